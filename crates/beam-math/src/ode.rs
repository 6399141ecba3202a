//! Adaptive explicit Runge-Kutta integration (Dormand-Prince 5(4)).
//!
//! The solver advances a fixed-size state `[f64; N]` through an ordered list
//! of checkpoints. It lands exactly on every checkpoint, reports the state
//! there to an observer, and sub-steps freely in between under local error
//! control. The embedded 4th-order solution provides the error estimate;
//! the 5th-order solution is propagated (local extrapolation), and the last
//! stage is reused as the first stage of the next step (FSAL).
//!
//! Reference: Hairer, Nørsett & Wanner, "Solving ODEs I", 2nd ed., II.4-5.

use beam_types::error::IntegrationFailure;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
/// 1 / (order of the error estimator + 1)
const ERROR_EXPONENT: f64 = -0.2;

// Butcher tableau.
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;
const A71: f64 = 35.0 / 384.0;
const A73: f64 = 500.0 / 1113.0;
const A74: f64 = 125.0 / 192.0;
const A75: f64 = -2187.0 / 6784.0;
const A76: f64 = 11.0 / 84.0;

// 5th minus 4th order weights.
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

/// Right-hand side `dy/dt = f(t, y)`.
pub trait OdeSystem<const N: usize> {
    fn rhs(&self, t: f64, y: &[f64; N]) -> [f64; N];
}

/// Error control and budget for [`integrate_dopri5`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions<const N: usize> {
    pub rtol: f64,
    /// Per-component absolute tolerance.
    pub atol: [f64; N],
    /// Attempted steps (accepted + rejected) before giving up.
    pub max_steps: usize,
    /// Skip the automatic initial step selection.
    pub first_step: Option<f64>,
}

impl<const N: usize> SolverOptions<N> {
    pub fn new(rtol: f64, atol: f64) -> Self {
        SolverOptions {
            rtol,
            atol: [atol; N],
            max_steps: 100_000,
            first_step: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub accepted: usize,
    pub rejected: usize,
    pub evaluations: usize,
}

/// State at the final checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeSolution<const N: usize> {
    pub t: f64,
    pub y: [f64; N],
    pub stats: SolverStats,
}

fn combine<const N: usize>(y: &[f64; N], h: f64, terms: &[(f64, &[f64; N])]) -> [f64; N] {
    let mut out = *y;
    for (i, o) in out.iter_mut().enumerate() {
        let mut acc = 0.0;
        for (w, k) in terms {
            acc += w * k[i];
        }
        *o += h * acc;
    }
    out
}

fn all_finite<const N: usize>(y: &[f64; N]) -> bool {
    y.iter().all(|v| v.is_finite())
}

/// Weighted RMS norm used for step acceptance.
fn scaled_rms<const N: usize>(v: &[f64; N], scale: &[f64; N]) -> f64 {
    if N == 0 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (x, s) in v.iter().zip(scale.iter()) {
        let r = if *s > 0.0 {
            x / s
        } else if *x == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        sum += r * r;
    }
    (sum / N as f64).sqrt()
}

fn error_scale<const N: usize>(
    y_old: &[f64; N],
    y_new: &[f64; N],
    options: &SolverOptions<N>,
) -> [f64; N] {
    let mut scale = [0.0; N];
    for i in 0..N {
        scale[i] = options.atol[i] + options.rtol * y_old[i].abs().max(y_new[i].abs());
    }
    scale
}

/// One Dormand-Prince step. Returns the 5th-order state, the local error
/// vector and the derivative at the new state.
pub fn dopri5_step<S: OdeSystem<N>, const N: usize>(
    system: &S,
    t: f64,
    y: &[f64; N],
    h: f64,
    k1: &[f64; N],
) -> ([f64; N], [f64; N], [f64; N]) {
    let k2 = system.rhs(t + C2 * h, &combine(y, h, &[(A21, k1)]));
    let k3 = system.rhs(t + C3 * h, &combine(y, h, &[(A31, k1), (A32, &k2)]));
    let k4 = system.rhs(
        t + C4 * h,
        &combine(y, h, &[(A41, k1), (A42, &k2), (A43, &k3)]),
    );
    let k5 = system.rhs(
        t + C5 * h,
        &combine(y, h, &[(A51, k1), (A52, &k2), (A53, &k3), (A54, &k4)]),
    );
    let k6 = system.rhs(
        t + h,
        &combine(
            y,
            h,
            &[(A61, k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)],
        ),
    );
    let y_new = combine(
        y,
        h,
        &[(A71, k1), (A73, &k3), (A74, &k4), (A75, &k5), (A76, &k6)],
    );
    let k7 = system.rhs(t + h, &y_new);

    let zero = [0.0; N];
    let err = combine(
        &zero,
        h,
        &[
            (E1, k1),
            (E3, &k3),
            (E4, &k4),
            (E5, &k5),
            (E6, &k6),
            (E7, &k7),
        ],
    );
    (y_new, err, k7)
}

/// Hairer's starting step heuristic, bounded by the integration span.
fn initial_step<S: OdeSystem<N>, const N: usize>(
    system: &S,
    t0: f64,
    y0: &[f64; N],
    f0: &[f64; N],
    span: f64,
    options: &SolverOptions<N>,
) -> f64 {
    let scale = error_scale(y0, y0, options);
    let d0 = scaled_rms(y0, &scale);
    let d1 = scaled_rms(f0, &scale);
    let h0 = if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
        1e-6 * span
    } else {
        0.01 * d0 / d1
    };

    let y1 = combine(y0, h0, &[(1.0, f0)]);
    let f1 = system.rhs(t0 + h0, &y1);
    let mut df = [0.0; N];
    for i in 0..N {
        df[i] = f1[i] - f0[i];
    }
    let d2 = scaled_rms(&df, &scale) / h0;

    let dmax = d1.max(d2);
    let h1 = if !dmax.is_finite() || dmax <= 1e-15 {
        (h0 * 1e-3).max(1e-6 * span)
    } else {
        (0.01 / dmax).powf(0.2)
    };
    (100.0 * h0).min(h1).min(span)
}

/// Integrate `system` from `checkpoints[0]` through every later checkpoint.
///
/// `observer` sees the state at each checkpoint, starting with `y0`.
/// Checkpoints must be finite and non-decreasing.
pub fn integrate_dopri5<S, F, const N: usize>(
    system: &S,
    y0: [f64; N],
    checkpoints: &[f64],
    options: &SolverOptions<N>,
    mut observer: F,
) -> Result<OdeSolution<N>, IntegrationFailure>
where
    S: OdeSystem<N>,
    F: FnMut(f64, &[f64; N]),
{
    let Some(&t0) = checkpoints.first() else {
        return Err(IntegrationFailure::InvalidSpan(
            "at least one checkpoint is required".to_string(),
        ));
    };
    if checkpoints.iter().any(|t| !t.is_finite()) {
        return Err(IntegrationFailure::InvalidSpan(
            "checkpoints must be finite".to_string(),
        ));
    }
    if checkpoints.windows(2).any(|w| w[1] < w[0]) {
        return Err(IntegrationFailure::InvalidSpan(
            "checkpoints must be non-decreasing".to_string(),
        ));
    }
    if !options.rtol.is_finite() || options.rtol <= 0.0 {
        return Err(IntegrationFailure::InvalidSpan(format!(
            "rtol must be finite and > 0, got {}",
            options.rtol
        )));
    }
    if !all_finite(&y0) {
        return Err(IntegrationFailure::NonFiniteState { t: t0 });
    }

    let mut stats = SolverStats::default();
    let mut t = t0;
    let mut y = y0;
    observer(t, &y);

    let t_end = checkpoints[checkpoints.len() - 1];
    let span = t_end - t0;
    if span == 0.0 {
        return Ok(OdeSolution { t, y, stats });
    }

    let mut f = system.rhs(t, &y);
    stats.evaluations += 1;
    if !all_finite(&f) {
        return Err(IntegrationFailure::NonFiniteState { t });
    }

    let mut h = match options.first_step {
        Some(step) if step.is_finite() && step > 0.0 => step.min(span),
        _ => {
            stats.evaluations += 1;
            initial_step(system, t, &y, &f, span, options)
        }
    };
    let mut last_rejected = false;

    for &target in &checkpoints[1..] {
        while t < target {
            if stats.accepted + stats.rejected >= options.max_steps {
                return Err(IntegrationFailure::StepLimitExceeded {
                    t,
                    max_steps: options.max_steps,
                });
            }

            let min_step = 16.0 * f64::EPSILON * t.abs().max(target.abs());
            let remaining = target - t;
            if remaining <= min_step {
                t = target;
                break;
            }
            let landing = h >= remaining;
            let step = if landing { remaining } else { h };
            if step < min_step {
                return Err(IntegrationFailure::StepSizeUnderflow { t, step });
            }

            let (y_new, err, f_new) = dopri5_step(system, t, &y, step, &f);
            stats.evaluations += 6;

            let scale = error_scale(&y, &y_new, options);
            let err_norm = scaled_rms(&err, &scale);
            let usable = err_norm.is_finite() && all_finite(&y_new) && all_finite(&f_new);

            if usable && err_norm <= 1.0 {
                t = if landing { target } else { t + step };
                y = y_new;
                f = f_new;
                stats.accepted += 1;

                let mut factor = if err_norm == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err_norm.powf(ERROR_EXPONENT)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                if last_rejected {
                    factor = factor.min(1.0);
                }
                let proposed = step * factor;
                h = if landing { h.max(proposed) } else { proposed };
                last_rejected = false;
            } else {
                stats.rejected += 1;
                let factor = if usable {
                    (SAFETY * err_norm.powf(ERROR_EXPONENT)).max(MIN_FACTOR)
                } else {
                    MIN_FACTOR
                };
                h = step * factor;
                last_rejected = true;
            }
        }
        observer(t, &y);
    }

    Ok(OdeSolution { t, y, stats })
}
