// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Betatron Motion with Radiation Reaction
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Single-particle betatron oscillation in the ion column of a plasma
//! wakefield, including energy gain and radiation-reaction damping.
//!
//! State `[x, v_x, γ]`:
//!
//! ```text
//! dx/dt   = v_x
//! dv_x/dt = -(C/γ + A) v_x - (B/γ) x
//! dγ/dt   = C - D γ² x²
//! ```
//!
//! with `K = k_p/√2`, `τ_r = 2 r_e / 3c`, `A = τ_r c² K²`, `B = c² K²`,
//! `C = ω_p E_z / E_0`, `D = τ_r c² K⁴`.
//!
//! Particles are independent; they share one sampling grid sized to
//! resolve the shortest betatron wavelength in the ensemble.

use beam_math::ode::{integrate_dopri5, OdeSystem, SolverOptions};
use beam_types::config::{IntegratorSettings, PlasmaConfig};
use beam_types::constants::{
    CLASSICAL_ELECTRON_RADIUS, DEFAULT_ACCELERATING_FIELD, ELECTRON_MASS, ELEMENTARY_CHARGE,
    EPSILON_0, REFERENCE_PLASMA_DENSITY, SPEED_OF_LIGHT, WAVEBREAKING_FIELD_AT_REFERENCE,
};
use beam_types::error::{BeamError, BeamResult};
use ndarray::Array1;
use rayon::prelude::*;
use std::f64::consts::{PI, SQRT_2};
use tracing::{debug, warn};

/// Normalized transverse momentum `u_x = γ v_x / c` to velocity [m/s].
#[inline]
pub fn momentum_to_velocity(ux: f64, gamma: f64) -> f64 {
    ux * SPEED_OF_LIGHT / gamma
}

/// Velocity [m/s] to normalized transverse momentum.
#[inline]
pub fn velocity_to_momentum(vx: f64, gamma: f64) -> f64 {
    vx * gamma / SPEED_OF_LIGHT
}

/// Electron density [m⁻³] for a plasma wavenumber [1/m].
pub fn plasma_density(plasma_wavenumber: f64) -> f64 {
    let omega_p = SPEED_OF_LIGHT * plasma_wavenumber;
    omega_p * omega_p * ELECTRON_MASS * EPSILON_0 / (ELEMENTARY_CHARGE * ELEMENTARY_CHARGE)
}

/// Cold non-relativistic wave-breaking field [V/m], scaled from 96 GV/m at 10²⁴ m⁻³.
pub fn wavebreaking_field(density: f64) -> f64 {
    WAVEBREAKING_FIELD_AT_REFERENCE * (density / REFERENCE_PLASMA_DENSITY).sqrt()
}

/// Matched beta function in a blowout ion column [m].
pub fn matched_beta_function(gamma: f64, plasma_wavenumber: f64) -> f64 {
    (2.0 * gamma).sqrt() / plasma_wavenumber
}

/// Linear and nonlinear coefficients of the betatron ODE.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorCoefficients {
    /// Radiation damping of v_x [1/s]
    pub a: f64,
    /// Focusing strength [1/s²]
    pub b: f64,
    /// Energy gain rate dγ/dt [1/s]
    pub c: f64,
    /// Radiation loss coefficient [1/(m² s)]
    pub d: f64,
}

impl OscillatorCoefficients {
    pub fn from_plasma(plasma_wavenumber: f64, accelerating_field: f64) -> Self {
        let c2 = SPEED_OF_LIGHT * SPEED_OF_LIGHT;
        let omega_p = SPEED_OF_LIGHT * plasma_wavenumber;
        let e0 = wavebreaking_field(plasma_density(plasma_wavenumber));
        let tau_r = 2.0 * CLASSICAL_ELECTRON_RADIUS / (3.0 * SPEED_OF_LIGHT);
        let k = plasma_wavenumber / SQRT_2;
        let k2 = k * k;

        OscillatorCoefficients {
            a: tau_r * c2 * k2,
            b: c2 * k2,
            c: omega_p * accelerating_field / e0,
            d: tau_r * c2 * k2 * k2,
        }
    }
}

struct BetatronOde {
    k: OscillatorCoefficients,
}

impl OdeSystem<3> for BetatronOde {
    fn rhs(&self, _t: f64, y: &[f64; 3]) -> [f64; 3] {
        let [x, v, gamma] = *y;
        let k = &self.k;
        [
            v,
            -(k.c / gamma + k.a) * v - (k.b / gamma) * x,
            k.c - k.d * gamma * gamma * x * x,
        ]
    }
}

/// Coefficients plus the plasma wavenumber that sets the sampling grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetatronModel {
    pub coefficients: OscillatorCoefficients,
    pub plasma_wavenumber: f64,
}

impl BetatronModel {
    pub fn from_plasma(plasma_wavenumber: f64, accelerating_field: f64) -> BeamResult<Self> {
        validate_wavenumber(plasma_wavenumber)?;
        if !accelerating_field.is_finite() {
            return Err(BeamError::InvalidParameter(format!(
                "accelerating_field must be finite, got {accelerating_field}"
            )));
        }
        Ok(BetatronModel {
            coefficients: OscillatorCoefficients::from_plasma(
                plasma_wavenumber,
                accelerating_field,
            ),
            plasma_wavenumber,
        })
    }

    /// Explicit coefficients, e.g. to switch radiation reaction off.
    pub fn new(coefficients: OscillatorCoefficients, plasma_wavenumber: f64) -> BeamResult<Self> {
        validate_wavenumber(plasma_wavenumber)?;
        let OscillatorCoefficients { a, b, c, d } = coefficients;
        if ![a, b, c, d].iter().all(|v| v.is_finite()) {
            return Err(BeamError::InvalidParameter(format!(
                "oscillator coefficients must be finite, got {coefficients:?}"
            )));
        }
        Ok(BetatronModel {
            coefficients,
            plasma_wavenumber,
        })
    }

    /// Small-amplitude betatron angular frequency at `gamma` [rad/s].
    fn betatron_frequency(&self, gamma: f64) -> f64 {
        (self.coefficients.b / gamma).max(0.0).sqrt()
    }
}

fn validate_length(length: f64) -> BeamResult<()> {
    if !length.is_finite() || length < 0.0 {
        return Err(BeamError::InvalidParameter(format!(
            "propagation length must be finite and >= 0, got {length}"
        )));
    }
    Ok(())
}

fn validate_gamma(gamma: f64, name: &str) -> BeamResult<()> {
    if !gamma.is_finite() || gamma < 1.0 {
        return Err(BeamError::InvalidParameter(format!(
            "{name} must be finite and >= 1, got {gamma}"
        )));
    }
    Ok(())
}

fn validate_wavenumber(kp: f64) -> BeamResult<()> {
    if !kp.is_finite() || kp <= 0.0 {
        return Err(BeamError::InvalidParameter(format!(
            "plasma_wavenumber must be finite and > 0, got {kp}"
        )));
    }
    Ok(())
}

/// Final per-particle state.
#[derive(Debug, Clone, PartialEq)]
pub struct BetatronState {
    pub x: Array1<f64>,
    /// Normalized transverse momentum γ v_x / c
    pub ux: Array1<f64>,
    pub gamma: Array1<f64>,
}

impl BetatronState {
    fn empty() -> Self {
        BetatronState {
            x: Array1::zeros(0),
            ux: Array1::zeros(0),
            gamma: Array1::zeros(0),
        }
    }
}

/// Integrates the betatron ODE for an ensemble of particles.
#[derive(Debug, Clone)]
pub struct BetatronIntegrator {
    model: BetatronModel,
    settings: IntegratorSettings,
}

impl BetatronIntegrator {
    pub fn new(model: BetatronModel, settings: IntegratorSettings) -> BeamResult<Self> {
        if settings.samples_per_oscillation == 0 {
            return Err(BeamError::ConfigError(
                "samples_per_oscillation must be >= 1".to_string(),
            ));
        }
        if !settings.relative_tolerance.is_finite() || settings.relative_tolerance <= 0.0 {
            return Err(BeamError::ConfigError(format!(
                "relative_tolerance must be finite and > 0, got {}",
                settings.relative_tolerance
            )));
        }
        if !settings.absolute_tolerance.is_finite() || settings.absolute_tolerance < 0.0 {
            return Err(BeamError::ConfigError(format!(
                "absolute_tolerance must be finite and >= 0, got {}",
                settings.absolute_tolerance
            )));
        }
        if settings.max_steps == 0 {
            return Err(BeamError::ConfigError("max_steps must be >= 1".to_string()));
        }
        Ok(BetatronIntegrator { model, settings })
    }

    pub fn from_config(config: &PlasmaConfig) -> BeamResult<Self> {
        let model =
            BetatronModel::from_plasma(config.plasma_wavenumber, config.accelerating_field)?;
        Self::new(model, config.integrator)
    }

    pub fn from_file(path: &str) -> BeamResult<Self> {
        Self::from_config(&PlasmaConfig::from_file(path)?)
    }

    pub fn model(&self) -> &BetatronModel {
        &self.model
    }

    pub fn settings(&self) -> &IntegratorSettings {
        &self.settings
    }

    /// Shared output grid over `[0, length / c]`, at least two points.
    ///
    /// Every interval costs at least one solver step, so a grid with more
    /// intervals than `max_steps` is rejected before it is allocated.
    pub fn sample_times(&self, length: f64, gamma_min: f64) -> BeamResult<Vec<f64>> {
        validate_length(length)?;
        validate_gamma(gamma_min, "gamma_min")?;
        let n = self.sample_count(length, gamma_min)?;
        let t_end = length / SPEED_OF_LIGHT;
        let last = (n - 1) as f64;
        Ok((0..n).map(|i| i as f64 / last * t_end).collect())
    }

    fn sample_count(&self, length: f64, gamma_min: f64) -> BeamResult<usize> {
        let lambda_beta =
            2.0 * PI * matched_beta_function(gamma_min, self.model.plasma_wavenumber);
        let oscillations = length / lambda_beta;
        let n = (oscillations * self.settings.samples_per_oscillation as f64).round();
        let budget = self.settings.max_steps as f64;
        if !n.is_finite() || n - 1.0 > budget {
            return Err(BeamError::InvalidParameter(format!(
                "{length} m at gamma {gamma_min} needs {n:e} samples, \
                 more than max_steps + 1 = {}",
                budget + 1.0
            )));
        }
        Ok((n as usize).max(2))
    }

    /// Evolve every particle over `length` [m] of plasma.
    ///
    /// `x0` [m], `ux0` (normalized momentum) and `gamma0` must have equal
    /// lengths. Any integration failure aborts the whole call.
    pub fn evolve(
        &self,
        x0: &[f64],
        ux0: &[f64],
        gamma0: &[f64],
        length: f64,
    ) -> BeamResult<BetatronState> {
        let n = x0.len();
        if ux0.len() != n {
            return Err(BeamError::ShapeMismatch {
                field: "ux0",
                expected: n,
                found: ux0.len(),
            });
        }
        if gamma0.len() != n {
            return Err(BeamError::ShapeMismatch {
                field: "gamma0",
                expected: n,
                found: gamma0.len(),
            });
        }
        validate_length(length)?;
        for i in 0..n {
            if !x0[i].is_finite() || !ux0[i].is_finite() {
                return Err(BeamError::InvalidParameter(format!(
                    "particle {i} has non-finite initial coordinates (x={}, ux={})",
                    x0[i], ux0[i]
                )));
            }
            if !gamma0[i].is_finite() || gamma0[i] < 1.0 {
                return Err(BeamError::InvalidParameter(format!(
                    "particle {i} has invalid Lorentz factor {} (must be >= 1)",
                    gamma0[i]
                )));
            }
        }
        if n == 0 {
            return Ok(BetatronState::empty());
        }

        let gamma_min = gamma0.iter().copied().fold(f64::INFINITY, f64::min);
        let times = self.sample_times(length, gamma_min)?;
        debug!(
            particles = n,
            samples = times.len(),
            length_m = length,
            parallel = self.settings.parallel,
            "evolving betatron motion"
        );

        let run = |i: usize| self.evolve_particle(i, x0[i], ux0[i], gamma0[i], &times);
        let finals: Vec<[f64; 3]> = if self.settings.parallel {
            (0..n).into_par_iter().map(run).collect::<BeamResult<_>>()?
        } else {
            (0..n).map(run).collect::<BeamResult<_>>()?
        };

        let mut state = BetatronState {
            x: Array1::zeros(n),
            ux: Array1::zeros(n),
            gamma: Array1::zeros(n),
        };
        for (i, [x, v, gamma]) in finals.into_iter().enumerate() {
            state.x[i] = x;
            state.ux[i] = velocity_to_momentum(v, gamma);
            state.gamma[i] = gamma;
        }
        Ok(state)
    }

    fn evolve_particle(
        &self,
        index: usize,
        x0: f64,
        ux0: f64,
        gamma0: f64,
        times: &[f64],
    ) -> BeamResult<[f64; 3]> {
        let v0 = momentum_to_velocity(ux0, gamma0);
        let options = self.solver_options(x0, v0, gamma0, times);
        let system = BetatronOde {
            k: self.model.coefficients,
        };

        integrate_dopri5(&system, [x0, v0, gamma0], times, &options, |_, _| {})
            .map(|solution| solution.y)
            .map_err(|cause| {
                warn!(particle = index, %cause, "betatron integration failed");
                BeamError::IntegrationFailed {
                    particle: index,
                    cause,
                }
            })
    }

    /// Absolute tolerances scale with the oscillation amplitude, the peak
    /// transverse velocity and γ.
    fn solver_options(&self, x0: f64, v0: f64, gamma0: f64, times: &[f64]) -> SolverOptions<3> {
        let omega = self.model.betatron_frequency(gamma0);
        let t_end = times.last().copied().unwrap_or(0.0);
        let amplitude = if omega > 0.0 {
            (x0 * x0 + (v0 / omega).powi(2)).sqrt()
        } else {
            x0.abs() + v0.abs() * t_end
        };
        let v_scale = v0.abs().max(omega * amplitude);
        let frac = self.settings.absolute_tolerance;
        SolverOptions {
            rtol: self.settings.relative_tolerance,
            atol: [
                (frac * amplitude).max(f64::MIN_POSITIVE),
                (frac * v_scale).max(f64::MIN_POSITIVE),
                (frac * gamma0).max(f64::MIN_POSITIVE),
            ],
            max_steps: self.settings.max_steps,
            first_step: None,
        }
    }
}

/// Evolve with the default accelerating field and integrator settings.
pub fn evolve_betatron_motion(
    x0: &[f64],
    ux0: &[f64],
    gamma0: &[f64],
    length: f64,
    plasma_wavenumber: f64,
) -> BeamResult<BetatronState> {
    let model = BetatronModel::from_plasma(plasma_wavenumber, DEFAULT_ACCELERATING_FIELD)?;
    BetatronIntegrator::new(model, IntegratorSettings::default())?.evolve(x0, ux0, gamma0, length)
}
