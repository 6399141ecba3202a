//! Linear 2×2 transfer maps on transverse phase space `(u, u')`.

use beam_types::error::{BeamError, BeamResult};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};

/// Transfer matrix acting on a column `(u, u')`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferMatrix {
    pub m11: f64,
    pub m12: f64,
    pub m21: f64,
    pub m22: f64,
}

impl TransferMatrix {
    pub const IDENTITY: TransferMatrix = TransferMatrix {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
    };

    /// Betatron rotation between two matched waists (alpha = 0):
    ///
    /// ```text
    /// |  cos θ      β sin θ |
    /// | -sin θ / β  cos θ   |
    /// ```
    pub fn phase_rotation(beta: f64, phase_advance: f64) -> Self {
        let (s, c) = phase_advance.sin_cos();
        TransferMatrix {
            m11: c,
            m12: beta * s,
            m21: -s / beta,
            m22: c,
        }
    }

    #[inline]
    pub fn apply(&self, u: f64, up: f64) -> (f64, f64) {
        (
            self.m11 * u + self.m12 * up,
            self.m21 * u + self.m22 * up,
        )
    }

    pub fn determinant(&self) -> f64 {
        self.m11 * self.m22 - self.m12 * self.m21
    }

    /// `self · first`: apply `first`, then `self`.
    pub fn after(&self, first: &TransferMatrix) -> TransferMatrix {
        TransferMatrix {
            m11: self.m11 * first.m11 + self.m12 * first.m21,
            m12: self.m11 * first.m12 + self.m12 * first.m22,
            m21: self.m21 * first.m11 + self.m22 * first.m21,
            m22: self.m21 * first.m12 + self.m22 * first.m22,
        }
    }
}

/// Rotate `(u, u')` in place with a per-particle beta function.
pub fn rotate_phase_space(
    mut u: ArrayViewMut1<'_, f64>,
    mut up: ArrayViewMut1<'_, f64>,
    betas: ArrayView1<'_, f64>,
    phase_advance: f64,
) -> BeamResult<()> {
    let n = u.len();
    if up.len() != n {
        return Err(BeamError::ShapeMismatch {
            field: "angle",
            expected: n,
            found: up.len(),
        });
    }
    if betas.len() != n {
        return Err(BeamError::ShapeMismatch {
            field: "beta",
            expected: n,
            found: betas.len(),
        });
    }

    Zip::from(&mut u)
        .and(&mut up)
        .and(&betas)
        .for_each(|ui, upi, &beta| {
            let (a, b) = TransferMatrix::phase_rotation(beta, phase_advance).apply(*ui, *upi);
            *ui = a;
            *upi = b;
        });
    Ok(())
}
