// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::ELECTRON_REST_ENERGY_EV;
use crate::error::{BeamError, BeamResult};
use ndarray::{Array1, ArrayViewMut1};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Transverse plane selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    X,
    Y,
}

impl Plane {
    pub const BOTH: [Plane; 2] = [Plane::X, Plane::Y];
}

/// Macro-particle beam in 6D phase space.
///
/// All columns share one length; the constructor enforces it and the
/// mutable accessors hand out fixed-size views so it cannot drift.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleEnsemble {
    x: Array1<f64>,      // horizontal position [m]
    xp: Array1<f64>,     // horizontal angle [rad]
    y: Array1<f64>,      // vertical position [m]
    yp: Array1<f64>,     // vertical angle [rad]
    z: Array1<f64>,      // longitudinal position, positive towards the head [m]
    energy: Array1<f64>, // total energy [eV]
    /// Accumulated beamline position [m].
    pub location: f64,
    /// Number of stages this beam has been tracked through.
    pub stage_number: usize,
}

impl ParticleEnsemble {
    pub fn new(
        x: Array1<f64>,
        xp: Array1<f64>,
        y: Array1<f64>,
        yp: Array1<f64>,
        z: Array1<f64>,
        energy: Array1<f64>,
    ) -> BeamResult<Self> {
        let n = x.len();
        for (field, len) in [
            ("xp", xp.len()),
            ("y", y.len()),
            ("yp", yp.len()),
            ("z", z.len()),
            ("energy", energy.len()),
        ] {
            if len != n {
                return Err(BeamError::ShapeMismatch {
                    field,
                    expected: n,
                    found: len,
                });
            }
        }
        Ok(ParticleEnsemble {
            x,
            xp,
            y,
            yp,
            z,
            energy,
            location: 0.0,
            stage_number: 0,
        })
    }

    /// Sample an uncorrelated Gaussian beam at a beta-function waist.
    pub fn gaussian(params: &GaussianBeam, n_particles: usize, seed: u64) -> BeamResult<Self> {
        params.validate()?;
        let sigma_x = (params.emittance * params.beta).sqrt();
        let sigma_xp = (params.emittance / params.beta).sqrt();
        let sigma_e = params.relative_energy_spread * params.energy;

        let normal = |sigma: f64| {
            Normal::new(0.0, sigma)
                .map_err(|e| BeamError::InvalidParameter(format!("gaussian sampler: {e}")))
        };
        let d_x = normal(sigma_x)?;
        let d_xp = normal(sigma_xp)?;
        let d_z = normal(params.bunch_length)?;
        let d_e = normal(sigma_e)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut draw = |d: &Normal<f64>| -> Array1<f64> {
            Array1::from_iter((0..n_particles).map(|_| d.sample(&mut rng)))
        };
        let x = draw(&d_x);
        let xp = draw(&d_xp);
        let y = draw(&d_x);
        let yp = draw(&d_xp);
        let z = draw(&d_z);
        let energy = draw(&d_e).mapv(|de| params.energy + de);

        Self::new(x, xp, y, yp, z, energy)
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn xp(&self) -> &Array1<f64> {
        &self.xp
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn yp(&self) -> &Array1<f64> {
        &self.yp
    }

    pub fn z(&self) -> &Array1<f64> {
        &self.z
    }

    pub fn energy(&self) -> &Array1<f64> {
        &self.energy
    }

    /// Position and angle columns of one plane.
    pub fn plane(&self, plane: Plane) -> (&Array1<f64>, &Array1<f64>) {
        match plane {
            Plane::X => (&self.x, &self.xp),
            Plane::Y => (&self.y, &self.yp),
        }
    }

    pub fn plane_mut(&mut self, plane: Plane) -> (ArrayViewMut1<'_, f64>, ArrayViewMut1<'_, f64>) {
        match plane {
            Plane::X => (self.x.view_mut(), self.xp.view_mut()),
            Plane::Y => (self.y.view_mut(), self.yp.view_mut()),
        }
    }

    pub fn z_mut(&mut self) -> ArrayViewMut1<'_, f64> {
        self.z.view_mut()
    }

    /// Lorentz factor per particle.
    pub fn gamma(&self) -> Array1<f64> {
        self.energy.mapv(|e| e / ELECTRON_REST_ENERGY_EV)
    }

    pub fn mean_energy(&self) -> f64 {
        self.energy.mean().unwrap_or(0.0)
    }

    /// Centred rms geometric emittance of one plane [m rad].
    pub fn rms_emittance(&self, plane: Plane) -> f64 {
        let (u, up) = self.plane(plane);
        let n = u.len();
        if n < 2 {
            return 0.0;
        }
        let inv_n = 1.0 / n as f64;
        let mu = u.sum() * inv_n;
        let mup = up.sum() * inv_n;
        let mut s_uu = 0.0;
        let mut s_pp = 0.0;
        let mut s_up = 0.0;
        for (&a, &b) in u.iter().zip(up.iter()) {
            let da = a - mu;
            let db = b - mup;
            s_uu += da * da;
            s_pp += db * db;
            s_up += da * db;
        }
        s_uu *= inv_n;
        s_pp *= inv_n;
        s_up *= inv_n;
        (s_uu * s_pp - s_up * s_up).max(0.0).sqrt()
    }
}

/// Gaussian beam description used by [`ParticleEnsemble::gaussian`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianBeam {
    /// Mean total energy [eV]
    pub energy: f64,
    /// rms relative energy spread
    pub relative_energy_spread: f64,
    /// rms bunch length [m]
    pub bunch_length: f64,
    /// Beta function at the waist, both planes [m]
    pub beta: f64,
    /// Geometric emittance, both planes [m rad]
    pub emittance: f64,
}

impl GaussianBeam {
    fn validate(&self) -> BeamResult<()> {
        if !self.energy.is_finite() || self.energy <= 0.0 {
            return Err(BeamError::InvalidParameter(format!(
                "beam energy must be finite and > 0, got {}",
                self.energy
            )));
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(BeamError::InvalidParameter(format!(
                "beta must be finite and > 0, got {}",
                self.beta
            )));
        }
        for (name, v) in [
            ("relative_energy_spread", self.relative_energy_spread),
            ("bunch_length", self.bunch_length),
            ("emittance", self.emittance),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(BeamError::InvalidParameter(format!(
                    "{name} must be finite and >= 0, got {v}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn beam_params() -> GaussianBeam {
        GaussianBeam {
            energy: 10e9,
            relative_energy_spread: 0.01,
            bunch_length: 20e-6,
            beta: 0.05,
            emittance: 1e-9,
        }
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = ParticleEnsemble::new(
            array![0.0, 1.0],
            array![0.0, 1.0],
            array![0.0, 1.0],
            array![0.0],
            array![0.0, 1.0],
            array![1e9, 1e9],
        )
        .unwrap_err();
        match err {
            BeamError::ShapeMismatch {
                field,
                expected,
                found,
            } => {
                assert_eq!(field, "yp");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_gamma_of_rest_energy_is_one() {
        let beam = ParticleEnsemble::new(
            array![0.0],
            array![0.0],
            array![0.0],
            array![0.0],
            array![0.0],
            array![ELECTRON_REST_ENERGY_EV],
        )
        .unwrap();
        assert!((beam.gamma()[0] - 1.0).abs() < 1e-15);
        assert_eq!(beam.stage_number, 0);
        assert_eq!(beam.location, 0.0);
    }

    #[test]
    fn test_gaussian_is_deterministic_per_seed() {
        let a = ParticleEnsemble::gaussian(&beam_params(), 64, 7).unwrap();
        let b = ParticleEnsemble::gaussian(&beam_params(), 64, 7).unwrap();
        let c = ParticleEnsemble::gaussian(&beam_params(), 64, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.x(), c.x());
    }

    #[test]
    fn test_gaussian_moments() {
        let params = beam_params();
        let beam = ParticleEnsemble::gaussian(&params, 20_000, 42).unwrap();
        assert_eq!(beam.len(), 20_000);
        let rel = (beam.mean_energy() - params.energy).abs() / params.energy;
        assert!(rel < 1e-3, "mean energy offset {rel}");
        for plane in Plane::BOTH {
            let eps = beam.rms_emittance(plane);
            assert!(
                (eps - params.emittance).abs() / params.emittance < 0.05,
                "{plane:?} emittance {eps}"
            );
        }
    }

    #[test]
    fn test_gaussian_rejects_zero_beta() {
        let params = GaussianBeam {
            beta: 0.0,
            ..beam_params()
        };
        assert!(ParticleEnsemble::gaussian(&params, 10, 1).is_err());
    }

    #[test]
    fn test_emittance_of_line_is_zero() {
        let beam = ParticleEnsemble::new(
            array![1.0, 2.0, 3.0],
            array![2.0, 4.0, 6.0],
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
            array![1e9, 1e9, 1e9],
        )
        .unwrap();
        assert!(beam.rms_emittance(Plane::X) < 1e-12);
        assert_eq!(beam.rms_emittance(Plane::Y), 0.0);
    }
}
