// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Longitudinal Compression
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Longitudinal dispersion applied by chicane-like lattices.

use beam_types::error::{BeamError, BeamResult};
use beam_types::state::ParticleEnsemble;
use ndarray::Zip;

/// Maps each particle's energy offset to a longitudinal shift.
pub trait Compressor: Send + Sync {
    fn compress(&self, beam: &mut ParticleEnsemble, r56: f64, nominal_energy: f64)
        -> BeamResult<()>;
}

/// First-order dispersion: `z -> z - R56 · (E - E_nom) / E_nom`.
///
/// With `z` positive towards the head and `R56 < 0`, higher-energy
/// particles move forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearCompressor;

impl Compressor for LinearCompressor {
    fn compress(
        &self,
        beam: &mut ParticleEnsemble,
        r56: f64,
        nominal_energy: f64,
    ) -> BeamResult<()> {
        if !nominal_energy.is_finite() || nominal_energy <= 0.0 {
            return Err(BeamError::InvalidParameter(format!(
                "nominal_energy must be finite and > 0, got {nominal_energy}"
            )));
        }
        if !r56.is_finite() {
            return Err(BeamError::InvalidParameter(format!(
                "R56 must be finite, got {r56}"
            )));
        }
        if r56 == 0.0 {
            return Ok(());
        }

        let energy = beam.energy().clone();
        Zip::from(beam.z_mut()).and(&energy).for_each(|z, &e| {
            let delta = (e - nominal_energy) / nominal_energy;
            *z -= r56 * delta;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn beam() -> ParticleEnsemble {
        ParticleEnsemble::new(
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
            array![0.0, 0.0, 0.0],
            array![1e-6, 0.0, -1e-6],
            array![1.01e9, 1e9, 0.99e9],
        )
        .unwrap()
    }

    #[test]
    fn test_nominal_particle_unmoved() {
        let mut b = beam();
        LinearCompressor.compress(&mut b, -2e-3, 1e9).unwrap();
        assert_eq!(b.z()[1], 0.0);
    }

    #[test]
    fn test_negative_r56_moves_high_energy_forward() {
        let mut b = beam();
        LinearCompressor.compress(&mut b, -1e-4, 1e9).unwrap();
        // δ = +1 %: z = 1e-6 + 1e-4 × 0.01
        assert!((b.z()[0] - 2e-6).abs() < 1e-15);
        assert!((b.z()[2] + 2e-6).abs() < 1e-15);
    }

    #[test]
    fn test_zero_r56_is_noop() {
        let mut b = beam();
        LinearCompressor.compress(&mut b, 0.0, 1e9).unwrap();
        assert_eq!(b, beam());
    }

    #[test]
    fn test_invalid_nominal_energy() {
        let mut b = beam();
        assert!(LinearCompressor.compress(&mut b, -1e-4, 0.0).is_err());
        assert!(LinearCompressor.compress(&mut b, f64::NAN, 1e9).is_err());
    }
}
