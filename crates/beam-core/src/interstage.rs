// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Interstage Element
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Basic interstage between two plasma accelerator stages.
//!
//! The element is modelled by its net effect only:
//! 1. longitudinal compression with R56 (explicit or from the dipoles),
//! 2. an achromatic betatron rotation by `phase_advance` in both planes,
//!    with the matched beta function `beta0` at either end.
//!
//! Without an explicit value the dipole pair gives
//! `R56 = -B² c² L³ / (3 E²)` and the lattice length is `4.7875 L_dipole`.

use crate::compression::{Compressor, LinearCompressor};
use crate::stage::{Stage, TrackContext};
use beam_math::transfer::rotate_phase_space;
use beam_types::config::InterstageConfig;
use beam_types::constants::{LENGTH_PER_DIPOLE_LENGTH, SPEED_OF_LIGHT};
use beam_types::error::{BeamError, BeamResult};
use beam_types::param::Parameter;
use beam_types::state::{ParticleEnsemble, Plane};
use ndarray::{Array1, ArrayView1};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Interstage lattice element.
#[derive(Clone)]
pub struct Interstage {
    nominal_energy: f64,
    length: Option<Parameter>,
    dipole_length: Option<Parameter>,
    dipole_field: Option<Parameter>,
    beta0: Parameter,
    r56: Option<Parameter>,
    phase_advance: f64,
    compressor: Arc<dyn Compressor>,
}

impl fmt::Debug for Interstage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interstage")
            .field("nominal_energy", &self.nominal_energy)
            .field("length", &self.length)
            .field("dipole_length", &self.dipole_length)
            .field("dipole_field", &self.dipole_field)
            .field("beta0", &self.beta0)
            .field("r56", &self.r56)
            .field("phase_advance", &self.phase_advance)
            .finish_non_exhaustive()
    }
}

fn resolve(param: Option<&Parameter>, name: &str, energy: f64) -> BeamResult<f64> {
    let param = param.ok_or_else(|| BeamError::InvalidParameter(format!("{name} is not set")))?;
    let value = param.evaluate(energy);
    if !value.is_finite() {
        return Err(BeamError::InvalidParameter(format!(
            "{name} evaluated to {value} at {energy:e} eV"
        )));
    }
    Ok(value)
}

impl Interstage {
    /// Validate the configuration and build the element.
    pub fn new(config: InterstageConfig) -> BeamResult<Self> {
        let InterstageConfig {
            nominal_energy,
            length,
            dipole_length,
            dipole_field,
            beta0,
            r56,
            phase_advance,
        } = config;

        if !nominal_energy.is_finite() || nominal_energy <= 0.0 {
            return Err(BeamError::InvalidParameter(format!(
                "nominal_energy must be finite and > 0, got {nominal_energy}"
            )));
        }
        if !phase_advance.is_finite() {
            return Err(BeamError::InvalidParameter(format!(
                "phase_advance must be finite, got {phase_advance}"
            )));
        }

        beta0.validate("beta0")?;
        if let Some(b) = beta0.as_fixed() {
            if b <= 0.0 {
                return Err(BeamError::InvalidParameter(format!(
                    "beta0 must be > 0, got {b}"
                )));
            }
        }
        for (name, p) in [
            ("length", &length),
            ("dipole_length", &dipole_length),
            ("dipole_field", &dipole_field),
            ("R56", &r56),
        ] {
            if let Some(p) = p {
                p.validate(name)?;
            }
        }
        if let Some(l) = length.as_ref().and_then(Parameter::as_fixed) {
            if l < 0.0 {
                return Err(BeamError::InvalidParameter(format!(
                    "length must be >= 0, got {l}"
                )));
            }
        }
        if let Some(l) = dipole_length.as_ref().and_then(Parameter::as_fixed) {
            if l <= 0.0 {
                return Err(BeamError::InvalidParameter(format!(
                    "dipole_length must be > 0, got {l}"
                )));
            }
        }
        if length.is_none() && dipole_length.is_none() {
            return Err(BeamError::InvalidParameter(
                "either length or dipole_length must be set".to_string(),
            ));
        }
        if r56.is_none() && (dipole_length.is_none() || dipole_field.is_none()) {
            return Err(BeamError::InvalidParameter(
                "R56 requires either an explicit value or both dipole_length and dipole_field"
                    .to_string(),
            ));
        }

        let stage = Interstage {
            nominal_energy,
            length,
            dipole_length,
            dipole_field,
            beta0,
            r56,
            phase_advance,
            compressor: Arc::new(LinearCompressor),
        };
        // Energy-dependent parameters must resolve at the design energy.
        stage.r56()?;
        stage.length()?;
        Ok(stage)
    }

    pub fn from_file(path: &str) -> BeamResult<Self> {
        Self::new(InterstageConfig::from_file(path)?)
    }

    /// Replace the longitudinal compression model.
    pub fn with_compressor(mut self, compressor: impl Compressor + 'static) -> Self {
        self.compressor = Arc::new(compressor);
        self
    }

    pub fn nominal_energy(&self) -> f64 {
        self.nominal_energy
    }

    pub fn phase_advance(&self) -> f64 {
        self.phase_advance
    }

    /// Dipole length at the nominal energy [m].
    pub fn dipole_length(&self) -> BeamResult<f64> {
        resolve(self.dipole_length.as_ref(), "dipole_length", self.nominal_energy)
    }

    /// Dipole field at the nominal energy [T].
    pub fn dipole_field(&self) -> BeamResult<f64> {
        resolve(self.dipole_field.as_ref(), "dipole_field", self.nominal_energy)
    }

    /// Longitudinal dispersion [m].
    pub fn r56(&self) -> BeamResult<f64> {
        if self.r56.is_some() {
            return resolve(self.r56.as_ref(), "R56", self.nominal_energy);
        }
        let b = self.dipole_field()?;
        let l = self.dipole_length()?;
        let e = self.nominal_energy;
        Ok(-(b * b) * SPEED_OF_LIGHT * SPEED_OF_LIGHT * l.powi(3) / (3.0 * e * e))
    }

    /// Lattice length [m].
    pub fn length(&self) -> BeamResult<f64> {
        if self.length.is_some() {
            return resolve(self.length.as_ref(), "length", self.nominal_energy);
        }
        Ok(LENGTH_PER_DIPOLE_LENGTH * self.dipole_length()?)
    }

    /// Matched beta function per particle energy [m].
    pub fn betas(&self, energies: ArrayView1<'_, f64>) -> BeamResult<Array1<f64>> {
        let betas = self.beta0.evaluate_each(energies);
        if let Some((i, b)) = betas
            .iter()
            .enumerate()
            .find(|(_, b)| !b.is_finite() || **b <= 0.0)
        {
            return Err(BeamError::InvalidParameter(format!(
                "beta0 must be finite and > 0, got {b} for particle {i} (E = {:e} eV)",
                energies[i]
            )));
        }
        Ok(betas)
    }
}

impl Stage for Interstage {
    fn name(&self) -> &str {
        "interstage"
    }

    fn length(&self) -> BeamResult<f64> {
        Interstage::length(self)
    }

    fn process(
        &self,
        mut beam: ParticleEnsemble,
        ctx: &TrackContext,
    ) -> BeamResult<ParticleEnsemble> {
        let r56 = self.r56()?;
        self.compressor.compress(&mut beam, r56, self.nominal_energy)?;

        let betas = self.betas(beam.energy().view())?;
        for plane in Plane::BOTH {
            let (u, up) = beam.plane_mut(plane);
            rotate_phase_space(u, up, betas.view(), self.phase_advance)?;
        }

        debug!(
            depth = ctx.depth,
            r56_m = r56,
            phase_advance = self.phase_advance,
            chromatic = self.beta0.is_energy_dependent(),
            particles = beam.len(),
            "interstage applied"
        );
        Ok(beam)
    }
}
