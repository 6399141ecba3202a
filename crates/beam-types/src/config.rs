// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{
    DEFAULT_ACCELERATING_FIELD, DEFAULT_PHASE_ADVANCE, DEFAULT_SAMPLES_PER_OSCILLATION,
};
use crate::param::Parameter;
use serde::{Deserialize, Serialize};

/// Interstage lattice description.
/// Energy-dependent fields accept a number or a power-law object in JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterstageConfig {
    /// Nominal beam energy [eV].
    pub nominal_energy: f64,
    /// Lattice length [m]. Defaults to 4.7875 × dipole length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<Parameter>,
    /// Dipole length [m].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dipole_length: Option<Parameter>,
    /// Dipole field [T].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dipole_field: Option<Parameter>,
    /// Matched beta function at the interstage ends [m].
    pub beta0: Parameter,
    /// Longitudinal dispersion [m]. Derived from the dipoles when absent.
    #[serde(default, rename = "R56", skip_serializing_if = "Option::is_none")]
    pub r56: Option<Parameter>,
    /// Betatron phase advance [rad].
    #[serde(default = "default_phase_advance")]
    pub phase_advance: f64,
}

fn default_phase_advance() -> f64 {
    DEFAULT_PHASE_ADVANCE
}

impl InterstageConfig {
    pub fn new(nominal_energy: f64, beta0: impl Into<Parameter>) -> Self {
        InterstageConfig {
            nominal_energy,
            length: None,
            dipole_length: None,
            dipole_field: None,
            beta0: beta0.into(),
            r56: None,
            phase_advance: DEFAULT_PHASE_ADVANCE,
        }
    }

    pub fn with_dipole(
        mut self,
        length: impl Into<Parameter>,
        field: impl Into<Parameter>,
    ) -> Self {
        self.dipole_length = Some(length.into());
        self.dipole_field = Some(field.into());
        self
    }

    pub fn with_length(mut self, length: impl Into<Parameter>) -> Self {
        self.length = Some(length.into());
        self
    }

    pub fn with_r56(mut self, r56: impl Into<Parameter>) -> Self {
        self.r56 = Some(r56.into());
        self
    }

    pub fn with_phase_advance(mut self, phase_advance: f64) -> Self {
        self.phase_advance = phase_advance;
        self
    }

    pub fn from_file(path: &str) -> crate::error::BeamResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

/// Plasma channel driving the betatron integrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlasmaConfig {
    /// Plasma wavenumber k_p [1/m].
    pub plasma_wavenumber: f64,
    /// Longitudinal accelerating field E_z [V/m].
    #[serde(default = "default_accelerating_field")]
    pub accelerating_field: f64,
    #[serde(default)]
    pub integrator: IntegratorSettings,
}

fn default_accelerating_field() -> f64 {
    DEFAULT_ACCELERATING_FIELD
}

impl PlasmaConfig {
    pub fn new(plasma_wavenumber: f64) -> Self {
        PlasmaConfig {
            plasma_wavenumber,
            accelerating_field: DEFAULT_ACCELERATING_FIELD,
            integrator: IntegratorSettings::default(),
        }
    }

    pub fn from_file(path: &str) -> crate::error::BeamResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }
}

/// Adaptive integrator controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorSettings {
    /// Output samples per betatron wavelength (default: 100)
    #[serde(default = "default_samples_per_oscillation")]
    pub samples_per_oscillation: usize,
    /// Relative local error tolerance (default: 1e-8)
    #[serde(default = "default_relative_tolerance")]
    pub relative_tolerance: f64,
    /// Absolute tolerance as a fraction of each component's natural scale (default: 1e-10)
    #[serde(default = "default_absolute_tolerance")]
    pub absolute_tolerance: f64,
    /// Accepted plus rejected steps allowed per particle (default: 1_000_000)
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Integrate particles on the rayon pool (default: true)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_samples_per_oscillation() -> usize {
    DEFAULT_SAMPLES_PER_OSCILLATION
}
fn default_relative_tolerance() -> f64 {
    1e-8
}
fn default_absolute_tolerance() -> f64 {
    1e-10
}
fn default_max_steps() -> usize {
    1_000_000
}
fn default_parallel() -> bool {
    true
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        IntegratorSettings {
            samples_per_oscillation: default_samples_per_oscillation(),
            relative_tolerance: default_relative_tolerance(),
            absolute_tolerance: default_absolute_tolerance(),
            max_steps: default_max_steps(),
            parallel: default_parallel(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use std::path::PathBuf;

    /// CARGO_MANIFEST_DIR points to crates/beam-types/, configs live at the
    /// workspace root.
    fn project_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
    }

    fn config_path(relative: &str) -> String {
        project_root().join(relative).to_string_lossy().to_string()
    }

    #[test]
    fn test_load_interstage_config() {
        let cfg = InterstageConfig::from_file(&config_path("configs/interstage_10gev.json"))
            .unwrap();
        assert!((cfg.nominal_energy - 10e9).abs() < 1.0);
        assert!(cfg.length.is_none());
        assert!(cfg.r56.is_none());
        assert!((cfg.phase_advance - 1.5 * PI).abs() < 1e-12);
        match cfg.dipole_length {
            Some(Parameter::Scaled(law)) => {
                assert!((law.exponent - 0.5).abs() < 1e-15);
                assert!((law.reference_energy - 10e9).abs() < 1.0);
            }
            other => panic!("expected scaled dipole length, got {other:?}"),
        }
        assert_eq!(cfg.beta0.as_fixed(), None);
    }

    #[test]
    fn test_load_plasma_config() {
        let cfg = PlasmaConfig::from_file(&config_path("configs/plasma_stage.json")).unwrap();
        assert!(cfg.plasma_wavenumber > 0.0);
        assert!((cfg.accelerating_field - 6.4e9).abs() < 1.0);
        assert_eq!(cfg.integrator.samples_per_oscillation, 100);
        assert!(cfg.integrator.parallel);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let cfg: InterstageConfig =
            serde_json::from_str(r#"{"nominal_energy": 5e9, "beta0": 2.0, "R56": -1e-4}"#)
                .unwrap();
        assert!((cfg.phase_advance - DEFAULT_PHASE_ADVANCE).abs() < 1e-15);
        assert_eq!(cfg.r56.and_then(|p| p.as_fixed()), Some(-1e-4));

        let plasma: PlasmaConfig = serde_json::from_str(r#"{"plasma_wavenumber": 1e5}"#).unwrap();
        assert_eq!(plasma.integrator, IntegratorSettings::default());
    }

    #[test]
    fn test_roundtrip_serialization() {
        let cfg = InterstageConfig::new(1e9, 10.0)
            .with_dipole(1.0, 1.0)
            .with_phase_advance(PI / 2.0);
        let json = serde_json::to_string_pretty(&cfg).unwrap();
        assert!(json.contains("dipole_field"));
        assert!(!json.contains("R56"));
        let back: InterstageConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nominal_energy, cfg.nominal_energy);
        assert_eq!(back.beta0.as_fixed(), Some(10.0));
        assert_eq!(back.phase_advance, cfg.phase_advance);
    }
}
