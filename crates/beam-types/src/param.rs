// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Parameters
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Lattice parameters that are either fixed or a function of energy.
//!
//! Every energy-dependent knob of a stage (dipole length, dipole field,
//! beta function, R56, length) is a [`Parameter`]. Call sites resolve it
//! through [`Parameter::evaluate`] and never inspect the variant.

use crate::error::{BeamError, BeamResult};
use ndarray::{Array1, ArrayView1};
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Energy-dependent closure: energy [eV] -> parameter value.
pub type EnergyFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// `coefficient * (energy / reference_energy)^exponent`.
///
/// The serializable form of an energy-scaled parameter, e.g. dipoles that
/// grow with the square root of the beam energy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLaw {
    pub coefficient: f64,
    /// Energy at which the parameter equals `coefficient` [eV].
    pub reference_energy: f64,
    #[serde(default = "default_exponent")]
    pub exponent: f64,
}

fn default_exponent() -> f64 {
    1.0
}

impl PowerLaw {
    pub fn evaluate(&self, energy: f64) -> f64 {
        self.coefficient * (energy / self.reference_energy).powf(self.exponent)
    }
}

/// Fixed value or energy-dependent function.
#[derive(Clone)]
pub enum Parameter {
    Fixed(f64),
    Scaled(PowerLaw),
    Derived(EnergyFn),
}

impl Parameter {
    /// Wrap an arbitrary closure of energy.
    pub fn derived<F>(f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Parameter::Derived(Arc::new(f))
    }

    /// Resolve the parameter at `energy` [eV].
    pub fn evaluate(&self, energy: f64) -> f64 {
        match self {
            Parameter::Fixed(value) => *value,
            Parameter::Scaled(law) => law.evaluate(energy),
            Parameter::Derived(f) => f(energy),
        }
    }

    /// Resolve the parameter once per particle energy.
    pub fn evaluate_each(&self, energies: ArrayView1<'_, f64>) -> Array1<f64> {
        match self {
            Parameter::Fixed(value) => Array1::from_elem(energies.len(), *value),
            _ => energies.mapv(|e| self.evaluate(e)),
        }
    }

    pub fn is_energy_dependent(&self) -> bool {
        !matches!(self, Parameter::Fixed(_))
    }

    pub fn as_fixed(&self) -> Option<f64> {
        match self {
            Parameter::Fixed(value) => Some(*value),
            _ => None,
        }
    }

    /// Structural checks that do not depend on the evaluation energy.
    pub fn validate(&self, name: &str) -> BeamResult<()> {
        match self {
            Parameter::Fixed(value) if !value.is_finite() => Err(BeamError::InvalidParameter(
                format!("{name} must be finite, got {value}"),
            )),
            Parameter::Scaled(law) => {
                if !law.coefficient.is_finite() || !law.exponent.is_finite() {
                    return Err(BeamError::InvalidParameter(format!(
                        "{name} power law needs finite coefficient and exponent"
                    )));
                }
                if !law.reference_energy.is_finite() || law.reference_energy <= 0.0 {
                    return Err(BeamError::InvalidParameter(format!(
                        "{name} power law reference_energy must be finite and > 0, got {}",
                        law.reference_energy
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl From<f64> for Parameter {
    fn from(value: f64) -> Self {
        Parameter::Fixed(value)
    }
}

impl From<PowerLaw> for Parameter {
    fn from(law: PowerLaw) -> Self {
        Parameter::Scaled(law)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Fixed(value) => f.debug_tuple("Fixed").field(value).finish(),
            Parameter::Scaled(law) => f.debug_tuple("Scaled").field(law).finish(),
            Parameter::Derived(_) => f.write_str("Derived(<fn>)"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterRepr {
    Fixed(f64),
    Scaled(PowerLaw),
}

impl Serialize for Parameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Parameter::Fixed(value) => serializer.serialize_f64(*value),
            Parameter::Scaled(law) => law.serialize(serializer),
            Parameter::Derived(_) => Err(S::Error::custom(
                "closure-derived parameters cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Parameter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match ParameterRepr::deserialize(deserializer)? {
            ParameterRepr::Fixed(value) => Parameter::Fixed(value),
            ParameterRepr::Scaled(law) => Parameter::Scaled(law),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fixed_ignores_energy() {
        let p = Parameter::Fixed(2.5);
        assert_eq!(p.evaluate(1e9), 2.5);
        assert_eq!(p.evaluate(5e10), 2.5);
        assert!(!p.is_energy_dependent());
    }

    #[test]
    fn test_power_law_at_reference_equals_coefficient() {
        let law = PowerLaw {
            coefficient: 1.2,
            reference_energy: 10e9,
            exponent: 0.5,
        };
        assert!((law.evaluate(10e9) - 1.2).abs() < 1e-15);
        assert!((law.evaluate(40e9) - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_derived_closure_per_particle() {
        let p = Parameter::derived(|e| e / 1e9);
        let energies = array![1e9, 2e9, 4e9];
        let out = p.evaluate_each(energies.view());
        assert_eq!(out.len(), 3);
        assert!((out[2] - 4.0).abs() < 1e-15);
        assert!(p.is_energy_dependent());
        assert!(p.as_fixed().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_power_law() {
        let p = Parameter::Scaled(PowerLaw {
            coefficient: 1.0,
            reference_energy: 0.0,
            exponent: 1.0,
        });
        assert!(matches!(
            p.validate("dipole_length"),
            Err(BeamError::InvalidParameter(_))
        ));
        assert!(Parameter::Fixed(f64::NAN).validate("beta0").is_err());
        assert!(Parameter::Fixed(3.0).validate("beta0").is_ok());
    }

    #[test]
    fn test_json_number_and_object() {
        let fixed: Parameter = serde_json::from_str("0.75").unwrap();
        assert_eq!(fixed.as_fixed(), Some(0.75));

        let scaled: Parameter =
            serde_json::from_str(r#"{"coefficient": 1.0, "reference_energy": 1e10}"#).unwrap();
        match scaled {
            Parameter::Scaled(law) => assert_eq!(law.exponent, 1.0),
            other => panic!("expected power law, got {other:?}"),
        }
    }

    #[test]
    fn test_derived_refuses_serialization() {
        let p = Parameter::derived(|e| e);
        assert!(serde_json::to_string(&p).is_err());
        assert_eq!(serde_json::to_string(&Parameter::Fixed(2.0)).unwrap(), "2.0");
    }
}
