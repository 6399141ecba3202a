// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! CODATA 2018 constants in SI units, plus the lattice and plasma
//! reference values shared by the stages.

use std::f64::consts::PI;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Elementary charge (C)
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;

/// Electron rest mass (kg)
pub const ELECTRON_MASS: f64 = 9.109_383_701_5e-31;

/// Vacuum permittivity (F/m)
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

/// Classical electron radius (m)
pub const CLASSICAL_ELECTRON_RADIUS: f64 = 2.817_940_326_2e-15;

/// Electron rest energy (eV), m_e c^2 / e.
pub const ELECTRON_REST_ENERGY_EV: f64 = 510_998.950_00;

/// Default interstage phase advance (rad).
pub const DEFAULT_PHASE_ADVANCE: f64 = 1.5 * PI;

/// Interstage length per unit dipole length when no explicit length is given.
pub const LENGTH_PER_DIPOLE_LENGTH: f64 = 4.7875;

/// Wave-breaking field at the reference density (V/m).
pub const WAVEBREAKING_FIELD_AT_REFERENCE: f64 = 96e9;

/// Reference plasma density for the wave-breaking field scaling (m^-3).
pub const REFERENCE_PLASMA_DENSITY: f64 = 1e24;

/// Default accelerating gradient in the plasma stage (V/m).
pub const DEFAULT_ACCELERATING_FIELD: f64 = 6.4e9;

/// Output samples per betatron oscillation.
pub const DEFAULT_SAMPLES_PER_OSCILLATION: usize = 100;
