// ─────────────────────────────────────────────────────────────────────
// Wakefield Interstage — Errors
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeamError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Shape mismatch for {field}: expected {expected} entries, found {found}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Integration failed for particle {particle}: {cause}")]
    IntegrationFailed {
        particle: usize,
        #[source]
        cause: IntegrationFailure,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why an ODE integration stopped before reaching the end of its span.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationFailure {
    #[error("step size underflow at t={t:e} (step={step:e})")]
    StepSizeUnderflow { t: f64, step: f64 },

    #[error("step budget of {max_steps} exhausted at t={t:e}")]
    StepLimitExceeded { t: f64, max_steps: usize },

    #[error("state became non-finite at t={t:e}")]
    NonFiniteState { t: f64 },

    #[error("invalid integration span: {0}")]
    InvalidSpan(String),
}

pub type BeamResult<T> = Result<T, BeamError>;
