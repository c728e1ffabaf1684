//! Error types for the boundaries of the engine.
//!
//! The evaluator itself never fails on a structurally valid [`Project`]
//! value: electrically questionable input is reported through
//! [`Diagnostics`] instead. [`PdnError`] covers parsing a project snapshot
//! and [`EfficiencyError`] describes efficiency models that cannot be
//! evaluated.
//!
//! [`Project`]: crate::Project
//! [`Diagnostics`]: crate::Diagnostics
//!
//! # Example
//!
//! ```
//! use pdn_core::{PdnError, Project};
//!
//! let err = Project::from_json_str("[1, 2, 3]").unwrap_err();
//! assert!(matches!(err, PdnError::Parse(_)));
//! ```

use thiserror::Error;

/// Errors raised before a project reaches the evaluator.
#[derive(Error, Debug)]
pub enum PdnError {
    /// The snapshot could not be read as a project
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type PdnResult<T> = Result<T, PdnError>;

impl From<serde_json::Error> for PdnError {
    fn from(err: serde_json::Error) -> Self {
        PdnError::Parse(err.to_string())
    }
}

/// Reasons an efficiency model cannot produce a number.
///
/// The resolver maps every variant to the configured default efficiency
/// plus a model warning, so these never escape [`crate::compute`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EfficiencyError {
    #[error("efficiency curve has no points")]
    EmptyCurve,

    #[error("efficiency table is missing")]
    MissingTable,

    #[error("efficiency table has an empty {0} axis")]
    EmptyAxis(&'static str),

    #[error("efficiency table has no defined value near the operating point")]
    NoDefinedValues,

    #[error("efficiency model produced a non-finite value")]
    NonFinite,

    #[error("efficiency resolved to {0}, which cannot carry load")]
    NonPositive(f64),
}
