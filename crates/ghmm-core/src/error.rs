//! Configuration-error taxonomy for model and distribution construction.
//!
//! These are the only errors the crate raises. Runtime degeneracies (a cell
//! with no admissible entry, a `LOG_ZERO` forward mass) are represented
//! in-band in the DP lattice itself — see [`crate::log::LOG_ZERO`] — and
//! never surface as an `Err`.

/// Errors raised while building a [`crate::dpdf::Dpdf`], [`crate::state::State`],
/// or compiling a [`crate::model::Model`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    #[error("invalid distribution range: max ({max}) <= min ({min})")]
    InvalidRange { min: i64, max: i64 },

    #[error("index {index} out of distribution range [{min}, {max})")]
    IndexOutOfRange { index: i64, min: i64, max: i64 },

    #[error(
        "position-specific emission (length {emission_len}) requires a fixed \
         length distribution of the same length (got {length_len})"
    )]
    EmissionLengthMismatch { emission_len: usize, length_len: usize },

    #[error("state '{0}' has no outgoing transitions summing to a positive weight")]
    ZeroSumRow(String),

    #[error("unknown state name '{0}'")]
    UnknownState(String),

    #[error("reserved state name '{0}' cannot be added by name")]
    ReservedName(String),
}

pub type Result<T> = std::result::Result<T, Error>;
