//! # Error Types
//!
//! Record validation errors shared by every crate in the workspace. Each
//! variant names the offending field and the rejected value. Parse errors
//! for stored enum columns carry the raw column text.
//!
//! Operational failures (missing records, conflicts, storage) live in
//! `ncs-occupancy`'s `OccupancyError`, which wraps [`ValidationError`].

use thiserror::Error;

/// Error raised when a record or identifier fails validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the field.
        field: &'static str,
    },

    /// A text field exceeded its stored column width.
    #[error("{field} must not exceed {max} characters (got {actual})")]
    TooLong {
        /// Name of the field.
        field: &'static str,
        /// Column width.
        max: usize,
        /// Observed length.
        actual: usize,
    },

    /// An identifier string was not a valid UUID.
    #[error("invalid {kind} identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// Identifier namespace (`bed`, `patient`, ...).
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// A stored enum column held an unknown value.
    #[error("unknown {kind} value: {value:?}")]
    UnknownVariant {
        /// Column / enum name.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The rejected input.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// Validate a required, bounded text field. Returns the trimmed value.
pub fn require_text(
    field: &'static str,
    value: impl Into<String>,
    max: usize,
) -> Result<String, ValidationError> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { field, max, actual });
    }
    Ok(trimmed.to_string())
}
