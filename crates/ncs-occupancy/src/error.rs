//! # Occupancy Errors
//!
//! One error enum for every operation in this crate. Variants name the bed
//! or patient involved so callers (and logs) can act on them without
//! parsing messages.
//!
//! ## Conflicts
//!
//! [`OccupancyError::BedUpdateConflict`] is the only retryable variant. It is
//! raised when a bed's stored version moved between read and write, or when
//! Postgres reports a serialization failure / deadlock. See
//! [`crate::retry::retry_on_conflict`].

use thiserror::Error;

use ncs_core::{BedId, PatientId, ValidationError};
use ncs_state::BedError;

/// Errors raised by the occupancy service, reactor, audit and stores.
#[derive(Error, Debug)]
pub enum OccupancyError {
    /// A patient references a bed that does not exist.
    #[error("bed not found: {bed}")]
    BedNotFound { bed: BedId },

    /// A concurrent writer changed the bed first.
    #[error("concurrent update conflict on {bed}")]
    BedUpdateConflict { bed: BedId },

    /// A patient change tried to move a bed out of maintenance.
    ///
    /// Under the shield policy this is logged and swallowed; it only
    /// surfaces from APIs that are asked to fail instead.
    #[error("bed {bed} is under maintenance; occupancy change refused")]
    MaintenanceOverrideAttempt { bed: BedId },

    /// The patient does not exist.
    #[error("patient not found: {patient}")]
    PatientNotFound { patient: PatientId },

    /// Another patient already references the bed.
    #[error("{bed} is already assigned to {patient}")]
    BedAlreadyAssigned { bed: BedId, patient: PatientId },

    /// A bed with this id is already registered.
    #[error("bed already registered: {bed}")]
    DuplicateBed { bed: BedId },

    /// A patient or bed field failed validation.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A bed status transition was rejected.
    #[error("bed transition error: {0}")]
    Transition(#[from] BedError),

    /// Snapshot file or stored row could not be read or written.
    #[error("storage error: {0}")]
    Storage(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OccupancyError {
    /// Whether retrying the whole unit of work may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::BedUpdateConflict { .. })
    }

    /// The bed this error concerns, if any.
    pub fn bed(&self) -> Option<BedId> {
        match self {
            Self::BedNotFound { bed }
            | Self::BedUpdateConflict { bed }
            | Self::MaintenanceOverrideAttempt { bed }
            | Self::BedAlreadyAssigned { bed, .. }
            | Self::DuplicateBed { bed } => Some(*bed),
            Self::Transition(BedError::UnderMaintenance { bed })
            | Self::Transition(BedError::InvalidTransition { bed, .. }) => Some(*bed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_bed_update_conflict_is_retryable() {
        let bed = BedId::new();
        assert!(OccupancyError::BedUpdateConflict { bed }.is_conflict());
        assert!(!OccupancyError::BedNotFound { bed }.is_conflict());
        assert!(!OccupancyError::Storage("disk full".into()).is_conflict());
    }

    #[test]
    fn bed_is_extracted_from_transition_errors() {
        let bed = BedId::new();
        let err: OccupancyError = BedError::UnderMaintenance { bed }.into();
        assert_eq!(err.bed(), Some(bed));
        let err = OccupancyError::PatientNotFound {
            patient: PatientId::new(),
        };
        assert_eq!(err.bed(), None);
    }

    #[test]
    fn messages_name_the_records() {
        let bed = BedId::new();
        let patient = PatientId::new();
        let msg = OccupancyError::BedAlreadyAssigned { bed, patient }.to_string();
        assert!(msg.contains(&bed.to_string()));
        assert!(msg.contains(&patient.to_string()));
    }
}
