//! # Bed Status State Machine
//!
//! Models the occupancy status of a bed and the only transitions allowed
//! on it.
//!
//! ## States
//!
//! ```text
//!                 occupy (patient saved with bed)
//!   Available ───────────────────────────────▶ Occupied
//!       ▲  ◀───────────────────────────────────  │
//!       │        release (patient deleted /      │
//!       │        moved to another bed)           │
//!       │                                        │
//!       │ begin_maintenance       begin_maintenance
//!       ▼                                        ▼
//!   ┌──────────────────── Maintenance ──────────────────┐
//!   │ end_maintenance re-derives: Occupied if a patient │
//!   │ still references the bed, otherwise Available     │
//!   └───────────────────────────────────────────────────┘
//! ```
//!
//! `occupy` and `release` are the reactor's transitions and refuse to touch a
//! bed in `Maintenance`. `begin_maintenance` / `end_maintenance` belong to
//! admin tooling. `overwrite_status` exists only for the legacy
//! maintenance-overwrite policy and for audit repairs.
//!
//! Every status change appends a [`BedTransitionRecord`] and bumps the
//! bed's `version`, which persistence layers use as a compare-and-set token.
//! Idempotent calls (occupying an occupied bed) change nothing and record
//! nothing.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ncs_core::records::validate_bed_number;
use ncs_core::{BedId, PatientId, Timestamp, ValidationError, WardId};

// ─── Bed Status ──────────────────────────────────────────────────────

/// Occupancy status of a bed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    /// No patient references the bed.
    #[default]
    Available,
    /// Exactly one patient references the bed.
    Occupied,
    /// Out of service. Set and cleared only by admin tooling.
    Maintenance,
}

impl BedStatus {
    /// Stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Occupied => "occupied",
            Self::Maintenance => "maintenance",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Occupied => "Occupied",
            Self::Maintenance => "Under Maintenance",
        }
    }

    /// Parse a stored column value. Unknown values are rejected.
    pub fn parse(s: &str) -> Result<Self, BedError> {
        match s {
            "available" => Ok(Self::Available),
            "occupied" => Ok(Self::Occupied),
            "maintenance" => Ok(Self::Maintenance),
            other => Err(BedError::UnknownStatus(other.to_string())),
        }
    }

    /// The status that reflects occupancy alone.
    pub fn for_occupancy(occupied: bool) -> Self {
        if occupied {
            Self::Occupied
        } else {
            Self::Available
        }
    }
}

impl std::fmt::Display for BedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by bed status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BedError {
    /// The transition is not defined from the current status.
    #[error("invalid bed transition for {bed}: {from} -> {to}")]
    InvalidTransition {
        /// The bed.
        bed: BedId,
        /// Current status.
        from: BedStatus,
        /// Attempted status.
        to: BedStatus,
    },

    /// The reactor attempted to change a bed that is under maintenance.
    #[error("bed {bed} is under maintenance")]
    UnderMaintenance {
        /// The bed.
        bed: BedId,
    },

    /// A stored status string is not one of the known values.
    #[error("unknown bed status: {0:?}")]
    UnknownStatus(String),

    /// The bed record failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ─── Transition Log ──────────────────────────────────────────────────

/// What caused a bed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionCause {
    /// A patient referencing the bed was created or updated.
    PatientSaved { patient: PatientId },
    /// The patient holding the bed was deleted.
    PatientDeleted { patient: PatientId },
    /// The patient holding the bed moved to another bed or cleared it.
    PatientMoved { patient: PatientId },
    /// Admin tooling took the bed out of service.
    MaintenanceBegun,
    /// Admin tooling returned the bed to service.
    MaintenanceEnded,
    /// An occupancy audit repaired a drifted status.
    AuditRepair,
}

/// Record of a bed status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BedTransitionRecord {
    pub from: BedStatus,
    pub to: BedStatus,
    pub timestamp: Timestamp,
    pub cause: TransitionCause,
}

// ─── Bed ─────────────────────────────────────────────────────────────

/// A bed with its status and transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    /// Label shown on the ward board, e.g. `12A`.
    pub number: String,
    pub ward: WardId,
    #[serde(default)]
    pub status: BedStatus,
    /// Incremented on every status change.
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub transitions: Vec<BedTransitionRecord>,
}

impl Bed {
    /// Create an `Available` bed in a ward.
    pub fn new(ward: WardId, number: impl Into<String>) -> Result<Self, BedError> {
        Ok(Self {
            id: BedId::new(),
            number: validate_bed_number(number)?,
            ward,
            status: BedStatus::Available,
            version: 0,
            transitions: Vec::new(),
        })
    }

    /// Mark the bed occupied (AVAILABLE → OCCUPIED).
    ///
    /// Returns `Ok(false)` without recording anything if the bed is already
    /// occupied. Fails with [`BedError::UnderMaintenance`] for beds in
    /// maintenance.
    pub fn occupy(&mut self, cause: TransitionCause) -> Result<bool, BedError> {
        match self.status {
            BedStatus::Available => {
                self.do_transition(BedStatus::Occupied, cause);
                Ok(true)
            }
            BedStatus::Occupied => Ok(false),
            BedStatus::Maintenance => Err(BedError::UnderMaintenance { bed: self.id }),
        }
    }

    /// Release the bed (OCCUPIED → AVAILABLE).
    ///
    /// Releasing an available bed is a no-op returning `Ok(false)`.
    pub fn release(&mut self, cause: TransitionCause) -> Result<bool, BedError> {
        match self.status {
            BedStatus::Occupied => {
                self.do_transition(BedStatus::Available, cause);
                Ok(true)
            }
            BedStatus::Available => Ok(false),
            BedStatus::Maintenance => Err(BedError::UnderMaintenance { bed: self.id }),
        }
    }

    /// Take the bed out of service (AVAILABLE | OCCUPIED → MAINTENANCE).
    pub fn begin_maintenance(&mut self) -> Result<(), BedError> {
        if self.status == BedStatus::Maintenance {
            return Err(self.invalid(BedStatus::Maintenance));
        }
        self.do_transition(BedStatus::Maintenance, TransitionCause::MaintenanceBegun);
        Ok(())
    }

    /// Return the bed to service (MAINTENANCE → OCCUPIED | AVAILABLE).
    ///
    /// `occupied` is whether a patient currently references the bed; the
    /// resulting status is derived from it rather than restored from before
    /// maintenance.
    pub fn end_maintenance(&mut self, occupied: bool) -> Result<BedStatus, BedError> {
        let to = BedStatus::for_occupancy(occupied);
        if self.status != BedStatus::Maintenance {
            return Err(self.invalid(to));
        }
        self.do_transition(to, TransitionCause::MaintenanceEnded);
        Ok(to)
    }

    /// Set the status to `AVAILABLE` or `OCCUPIED` regardless of the current
    /// status, maintenance included.
    ///
    /// Returns whether anything changed. `MAINTENANCE` is never a valid
    /// target; use [`Bed::begin_maintenance`].
    pub fn overwrite_status(
        &mut self,
        to: BedStatus,
        cause: TransitionCause,
    ) -> Result<bool, BedError> {
        if to == BedStatus::Maintenance {
            return Err(self.invalid(to));
        }
        if self.status == to {
            return Ok(false);
        }
        self.do_transition(to, cause);
        Ok(true)
    }

    /// Whether the bed is out of service.
    pub fn in_maintenance(&self) -> bool {
        self.status == BedStatus::Maintenance
    }

    /// The most recent transition, if any.
    pub fn last_transition(&self) -> Option<&BedTransitionRecord> {
        self.transitions.last()
    }

    /// Drop all but the `keep` most recent transitions. The version is left
    /// as is.
    pub fn trim_history(&mut self, keep: usize) {
        let excess = self.transitions.len().saturating_sub(keep);
        self.transitions.drain(..excess);
    }

    fn invalid(&self, to: BedStatus) -> BedError {
        BedError::InvalidTransition {
            bed: self.id,
            from: self.status,
            to,
        }
    }

    fn do_transition(&mut self, to: BedStatus, cause: TransitionCause) {
        self.transitions.push(BedTransitionRecord {
            from: self.status,
            to,
            timestamp: Timestamp::now(),
            cause,
        });
        self.status = to;
        self.version += 1;
    }
}

impl std::fmt::Display for Bed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bed {} ({})", self.number, self.status.label())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
