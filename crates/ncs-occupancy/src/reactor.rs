//! # Occupancy Reactor
//!
//! Derives bed status from patient changes. The reactor is synchronous and
//! storage-agnostic: it reads and writes beds through a [`BedLedger`], which
//! the caller scopes to the same unit of work as the patient write. A failure
//! here therefore aborts the patient change as well.
//!
//! ## Rules
//!
//! | Patient change                        | Bed effect                               |
//! |---------------------------------------|------------------------------------------|
//! | saved with bed B                      | B → occupied                             |
//! | saved, bed changed A → B (or cleared) | A → available (policy), B → occupied     |
//! | deleted while holding A               | A → available                            |
//!
//! Beds in maintenance are governed by [`MaintenancePolicy`]. A bed is only
//! released when no other patient still references it. A missing target bed
//! fails the step; a missing bed being released is logged and skipped.

use serde::{Deserialize, Serialize};

use ncs_core::{BedId, Patient, PatientId};
use ncs_state::{Bed, BedError, BedStatus, TransitionCause};

use crate::config::{MaintenancePolicy, OccupancyConfig, ReassignmentPolicy};
use crate::error::OccupancyError;

/// Bed access for one unit of work.
pub trait BedLedger {
    /// Current state of a bed, including changes made in this unit of work.
    fn bed(&self, id: BedId) -> Option<Bed>;

    /// Stage a changed bed.
    fn put_bed(&mut self, bed: Bed);

    /// Patients that currently reference the bed, as seen by this unit of
    /// work.
    fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId>;
}

/// Observable outcome of one reactor step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OccupancyEvent {
    /// The bed moved to occupied.
    Occupied { bed: BedId },
    /// The bed was already occupied.
    AlreadyOccupied { bed: BedId },
    /// The bed moved to available.
    Released { bed: BedId },
    /// The bed was already available.
    AlreadyAvailable { bed: BedId },
    /// The bed is in maintenance and was left alone.
    MaintenanceSkipped { bed: BedId, wanted: BedStatus },
    /// The bed was in maintenance and its status was overwritten.
    MaintenanceOverridden { bed: BedId, to: BedStatus },
    /// Not released because other patients still reference the bed.
    ReleaseSkippedStillReferenced { bed: BedId, holders: Vec<PatientId> },
    /// The previous bed was left untouched by the reassignment policy.
    PreviousBedRetained { bed: BedId },
    /// The bed being released no longer exists. Nothing to release.
    ReleasedBedMissing { bed: BedId },
}

impl OccupancyEvent {
    /// The bed this event concerns.
    pub fn bed(&self) -> BedId {
        match self {
            Self::Occupied { bed }
            | Self::AlreadyOccupied { bed }
            | Self::Released { bed }
            | Self::AlreadyAvailable { bed }
            | Self::MaintenanceSkipped { bed, .. }
            | Self::MaintenanceOverridden { bed, .. }
            | Self::ReleaseSkippedStillReferenced { bed, .. }
            | Self::PreviousBedRetained { bed }
            | Self::ReleasedBedMissing { bed } => *bed,
        }
    }

    /// Whether the event wrote a new status.
    pub fn changed_status(&self) -> bool {
        matches!(
            self,
            Self::Occupied { .. } | Self::Released { .. } | Self::MaintenanceOverridden { .. }
        )
    }
}

/// Applies the occupancy rules to a [`BedLedger`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyReactor {
    config: OccupancyConfig,
}

impl OccupancyReactor {
    pub fn new(config: OccupancyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OccupancyConfig {
        &self.config
    }

    /// React to a patient that was created or updated.
    ///
    /// `previous_bed` is the bed the patient referenced before the save
    /// (`None` for a new patient). The saved patient must already be staged
    /// in the ledger's unit of work.
    pub fn on_patient_saved(
        &self,
        previous_bed: Option<BedId>,
        saved: &Patient,
        beds: &mut impl BedLedger,
    ) -> Result<Vec<OccupancyEvent>, OccupancyError> {
        let mut events = Vec::new();

        if let Some(previous) = previous_bed.filter(|b| saved.bed != Some(*b)) {
            match self.config.reassignment {
                ReassignmentPolicy::Release => {
                    let cause = TransitionCause::PatientMoved { patient: saved.id };
                    events.push(self.release(previous, saved.id, cause, beds)?);
                }
                ReassignmentPolicy::KeepPrevious => {
                    tracing::debug!(bed = %previous, patient = %saved.id, "previous bed retained");
                    events.push(OccupancyEvent::PreviousBedRetained { bed: previous });
                }
            }
        }

        if let Some(bed) = saved.bed {
            let cause = TransitionCause::PatientSaved { patient: saved.id };
            events.push(self.occupy(bed, cause, beds)?);
        }

        Ok(events)
    }

    /// React to a deleted patient. The deletion must already be staged in
    /// the ledger's unit of work.
    pub fn on_patient_deleted(
        &self,
        deleted: &Patient,
        beds: &mut impl BedLedger,
    ) -> Result<Vec<OccupancyEvent>, OccupancyError> {
        let Some(bed) = deleted.bed else {
            return Ok(Vec::new());
        };
        let cause = TransitionCause::PatientDeleted {
            patient: deleted.id,
        };
        Ok(vec![self.release(bed, deleted.id, cause, beds)?])
    }

    fn occupy(
        &self,
        id: BedId,
        cause: TransitionCause,
        beds: &mut impl BedLedger,
    ) -> Result<OccupancyEvent, OccupancyError> {
        let mut bed = beds.bed(id).ok_or(OccupancyError::BedNotFound { bed: id })?;
        match bed.occupy(cause.clone()) {
            Ok(true) => {
                beds.put_bed(bed);
                Ok(OccupancyEvent::Occupied { bed: id })
            }
            Ok(false) => Ok(OccupancyEvent::AlreadyOccupied { bed: id }),
            Err(BedError::UnderMaintenance { .. }) => {
                self.under_maintenance(bed, BedStatus::Occupied, cause, beds)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn release(
        &self,
        id: BedId,
        leaving: PatientId,
        cause: TransitionCause,
        beds: &mut impl BedLedger,
    ) -> Result<OccupancyEvent, OccupancyError> {
        let Some(mut bed) = beds.bed(id) else {
            tracing::warn!(bed = %id, patient = %leaving, "released bed does not exist");
            return Ok(OccupancyEvent::ReleasedBedMissing { bed: id });
        };

        let holders: Vec<PatientId> = beds
            .patients_on_bed(id)
            .into_iter()
            .filter(|p| *p != leaving)
            .collect();
        if !holders.is_empty() {
            tracing::warn!(
                bed = %id,
                patient = %leaving,
                holders = holders.len(),
                "bed still referenced by other patients; not released"
            );
            return Ok(OccupancyEvent::ReleaseSkippedStillReferenced { bed: id, holders });
        }

        match bed.release(cause.clone()) {
            Ok(true) => {
                beds.put_bed(bed);
                Ok(OccupancyEvent::Released { bed: id })
            }
            Ok(false) => Ok(OccupancyEvent::AlreadyAvailable { bed: id }),
            Err(BedError::UnderMaintenance { .. }) => {
                self.under_maintenance(bed, BedStatus::Available, cause, beds)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn under_maintenance(
        &self,
        mut bed: Bed,
        wanted: BedStatus,
        cause: TransitionCause,
        beds: &mut impl BedLedger,
    ) -> Result<OccupancyEvent, OccupancyError> {
        match self.config.maintenance {
            MaintenancePolicy::Shield => {
                let refused = OccupancyError::MaintenanceOverrideAttempt { bed: bed.id };
                tracing::warn!(bed = %bed.id, wanted = %wanted, "{refused}");
                Ok(OccupancyEvent::MaintenanceSkipped {
                    bed: bed.id,
                    wanted,
                })
            }
            MaintenancePolicy::Overwrite => {
                let id = bed.id;
                bed.overwrite_status(wanted, cause)?;
                tracing::info!(bed = %id, to = %wanted, "maintenance status overwritten");
                beds.put_bed(bed);
                Ok(OccupancyEvent::MaintenanceOverridden { bed: id, to: wanted })
            }
        }
    }
}
