//! # Patient Service
//!
//! The public entry point for patient and bed changes. Every mutating call
//! is one unit of work on the store: the patient record and every bed status
//! the reactor derives from it commit together or not at all.
//!
//! Reads (`get_*`, `list_*`) go straight to the store.

use ncs_core::{BedId, Patient, PatientId, WardId};
use ncs_state::Bed;

use crate::audit::{self, AuditReport, Repair};
use crate::config::OccupancyConfig;
use crate::error::OccupancyError;
use crate::mutation::{self, NewPatient, PatientMutation, PatientUpdate};
use crate::reactor::OccupancyReactor;
use crate::retry::retry_on_conflict_blocking;
use crate::store::{MemoryStore, OccupancyStore};

/// Patient CRUD with bed occupancy kept in step.
#[derive(Debug, Clone)]
pub struct PatientService<S = MemoryStore> {
    store: S,
    reactor: OccupancyReactor,
}

impl<S: OccupancyStore> PatientService<S> {
    pub fn new(store: S, config: OccupancyConfig) -> Self {
        Self {
            store,
            reactor: OccupancyReactor::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &OccupancyConfig {
        self.reactor.config()
    }

    // ── Patients ─────────────────────────────────────────────────────

    pub fn create_patient(&self, new: NewPatient) -> Result<PatientMutation, OccupancyError> {
        let reactor = self.reactor;
        let result = retry_on_conflict_blocking("create_patient", || {
            self.store
                .transact(|ws| mutation::create(&reactor, ws, new.clone()))
        })?;
        tracing::info!(
            patient = %result.patient.id,
            bed = ?result.patient.bed,
            events = result.events.len(),
            "patient created"
        );
        Ok(result)
    }

    pub fn update_patient(
        &self,
        id: PatientId,
        update: PatientUpdate,
    ) -> Result<PatientMutation, OccupancyError> {
        let reactor = self.reactor;
        let result = retry_on_conflict_blocking("update_patient", || {
            self.store
                .transact(|ws| mutation::update(&reactor, ws, id, update.clone()))
        })?;
        tracing::info!(
            patient = %id,
            bed = ?result.patient.bed,
            events = result.events.len(),
            "patient updated"
        );
        Ok(result)
    }

    pub fn delete_patient(&self, id: PatientId) -> Result<PatientMutation, OccupancyError> {
        let reactor = self.reactor;
        let result = retry_on_conflict_blocking("delete_patient", || {
            self.store
                .transact(|ws| mutation::delete(&reactor, ws, id))
        })?;
        tracing::info!(patient = %id, events = result.events.len(), "patient deleted");
        Ok(result)
    }

    pub fn get_patient(&self, id: PatientId) -> Result<Patient, OccupancyError> {
        self.store
            .patient(id)
            .ok_or(OccupancyError::PatientNotFound { patient: id })
    }

    pub fn list_patients(&self) -> Vec<Patient> {
        self.store.patients()
    }

    // ── Beds ─────────────────────────────────────────────────────────

    pub fn get_bed(&self, id: BedId) -> Result<Bed, OccupancyError> {
        self.store
            .bed(id)
            .ok_or(OccupancyError::BedNotFound { bed: id })
    }

    pub fn list_beds(&self) -> Vec<Bed> {
        self.store.beds()
    }

    pub fn register_bed(&self, ward: WardId, number: &str) -> Result<Bed, OccupancyError> {
        let bed = self
            .store
            .transact(|ws| mutation::register_bed(ws, ward, number))?;
        tracing::info!(bed = %bed.id, ward = %ward, number = %bed.number, "bed registered");
        Ok(bed)
    }

    pub fn begin_maintenance(&self, id: BedId) -> Result<Bed, OccupancyError> {
        let bed = retry_on_conflict_blocking("begin_maintenance", || {
            self.store.transact(|ws| mutation::begin_maintenance(ws, id))
        })?;
        tracing::info!(bed = %id, "maintenance begun");
        Ok(bed)
    }

    pub fn end_maintenance(&self, id: BedId) -> Result<Bed, OccupancyError> {
        let bed = retry_on_conflict_blocking("end_maintenance", || {
            self.store.transact(|ws| mutation::end_maintenance(ws, id))
        })?;
        tracing::info!(bed = %id, status = %bed.status, "maintenance ended");
        Ok(bed)
    }

    // ── Audit ────────────────────────────────────────────────────────

    /// Reconcile the current contents of the store.
    pub fn audit(&self) -> AuditReport {
        let beds = self.store.beds();
        let patients = self.store.patients();
        audit::reconcile(&beds, &patients)
    }

    /// Audit, then stage and commit every repair that still applies.
    pub fn repair(&self) -> Result<Vec<Repair>, OccupancyError> {
        let repairs = self.audit().repairs();
        if repairs.is_empty() {
            return Ok(Vec::new());
        }
        let applied = self
            .store
            .transact(|ws| audit::apply_repairs(ws, &repairs))?;
        tracing::info!(
            proposed = repairs.len(),
            applied = applied.len(),
            "occupancy repairs committed"
        );
        Ok(applied)
    }
}

impl Default for PatientService<MemoryStore> {
    fn default() -> Self {
        Self::new(MemoryStore::new(), OccupancyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::OccupancyEvent;
    use ncs_state::BedStatus;

    #[test]
    fn admit_transfer_discharge() {
        let svc = PatientService::default();
        let ward = WardId::new();
        let a = svc.register_bed(ward, "A").unwrap().id;
        let b = svc.register_bed(ward, "B").unwrap().id;

        let admitted = svc.create_patient(NewPatient::new("Ada", 36, "F").in_bed(a)).unwrap();
        let id = admitted.patient.id;
        assert_eq!(svc.get_bed(a).unwrap().status, BedStatus::Occupied);

        let moved = svc.update_patient(id, PatientUpdate::transfer(b)).unwrap();
        assert_eq!(
            moved.events,
            vec![OccupancyEvent::Released { bed: a }, OccupancyEvent::Occupied { bed: b }]
        );

        svc.delete_patient(id).unwrap();
        assert_eq!(svc.get_bed(b).unwrap().status, BedStatus::Available);
        assert!(matches!(
            svc.get_patient(id),
            Err(OccupancyError::PatientNotFound { .. })
        ));
    }

    #[test]
    fn rejected_reactor_step_rolls_back_patient() {
        let svc = PatientService::default();
        let ghost = BedId::new();
        let err = svc
            .create_patient(NewPatient::new("Ada", 36, "F").in_bed(ghost))
            .unwrap_err();
        assert!(matches!(err, OccupancyError::BedNotFound { bed } if bed == ghost));
        assert!(svc.list_patients().is_empty());
    }

    #[test]
    fn list_beds_is_ordered_by_number() {
        let svc = PatientService::default();
        let ward = WardId::new();
        svc.register_bed(ward, "B").unwrap();
        svc.register_bed(ward, "A").unwrap();
        let numbers: Vec<String> = svc.list_beds().into_iter().map(|b| b.number).collect();
        assert_eq!(numbers, vec!["A", "B"]);
    }

    #[test]
    fn repair_fixes_drifted_snapshot() {
        use crate::snapshot::OccupancySnapshot;

        let mut ghost = Bed::new(WardId::new(), "G").unwrap();
        ghost.status = BedStatus::Occupied;
        let store = MemoryStore::from_snapshot(OccupancySnapshot {
            beds: vec![ghost.clone()],
            patients: vec![],
        });
        let svc = PatientService::new(store, OccupancyConfig::default());
        assert!(!svc.audit().is_consistent());

        let applied = svc.repair().unwrap();
        assert_eq!(applied.len(), 1);
        assert!(svc.audit().is_consistent());
        assert_eq!(svc.get_bed(ghost.id).unwrap().status, BedStatus::Available);
        assert!(svc.repair().unwrap().is_empty());
    }
}
