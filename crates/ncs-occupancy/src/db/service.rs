//! Patient service over [`PgStore`].
//!
//! Mirrors [`crate::PatientService`] with async calls. Each mutation is one
//! transaction, re-run once on conflict.

use sqlx::PgPool;

use ncs_core::{BedId, Patient, PatientId, WardId};
use ncs_state::Bed;

use crate::audit::{self, AuditReport, Repair};
use crate::config::OccupancyConfig;
use crate::error::OccupancyError;
use crate::mutation::{self, BedChange, NewPatient, PatientMutation, PatientUpdate};
use crate::reactor::OccupancyReactor;
use crate::retry::retry_on_conflict;

use super::{LoadPlan, PgStore};

/// Patient CRUD with bed occupancy kept in step, backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgPatientService {
    store: PgStore,
    reactor: OccupancyReactor,
}

impl PgPatientService {
    pub fn new(pool: PgPool, config: OccupancyConfig) -> Self {
        Self {
            store: PgStore::new(pool),
            reactor: OccupancyReactor::new(config),
        }
    }

    pub fn store(&self) -> &PgStore {
        &self.store
    }

    pub async fn create_patient(&self, new: NewPatient) -> Result<PatientMutation, OccupancyError> {
        let (store, reactor) = (&self.store, self.reactor);
        let plan = &LoadPlan::for_beds(new.bed);
        let result = retry_on_conflict("create_patient", move || {
            let new = new.clone();
            store.transact(plan, move |ws| mutation::create(&reactor, ws, new))
        })
        .await?;
        tracing::info!(patient = %result.patient.id, bed = ?result.patient.bed, "patient created");
        Ok(result)
    }

    pub async fn update_patient(
        &self,
        id: PatientId,
        update: PatientUpdate,
    ) -> Result<PatientMutation, OccupancyError> {
        let (store, reactor) = (&self.store, self.reactor);
        let target = match update.bed {
            BedChange::Assign(bed) => Some(bed),
            BedChange::Keep | BedChange::Clear => None,
        };
        let plan = &LoadPlan::for_patient(id).with_bed(target);
        let result = retry_on_conflict("update_patient", move || {
            let update = update.clone();
            store.transact(plan, move |ws| mutation::update(&reactor, ws, id, update))
        })
        .await?;
        tracing::info!(patient = %id, bed = ?result.patient.bed, "patient updated");
        Ok(result)
    }

    pub async fn delete_patient(&self, id: PatientId) -> Result<PatientMutation, OccupancyError> {
        let (store, reactor) = (&self.store, self.reactor);
        let plan = &LoadPlan::for_patient(id);
        let result = retry_on_conflict("delete_patient", move || {
            store.transact(plan, move |ws| mutation::delete(&reactor, ws, id))
        })
        .await?;
        tracing::info!(patient = %id, "patient deleted");
        Ok(result)
    }

    pub async fn get_patient(&self, id: PatientId) -> Result<Patient, OccupancyError> {
        self.store
            .patient(id)
            .await?
            .ok_or(OccupancyError::PatientNotFound { patient: id })
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, OccupancyError> {
        self.store.patients().await
    }

    pub async fn get_bed(&self, id: BedId) -> Result<Bed, OccupancyError> {
        self.store
            .bed(id)
            .await?
            .ok_or(OccupancyError::BedNotFound { bed: id })
    }

    pub async fn list_beds(&self) -> Result<Vec<Bed>, OccupancyError> {
        self.store.beds().await
    }

    pub async fn register_bed(&self, ward: WardId, number: &str) -> Result<Bed, OccupancyError> {
        let bed = self
            .store
            .transact(&LoadPlan::default(), |ws| mutation::register_bed(ws, ward, number))
            .await?;
        tracing::info!(bed = %bed.id, ward = %ward, "bed registered");
        Ok(bed)
    }

    pub async fn begin_maintenance(&self, id: BedId) -> Result<Bed, OccupancyError> {
        let store = &self.store;
        let plan = &LoadPlan::for_beds([id]);
        let bed = retry_on_conflict("begin_maintenance", move || {
            store.transact(plan, move |ws| mutation::begin_maintenance(ws, id))
        })
        .await?;
        tracing::info!(bed = %id, "maintenance begun");
        Ok(bed)
    }

    pub async fn end_maintenance(&self, id: BedId) -> Result<Bed, OccupancyError> {
        let store = &self.store;
        let plan = &LoadPlan::for_beds([id]);
        let bed = retry_on_conflict("end_maintenance", move || {
            store.transact(plan, move |ws| mutation::end_maintenance(ws, id))
        })
        .await?;
        tracing::info!(bed = %id, status = %bed.status, "maintenance ended");
        Ok(bed)
    }

    /// Reconcile everything currently stored.
    pub async fn audit(&self) -> Result<AuditReport, OccupancyError> {
        let beds = self.store.beds().await?;
        let patients = self.store.patients().await?;
        Ok(audit::reconcile(&beds, &patients))
    }

    /// Audit, then commit every repair that still applies.
    pub async fn repair(&self) -> Result<Vec<Repair>, OccupancyError> {
        let repairs = self.audit().await?.repairs();
        if repairs.is_empty() {
            return Ok(Vec::new());
        }
        // The bed_id foreign key nulls dangling references, so only status
        // repairs reach this point in practice.
        let plan = LoadPlan::for_beds(repairs.iter().map(Repair::bed));
        let applied = self
            .store
            .transact(&plan, |ws| audit::apply_repairs(ws, &repairs))
            .await?;
        tracing::info!(
            proposed = repairs.len(),
            applied = applied.len(),
            "occupancy repairs committed"
        );
        Ok(applied)
    }
}
