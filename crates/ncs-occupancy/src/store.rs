//! # Occupancy Stores
//!
//! [`OccupancyStore`] is the seam between the service and persistence: a
//! store runs one closure against a [`WorkingSet`] and commits the
//! resulting [`Changeset`] atomically, or commits nothing.
//!
//! [`MemoryStore`] keeps beds and patients behind a single
//! `parking_lot::RwLock`, write-locked for the whole unit of work. The lock
//! is never held across an `.await`.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use ncs_core::{BedId, Patient, PatientId};
use ncs_state::Bed;

use crate::error::OccupancyError;
use crate::snapshot::{OccupancySnapshot, HISTORY_LIMIT};
use crate::unit::{Changeset, RecordSource, WorkingSet};

/// Transactional storage for beds and patients.
pub trait OccupancyStore: Send + Sync {
    /// Run `work` as one unit of work. Its staged changes are committed only
    /// if it returns `Ok`, and only if no staged bed changed underneath it.
    fn transact<R>(
        &self,
        work: impl FnOnce(&mut WorkingSet<'_>) -> Result<R, OccupancyError>,
    ) -> Result<R, OccupancyError>;

    fn bed(&self, id: BedId) -> Option<Bed>;
    fn patient(&self, id: PatientId) -> Option<Patient>;
    fn beds(&self) -> Vec<Bed>;
    fn patients(&self) -> Vec<Patient>;
}

// ─── In-memory store ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    beds: HashMap<BedId, Bed>,
    patients: HashMap<PatientId, Patient>,
    /// Reverse index of `patients.bed`.
    by_bed: HashMap<BedId, BTreeSet<PatientId>>,
}

impl Tables {
    fn index(&mut self, patient: &Patient) {
        if let Some(bed) = patient.bed {
            self.by_bed.entry(bed).or_default().insert(patient.id);
        }
    }

    fn unindex(&mut self, patient: &Patient) {
        if let Some(bed) = patient.bed {
            if let Some(holders) = self.by_bed.get_mut(&bed) {
                holders.remove(&patient.id);
                if holders.is_empty() {
                    self.by_bed.remove(&bed);
                }
            }
        }
    }

    fn put_patient(&mut self, patient: Patient) {
        if let Some(old) = self.patients.remove(&patient.id) {
            self.unindex(&old);
        }
        self.index(&patient);
        self.patients.insert(patient.id, patient);
    }

    fn remove_patient(&mut self, id: PatientId) {
        if let Some(old) = self.patients.remove(&id) {
            self.unindex(&old);
        }
    }

    /// Apply a changeset. Every bed version is checked before anything is
    /// written.
    fn apply(&mut self, changes: Changeset) -> Result<(), OccupancyError> {
        for staged in &changes.beds {
            let current = self.beds.get(&staged.bed.id).map(|b| b.version);
            if current != staged.expected_version {
                return Err(OccupancyError::BedUpdateConflict { bed: staged.bed.id });
            }
        }
        for staged in changes.beds {
            self.beds.insert(staged.bed.id, staged.bed);
        }
        for id in changes.deleted_patients {
            self.remove_patient(id);
        }
        for patient in changes.saved_patients {
            self.put_patient(patient);
        }
        Ok(())
    }
}

impl RecordSource for Tables {
    fn bed(&self, id: BedId) -> Option<Bed> {
        self.beds.get(&id).cloned()
    }

    fn patient(&self, id: PatientId) -> Option<Patient> {
        self.patients.get(&id).cloned()
    }

    fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId> {
        self.by_bed
            .get(&bed)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Thread-safe, cloneable in-memory occupancy store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, as-is.
    pub fn from_snapshot(snapshot: OccupancySnapshot) -> Self {
        let mut tables = Tables::default();
        for bed in snapshot.beds {
            tables.beds.insert(bed.id, bed);
        }
        for patient in snapshot.patients {
            tables.put_patient(patient);
        }
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Copy the current state into a snapshot, ordered by id. Bed history is
    /// cut to the last [`HISTORY_LIMIT`] transitions.
    pub fn snapshot(&self) -> OccupancySnapshot {
        let tables = self.tables.read();
        let mut beds: Vec<Bed> = tables.beds.values().cloned().collect();
        beds.sort_by_key(|b| b.id);
        for bed in &mut beds {
            bed.trim_history(HISTORY_LIMIT);
        }
        let mut patients: Vec<Patient> = tables.patients.values().cloned().collect();
        patients.sort_by_key(|p| p.id);
        OccupancySnapshot { beds, patients }
    }

    /// Number of beds and patients.
    pub fn counts(&self) -> (usize, usize) {
        let tables = self.tables.read();
        (tables.beds.len(), tables.patients.len())
    }
}

impl OccupancyStore for MemoryStore {
    fn transact<R>(
        &self,
        work: impl FnOnce(&mut WorkingSet<'_>) -> Result<R, OccupancyError>,
    ) -> Result<R, OccupancyError> {
        let mut tables = self.tables.write();
        let (result, changes) = {
            let mut ws = WorkingSet::new(&*tables);
            let result = work(&mut ws)?;
            (result, ws.into_changeset())
        };
        tables.apply(changes)?;
        Ok(result)
    }

    fn bed(&self, id: BedId) -> Option<Bed> {
        self.tables.read().beds.get(&id).cloned()
    }

    fn patient(&self, id: PatientId) -> Option<Patient> {
        self.tables.read().patients.get(&id).cloned()
    }

    fn beds(&self) -> Vec<Bed> {
        let mut beds: Vec<Bed> = self.tables.read().beds.values().cloned().collect();
        beds.sort_by(|a, b| a.number.cmp(&b.number).then(a.id.cmp(&b.id)));
        beds
    }

    fn patients(&self) -> Vec<Patient> {
        let mut patients: Vec<Patient> = self.tables.read().patients.values().cloned().collect();
        patients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        patients
    }
}
