//! # Unit of Work
//!
//! A [`WorkingSet`] stages patient and bed writes over a read-only
//! [`RecordSource`]. The patient change and every bed change the reactor
//! derives from it are staged into the same working set, then handed to the
//! store as one [`Changeset`] that is committed or dropped as a whole.
//!
//! Stores supply the base:
//!
//! - the in-memory store passes its tables, read under its write lock;
//! - the Postgres store passes the rows it locked with `FOR UPDATE` inside
//!   the open transaction.
//!
//! Staged beds remember the version they were read at so the commit can
//! compare-and-set.

use std::collections::{BTreeMap, BTreeSet};

use ncs_core::{BedId, Patient, PatientId};
use ncs_state::{Bed, BedTransitionRecord};

use crate::error::OccupancyError;
use crate::reactor::BedLedger;

/// Read access to committed records.
pub trait RecordSource {
    fn bed(&self, id: BedId) -> Option<Bed>;
    fn patient(&self, id: PatientId) -> Option<Patient>;
    /// Patients whose committed record references the bed.
    fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId>;
}

/// A bed staged for write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedBed {
    pub bed: Bed,
    /// Version the bed had when read; `None` for newly registered beds.
    pub expected_version: Option<i64>,
    /// Length of the transition log when read.
    base_transitions: usize,
}

impl StagedBed {
    /// Transitions appended in this unit of work.
    pub fn new_transitions(&self) -> &[BedTransitionRecord] {
        self.bed
            .transitions
            .get(self.base_transitions..)
            .unwrap_or_default()
    }

    pub fn is_new(&self) -> bool {
        self.expected_version.is_none()
    }
}

/// Everything one unit of work wants written.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub beds: Vec<StagedBed>,
    pub saved_patients: Vec<Patient>,
    pub deleted_patients: Vec<PatientId>,
}

impl Changeset {
    pub fn is_empty(&self) -> bool {
        self.beds.is_empty() && self.saved_patients.is_empty() && self.deleted_patients.is_empty()
    }
}

/// Staged writes over a [`RecordSource`].
pub struct WorkingSet<'a> {
    base: &'a dyn RecordSource,
    beds: BTreeMap<BedId, StagedBed>,
    /// `None` marks a deletion.
    patients: BTreeMap<PatientId, Option<Patient>>,
}

impl<'a> WorkingSet<'a> {
    pub fn new(base: &'a dyn RecordSource) -> Self {
        Self {
            base,
            beds: BTreeMap::new(),
            patients: BTreeMap::new(),
        }
    }

    /// Current patient, staged changes included.
    pub fn patient(&self, id: PatientId) -> Option<Patient> {
        match self.patients.get(&id) {
            Some(staged) => staged.clone(),
            None => self.base.patient(id),
        }
    }

    /// Stage a created or updated patient.
    pub fn put_patient(&mut self, patient: Patient) {
        self.patients.insert(patient.id, Some(patient));
    }

    /// Stage a deletion. Returns the patient as it was, if it existed.
    pub fn remove_patient(&mut self, id: PatientId) -> Option<Patient> {
        let current = self.patient(id)?;
        self.patients.insert(id, None);
        Some(current)
    }

    /// Stage a newly registered bed.
    pub fn insert_bed(&mut self, bed: Bed) -> Result<(), OccupancyError> {
        if self.bed(bed.id).is_some() {
            return Err(OccupancyError::DuplicateBed { bed: bed.id });
        }
        self.beds.insert(
            bed.id,
            StagedBed {
                base_transitions: 0,
                expected_version: None,
                bed,
            },
        );
        Ok(())
    }

    /// Finish the unit of work.
    pub fn into_changeset(self) -> Changeset {
        let mut changes = Changeset {
            beds: self.beds.into_values().collect(),
            ..Changeset::default()
        };
        for (id, staged) in self.patients {
            match staged {
                Some(patient) => changes.saved_patients.push(patient),
                None => changes.deleted_patients.push(id),
            }
        }
        changes
    }
}

impl BedLedger for WorkingSet<'_> {
    fn bed(&self, id: BedId) -> Option<Bed> {
        match self.beds.get(&id) {
            Some(staged) => Some(staged.bed.clone()),
            None => self.base.bed(id),
        }
    }

    fn put_bed(&mut self, bed: Bed) {
        if let Some(staged) = self.beds.get_mut(&bed.id) {
            staged.bed = bed;
            return;
        }
        let (expected_version, base_transitions) = match self.base.bed(bed.id) {
            Some(base) => (Some(base.version), base.transitions.len()),
            None => (None, 0),
        };
        self.beds.insert(
            bed.id,
            StagedBed {
                bed,
                expected_version,
                base_transitions,
            },
        );
    }

    fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId> {
        let mut holders: BTreeSet<PatientId> = self
            .base
            .patients_on_bed(bed)
            .into_iter()
            .filter(|p| !self.patients.contains_key(p))
            .collect();
        holders.extend(
            self.patients
                .values()
                .flatten()
                .filter(|p| p.bed == Some(bed))
                .map(|p| p.id),
        );
        holders.into_iter().collect()
    }
}
