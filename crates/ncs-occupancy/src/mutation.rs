//! # Patient and Bed Mutations
//!
//! The operations behind the service API, written against a
//! [`WorkingSet`]. Each function stages the record change, runs the
//! occupancy reactor inside the same working set, and returns what happened.
//! Nothing is visible to other readers until the store commits the
//! resulting changeset.
//!
//! A bed may be referenced by at most one patient. Assigning a bed that
//! another patient holds fails with [`OccupancyError::BedAlreadyAssigned`]
//! before anything is staged.

use serde::{Deserialize, Serialize};

use ncs_core::{BedId, DeviceId, NurseId, Patient, PatientId, WardId};
use ncs_state::Bed;

use crate::error::OccupancyError;
use crate::reactor::{BedLedger, OccupancyEvent, OccupancyReactor};
use crate::unit::WorkingSet;

/// Input for a new patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub age: u32,
    pub gender: String,
    #[serde(default)]
    pub bed: Option<BedId>,
    #[serde(default)]
    pub nurse: Option<NurseId>,
    #[serde(default)]
    pub device: Option<DeviceId>,
}

impl NewPatient {
    pub fn new(name: impl Into<String>, age: u32, gender: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age,
            gender: gender.into(),
            bed: None,
            nurse: None,
            device: None,
        }
    }

    pub fn in_bed(mut self, bed: BedId) -> Self {
        self.bed = Some(bed);
        self
    }
}

/// What an update does to one of the patient's references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "id", rename_all = "snake_case")]
pub enum ReferenceChange<T> {
    /// Leave the reference as it is.
    Keep,
    /// Point the reference at this record.
    Assign(T),
    /// Remove the reference.
    Clear,
}

impl<T> Default for ReferenceChange<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T> ReferenceChange<T> {
    fn apply_to(self, reference: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Assign(id) => *reference = Some(id),
            Self::Clear => *reference = None,
        }
    }
}

pub type BedChange = ReferenceChange<BedId>;

/// Partial update of a patient. `None` fields and kept references are left
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub bed: BedChange,
    #[serde(default)]
    pub nurse: ReferenceChange<NurseId>,
    #[serde(default)]
    pub device: ReferenceChange<DeviceId>,
}

impl PatientUpdate {
    /// An update that only moves the patient to `bed`.
    pub fn transfer(bed: BedId) -> Self {
        Self {
            bed: BedChange::Assign(bed),
            ..Self::default()
        }
    }

    /// An update that only clears the patient's bed.
    pub fn clear_bed() -> Self {
        Self {
            bed: BedChange::Clear,
            ..Self::default()
        }
    }

    fn apply(self, mut patient: Patient) -> Result<Patient, OccupancyError> {
        if let Some(name) = self.name {
            patient.name = name;
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        self.bed.apply_to(&mut patient.bed);
        self.nurse.apply_to(&mut patient.nurse);
        self.device.apply_to(&mut patient.device);
        patient.name = patient.name.trim().to_string();
        patient.gender = patient.gender.trim().to_string();
        patient.validate()?;
        Ok(patient)
    }
}

/// A committed patient change and the bed effects it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientMutation {
    pub patient: Patient,
    pub events: Vec<OccupancyEvent>,
}

// ─── Patient operations ──────────────────────────────────────────────

/// Create a patient and occupy its bed.
pub fn create(
    reactor: &OccupancyReactor,
    ws: &mut WorkingSet<'_>,
    new: NewPatient,
) -> Result<PatientMutation, OccupancyError> {
    let mut patient = Patient::new(new.name, new.age, new.gender)?;
    patient.bed = new.bed;
    patient.nurse = new.nurse;
    patient.device = new.device;

    if let Some(bed) = patient.bed {
        ensure_assignable(ws, bed, patient.id)?;
    }
    ws.put_patient(patient.clone());
    let events = reactor.on_patient_saved(None, &patient, ws)?;
    Ok(PatientMutation { patient, events })
}

/// Update a patient, moving bed occupancy along with it.
pub fn update(
    reactor: &OccupancyReactor,
    ws: &mut WorkingSet<'_>,
    id: PatientId,
    update: PatientUpdate,
) -> Result<PatientMutation, OccupancyError> {
    let previous = ws
        .patient(id)
        .ok_or(OccupancyError::PatientNotFound { patient: id })?;
    let previous_bed = previous.bed;
    let patient = update.apply(previous)?;

    if let Some(bed) = patient.bed.filter(|b| previous_bed != Some(*b)) {
        ensure_assignable(ws, bed, id)?;
    }
    ws.put_patient(patient.clone());
    let events = reactor.on_patient_saved(previous_bed, &patient, ws)?;
    Ok(PatientMutation { patient, events })
}

/// Delete a patient and release its bed.
pub fn delete(
    reactor: &OccupancyReactor,
    ws: &mut WorkingSet<'_>,
    id: PatientId,
) -> Result<PatientMutation, OccupancyError> {
    let patient = ws
        .remove_patient(id)
        .ok_or(OccupancyError::PatientNotFound { patient: id })?;
    let events = reactor.on_patient_deleted(&patient, ws)?;
    Ok(PatientMutation { patient, events })
}

fn ensure_assignable(
    ws: &WorkingSet<'_>,
    bed: BedId,
    patient: PatientId,
) -> Result<(), OccupancyError> {
    if ws.bed(bed).is_none() {
        return Err(OccupancyError::BedNotFound { bed });
    }
    match ws.patients_on_bed(bed).into_iter().find(|p| *p != patient) {
        Some(holder) => Err(OccupancyError::BedAlreadyAssigned {
            bed,
            patient: holder,
        }),
        None => Ok(()),
    }
}

// ─── Bed administration ──────────────────────────────────────────────

/// Register a new, available bed.
pub fn register_bed(
    ws: &mut WorkingSet<'_>,
    ward: WardId,
    number: &str,
) -> Result<Bed, OccupancyError> {
    let bed = Bed::new(ward, number)?;
    ws.insert_bed(bed.clone())?;
    Ok(bed)
}

/// Take a bed out of service.
pub fn begin_maintenance(ws: &mut WorkingSet<'_>, id: BedId) -> Result<Bed, OccupancyError> {
    let mut bed = ws.bed(id).ok_or(OccupancyError::BedNotFound { bed: id })?;
    bed.begin_maintenance()?;
    ws.put_bed(bed.clone());
    Ok(bed)
}

/// Return a bed to service with the status its current references imply.
pub fn end_maintenance(ws: &mut WorkingSet<'_>, id: BedId) -> Result<Bed, OccupancyError> {
    let mut bed = ws.bed(id).ok_or(OccupancyError::BedNotFound { bed: id })?;
    let occupied = !ws.patients_on_bed(id).is_empty();
    bed.end_maintenance(occupied)?;
    ws.put_bed(bed.clone());
    Ok(bed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::RecordSource;
    use ncs_state::BedStatus;

    struct Empty;

    impl RecordSource for Empty {
        fn bed(&self, _: BedId) -> Option<Bed> {
            None
        }
        fn patient(&self, _: PatientId) -> Option<Patient> {
            None
        }
        fn patients_on_bed(&self, _: BedId) -> Vec<PatientId> {
            Vec::new()
        }
    }

    #[test]
    fn create_in_registered_bed_occupies_it() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let bed = register_bed(&mut ws, WardId::new(), "3").unwrap();

        let m = create(&reactor, &mut ws, NewPatient::new("A", 30, "M").in_bed(bed.id)).unwrap();
        assert_eq!(m.events, vec![OccupancyEvent::Occupied { bed: bed.id }]);
        assert_eq!(ws.bed(bed.id).unwrap().status, BedStatus::Occupied);
    }

    #[test]
    fn second_patient_cannot_take_held_bed() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let bed = register_bed(&mut ws, WardId::new(), "3").unwrap();
        let first = create(&reactor, &mut ws, NewPatient::new("A", 30, "M").in_bed(bed.id)).unwrap();

        let err = create(&reactor, &mut ws, NewPatient::new("B", 31, "F").in_bed(bed.id)).unwrap_err();
        assert!(matches!(
            err,
            OccupancyError::BedAlreadyAssigned { patient, .. } if patient == first.patient.id
        ));
    }

    #[test]
    fn update_validates_edited_fields() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let m = create(&reactor, &mut ws, NewPatient::new("A", 30, "M")).unwrap();

        let err = update(
            &reactor,
            &mut ws,
            m.patient.id,
            PatientUpdate {
                name: Some("  ".into()),
                ..PatientUpdate::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, OccupancyError::Validation(_)));
    }

    #[test]
    fn update_unknown_patient_fails() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let id = PatientId::new();
        let err = update(&reactor, &mut ws, id, PatientUpdate::clear_bed()).unwrap_err();
        assert!(matches!(err, OccupancyError::PatientNotFound { patient } if patient == id));
    }

    #[test]
    fn update_keeping_bed_does_not_recheck_uniqueness() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let bed = register_bed(&mut ws, WardId::new(), "3").unwrap();
        let m = create(&reactor, &mut ws, NewPatient::new("A", 30, "M").in_bed(bed.id)).unwrap();

        let renamed = update(
            &reactor,
            &mut ws,
            m.patient.id,
            PatientUpdate {
                name: Some("Alan".into()),
                ..PatientUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(renamed.patient.name, "Alan");
        assert_eq!(renamed.events, vec![OccupancyEvent::AlreadyOccupied { bed: bed.id }]);
    }

    #[test]
    fn end_maintenance_derives_from_references() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let held = register_bed(&mut ws, WardId::new(), "1").unwrap();
        let free = register_bed(&mut ws, WardId::new(), "2").unwrap();
        create(&reactor, &mut ws, NewPatient::new("A", 30, "M").in_bed(held.id)).unwrap();

        for id in [held.id, free.id] {
            begin_maintenance(&mut ws, id).unwrap();
        }
        assert_eq!(end_maintenance(&mut ws, held.id).unwrap().status, BedStatus::Occupied);
        assert_eq!(end_maintenance(&mut ws, free.id).unwrap().status, BedStatus::Available);
    }

    #[test]
    fn maintenance_on_unknown_bed_fails() {
        let mut ws = WorkingSet::new(&Empty);
        let id = BedId::new();
        assert!(matches!(
            begin_maintenance(&mut ws, id),
            Err(OccupancyError::BedNotFound { .. })
        ));
    }

    #[test]
    fn nurse_and_device_can_be_assigned_and_cleared() {
        let reactor = OccupancyReactor::default();
        let mut ws = WorkingSet::new(&Empty);
        let nurse = NurseId::new();
        let device = DeviceId::new();
        let m = create(&reactor, &mut ws, NewPatient::new("A", 30, "M")).unwrap();

        let assigned = update(
            &reactor,
            &mut ws,
            m.patient.id,
            PatientUpdate {
                nurse: ReferenceChange::Assign(nurse),
                device: ReferenceChange::Assign(device),
                ..PatientUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(assigned.patient.nurse, Some(nurse));
        assert_eq!(assigned.patient.device, Some(device));

        let renamed = update(
            &reactor,
            &mut ws,
            m.patient.id,
            PatientUpdate {
                name: Some("Alan".into()),
                ..PatientUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(renamed.patient.nurse, Some(nurse));

        let cleared = update(
            &reactor,
            &mut ws,
            m.patient.id,
            PatientUpdate {
                nurse: ReferenceChange::Clear,
                device: ReferenceChange::Clear,
                ..PatientUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(cleared.patient.nurse, None);
        assert_eq!(cleared.patient.device, None);
        assert_eq!(ws.patient(m.patient.id).unwrap().nurse, None);
    }

    #[test]
    fn reference_change_serde_shape() {
        let bed = BedId::new();
        let json = serde_json::to_value(BedChange::Assign(bed)).unwrap();
        assert_eq!(json["action"], "assign");
        let keep: PatientUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(keep.bed, BedChange::Keep);
        assert_eq!(keep.nurse, ReferenceChange::Keep);
        let clear: PatientUpdate =
            serde_json::from_str(r#"{"device": {"action": "clear"}}"#).unwrap();
        assert_eq!(clear.device, ReferenceChange::Clear);
    }
}
