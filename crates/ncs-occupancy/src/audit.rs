//! # Occupancy Audit
//!
//! Compares every bed's stored status with the patients that reference it
//! and reports where they disagree. Drift can come from data written before
//! the reactor existed, from the keep-previous reassignment policy, or from
//! manual edits to the database.
//!
//! The audit is read-only. [`AuditReport::repairs`] proposes fixes and
//! [`apply_repairs`] stages them into a unit of work, re-checking each one
//! against the current state first. A wrong status is overwritten with the
//! derived one; a reference to a bed that no longer exists is cleared. Beds
//! in maintenance are reported but never repaired, and duplicate references
//! need a human decision, so neither produces a repair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ncs_core::{BedId, Patient, PatientId};
use ncs_state::{Bed, BedStatus, TransitionCause};

use crate::error::OccupancyError;
use crate::reactor::BedLedger;
use crate::unit::WorkingSet;

/// One disagreement between bed status and patient references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discrepancy {
    /// Marked occupied, but no patient references it.
    OccupiedWithoutPatient { bed: BedId },
    /// Marked available, but a patient references it.
    AvailableWithPatient { bed: BedId, patient: PatientId },
    /// More than one patient references the bed.
    MultiplePatients { bed: BedId, patients: Vec<PatientId> },
    /// A patient references a bed that does not exist.
    DanglingBedReference { patient: PatientId, bed: BedId },
    /// In maintenance while a patient references it. Informational.
    MaintenanceWithPatient { bed: BedId, patients: Vec<PatientId> },
}

impl Discrepancy {
    pub fn bed(&self) -> BedId {
        match self {
            Self::OccupiedWithoutPatient { bed }
            | Self::AvailableWithPatient { bed, .. }
            | Self::MultiplePatients { bed, .. }
            | Self::DanglingBedReference { bed, .. }
            | Self::MaintenanceWithPatient { bed, .. } => *bed,
        }
    }

    /// Whether this is actual drift rather than an informational note.
    pub fn is_drift(&self) -> bool {
        !matches!(self, Self::MaintenanceWithPatient { .. })
    }

    /// The fix this discrepancy calls for, if it has one.
    pub fn repair(&self) -> Option<Repair> {
        match self {
            Self::OccupiedWithoutPatient { bed } => Some(Repair::SetStatus {
                bed: *bed,
                from: BedStatus::Occupied,
                to: BedStatus::Available,
            }),
            Self::AvailableWithPatient { bed, .. } => Some(Repair::SetStatus {
                bed: *bed,
                from: BedStatus::Available,
                to: BedStatus::Occupied,
            }),
            Self::DanglingBedReference { patient, bed } => Some(Repair::ClearBedReference {
                patient: *patient,
                bed: *bed,
            }),
            Self::MultiplePatients { .. } | Self::MaintenanceWithPatient { .. } => None,
        }
    }
}

/// A proposed fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Repair {
    /// Overwrite a bed's status. `from` is the status the audit observed.
    SetStatus {
        bed: BedId,
        from: BedStatus,
        to: BedStatus,
    },
    /// Drop a patient's reference to a bed that does not exist.
    ClearBedReference { patient: PatientId, bed: BedId },
}

impl Repair {
    pub fn bed(&self) -> BedId {
        match self {
            Self::SetStatus { bed, .. } | Self::ClearBedReference { bed, .. } => *bed,
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub beds_checked: usize,
    pub patients_checked: usize,
    pub discrepancies: Vec<Discrepancy>,
}

impl AuditReport {
    /// No drift found. Informational entries are allowed.
    pub fn is_consistent(&self) -> bool {
        self.drift_count() == 0
    }

    pub fn drift_count(&self) -> usize {
        self.discrepancies.iter().filter(|d| d.is_drift()).count()
    }

    pub fn repairs(&self) -> Vec<Repair> {
        self.discrepancies.iter().filter_map(Discrepancy::repair).collect()
    }
}

/// Compare bed statuses with patient references. Bed discrepancies come
/// first in bed id order; dangling references follow.
pub fn reconcile<'a>(
    beds: impl IntoIterator<Item = &'a Bed>,
    patients: impl IntoIterator<Item = &'a Patient>,
) -> AuditReport {
    let beds: BTreeMap<BedId, &Bed> = beds.into_iter().map(|b| (b.id, b)).collect();
    let mut holders: BTreeMap<BedId, Vec<PatientId>> = BTreeMap::new();
    let mut dangling = Vec::new();
    let mut patients_checked = 0;

    for patient in patients {
        patients_checked += 1;
        let Some(bed) = patient.bed else { continue };
        if beds.contains_key(&bed) {
            holders.entry(bed).or_default().push(patient.id);
        } else {
            dangling.push(Discrepancy::DanglingBedReference {
                patient: patient.id,
                bed,
            });
        }
    }

    let mut discrepancies = Vec::new();
    for (id, bed) in &beds {
        let mut held_by = holders.remove(id).unwrap_or_default();
        held_by.sort();

        if held_by.len() > 1 {
            discrepancies.push(Discrepancy::MultiplePatients {
                bed: *id,
                patients: held_by.clone(),
            });
        }
        let first = held_by.first().copied();
        match (bed.status, first) {
            (BedStatus::Occupied, None) => {
                discrepancies.push(Discrepancy::OccupiedWithoutPatient { bed: *id });
            }
            (BedStatus::Available, Some(patient)) => {
                discrepancies.push(Discrepancy::AvailableWithPatient {
                    bed: *id,
                    patient,
                });
            }
            (BedStatus::Maintenance, Some(_)) => {
                discrepancies.push(Discrepancy::MaintenanceWithPatient {
                    bed: *id,
                    patients: held_by,
                });
            }
            _ => {}
        }
    }

    dangling.sort_by_key(|d| (d.bed(), patient_of(d)));
    discrepancies.extend(dangling);

    let report = AuditReport {
        beds_checked: beds.len(),
        patients_checked,
        discrepancies,
    };
    tracing::debug!(
        beds = report.beds_checked,
        patients = report.patients_checked,
        drift = report.drift_count(),
        "occupancy reconciled"
    );
    report
}

fn patient_of(d: &Discrepancy) -> Option<PatientId> {
    match d {
        Discrepancy::DanglingBedReference { patient, .. }
        | Discrepancy::AvailableWithPatient { patient, .. } => Some(*patient),
        _ => None,
    }
}

/// Stage repairs into a unit of work.
///
/// Each repair is re-derived from the working set before it is applied: a
/// bed whose status moved since the audit, that entered maintenance, or
/// whose references no longer call for the proposed status is skipped, and
/// so is a reference that changed or whose bed now exists. Returns the
/// repairs that were staged.
pub fn apply_repairs(
    ws: &mut WorkingSet<'_>,
    repairs: &[Repair],
) -> Result<Vec<Repair>, OccupancyError> {
    let mut applied = Vec::new();
    for repair in repairs {
        let staged = match *repair {
            Repair::SetStatus { bed, from, to } => set_status(ws, bed, from, to)?,
            Repair::ClearBedReference { patient, bed } => clear_reference(ws, patient, bed),
        };
        if staged {
            applied.push(*repair);
        }
    }
    Ok(applied)
}

fn set_status(
    ws: &mut WorkingSet<'_>,
    id: BedId,
    from: BedStatus,
    to: BedStatus,
) -> Result<bool, OccupancyError> {
    let mut bed = ws.bed(id).ok_or(OccupancyError::BedNotFound { bed: id })?;
    let derived = BedStatus::for_occupancy(!ws.patients_on_bed(id).is_empty());

    if bed.in_maintenance() || bed.status != from || derived != to {
        tracing::warn!(
            bed = %id,
            audited = %from,
            current = %bed.status,
            "stale repair skipped"
        );
        return Ok(false);
    }
    if !bed.overwrite_status(to, TransitionCause::AuditRepair)? {
        return Ok(false);
    }
    tracing::info!(bed = %id, from = %from, to = %to, "bed status repaired");
    ws.put_bed(bed);
    Ok(true)
}

fn clear_reference(ws: &mut WorkingSet<'_>, id: PatientId, bed: BedId) -> bool {
    let Some(mut patient) = ws.patient(id) else {
        tracing::warn!(patient = %id, bed = %bed, "stale repair skipped");
        return false;
    };
    if patient.bed != Some(bed) || ws.bed(bed).is_some() {
        tracing::warn!(patient = %id, bed = %bed, "stale repair skipped");
        return false;
    }
    patient.bed = None;
    ws.put_patient(patient);
    tracing::info!(patient = %id, bed = %bed, "dangling bed reference cleared");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::RecordSource;
    use ncs_core::WardId;

    fn bed(status: BedStatus) -> Bed {
        let mut b = Bed::new(WardId::new(), "1").unwrap();
        b.status = status;
        b
    }

    struct Fixture {
        beds: Vec<Bed>,
        patients: Vec<Patient>,
    }

    impl RecordSource for Fixture {
        fn bed(&self, id: BedId) -> Option<Bed> {
            self.beds.iter().find(|b| b.id == id).cloned()
        }
        fn patient(&self, id: PatientId) -> Option<Patient> {
            self.patients.iter().find(|p| p.id == id).cloned()
        }
        fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId> {
            self.patients
                .iter()
                .filter(|p| p.bed == Some(bed))
                .map(|p| p.id)
                .collect()
        }
    }

    fn patient_in(bed: Option<BedId>) -> Patient {
        let mut p = Patient::new("P", 50, "M").unwrap();
        p.bed = bed;
        p
    }

    #[test]
    fn consistent_ward_has_no_discrepancies() {
        let occupied = bed(BedStatus::Occupied);
        let free = bed(BedStatus::Available);
        let p = patient_in(Some(occupied.id));
        let report = reconcile([&occupied, &free], [&p]);
        assert!(report.is_consistent());
        assert!(report.discrepancies.is_empty());
        assert_eq!((report.beds_checked, report.patients_checked), (2, 1));
    }

    #[test]
    fn detects_each_kind_of_drift() {
        let ghost_occupied = bed(BedStatus::Occupied);
        let unmarked = bed(BedStatus::Available);
        let p = patient_in(Some(unmarked.id));
        let lost = patient_in(Some(BedId::new()));

        let report = reconcile([&ghost_occupied, &unmarked], [&p, &lost]);
        assert_eq!(report.drift_count(), 3);
        assert!(report
            .discrepancies
            .contains(&Discrepancy::OccupiedWithoutPatient { bed: ghost_occupied.id }));
        assert!(report.discrepancies.contains(&Discrepancy::AvailableWithPatient {
            bed: unmarked.id,
            patient: p.id
        }));
        assert!(matches!(
            report.discrepancies.last(),
            Some(Discrepancy::DanglingBedReference { patient, .. }) if *patient == lost.id
        ));
    }

    #[test]
    fn duplicate_references_are_drift_without_repair() {
        let b = bed(BedStatus::Occupied);
        let p1 = patient_in(Some(b.id));
        let p2 = patient_in(Some(b.id));
        let report = reconcile([&b], [&p1, &p2]);
        assert_eq!(report.drift_count(), 1);
        assert!(report.repairs().is_empty());
        match &report.discrepancies[0] {
            Discrepancy::MultiplePatients { patients, .. } => assert_eq!(patients.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn maintenance_with_patient_is_informational() {
        let b = bed(BedStatus::Maintenance);
        let p = patient_in(Some(b.id));
        let report = reconcile([&b], [&p]);
        assert!(report.is_consistent());
        assert_eq!(report.discrepancies.len(), 1);
        assert!(report.repairs().is_empty());
    }

    #[test]
    fn repairs_map_to_derived_status() {
        let ghost = bed(BedStatus::Occupied);
        let unmarked = bed(BedStatus::Available);
        let p = patient_in(Some(unmarked.id));
        let repairs = reconcile([&ghost, &unmarked], [&p]).repairs();
        assert!(repairs.contains(&Repair::SetStatus {
            bed: ghost.id,
            from: BedStatus::Occupied,
            to: BedStatus::Available
        }));
        assert!(repairs.contains(&Repair::SetStatus {
            bed: unmarked.id,
            from: BedStatus::Available,
            to: BedStatus::Occupied
        }));
    }

    #[test]
    fn dangling_reference_repair_clears_the_patient_bed() {
        let b = bed(BedStatus::Available);
        let missing = BedId::new();
        let lost = patient_in(Some(missing));
        let repairs = reconcile([&b], [&lost]).repairs();
        assert_eq!(
            repairs,
            vec![Repair::ClearBedReference {
                patient: lost.id,
                bed: missing
            }]
        );

        let source = Fixture {
            beds: vec![b],
            patients: vec![lost.clone()],
        };
        let mut ws = WorkingSet::new(&source);
        let applied = apply_repairs(&mut ws, &repairs).unwrap();
        assert_eq!(applied, repairs);
        assert_eq!(ws.patient(lost.id).unwrap().bed, None);

        // A second pass over the same proposal finds nothing left to clear.
        assert!(apply_repairs(&mut ws, &repairs).unwrap().is_empty());
    }

    #[test]
    fn repair_serializes_with_action_tags() {
        let json = serde_json::to_value(Repair::ClearBedReference {
            patient: PatientId::new(),
            bed: BedId::new(),
        })
        .unwrap();
        assert_eq!(json["action"], "clear_bed_reference");
    }

    #[test]
    fn report_serializes_with_kind_tags() {
        let b = bed(BedStatus::Occupied);
        let report = reconcile([&b], std::iter::empty::<&Patient>());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["discrepancies"][0]["kind"], "occupied_without_patient");
    }
}
