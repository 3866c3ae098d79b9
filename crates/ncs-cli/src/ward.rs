//! # Ward Subcommands
//!
//! Admission, transfer, discharge and bed administration against a ward
//! snapshot file. Each command loads the snapshot into an in-memory store,
//! runs one service call, and writes the snapshot back only if the call
//! succeeded.
//!
//! ```text
//! ncs admit --snapshot ward.yaml --name "A. Patient" --age 71 --gender F --bed <id>
//! ncs transfer --snapshot ward.yaml --patient <id> --bed <id>
//! ncs transfer --snapshot ward.yaml --patient <id> --clear
//! ncs discharge --snapshot ward.yaml --patient <id>
//! ncs maintenance --snapshot ward.yaml --bed <id> --begin
//! ncs beds add --snapshot ward.yaml --ward <id> --number 12A
//! ncs beds list --snapshot ward.yaml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Subcommand};

use ncs_core::{BedId, PatientId, WardId};
use ncs_occupancy::{
    MemoryStore, NewPatient, OccupancyConfig, OccupancyEvent, OccupancySnapshot, PatientMutation,
    PatientService, PatientUpdate,
};

/// Admit a patient, optionally straight into a bed.
#[derive(Args, Debug)]
pub struct AdmitArgs {
    /// Ward snapshot file (YAML, or JSON by `.json` extension).
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: u32,
    #[arg(long)]
    pub gender: String,
    /// Bed to assign on admission.
    #[arg(long)]
    pub bed: Option<BedId>,
}

/// Move a patient to another bed, or take them out of their bed.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["bed", "clear"])))]
pub struct TransferArgs {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub patient: PatientId,
    /// Destination bed.
    #[arg(long)]
    pub bed: Option<BedId>,
    /// Leave the patient without a bed.
    #[arg(long)]
    pub clear: bool,
}

/// Discharge (delete) a patient.
#[derive(Args, Debug)]
pub struct DischargeArgs {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub patient: PatientId,
}

/// Take a bed out of service or return it.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("action").required(true).args(["begin", "end"])))]
pub struct MaintenanceArgs {
    #[arg(long)]
    pub snapshot: PathBuf,
    #[arg(long)]
    pub bed: BedId,
    /// Put the bed into maintenance.
    #[arg(long)]
    pub begin: bool,
    /// Return the bed to service with the status its references imply.
    #[arg(long)]
    pub end: bool,
}

/// Bed registry operations.
#[derive(Args, Debug)]
pub struct BedsArgs {
    #[command(subcommand)]
    pub command: BedsCommand,
}

#[derive(Subcommand, Debug)]
pub enum BedsCommand {
    /// Register a bed. Creates the snapshot file if it does not exist.
    Add {
        #[arg(long)]
        snapshot: PathBuf,
        #[arg(long)]
        ward: WardId,
        /// Bed number as shown on the ward, e.g. `12A`.
        #[arg(long)]
        number: String,
    },
    /// Print every bed with its status and holder.
    List {
        #[arg(long)]
        snapshot: PathBuf,
    },
}

// ─── Handlers ───────────────────────────────────────────────────────

pub fn run_admit(args: &AdmitArgs, config: OccupancyConfig) -> Result<u8> {
    let svc = open(&args.snapshot, config)?;
    let mut new = NewPatient::new(args.name.as_str(), args.age, args.gender.as_str());
    new.bed = args.bed;
    let m = svc.create_patient(new).context("admission rejected")?;
    save(&svc, &args.snapshot)?;
    print_mutation("admitted", &m);
    Ok(0)
}

pub fn run_transfer(args: &TransferArgs, config: OccupancyConfig) -> Result<u8> {
    let svc = open(&args.snapshot, config)?;
    let update = match args.bed {
        Some(bed) if !args.clear => PatientUpdate::transfer(bed),
        _ => PatientUpdate::clear_bed(),
    };
    let m = svc
        .update_patient(args.patient, update)
        .context("transfer rejected")?;
    save(&svc, &args.snapshot)?;
    print_mutation("transferred", &m);
    Ok(0)
}

pub fn run_discharge(args: &DischargeArgs, config: OccupancyConfig) -> Result<u8> {
    let svc = open(&args.snapshot, config)?;
    let m = svc
        .delete_patient(args.patient)
        .context("discharge rejected")?;
    save(&svc, &args.snapshot)?;
    print_mutation("discharged", &m);
    Ok(0)
}

pub fn run_maintenance(args: &MaintenanceArgs, config: OccupancyConfig) -> Result<u8> {
    let svc = open(&args.snapshot, config)?;
    let bed = if args.begin {
        svc.begin_maintenance(args.bed)?
    } else {
        svc.end_maintenance(args.bed)?
    };
    save(&svc, &args.snapshot)?;
    println!("OK: bed {} is now {}", bed.number, bed.status);
    Ok(0)
}

pub fn run_beds(args: &BedsArgs, config: OccupancyConfig) -> Result<u8> {
    match &args.command {
        BedsCommand::Add {
            snapshot,
            ward,
            number,
        } => cmd_add_bed(snapshot, *ward, number, config),
        BedsCommand::List { snapshot } => cmd_list_beds(snapshot, config),
    }
}

fn cmd_add_bed(path: &Path, ward: WardId, number: &str, config: OccupancyConfig) -> Result<u8> {
    let svc = if path.exists() {
        open(path, config)?
    } else {
        tracing::info!(path = %path.display(), "creating new ward snapshot");
        PatientService::new(MemoryStore::new(), config)
    };
    let bed = svc.register_bed(ward, number)?;
    save(&svc, path)?;
    println!("OK: registered bed {} as {}", bed.number, bed.id);
    Ok(0)
}

fn cmd_list_beds(path: &Path, config: OccupancyConfig) -> Result<u8> {
    let svc = open(path, config)?;
    let patients = svc.list_patients();
    for bed in svc.list_beds() {
        let holder = patients
            .iter()
            .find(|p| p.bed == Some(bed.id))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        println!("{:<8} {:<12} {:<24} {}", bed.number, bed.status.as_str(), holder, bed.id);
    }
    Ok(0)
}

// ─── Helpers ────────────────────────────────────────────────────────

fn open(path: &Path, config: OccupancyConfig) -> Result<PatientService> {
    let snapshot = OccupancySnapshot::load(path)
        .with_context(|| format!("failed to load ward snapshot {}", path.display()))?;
    tracing::debug!(
        beds = snapshot.beds.len(),
        patients = snapshot.patients.len(),
        "snapshot loaded"
    );
    Ok(PatientService::new(MemoryStore::from_snapshot(snapshot), config))
}

fn save(svc: &PatientService, path: &Path) -> Result<()> {
    svc.store()
        .snapshot()
        .save(path)
        .with_context(|| format!("failed to write ward snapshot {}", path.display()))
}

fn print_mutation(verb: &str, m: &PatientMutation) {
    match m.patient.bed {
        Some(bed) => println!("OK: {verb} {} ({}) in {bed}", m.patient.name, m.patient.id),
        None => println!("OK: {verb} {} ({})", m.patient.name, m.patient.id),
    }
    for event in &m.events {
        println!("  {}", describe(event));
    }
}

fn describe(event: &OccupancyEvent) -> String {
    match event {
        OccupancyEvent::Occupied { bed } => format!("{bed}: occupied"),
        OccupancyEvent::AlreadyOccupied { bed } => format!("{bed}: already occupied"),
        OccupancyEvent::Released { bed } => format!("{bed}: released"),
        OccupancyEvent::AlreadyAvailable { bed } => format!("{bed}: already available"),
        OccupancyEvent::MaintenanceSkipped { bed, wanted } => {
            format!("{bed}: in maintenance, left as is (would be {wanted})")
        }
        OccupancyEvent::MaintenanceOverridden { bed, to } => {
            format!("{bed}: maintenance overwritten with {to}")
        }
        OccupancyEvent::ReleaseSkippedStillReferenced { bed, holders } => {
            format!("{bed}: still referenced by {} patient(s), not released", holders.len())
        }
        OccupancyEvent::PreviousBedRetained { bed } => format!("{bed}: previous bed left as is"),
        OccupancyEvent::ReleasedBedMissing { bed } => format!("{bed}: no such bed, nothing released"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_state::BedStatus;

    fn ward_file(dir: &Path, beds: usize) -> (PathBuf, Vec<BedId>) {
        let path = dir.join("ward.yaml");
        let ward = WardId::new();
        for i in 1..=beds {
            cmd_add_bed(&path, ward, &format!("B{i}"), OccupancyConfig::default()).unwrap();
        }
        let ids = OccupancySnapshot::load(&path)
            .unwrap()
            .beds
            .iter()
            .map(|b| b.id)
            .collect();
        (path, ids)
    }

    fn reload(path: &Path) -> PatientService {
        open(path, OccupancyConfig::default()).unwrap()
    }

    fn admit(path: &Path, name: &str, bed: Option<BedId>) -> PatientId {
        let args = AdmitArgs {
            snapshot: path.to_path_buf(),
            name: name.into(),
            age: 70,
            gender: "F".into(),
            bed,
        };
        assert_eq!(run_admit(&args, OccupancyConfig::default()).unwrap(), 0);
        reload(path)
            .list_patients()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
            .id
    }

    #[test]
    fn add_bed_creates_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let (path, beds) = ward_file(dir.path(), 2);
        assert!(path.exists());
        assert_eq!(beds.len(), 2);
        assert_eq!(cmd_list_beds(&path, OccupancyConfig::default()).unwrap(), 0);
    }

    #[test]
    fn admit_transfer_discharge_persist() {
        let dir = tempfile::tempdir().unwrap();
        let (path, beds) = ward_file(dir.path(), 2);

        let p = admit(&path, "Ada", Some(beds[0]));
        assert_eq!(reload(&path).get_bed(beds[0]).unwrap().status, BedStatus::Occupied);

        let transfer = TransferArgs {
            snapshot: path.clone(),
            patient: p,
            bed: Some(beds[1]),
            clear: false,
        };
        run_transfer(&transfer, OccupancyConfig::default()).unwrap();
        let svc = reload(&path);
        assert_eq!(svc.get_bed(beds[0]).unwrap().status, BedStatus::Available);
        assert_eq!(svc.get_bed(beds[1]).unwrap().status, BedStatus::Occupied);

        let discharge = DischargeArgs {
            snapshot: path.clone(),
            patient: p,
        };
        run_discharge(&discharge, OccupancyConfig::default()).unwrap();
        let svc = reload(&path);
        assert!(svc.list_patients().is_empty());
        assert_eq!(svc.get_bed(beds[1]).unwrap().status, BedStatus::Available);
    }

    #[test]
    fn clear_takes_the_patient_out_of_bed() {
        let dir = tempfile::tempdir().unwrap();
        let (path, beds) = ward_file(dir.path(), 1);
        let p = admit(&path, "Ada", Some(beds[0]));

        let args = TransferArgs {
            snapshot: path.clone(),
            patient: p,
            bed: None,
            clear: true,
        };
        run_transfer(&args, OccupancyConfig::default()).unwrap();
        let svc = reload(&path);
        assert_eq!(svc.get_patient(p).unwrap().bed, None);
        assert_eq!(svc.get_bed(beds[0]).unwrap().status, BedStatus::Available);
    }

    #[test]
    fn rejected_admission_leaves_the_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let (path, beds) = ward_file(dir.path(), 1);
        admit(&path, "Ada", Some(beds[0]));
        let before = std::fs::read_to_string(&path).unwrap();

        let args = AdmitArgs {
            snapshot: path.clone(),
            name: "Bob".into(),
            age: 40,
            gender: "M".into(),
            bed: Some(beds[0]),
        };
        let err = run_admit(&args, OccupancyConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("already assigned"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn maintenance_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (path, beds) = ward_file(dir.path(), 1);
        let begin = MaintenanceArgs {
            snapshot: path.clone(),
            bed: beds[0],
            begin: true,
            end: false,
        };
        run_maintenance(&begin, OccupancyConfig::default()).unwrap();
        assert!(reload(&path).get_bed(beds[0]).unwrap().in_maintenance());

        admit(&path, "Ada", Some(beds[0]));
        assert!(reload(&path).get_bed(beds[0]).unwrap().in_maintenance());

        let end = MaintenanceArgs {
            snapshot: path.clone(),
            bed: beds[0],
            begin: false,
            end: true,
        };
        run_maintenance(&end, OccupancyConfig::default()).unwrap();
        assert_eq!(reload(&path).get_bed(beds[0]).unwrap().status, BedStatus::Occupied);
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let args = DischargeArgs {
            snapshot: dir.path().join("absent.yaml"),
            patient: PatientId::new(),
        };
        let err = run_discharge(&args, OccupancyConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load ward snapshot"));
    }

    #[test]
    fn events_are_described() {
        let bed = BedId::new();
        assert!(describe(&OccupancyEvent::Released { bed }).ends_with("released"));
        assert!(describe(&OccupancyEvent::MaintenanceSkipped {
            bed,
            wanted: BedStatus::Occupied
        })
        .contains("would be occupied"));
    }
}
