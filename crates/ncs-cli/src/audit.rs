//! # Audit Subcommand
//!
//! Reconciles bed statuses with patient references, either in a ward
//! snapshot or in PostgreSQL, and optionally commits the repairs.
//!
//! Exit code 0 means no drift remains, 2 means drift was found and left in
//! place.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};
use serde::Serialize;

use ncs_occupancy::db;
use ncs_occupancy::{
    AuditReport, Discrepancy, MemoryStore, OccupancyConfig, OccupancySnapshot, PatientService,
    PgPatientService, Repair,
};

/// Exit code when drift remains after the run.
pub const EXIT_DRIFT: u8 = 2;

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["snapshot", "database_url"])))]
pub struct AuditArgs {
    /// Ward snapshot file to audit.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
    /// PostgreSQL connection string to audit.
    #[arg(long)]
    pub database_url: Option<String>,
    /// Commit the fixes the audit proposes.
    #[arg(long)]
    pub repair: bool,
    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

/// What one audit run found and changed.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub repaired: Vec<Repair>,
    /// Drift still present after repairs.
    pub remaining: usize,
}

impl AuditOutcome {
    fn exit_code(&self) -> u8 {
        if self.remaining == 0 {
            0
        } else {
            EXIT_DRIFT
        }
    }
}

pub fn run_audit(args: &AuditArgs, config: OccupancyConfig) -> Result<u8> {
    let outcome = match (&args.snapshot, &args.database_url) {
        (Some(path), _) => audit_snapshot(path, args.repair, config)?,
        (None, Some(url)) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(audit_database(url, args.repair, config))?
        }
        (None, None) => anyhow::bail!("either --snapshot or --database-url is required"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(outcome.exit_code())
}

fn audit_snapshot(path: &Path, repair: bool, config: OccupancyConfig) -> Result<AuditOutcome> {
    let snapshot = OccupancySnapshot::load(path)
        .with_context(|| format!("failed to load ward snapshot {}", path.display()))?;
    let svc = PatientService::new(MemoryStore::from_snapshot(snapshot), config);

    let report = svc.audit();
    let mut repaired = Vec::new();
    if repair && !report.repairs().is_empty() {
        repaired = svc.repair()?;
        svc.store()
            .snapshot()
            .save(path)
            .with_context(|| format!("failed to write ward snapshot {}", path.display()))?;
    }
    let remaining = if repaired.is_empty() {
        report.drift_count()
    } else {
        svc.audit().drift_count()
    };
    Ok(AuditOutcome {
        report,
        repaired,
        remaining,
    })
}

async fn audit_database(url: &str, repair: bool, config: OccupancyConfig) -> Result<AuditOutcome> {
    let pool = db::connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    let svc = PgPatientService::new(pool, config);

    let report = svc.audit().await?;
    let repaired = if repair {
        svc.repair().await?
    } else {
        Vec::new()
    };
    let remaining = if repaired.is_empty() {
        report.drift_count()
    } else {
        svc.audit().await?.drift_count()
    };
    Ok(AuditOutcome {
        report,
        repaired,
        remaining,
    })
}

fn print_outcome(outcome: &AuditOutcome) {
    let report = &outcome.report;
    println!(
        "Checked {} beds and {} patients",
        report.beds_checked, report.patients_checked
    );
    for d in &report.discrepancies {
        println!("  {}", describe(d));
    }
    for r in &outcome.repaired {
        match r {
            Repair::SetStatus { bed, from, to } => println!("  repaired {bed}: {from} -> {to}"),
            Repair::ClearBedReference { patient, bed } => {
                println!("  repaired {patient}: cleared reference to {bed}")
            }
        }
    }
    if outcome.remaining == 0 {
        println!("OK: occupancy consistent");
    } else {
        println!("DRIFT: {} discrepancies remain", outcome.remaining);
    }
}

fn describe(d: &Discrepancy) -> String {
    match d {
        Discrepancy::OccupiedWithoutPatient { bed } => {
            format!("{bed}: occupied but no patient references it")
        }
        Discrepancy::AvailableWithPatient { bed, patient } => {
            format!("{bed}: available but referenced by {patient}")
        }
        Discrepancy::MultiplePatients { bed, patients } => {
            format!("{bed}: referenced by {} patients", patients.len())
        }
        Discrepancy::DanglingBedReference { patient, bed } => {
            format!("{patient}: references unknown {bed}")
        }
        Discrepancy::MaintenanceWithPatient { bed, patients } => {
            format!("{bed}: in maintenance with {} patient(s) (info)", patients.len())
        }
    }
}
