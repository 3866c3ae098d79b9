//! # ncs CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ncs_cli::audit::{run_audit, AuditArgs};
use ncs_cli::resolve_config;
use ncs_cli::ward::{
    run_admit, run_beds, run_discharge, run_maintenance, run_transfer, AdmitArgs, BedsArgs,
    DischargeArgs, MaintenanceArgs, TransferArgs,
};
use ncs_occupancy::{MaintenancePolicy, ReassignmentPolicy};

/// Nurse-call system CLI.
///
/// Admits, transfers and discharges patients against ward snapshots while
/// keeping bed occupancy consistent, and audits occupancy in snapshots or
/// PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "ncs", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Maintenance policy (`shield` or `overwrite`). Overrides
    /// NCS_MAINTENANCE_POLICY.
    #[arg(long, global = true)]
    maintenance_policy: Option<MaintenancePolicy>,

    /// Reassignment policy (`release` or `keep_previous`). Overrides
    /// NCS_REASSIGNMENT_POLICY.
    #[arg(long, global = true)]
    reassignment_policy: Option<ReassignmentPolicy>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Admit a patient, optionally into a bed.
    Admit(AdmitArgs),

    /// Move a patient to another bed, or out of bed.
    Transfer(TransferArgs),

    /// Discharge a patient and release their bed.
    Discharge(DischargeArgs),

    /// Begin or end bed maintenance.
    Maintenance(MaintenanceArgs),

    /// Register and list beds.
    Beds(BedsArgs),

    /// Reconcile bed status with patient references.
    Audit(AuditArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = resolve_config(cli.maintenance_policy, cli.reassignment_policy).and_then(
        |config| match cli.command {
            Commands::Admit(args) => run_admit(&args, config),
            Commands::Transfer(args) => run_transfer(&args, config),
            Commands::Discharge(args) => run_discharge(&args, config),
            Commands::Maintenance(args) => run_maintenance(&args, config),
            Commands::Beds(args) => run_beds(&args, config),
            Commands::Audit(args) => run_audit(&args, config),
        },
    );

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncs_cli::ward::BedsCommand;
    use ncs_core::BedId;

    #[test]
    fn cli_parse_admit_with_bed() {
        let bed = BedId::new();
        let bed_arg = bed.to_string();
        let cli = Cli::try_parse_from([
            "ncs", "admit", "--snapshot", "w.yaml", "--name", "Ada", "--age", "81", "--gender",
            "F", "--bed", bed_arg.as_str(),
        ])
        .unwrap();
        match cli.command {
            Commands::Admit(args) => {
                assert_eq!(args.name, "Ada");
                assert_eq!(args.age, 81);
                assert_eq!(args.bed, Some(bed));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_bare_uuid_bed() {
        let bed = BedId::new();
        let bare = bed.as_uuid().to_string();
        let cli = Cli::try_parse_from([
            "ncs", "maintenance", "--snapshot", "w.yaml", "--bed", bare.as_str(), "--begin",
        ])
        .unwrap();
        match cli.command {
            Commands::Maintenance(args) => {
                assert_eq!(args.bed, bed);
                assert!(args.begin);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cli_parse_maintenance_requires_exactly_one_action() {
        let bed = BedId::new().to_string();
        let base = ["ncs", "maintenance", "--snapshot", "w.yaml", "--bed", bed.as_str()];
        assert!(Cli::try_parse_from(base).is_err());
        let mut both = base.to_vec();
        both.extend(["--begin", "--end"]);
        assert!(Cli::try_parse_from(both).is_err());
    }

    #[test]
    fn cli_parse_transfer_needs_bed_or_clear() {
        let patient = ncs_core::PatientId::new().to_string();
        let base = ["ncs", "transfer", "--snapshot", "w.yaml", "--patient", patient.as_str()];
        assert!(Cli::try_parse_from(base).is_err());
        let mut clear = base.to_vec();
        clear.push("--clear");
        assert!(Cli::try_parse_from(clear).is_ok());
    }

    #[test]
    fn cli_parse_rejects_malformed_ids() {
        assert!(Cli::try_parse_from([
            "ncs", "discharge", "--snapshot", "w.yaml", "--patient", "not-a-uuid",
        ])
        .is_err());
    }

    #[test]
    fn cli_parse_audit_sources() {
        let cli = Cli::try_parse_from(["ncs", "audit", "--snapshot", "w.json", "--repair"]).unwrap();
        match cli.command {
            Commands::Audit(args) => {
                assert!(args.repair);
                assert!(!args.json);
                assert!(args.database_url.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(Cli::try_parse_from(["ncs", "audit"]).is_err());
        assert!(Cli::try_parse_from([
            "ncs", "audit", "--snapshot", "w.json", "--database-url", "postgres://x",
        ])
        .is_err());
    }

    #[test]
    fn cli_parse_policies() {
        let cli = Cli::try_parse_from([
            "ncs",
            "beds",
            "list",
            "--snapshot",
            "w.yaml",
            "--maintenance-policy",
            "overwrite",
            "--reassignment-policy",
            "keep_previous",
        ])
        .unwrap();
        assert_eq!(cli.maintenance_policy, Some(MaintenancePolicy::Overwrite));
        assert_eq!(cli.reassignment_policy, Some(ReassignmentPolicy::KeepPrevious));
        assert!(matches!(
            cli.command,
            Commands::Beds(BedsArgs {
                command: BedsCommand::List { .. }
            })
        ));
        assert!(Cli::try_parse_from([
            "ncs", "beds", "list", "--snapshot", "w.yaml", "--maintenance-policy", "never",
        ])
        .is_err());
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli = Cli::try_parse_from(["ncs", "-vv", "audit", "--snapshot", "w.yaml"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["ncs"]).is_err());
    }
}
