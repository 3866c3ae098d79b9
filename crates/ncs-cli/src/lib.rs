//! # ncs-cli — Nurse-Call System Command-Line Interface
//!
//! Operator tooling for bed occupancy. Handlers parse nothing themselves;
//! `main.rs` owns the clap tree and each handler returns the process exit
//! code.
//!
//! ## Subcommands
//!
//! - `admit`, `transfer`, `discharge`: patient changes against a ward
//!   snapshot file
//! - `maintenance`: take a bed out of service or return it
//! - `beds`: register and list beds
//! - `audit`: reconcile bed status with patient references, in a snapshot
//!   or in PostgreSQL, with optional repair

pub mod audit;
pub mod ward;

use anyhow::Result;
use ncs_occupancy::{MaintenancePolicy, OccupancyConfig, ReassignmentPolicy};

/// Occupancy policies from the environment, with command-line overrides
/// taking precedence.
pub fn resolve_config(
    maintenance: Option<MaintenancePolicy>,
    reassignment: Option<ReassignmentPolicy>,
) -> Result<OccupancyConfig> {
    let mut config = OccupancyConfig::from_env()?;
    if let Some(policy) = maintenance {
        config = config.with_maintenance(policy);
    }
    if let Some(policy) = reassignment {
        config = config.with_reassignment(policy);
    }
    tracing::debug!(
        maintenance = config.maintenance.as_str(),
        reassignment = config.reassignment.as_str(),
        "occupancy policies"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_environment() {
        let config = resolve_config(Some(MaintenancePolicy::Overwrite), None).unwrap();
        assert_eq!(config.maintenance, MaintenancePolicy::Overwrite);

        let config = resolve_config(None, Some(ReassignmentPolicy::KeepPrevious)).unwrap();
        assert_eq!(config.reassignment, ReassignmentPolicy::KeepPrevious);
    }
}
