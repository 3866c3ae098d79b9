//! # Occupancy Configuration
//!
//! Two policies decide the behaviors operators disagree on:
//!
//! | Variable                  | Values                    | Default    |
//! |---------------------------|---------------------------|------------|
//! | `NCS_MAINTENANCE_POLICY`  | `shield`, `overwrite`     | `shield`   |
//! | `NCS_REASSIGNMENT_POLICY` | `release`, `keep_previous`| `release`  |
//!
//! `shield` keeps patient changes from touching beds in maintenance.
//! `overwrite` lets them, as older deployments did. `release` frees the bed
//! a patient leaves; `keep_previous` leaves it as it was.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the [`MaintenancePolicy`].
pub const MAINTENANCE_POLICY_VAR: &str = "NCS_MAINTENANCE_POLICY";
/// Environment variable selecting the [`ReassignmentPolicy`].
pub const REASSIGNMENT_POLICY_VAR: &str = "NCS_REASSIGNMENT_POLICY";

/// An environment variable held an unrecognized value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value {value:?} for {var} (expected one of: {expected})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// What the reactor does when a patient change touches a bed in maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenancePolicy {
    /// Leave the bed in maintenance, log a warning, let the patient change
    /// commit.
    #[default]
    Shield,
    /// Overwrite the maintenance status with the occupancy-derived one.
    Overwrite,
}

impl MaintenancePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shield => "shield",
            Self::Overwrite => "overwrite",
        }
    }
}

impl FromStr for MaintenancePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "shield" => Ok(Self::Shield),
            "overwrite" => Ok(Self::Overwrite),
            other => Err(ConfigError {
                var: MAINTENANCE_POLICY_VAR,
                value: other.to_string(),
                expected: "shield, overwrite",
            }),
        }
    }
}

/// What happens to the bed a patient leaves when moved or unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignmentPolicy {
    /// Release the previous bed unless another patient still references it.
    #[default]
    Release,
    /// Leave the previous bed's status untouched.
    KeepPrevious,
}

impl ReassignmentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::KeepPrevious => "keep_previous",
        }
    }
}

impl FromStr for ReassignmentPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "release" => Ok(Self::Release),
            "keep_previous" => Ok(Self::KeepPrevious),
            other => Err(ConfigError {
                var: REASSIGNMENT_POLICY_VAR,
                value: other.to_string(),
                expected: "release, keep_previous",
            }),
        }
    }
}

/// Policies consulted by the occupancy reactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OccupancyConfig {
    #[serde(default)]
    pub maintenance: MaintenancePolicy,
    #[serde(default)]
    pub reassignment: ReassignmentPolicy,
}

impl OccupancyConfig {
    /// Read both policies from the process environment. Unset variables
    /// fall back to the defaults; set-but-invalid ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read both policies through an arbitrary lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let maintenance = match lookup(MAINTENANCE_POLICY_VAR) {
            Some(v) if !v.trim().is_empty() => v.parse()?,
            _ => MaintenancePolicy::default(),
        };
        let reassignment = match lookup(REASSIGNMENT_POLICY_VAR) {
            Some(v) if !v.trim().is_empty() => v.parse()?,
            _ => ReassignmentPolicy::default(),
        };
        Ok(Self {
            maintenance,
            reassignment,
        })
    }

    pub fn with_maintenance(mut self, policy: MaintenancePolicy) -> Self {
        self.maintenance = policy;
        self
    }

    pub fn with_reassignment(mut self, policy: ReassignmentPolicy) -> Self {
        self.reassignment = policy;
        self
    }
}
