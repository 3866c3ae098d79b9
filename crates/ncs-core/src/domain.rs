//! # Domain Enumerations
//!
//! Closed vocabularies stored as text columns: building classification,
//! account role, and nurse-call status. Each enum has one `as_str()`
//! spelling that matches both the serde form and the stored column value,
//! and a `FromStr` that accepts exactly those spellings.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

// ─── Building type ───────────────────────────────────────────────────

/// Classification of a hospital building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    /// Administrative offices.
    Administrator,
    /// Wards and clinical care.
    Clinical,
    /// Research facilities.
    Research,
    /// Laboratory.
    Lab,
    /// Anything else. The default for new buildings.
    #[default]
    Other,
}

impl BuildingType {
    /// All building types in display order.
    pub fn all() -> &'static [BuildingType] {
        &[
            Self::Administrator,
            Self::Clinical,
            Self::Research,
            Self::Lab,
            Self::Other,
        ]
    }

    /// Stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::Clinical => "clinical",
            Self::Research => "research",
            Self::Lab => "lab",
            Self::Other => "other",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Clinical => "Clinical",
            Self::Research => "Research",
            Self::Lab => "Laboratory",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for BuildingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "building_type",
                value: s.to_string(),
            })
    }
}

// ─── Role ────────────────────────────────────────────────────────────

/// Role of a login account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Bedside nurse.
    Nurse,
    /// Supervises buildings or floors.
    Supervisor,
    /// Manages the hospital hierarchy, including bed maintenance.
    Admin,
}

impl Role {
    /// Stored column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nurse => "nurse",
            Self::Supervisor => "supervisor",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nurse" => Ok(Self::Nurse),
            "supervisor" => Ok(Self::Supervisor),
            "admin" => Ok(Self::Admin),
            other => Err(ValidationError::UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

// ─── Call status ─────────────────────────────────────────────────────

/// Status of a nurse call.
///
/// The stored column is free text, so unrecognized values are carried
/// through as `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallStatus {
    /// Raised, not yet answered.
    Pending,
    /// A nurse responded.
    Answered,
    /// Withdrawn from the bedside.
    Cancelled,
    /// Escalated.
    Urgent,
    /// Any other stored value.
    Other(String),
}

impl CallStatus {
    /// Stored column value.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Answered => "answered",
            Self::Cancelled => "cancelled",
            Self::Urgent => "urgent",
            Self::Other(s) => s,
        }
    }

    /// Map a stored value to a status. Never fails.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "answered" => Self::Answered,
            "cancelled" => Self::Cancelled,
            "urgent" => Self::Urgent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CallStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CallStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_stored(&raw))
    }
}
