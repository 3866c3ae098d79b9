//! # Entity Store Records
//!
//! Plain data records for the nurse-call hierarchy:
//!
//! ```text
//! Hospital ─▶ Building ─▶ Floor ─▶ Ward ─▶ Bed ─▶ Device
//!                                   ▲
//!               StaffTeam ─▶ TeamAssignment (ward + floor)
//!                   │
//!                   ├─▶ Nurse
//!                   └─▶ Supervisor ─▶ User
//!
//! Patient ──(0..1, unique)──▶ Bed      Call ─▶ Device, Bed, Nurse?
//! ```
//!
//! These records carry no behavior beyond local field validation. The bed
//! record itself lives in `ncs-state` because its status is a state machine.
//!
//! Column widths follow the stored schema; constructors trim text and reject
//! blank or overlong values.

use serde::{Deserialize, Serialize};

use crate::domain::{BuildingType, CallStatus, Role};
use crate::error::{require_text, ValidationError};
use crate::identity::{
    BedId, BuildingId, CallId, DeviceId, FloorId, HospitalId, NurseId, PatientId, StaffTeamId,
    SupervisorId, TeamAssignmentId, UserId, WardId,
};
use crate::temporal::Timestamp;

/// Width of name columns.
pub const NAME_MAX: usize = 255;
/// Width of the patient gender column.
pub const GENDER_MAX: usize = 10;
/// Width of the bed label column.
pub const BED_NUMBER_MAX: usize = 50;
/// Width of serial-number and badge columns.
pub const SERIAL_MAX: usize = 100;

// ─── Hierarchy ───────────────────────────────────────────────────────

/// A hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: HospitalId,
    pub name: String,
    pub address: String,
    /// Nurse record acting as hospital administrator.
    #[serde(default)]
    pub admin: Option<NurseId>,
    /// Comma-separated specialities, e.g. `Cardiology, Oncology`.
    #[serde(default)]
    pub speciality: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Hospital {
    /// Create a validated hospital record.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: HospitalId::new(),
            name: require_text("name", name, NAME_MAX)?,
            address: address.into(),
            admin: None,
            speciality: None,
            phone_number: None,
        })
    }
}

/// A building belonging to a hospital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub hospital: HospitalId,
    #[serde(default)]
    pub supervisor: Option<UserId>,
    #[serde(default)]
    pub building_type: BuildingType,
    /// Number of floors, if recorded.
    #[serde(default)]
    pub floors: Option<u32>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl Building {
    /// Create a validated building record.
    pub fn new(hospital: HospitalId, name: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: BuildingId::new(),
            name: require_text("name", name, NAME_MAX)?,
            hospital,
            supervisor: None,
            building_type: BuildingType::default(),
            floors: None,
            address: String::new(),
            description: String::new(),
        })
    }
}

/// A floor of a building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    pub number: i32,
    pub building: BuildingId,
    #[serde(default)]
    pub supervisor: Option<UserId>,
}

/// A ward on a floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ward {
    pub id: WardId,
    pub name: String,
    pub floor: FloorId,
    pub building: BuildingId,
}

impl Ward {
    /// Create a validated ward record.
    pub fn new(
        floor: FloorId,
        building: BuildingId,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: WardId::new(),
            name: require_text("name", name, NAME_MAX)?,
            floor,
            building,
        })
    }
}

/// A bedside call device mounted on a bed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub serial_number: String,
    pub bed: BedId,
}

impl Device {
    /// Create a validated device record.
    pub fn new(bed: BedId, serial_number: impl Into<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            id: DeviceId::new(),
            serial_number: require_text("serial_number", serial_number, SERIAL_MAX)?,
            bed,
        })
    }
}

// ─── Staff ───────────────────────────────────────────────────────────

/// A nursing team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffTeam {
    pub id: StaffTeamId,
    pub name: String,
}

/// A nurse on a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nurse {
    pub id: NurseId,
    pub team: StaffTeamId,
    /// Staff badge number, distinct from the record id.
    pub nurse_id: String,
    pub name: String,
}

impl Nurse {
    /// Create a validated nurse record.
    pub fn new(
        team: StaffTeamId,
        badge: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: NurseId::new(),
            team,
            nurse_id: require_text("nurse_id", badge, SERIAL_MAX)?,
            name: require_text("name", name, NAME_MAX)?,
        })
    }
}

/// A supervisor, linked one-to-one with a login account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supervisor {
    pub id: SupervisorId,
    pub user: UserId,
    pub team: StaffTeamId,
    pub name: String,
}

/// Assignment of a team to a ward on a floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamAssignment {
    pub id: TeamAssignmentId,
    pub ward: WardId,
    pub floor: FloorId,
    pub team: StaffTeamId,
}

/// A login account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    /// Unique across accounts.
    pub email: String,
    pub role: Role,
}

// ─── Calls ───────────────────────────────────────────────────────────

/// A call raised from a bedside device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub id: CallId,
    pub device: DeviceId,
    pub bed: BedId,
    pub call_time: Timestamp,
    pub status: CallStatus,
    #[serde(default)]
    pub response_time: Option<Timestamp>,
    /// Responding nurse. Cleared if the nurse record is deleted.
    #[serde(default)]
    pub nurse: Option<NurseId>,
}

// ─── Patient ─────────────────────────────────────────────────────────

/// A patient, optionally occupying one bed.
///
/// At most one patient may reference a given bed. The occupancy service
/// enforces that before any write reaches a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
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

impl Patient {
    /// Create a validated patient with no bed, nurse, or device.
    pub fn new(
        name: impl Into<String>,
        age: u32,
        gender: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            id: PatientId::new(),
            name: require_text("name", name, NAME_MAX)?,
            age,
            gender: require_text("gender", gender, GENDER_MAX)?,
            bed: None,
            nurse: None,
            device: None,
        })
    }

    /// Re-run field validation, e.g. after an in-place edit.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", self.name.as_str(), NAME_MAX)?;
        require_text("gender", self.gender.as_str(), GENDER_MAX)?;
        Ok(())
    }
}

/// Validate a bed label. Lives here so both the state crate and the
/// stores share one rule.
pub fn validate_bed_number(number: impl Into<String>) -> Result<String, ValidationError> {
    require_text("number", number, BED_NUMBER_MAX)
}
