//! # ncs-core — Foundational Types for the Nurse-Call System
//!
//! Every other crate in the workspace depends on `ncs-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `BedId`, `PatientId`, `NurseId`,
//!    `WardId` and the rest are distinct types over UUIDs. An occupancy call
//!    cannot confuse a patient with the bed it occupies.
//!
//! 2. **Plain records.** The entity store records (`Hospital` through
//!    `Call`) are data only. Behavior lives in `ncs-state` (bed status) and
//!    `ncs-occupancy` (the reactor).
//!
//! 3. **Stored vocabularies are enums.** `BuildingType`, `Role`, and
//!    `CallStatus` spell their variants exactly as the stored columns do.
//!
//! 4. **UTC-only timestamps**, truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ncs-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod domain;
pub mod error;
pub mod identity;
pub mod records;
pub mod temporal;

pub use domain::{BuildingType, CallStatus, Role};
pub use error::ValidationError;
pub use identity::{
    BedId, BuildingId, CallId, DeviceId, FloorId, HospitalId, NurseId, PatientId, StaffTeamId,
    SupervisorId, TeamAssignmentId, UserId, WardId,
};
pub use records::{
    Building, Call, Device, Floor, Hospital, Nurse, Patient, StaffTeam, Supervisor,
    TeamAssignment, User, Ward,
};
pub use temporal::Timestamp;
