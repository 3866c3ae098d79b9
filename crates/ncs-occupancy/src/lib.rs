//! # ncs-occupancy — Bed Occupancy Consistency
//!
//! Keeps every bed's status in step with the patients that reference it.
//!
//! ## Architecture
//!
//! ```text
//!   PatientService / PgPatientService
//!            │  one unit of work per call
//!            ▼
//!   OccupancyStore::transact ──▶ WorkingSet ◀── OccupancyReactor
//!   (MemoryStore | PgStore)        staged patient + bed writes
//!            │
//!            ▼
//!        Changeset  ──commit (version compare-and-set)──▶ storage
//! ```
//!
//! - [`reactor`]: the occupancy rules, written against a [`BedLedger`].
//! - [`mutation`]: create / update / delete and bed administration as
//!   functions over a [`WorkingSet`].
//! - [`service`]: [`PatientService`], the synchronous entry point.
//! - [`store`]: the [`OccupancyStore`] seam and the in-memory backend.
//! - [`db`]: the PostgreSQL backend.
//! - [`audit`]: drift detection and repair.
//!
//! ## Invariant
//!
//! After any create, update or delete completes, every bed that is not in
//! maintenance is `occupied` exactly when a patient references it. Beds in
//! maintenance change only through admin tooling (under the default
//! [`MaintenancePolicy::Shield`]).

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod mutation;
pub mod reactor;
pub mod retry;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod unit;

pub use audit::{reconcile, AuditReport, Discrepancy, Repair};
pub use config::{ConfigError, MaintenancePolicy, OccupancyConfig, ReassignmentPolicy};
pub use db::{PgPatientService, PgStore};
pub use error::OccupancyError;
pub use mutation::{BedChange, NewPatient, PatientMutation, PatientUpdate, ReferenceChange};
pub use reactor::{BedLedger, OccupancyEvent, OccupancyReactor};
pub use service::PatientService;
pub use snapshot::{OccupancySnapshot, HISTORY_LIMIT};
pub use store::{MemoryStore, OccupancyStore};
pub use unit::{Changeset, RecordSource, WorkingSet};
