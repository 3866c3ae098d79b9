//! # ncs-state — Bed Status State Machine
//!
//! A bed's status is the one piece of the nurse-call model with real
//! transition semantics. This crate owns it.
//!
//! ## Design
//!
//! `BedStatus` is a runtime enum read back from storage as a string. Each
//! transition on [`Bed`] validates the current status and returns `Result`.
//!
//! Reactor transitions (`occupy`, `release`) refuse beds in maintenance.
//! Only the admin transitions (`begin_maintenance`, `end_maintenance`) and
//! `overwrite_status` move a bed into or out of maintenance.

pub mod bed;

pub use bed::{Bed, BedError, BedStatus, BedTransitionRecord, TransitionCause};
