//! # Database Persistence Layer
//!
//! PostgreSQL backend for beds and patients via SQLx.
//!
//! ## Transactions
//!
//! Each unit of work is one SQL transaction:
//!
//! 1. lock the patient row (if any) and every bed involved, `FOR UPDATE`,
//!    in id order;
//! 2. read which patients reference those beds;
//! 3. run the unit of work against the locked rows;
//! 4. write patients, and write beds with a compare-and-set on `version`;
//! 5. commit.
//!
//! A lost compare-and-set, a serialization failure, a deadlock, or a unique
//! violation on `patients.bed_id` is reported as
//! [`OccupancyError::BedUpdateConflict`]. The service re-runs the unit of
//! work once, which re-reads the winner's changes and then fails with the
//! precise error (e.g. `BedAlreadyAssigned`) if it still cannot proceed.
//!
//! The database layer is optional. Without `DATABASE_URL`, callers use the
//! in-memory store.

pub mod beds;
pub mod patients;
pub mod service;

use std::collections::HashMap;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::PgConnection;
use uuid::Uuid;

use ncs_core::{BedId, Patient, PatientId};
use ncs_state::Bed;

use crate::error::OccupancyError;
use crate::unit::{Changeset, RecordSource, WorkingSet};

pub use service::PgPatientService;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; running in-memory only");
            return Ok(None);
        }
    };
    connect(&url).await.map(Some)
}

/// Connect to `url` and apply embedded migrations.
pub async fn connect(url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

// ─── Load plan ───────────────────────────────────────────────────────

/// Rows a unit of work needs locked before it runs.
///
/// The locked patient's current bed is added automatically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadPlan {
    pub patient: Option<PatientId>,
    pub beds: Vec<BedId>,
}

impl LoadPlan {
    pub fn for_patient(id: PatientId) -> Self {
        Self {
            patient: Some(id),
            beds: Vec::new(),
        }
    }

    pub fn for_beds(beds: impl IntoIterator<Item = BedId>) -> Self {
        Self {
            patient: None,
            beds: beds.into_iter().collect(),
        }
    }

    pub fn with_bed(mut self, bed: Option<BedId>) -> Self {
        self.beds.extend(bed);
        self
    }

    /// Bed named in conflict errors raised outside a specific bed write.
    fn conflict_bed(&self) -> BedId {
        self.beds
            .first()
            .copied()
            .unwrap_or_else(|| BedId::from_uuid(Uuid::nil()))
    }
}

/// Rows locked for one transaction.
#[derive(Debug, Default)]
struct Locked {
    beds: HashMap<BedId, Bed>,
    patients: HashMap<PatientId, Patient>,
    holders: HashMap<BedId, Vec<PatientId>>,
}

impl RecordSource for Locked {
    fn bed(&self, id: BedId) -> Option<Bed> {
        self.beds.get(&id).cloned()
    }

    fn patient(&self, id: PatientId) -> Option<Patient> {
        self.patients.get(&id).cloned()
    }

    fn patients_on_bed(&self, bed: BedId) -> Vec<PatientId> {
        self.holders.get(&bed).cloned().unwrap_or_default()
    }
}

// ─── Store ───────────────────────────────────────────────────────────

/// PostgreSQL-backed occupancy store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `work` in one transaction over the rows named by `plan`.
    pub async fn transact<R, F>(&self, plan: &LoadPlan, work: F) -> Result<R, OccupancyError>
    where
        F: FnOnce(&mut WorkingSet<'_>) -> Result<R, OccupancyError>,
    {
        self.run(plan, work)
            .await
            .map_err(|e| classify(e, plan.conflict_bed()))
    }

    async fn run<R, F>(&self, plan: &LoadPlan, work: F) -> Result<R, OccupancyError>
    where
        F: FnOnce(&mut WorkingSet<'_>) -> Result<R, OccupancyError>,
    {
        let mut tx = self.pool.begin().await?;
        let mut locked = Locked::default();
        let mut bed_ids: Vec<Uuid> = plan.beds.iter().map(|b| *b.as_uuid()).collect();

        if let Some(id) = plan.patient {
            if let Some(patient) = patients::lock(&mut tx, id).await? {
                bed_ids.extend(patient.bed.map(|b| *b.as_uuid()));
                locked.patients.insert(id, patient);
            }
        }
        bed_ids.sort();
        bed_ids.dedup();

        for bed in beds::lock_many(&mut tx, &bed_ids).await? {
            locked.beds.insert(bed.id, bed);
        }
        for (patient, bed) in patients::holders(&mut tx, &bed_ids).await? {
            locked.holders.entry(bed).or_default().push(patient);
        }

        let (result, changes) = {
            let mut ws = WorkingSet::new(&locked);
            let result = work(&mut ws)?;
            (result, ws.into_changeset())
        };

        write_changeset(&mut tx, changes).await?;
        tx.commit().await?;
        Ok(result)
    }

    pub async fn bed(&self, id: BedId) -> Result<Option<Bed>, OccupancyError> {
        beds::get_by_id(&self.pool, id).await
    }

    pub async fn patient(&self, id: PatientId) -> Result<Option<Patient>, OccupancyError> {
        patients::get_by_id(&self.pool, id).await
    }

    pub async fn beds(&self) -> Result<Vec<Bed>, OccupancyError> {
        beds::load_all(&self.pool).await
    }

    pub async fn patients(&self) -> Result<Vec<Patient>, OccupancyError> {
        patients::load_all(&self.pool).await
    }
}

async fn write_changeset(conn: &mut PgConnection, changes: Changeset) -> Result<(), OccupancyError> {
    for staged in &changes.beds {
        let bed = &staged.bed;
        match staged.expected_version {
            None => beds::insert(conn, bed).await?,
            Some(expected) => {
                if !beds::update_status(conn, bed, expected).await? {
                    return Err(OccupancyError::BedUpdateConflict { bed: bed.id });
                }
                beds::append_transitions(conn, bed.id, staged.new_transitions()).await?;
            }
        }
    }
    for id in &changes.deleted_patients {
        patients::delete(conn, *id).await?;
    }
    for patient in &changes.saved_patients {
        patients::upsert(conn, patient).await.map_err(|e| match patient.bed {
            Some(bed) => classify(e.into(), bed),
            None => e.into(),
        })?;
    }
    Ok(())
}

/// Postgres error codes that mean "another transaction won".
///
/// `40001` serialization failure, `40P01` deadlock, `23505` unique
/// violation (two patients racing for one bed).
pub fn is_conflict_code(code: &str) -> bool {
    matches!(code, "40001" | "40P01" | "23505")
}

fn classify(err: OccupancyError, bed: BedId) -> OccupancyError {
    match err {
        OccupancyError::Database(sqlx::Error::Database(db))
            if db.code().as_deref().is_some_and(is_conflict_code) =>
        {
            tracing::debug!(bed = %bed, code = ?db.code(), "database conflict");
            OccupancyError::BedUpdateConflict { bed }
        }
        other => other,
    }
}
