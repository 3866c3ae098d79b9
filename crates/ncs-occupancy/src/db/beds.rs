//! Bed persistence operations.
//!
//! Writes take a `&mut PgConnection` so they run inside the caller's
//! transaction. Status updates are compare-and-set on `version`.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use ncs_core::{BedId, Timestamp, WardId};
use ncs_state::{Bed, BedStatus, BedTransitionRecord};

use crate::error::OccupancyError;

const BED_COLUMNS: &str = "id, number, ward_id, status, version";

/// Insert a newly registered bed and its transition log.
pub async fn insert(conn: &mut PgConnection, bed: &Bed) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO beds (id, number, ward_id, status, version)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(bed.id.as_uuid())
    .bind(&bed.number)
    .bind(bed.ward.as_uuid())
    .bind(bed.status.as_str())
    .bind(bed.version)
    .execute(&mut *conn)
    .await?;

    append_transitions(conn, bed.id, &bed.transitions).await
}

/// Write a bed's status and version if the stored version still equals
/// `expected_version`. Returns `false` when another writer got there first.
pub async fn update_status(
    conn: &mut PgConnection,
    bed: &Bed,
    expected_version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE beds SET status = $1, version = $2
         WHERE id = $3 AND version = $4",
    )
    .bind(bed.status.as_str())
    .bind(bed.version)
    .bind(bed.id.as_uuid())
    .bind(expected_version)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Append transition records for a bed.
pub async fn append_transitions(
    conn: &mut PgConnection,
    bed: BedId,
    records: &[BedTransitionRecord],
) -> Result<(), sqlx::Error> {
    for record in records {
        let cause = serde_json::to_value(&record.cause)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "INSERT INTO bed_transitions (bed_id, from_status, to_status, cause, occurred_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(bed.as_uuid())
        .bind(record.from.as_str())
        .bind(record.to.as_str())
        .bind(cause)
        .bind(record.timestamp.as_datetime())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Lock beds for the rest of the transaction. Rows are locked in id order.
/// History is not loaded.
pub async fn lock_many(conn: &mut PgConnection, ids: &[Uuid]) -> Result<Vec<Bed>, OccupancyError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, BedRow>(&format!(
        "SELECT {BED_COLUMNS} FROM beds WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids.to_vec())
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(BedRow::into_record).collect()
}

/// Fetch a bed with its full transition log.
pub async fn get_by_id(pool: &PgPool, id: BedId) -> Result<Option<Bed>, OccupancyError> {
    let row = sqlx::query_as::<_, BedRow>(&format!("SELECT {BED_COLUMNS} FROM beds WHERE id = $1"))
        .bind(id.as_uuid())
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let mut bed = row.into_record()?;
    bed.transitions = history(pool, id).await?;
    Ok(Some(bed))
}

/// Load all beds, without history, ordered by label.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Bed>, OccupancyError> {
    let rows = sqlx::query_as::<_, BedRow>(&format!(
        "SELECT {BED_COLUMNS} FROM beds ORDER BY number, id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(BedRow::into_record).collect()
}

/// Transition log of a bed, oldest first.
pub async fn history(pool: &PgPool, id: BedId) -> Result<Vec<BedTransitionRecord>, OccupancyError> {
    let rows = sqlx::query_as::<_, TransitionRow>(
        "SELECT from_status, to_status, cause, occurred_at
         FROM bed_transitions WHERE bed_id = $1 ORDER BY id",
    )
    .bind(id.as_uuid())
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(TransitionRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct BedRow {
    id: Uuid,
    number: String,
    ward_id: Uuid,
    status: String,
    version: i64,
}

impl BedRow {
    fn into_record(self) -> Result<Bed, OccupancyError> {
        Ok(Bed {
            id: BedId::from_uuid(self.id),
            number: self.number,
            ward: WardId::from_uuid(self.ward_id),
            status: BedStatus::parse(&self.status)?,
            version: self.version,
            transitions: Vec::new(),
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransitionRow {
    from_status: String,
    to_status: String,
    cause: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl TransitionRow {
    fn into_record(self) -> Result<BedTransitionRecord, OccupancyError> {
        Ok(BedTransitionRecord {
            from: BedStatus::parse(&self.from_status)?,
            to: BedStatus::parse(&self.to_status)?,
            timestamp: Timestamp::from_utc(self.occurred_at),
            cause: serde_json::from_value(self.cause)
                .map_err(|e| OccupancyError::Storage(format!("bad transition cause: {e}")))?,
        })
    }
}
