//! Patient persistence operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use ncs_core::{BedId, DeviceId, NurseId, Patient, PatientId};

use crate::error::OccupancyError;

const PATIENT_COLUMNS: &str = "id, name, age, gender, bed_id, nurse_id, device_id";

/// Insert or replace a patient row.
pub async fn upsert(conn: &mut PgConnection, patient: &Patient) -> Result<(), sqlx::Error> {
    let age = i32::try_from(patient.age).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO patients (id, name, age, gender, bed_id, nurse_id, device_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (id) DO UPDATE SET
            name = EXCLUDED.name,
            age = EXCLUDED.age,
            gender = EXCLUDED.gender,
            bed_id = EXCLUDED.bed_id,
            nurse_id = EXCLUDED.nurse_id,
            device_id = EXCLUDED.device_id",
    )
    .bind(patient.id.as_uuid())
    .bind(&patient.name)
    .bind(age)
    .bind(&patient.gender)
    .bind(patient.bed.map(|b| *b.as_uuid()))
    .bind(patient.nurse.map(|n| *n.as_uuid()))
    .bind(patient.device.map(|d| *d.as_uuid()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Delete a patient row. Returns whether a row was removed.
pub async fn delete(conn: &mut PgConnection, id: PatientId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM patients WHERE id = $1")
        .bind(id.as_uuid())
        .execute(conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Fetch and lock a patient row for the rest of the transaction.
pub async fn lock(conn: &mut PgConnection, id: PatientId) -> Result<Option<Patient>, OccupancyError> {
    let row = sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(conn)
    .await?;

    row.map(PatientRow::into_record).transpose()
}

/// Patients referencing any of the given beds, as `(patient, bed)` pairs.
pub async fn holders(
    conn: &mut PgConnection,
    beds: &[Uuid],
) -> Result<Vec<(PatientId, BedId)>, sqlx::Error> {
    if beds.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT id, bed_id FROM patients WHERE bed_id = ANY($1) ORDER BY id",
    )
    .bind(beds.to_vec())
    .fetch_all(conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(p, b)| (PatientId::from_uuid(p), BedId::from_uuid(b)))
        .collect())
}

/// Fetch a patient by ID.
pub async fn get_by_id(pool: &PgPool, id: PatientId) -> Result<Option<Patient>, OccupancyError> {
    let row = sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1"
    ))
    .bind(id.as_uuid())
    .fetch_optional(pool)
    .await?;

    row.map(PatientRow::into_record).transpose()
}

/// Load all patients ordered by name.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Patient>, OccupancyError> {
    let rows = sqlx::query_as::<_, PatientRow>(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY name, id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(PatientRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PatientRow {
    id: Uuid,
    name: String,
    age: i32,
    gender: String,
    bed_id: Option<Uuid>,
    nurse_id: Option<Uuid>,
    device_id: Option<Uuid>,
}

impl PatientRow {
    fn into_record(self) -> Result<Patient, OccupancyError> {
        let age = u32::try_from(self.age)
            .map_err(|_| OccupancyError::Storage(format!("negative age for patient {}", self.id)))?;
        Ok(Patient {
            id: PatientId::from_uuid(self.id),
            name: self.name,
            age,
            gender: self.gender,
            bed: self.bed_id.map(BedId::from_uuid),
            nurse: self.nurse_id.map(NurseId::from_uuid),
            device: self.device_id.map(DeviceId::from_uuid),
        })
    }
}
