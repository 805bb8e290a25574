use chrono::{NaiveDate, NaiveDateTime};
use derive_more::Display;
use sqlx::MySqlPool;
use std::str::FromStr;

use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, RecordKey, VerificationType,
};
use crate::attendance::command::CheckInMeta;

/// Row contents for an insert-if-absent; the store assigns id/created_at.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub key: RecordKey,
    pub check_in_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub verification_type: Option<VerificationType>,
    pub meta: CheckInMeta,
}

#[derive(Debug, Display)]
pub enum StoreError {
    /// Unique-key violation on (employee_id, organization_uuid, date).
    /// This is the authoritative duplicate signal under concurrency.
    #[display(fmt = "duplicate attendance row")]
    Duplicate,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

/// Durable storage for attendance rows, keyed uniquely by
/// (employee_id, organization_uuid, attendance_date).
///
/// Mutations are atomic: `insert_new` is insert-if-absent, and the two
/// update methods are single conditional statements that only succeed if
/// the expected prior state still holds. The state machine relies on this
/// instead of read-then-write.
pub trait AttendanceStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Insert a brand-new row; `StoreError::Duplicate` if the day already
    /// has one.
    async fn insert_new(&self, rec: &NewRecord) -> Result<AttendanceRecord, StoreError>;

    /// Set check-out, only if check-in is set and check-out is still null.
    /// Returns whether a row was updated.
    async fn complete_check_out(
        &self,
        key: &RecordKey,
        at: NaiveDateTime,
    ) -> Result<bool, StoreError>;

    /// Overwrite status (and optionally check-in time), only while the row
    /// has no check-out. Non-working statuses clear the check-in time so a
    /// row never carries both. Returns whether a row was updated.
    async fn apply_status(
        &self,
        key: &RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError>;

    /// All rows for an organization on a date, newest check-in first.
    async fn roster(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Checked-in-but-not-out rows, oldest check-in first.
    async fn pending_checkouts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// One employee's rows in a date range, newest date first.
    async fn history(
        &self,
        employee_id: u64,
        organization_uuid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;

    /// Per-status row counts for an organization and date.
    async fn status_counts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<(AttendanceStatus, i64)>, StoreError>;
}

// -------------------- MySQL implementation --------------------

#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

const SELECT_COLUMNS: &str = "id, organization_uuid, employee_id, attendance_date, \
     check_in_time, check_out_time, status, verification_type, \
     verification_confidence, ip_address, device_info, notes, created_at, updated_at";

impl AttendanceStore for MySqlAttendanceStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND organization_uuid = ? AND attendance_date = ?"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(key.employee_id)
            .bind(&key.organization_uuid)
            .bind(key.date)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn insert_new(&self, rec: &NewRecord) -> Result<AttendanceRecord, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
            (organization_uuid, employee_id, attendance_date, check_in_time, status,
             verification_type, verification_confidence, ip_address, device_info, notes,
             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NOW(), NOW())
            "#,
        )
        .bind(&rec.key.organization_uuid)
        .bind(rec.key.employee_id)
        .bind(rec.key.date)
        .bind(rec.check_in_time)
        .bind(rec.status)
        .bind(rec.verification_type)
        .bind(&rec.meta.verification_confidence)
        .bind(&rec.meta.ip_address)
        .bind(&rec.meta.device_info)
        .bind(&rec.meta.notes)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => self
                .find(&rec.key)
                .await?
                .ok_or_else(|| {
                    StoreError::Database(sqlx::Error::RowNotFound)
                }),
            Err(e) => {
                // Losing concurrent insert surfaces as the unique-key error
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Err(StoreError::Duplicate);
                    }
                }
                Err(StoreError::Database(e))
            }
        }
    }

    async fn complete_check_out(
        &self,
        key: &RecordKey,
        at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = ?, updated_at = NOW()
            WHERE employee_id = ? AND organization_uuid = ? AND attendance_date = ?
              AND check_in_time IS NOT NULL
              AND check_out_time IS NULL
            "#,
        )
        .bind(at)
        .bind(key.employee_id)
        .bind(&key.organization_uuid)
        .bind(key.date)
        .execute(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        Ok(result.rows_affected() > 0)
    }

    async fn apply_status(
        &self,
        key: &RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError> {
        // Non-working statuses clear check_in_time; otherwise a supplied
        // time overwrites and None keeps the existing value.
        let result = if status.is_non_working() {
            sqlx::query(
                r#"
                UPDATE attendance
                SET status = ?, check_in_time = NULL, updated_at = NOW()
                WHERE employee_id = ? AND organization_uuid = ? AND attendance_date = ?
                  AND check_out_time IS NULL
                "#,
            )
            .bind(status)
            .bind(key.employee_id)
            .bind(&key.organization_uuid)
            .bind(key.date)
            .execute(&self.pool)
            .await
        } else {
            sqlx::query(
                r#"
                UPDATE attendance
                SET status = ?, check_in_time = COALESCE(?, check_in_time), updated_at = NOW()
                WHERE employee_id = ? AND organization_uuid = ? AND attendance_date = ?
                  AND check_out_time IS NULL
                "#,
            )
            .bind(status)
            .bind(check_in_time)
            .bind(key.employee_id)
            .bind(&key.organization_uuid)
            .bind(key.date)
            .execute(&self.pool)
            .await
        };

        Ok(result.map_err(StoreError::Database)?.rows_affected() > 0)
    }

    async fn roster(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE organization_uuid = ? AND attendance_date = ? \
             ORDER BY check_in_time DESC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(organization_uuid)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn pending_checkouts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE organization_uuid = ? AND attendance_date = ? \
               AND check_in_time IS NOT NULL AND check_out_time IS NULL \
               AND status NOT IN ('ABSENT', 'ON_LEAVE') \
             ORDER BY check_in_time ASC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(organization_uuid)
            .bind(date)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn history(
        &self,
        employee_id: u64,
        organization_uuid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM attendance \
             WHERE employee_id = ? AND organization_uuid = ? \
               AND attendance_date BETWEEN ? AND ? \
             ORDER BY attendance_date DESC"
        );
        sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(employee_id)
            .bind(organization_uuid)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)
    }

    async fn status_counts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<(AttendanceStatus, i64)>, StoreError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*) FROM attendance
            WHERE organization_uuid = ? AND attendance_date = ?
            GROUP BY status
            "#,
        )
        .bind(organization_uuid)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::Database)?;

        let mut counts = Vec::with_capacity(rows.len());
        for (status, count) in rows {
            match AttendanceStatus::from_str(&status) {
                Ok(s) => counts.push((s, count)),
                Err(_) => tracing::warn!(status, "skipping unknown status in counts"),
            }
        }
        Ok(counts)
    }
}
