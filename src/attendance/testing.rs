//! In-memory `AttendanceStore` used as the test double for the state
//! machine and query projections. Mirrors the MySQL implementation's
//! semantics: insert-if-absent on the unique key and conditional updates.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::attendance::store::{AttendanceStore, NewRecord, StoreError};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, RecordKey};

type MapKey = (u64, String, NaiveDate);

#[derive(Default)]
pub struct MemStore {
    rows: Mutex<HashMap<MapKey, AttendanceRecord>>,
    next_id: Mutex<u64>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    fn map_key(key: &RecordKey) -> MapKey {
        (key.employee_id, key.organization_uuid.clone(), key.date)
    }

    fn alloc_id(&self) -> u64 {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        *next
    }
}

impl AttendanceStore for MemStore {
    async fn find(&self, key: &RecordKey) -> Result<Option<AttendanceRecord>, StoreError> {
        Ok(self.rows.lock().unwrap().get(&Self::map_key(key)).cloned())
    }

    async fn insert_new(&self, rec: &NewRecord) -> Result<AttendanceRecord, StoreError> {
        let id = self.alloc_id();
        let mut rows = self.rows.lock().unwrap();
        let map_key = Self::map_key(&rec.key);
        if rows.contains_key(&map_key) {
            return Err(StoreError::Duplicate);
        }
        let row = AttendanceRecord {
            id,
            organization_uuid: rec.key.organization_uuid.clone(),
            employee_id: rec.key.employee_id,
            attendance_date: rec.key.date,
            check_in_time: rec.check_in_time,
            check_out_time: None,
            status: rec.status,
            verification_type: rec.verification_type,
            verification_confidence: rec.meta.verification_confidence.clone(),
            ip_address: rec.meta.ip_address.clone(),
            device_info: rec.meta.device_info.clone(),
            notes: rec.meta.notes.clone(),
            created_at: Utc::now().naive_utc(),
            updated_at: None,
        };
        rows.insert(map_key, row.clone());
        Ok(row)
    }

    async fn complete_check_out(
        &self,
        key: &RecordKey,
        at: NaiveDateTime,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&Self::map_key(key)) {
            Some(row) if row.check_in_time.is_some() && row.check_out_time.is_none() => {
                row.check_out_time = Some(at);
                row.updated_at = Some(Utc::now().naive_utc());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_status(
        &self,
        key: &RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    ) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&Self::map_key(key)) {
            Some(row) if row.check_out_time.is_none() => {
                row.status = status;
                if status.is_non_working() {
                    row.check_in_time = None;
                } else if let Some(at) = check_in_time {
                    row.check_in_time = Some(at);
                }
                row.updated_at = Some(Utc::now().naive_utc());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn roster(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| r.organization_uuid == organization_uuid && r.attendance_date == date)
            .cloned()
            .collect();
        // newest check-in first, rows without one last
        out.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));
        Ok(out)
    }

    async fn pending_checkouts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| {
                r.organization_uuid == organization_uuid
                    && r.attendance_date == date
                    && r.check_in_time.is_some()
                    && r.check_out_time.is_none()
                    && !r.status.is_non_working()
            })
            .cloned()
            .collect();
        out.sort_by_key(|r| r.check_in_time);
        Ok(out)
    }

    async fn history(
        &self,
        employee_id: u64,
        organization_uuid: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut out: Vec<_> = rows
            .values()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.organization_uuid == organization_uuid
                    && r.attendance_date >= start
                    && r.attendance_date <= end
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.attendance_date.cmp(&a.attendance_date));
        Ok(out)
    }

    async fn status_counts(
        &self,
        organization_uuid: &str,
        date: NaiveDate,
    ) -> Result<Vec<(AttendanceStatus, i64)>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut counts: HashMap<AttendanceStatus, i64> = HashMap::new();
        for r in rows.values() {
            if r.organization_uuid == organization_uuid && r.attendance_date == date {
                *counts.entry(r.status).or_insert(0) += 1;
            }
        }
        Ok(counts.into_iter().collect())
    }
}
