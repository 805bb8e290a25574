use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use utoipa::ToSchema;

use crate::attendance::error::AttendanceError;
use crate::attendance::store::{AttendanceStore, StoreError};
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DayState, RecordKey,
};

/// Read-only projections over the attendance store. Nothing in here
/// mutates state or consults the state machine.

#[derive(Debug, Serialize, ToSchema)]
pub struct TodayStatus {
    pub state: DayState,
    pub status: Option<AttendanceStatus>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub verification_type: Option<String>,
    #[schema(example = "7 hrs 55 mins")]
    pub working_hours: Option<String>,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct DailySummary {
    pub present: i64,
    pub late: i64,
    pub half_day: i64,
    pub absent: i64,
    pub on_leave: i64,
}

/// "7 hrs 55 mins" style duration between check-in and check-out.
pub fn working_hours(check_in: NaiveDateTime, check_out: NaiveDateTime) -> String {
    let minutes = (check_out - check_in).num_minutes().max(0);
    format!("{} hrs {} mins", minutes / 60, minutes % 60)
}

pub async fn today_status<S: AttendanceStore>(
    store: &S,
    key: &RecordKey,
) -> Result<TodayStatus, AttendanceError> {
    let record = store.find(key).await.map_err(store_err)?;
    Ok(match record {
        None => TodayStatus {
            state: DayState::NotMarked,
            status: None,
            check_in_time: None,
            check_out_time: None,
        },
        Some(r) => TodayStatus {
            state: r.day_state(),
            status: Some(r.status),
            check_in_time: r.check_in_time,
            check_out_time: r.check_out_time,
        },
    })
}

pub async fn roster<S: AttendanceStore>(
    store: &S,
    organization_uuid: &str,
    date: NaiveDate,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    store.roster(organization_uuid, date).await.map_err(store_err)
}

pub async fn pending_checkouts<S: AttendanceStore>(
    store: &S,
    organization_uuid: &str,
    date: NaiveDate,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    store
        .pending_checkouts(organization_uuid, date)
        .await
        .map_err(store_err)
}

pub async fn history<S: AttendanceStore>(
    store: &S,
    employee_id: u64,
    organization_uuid: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<HistoryEntry>, AttendanceError> {
    if start > end {
        return Err(AttendanceError::Validation(
            "start_date must not be after end_date",
        ));
    }
    let records = store
        .history(employee_id, organization_uuid, start, end)
        .await
        .map_err(store_err)?;

    Ok(records
        .into_iter()
        .map(|r| HistoryEntry {
            id: r.id,
            date: r.attendance_date,
            working_hours: match (r.check_in_time, r.check_out_time) {
                (Some(ci), Some(co)) => Some(working_hours(ci, co)),
                _ => None,
            },
            check_in_time: r.check_in_time,
            check_out_time: r.check_out_time,
            status: r.status,
            verification_type: r.verification_type.map(|v| v.to_string()),
        })
        .collect())
}

pub async fn daily_summary<S: AttendanceStore>(
    store: &S,
    organization_uuid: &str,
    date: NaiveDate,
) -> Result<DailySummary, AttendanceError> {
    let counts = store
        .status_counts(organization_uuid, date)
        .await
        .map_err(store_err)?;

    let mut summary = DailySummary::default();
    for (status, count) in counts {
        match status {
            AttendanceStatus::Present => summary.present = count,
            AttendanceStatus::Late => summary.late = count,
            AttendanceStatus::HalfDay => summary.half_day = count,
            AttendanceStatus::Absent => summary.absent = count,
            AttendanceStatus::OnLeave => summary.on_leave = count,
        }
    }
    Ok(summary)
}

fn store_err(e: StoreError) -> AttendanceError {
    match e {
        StoreError::Duplicate => AttendanceError::Internal("unexpected duplicate".into()),
        StoreError::Database(e) => AttendanceError::Internal(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::command::CheckInMeta;
    use crate::attendance::store::NewRecord;
    use crate::attendance::testing::MemStore;
    use crate::model::attendance::VerificationType;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn key(employee_id: u64) -> RecordKey {
        RecordKey::new(employee_id, "org-1", day())
    }

    async fn seed_check_in(store: &MemStore, employee_id: u64, h: u32, m: u32) {
        store
            .insert_new(&NewRecord {
                key: key(employee_id),
                check_in_time: Some(day().and_hms_opt(h, m, 0).unwrap()),
                status: AttendanceStatus::Present,
                verification_type: Some(VerificationType::FaceRecognition),
                meta: CheckInMeta::default(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn working_hours_formats_hours_and_minutes() {
        let ci = day().and_hms_opt(9, 10, 0).unwrap();
        let co = day().and_hms_opt(17, 5, 0).unwrap();
        assert_eq!(working_hours(ci, co), "7 hrs 55 mins");

        let short = day().and_hms_opt(9, 40, 0).unwrap();
        assert_eq!(working_hours(ci, short), "0 hrs 30 mins");
    }

    #[actix_web::test]
    async fn today_status_for_unmarked_employee() {
        let store = MemStore::new();
        let status = today_status(&store, &key(1)).await.unwrap();
        assert_eq!(status.state, DayState::NotMarked);
        assert_eq!(status.status, None);
    }

    #[actix_web::test]
    async fn pending_checkouts_are_ordered_oldest_check_in_first() {
        let store = MemStore::new();
        seed_check_in(&store, 2, 9, 30).await;
        seed_check_in(&store, 1, 8, 45).await;
        seed_check_in(&store, 3, 10, 0).await;
        // employee 3 already left
        store
            .complete_check_out(&key(3), day().and_hms_opt(16, 0, 0).unwrap())
            .await
            .unwrap();
        // on-leave shell never shows up as pending
        store
            .insert_new(&NewRecord {
                key: key(4),
                check_in_time: None,
                status: AttendanceStatus::OnLeave,
                verification_type: Some(VerificationType::Manual),
                meta: CheckInMeta::default(),
            })
            .await
            .unwrap();

        let pending = pending_checkouts(&store, "org-1", day()).await.unwrap();
        let ids: Vec<u64> = pending.iter().map(|r| r.employee_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[actix_web::test]
    async fn roster_is_ordered_newest_check_in_first() {
        let store = MemStore::new();
        seed_check_in(&store, 1, 8, 45).await;
        seed_check_in(&store, 2, 9, 30).await;

        let rows = roster(&store, "org-1", day()).await.unwrap();
        let ids: Vec<u64> = rows.iter().map(|r| r.employee_id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[actix_web::test]
    async fn history_computes_working_hours_and_rejects_bad_range() {
        let store = MemStore::new();
        seed_check_in(&store, 42, 9, 10).await;
        store
            .complete_check_out(&key(42), day().and_hms_opt(17, 5, 0).unwrap())
            .await
            .unwrap();

        let entries = history(&store, 42, "org-1", day(), day()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].working_hours.as_deref(), Some("7 hrs 55 mins"));

        let err = history(&store, 42, "org-1", day(), day().pred_opt().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(_)));
    }

    #[actix_web::test]
    async fn daily_summary_counts_by_status() {
        let store = MemStore::new();
        seed_check_in(&store, 1, 8, 45).await;
        seed_check_in(&store, 2, 9, 0).await;
        store
            .insert_new(&NewRecord {
                key: key(3),
                check_in_time: None,
                status: AttendanceStatus::OnLeave,
                verification_type: Some(VerificationType::Manual),
                meta: CheckInMeta::default(),
            })
            .await
            .unwrap();

        let summary = daily_summary(&store, "org-1", day()).await.unwrap();
        assert_eq!(summary.present, 2);
        assert_eq!(summary.on_leave, 1);
        assert_eq!(summary.late, 0);
    }
}
