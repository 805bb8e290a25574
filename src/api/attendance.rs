use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::attendance::command::{AttendanceCommand, CheckInMeta};
use crate::attendance::error::AttendanceError;
use crate::attendance::machine::AttendanceMachine;
use crate::attendance::query;
use crate::attendance::store::{AttendanceStore, MySqlAttendanceStore};
use crate::config::Config;
use crate::model::attendance::{
    AttendanceRecord, AttendanceStatus, DayState, RecordKey, VerificationType,
};
use crate::model::employee::EmployeeRef;
use crate::utils::directory_cache;

// -------------------- DTOs --------------------

/// Kiosk face-recognition payload; the AI service has already matched the
/// face, this carries the verdict.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MarkAttendanceRequest {
    pub employee_id: u64,
    pub organization_uuid: String,
    #[schema(example = "0.97")]
    pub verification_confidence: Option<String>,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub success: bool,
    pub message: String,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub attendance_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    /// CHECK_IN / CHECK_OUT / ALREADY_COMPLETED
    #[schema(example = "CHECK_IN")]
    pub action: &'static str,
    pub is_check_in: bool,
}

impl MarkAttendanceResponse {
    pub(crate) fn from_record(
        record: &AttendanceRecord,
        action: &'static str,
        message: String,
    ) -> Self {
        Self {
            success: true,
            message,
            employee_id: record.employee_id,
            attendance_date: record.attendance_date,
            check_in_time: record.check_in_time,
            check_out_time: record.check_out_time,
            status: record.status,
            action,
            is_check_in: action == "CHECK_IN",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ManualMarkRequest {
    pub organization_uuid: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub organization_uuid: String,
    pub status: AttendanceStatus,
    /// Optional: HR may set the check-in time manually (never for
    /// ABSENT/ON_LEAVE).
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct OrgQuery {
    pub organization_uuid: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterQuery {
    pub organization_uuid: String,
    #[schema(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub organization_uuid: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RosterRow {
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_code: Option<String>,
    pub department: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    #[schema(example = "7 hrs 55 mins")]
    pub working_hours: Option<String>,
    pub is_complete: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnmarkedEmployee {
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_code: Option<String>,
    pub department: Option<String>,
}

// -------------------- shared helpers --------------------

pub(crate) async fn resolve_active_employee(
    pool: &MySqlPool,
    employee_id: u64,
    organization_uuid: &str,
) -> Result<EmployeeRef, AttendanceError> {
    let org_ok = directory_cache::organization_accepts_writes(pool, organization_uuid)
        .await
        .map_err(internal)?;
    if !org_ok {
        return Err(AttendanceError::NotFound);
    }
    directory_cache::find_active_employee(pool, employee_id, organization_uuid)
        .await
        .map_err(internal)?
        .ok_or(AttendanceError::NotFound)
}

pub(crate) fn internal(e: sqlx::Error) -> AttendanceError {
    AttendanceError::Internal(e.to_string())
}

async fn roster_row(
    pool: &MySqlPool,
    record: &AttendanceRecord,
) -> Result<RosterRow, AttendanceError> {
    let display =
        directory_cache::employee_display(pool, record.employee_id, &record.organization_uuid)
            .await
            .map_err(internal)?;

    let (employee_name, employee_code, department) = match display {
        Some(emp) => (emp.full_name(), emp.employee_code.clone(), emp.department),
        None => ("Unknown".to_string(), None, None),
    };

    Ok(RosterRow {
        employee_id: record.employee_id,
        employee_name,
        employee_code,
        department,
        check_in_time: record.check_in_time,
        check_out_time: record.check_out_time,
        status: record.status,
        working_hours: match (record.check_in_time, record.check_out_time) {
            (Some(ci), Some(co)) => Some(query::working_hours(ci, co)),
            _ => None,
        },
        is_complete: record.is_complete(),
    })
}

async fn rows_for(
    pool: &MySqlPool,
    records: &[AttendanceRecord],
) -> Result<Vec<RosterRow>, AttendanceError> {
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        rows.push(roster_row(pool, record).await?);
    }
    Ok(rows)
}

// -------------------- write channel: face kiosk --------------------

/// Face-recognition channel: toggles between check-in and check-out based
/// on the day's current state. A completed day answers informationally
/// instead of failing.
#[utoipa::path(
    post,
    path = "/api/attendance/mark",
    request_body = MarkAttendanceRequest,
    responses(
        (status = 200, description = "Attendance marked", body = MarkAttendanceResponse),
        (status = 404, description = "Employee or organization not found"),
        (status = 409, description = "Transition refused"),
        (status = 422, description = "Invalid transition")
    ),
    tag = "Attendance"
)]
pub async fn mark_attendance(
    req: HttpRequest,
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    payload: web::Json<MarkAttendanceRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let payload = payload.into_inner();
    let employee =
        resolve_active_employee(store.pool(), payload.employee_id, &payload.organization_uuid)
            .await?;

    let now = config.local_now();
    let key = RecordKey::new(payload.employee_id, payload.organization_uuid.clone(), now.date());
    let machine = AttendanceMachine::new(store.get_ref(), config.classifier());

    let existing = store
        .find(&key)
        .await
        .map_err(|e| AttendanceError::Internal(e.to_string()))?;

    let response = match existing {
        Some(record) if record.is_complete() => MarkAttendanceResponse::from_record(
            &record,
            "ALREADY_COMPLETED",
            format!(
                "{} has already completed attendance for today",
                employee.full_name()
            ),
        ),
        Some(ref record) if record.day_state() == DayState::CheckedIn => {
            let record = machine
                .execute(AttendanceCommand::CheckOut { key, at: now })
                .await?;
            info!(employee_id = record.employee_id, "face check-out");
            MarkAttendanceResponse::from_record(
                &record,
                "CHECK_OUT",
                format!("Goodbye {}, checked out successfully", employee.full_name()),
            )
        }
        // no record yet, or an ABSENT/ON_LEAVE shell the machine will veto
        _ => {
            let ip = payload
                .ip_address
                .or_else(|| req.connection_info().realip_remote_addr().map(String::from));
            let record = machine
                .execute(AttendanceCommand::CheckIn {
                    key,
                    at: now,
                    verification: VerificationType::FaceRecognition,
                    meta: CheckInMeta {
                        verification_confidence: payload.verification_confidence,
                        device_info: payload.device_info,
                        ip_address: ip,
                        notes: payload.notes,
                    },
                })
                .await?;
            info!(employee_id = record.employee_id, status = %record.status, "face check-in");
            MarkAttendanceResponse::from_record(
                &record,
                "CHECK_IN",
                format!("Welcome {}, checked in successfully", employee.full_name()),
            )
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

// -------------------- write channel: HR manual --------------------

/// Manual check-in for one employee (kiosk operator / HR).
#[utoipa::path(
    post,
    path = "/api/attendance/check-in/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = ManualMarkRequest,
    responses(
        (status = 200, description = "Checked in", body = MarkAttendanceResponse),
        (status = 404, description = "Employee or organization not found"),
        (status = 409, description = "Already checked in today")
    ),
    tag = "Attendance"
)]
pub async fn manual_check_in(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<ManualMarkRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner();
    let employee =
        resolve_active_employee(store.pool(), employee_id, &payload.organization_uuid).await?;

    let now = config.local_now();
    let machine = AttendanceMachine::new(store.get_ref(), config.classifier());
    let record = machine
        .execute(AttendanceCommand::CheckIn {
            key: RecordKey::new(employee_id, payload.organization_uuid, now.date()),
            at: now,
            verification: VerificationType::Manual,
            meta: CheckInMeta {
                notes: payload.notes,
                ..CheckInMeta::default()
            },
        })
        .await?;

    info!(employee_id, status = %record.status, "manual check-in");
    Ok(HttpResponse::Ok().json(MarkAttendanceResponse::from_record(
        &record,
        "CHECK_IN",
        format!("{} checked in", employee.full_name()),
    )))
}

/// Manual "mark checkout now" shortcut.
#[utoipa::path(
    post,
    path = "/api/attendance/check-out/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = ManualMarkRequest,
    responses(
        (status = 200, description = "Checked out", body = MarkAttendanceResponse),
        (status = 404, description = "Employee or organization not found"),
        (status = 409, description = "Not checked in yet / already checked out")
    ),
    tag = "Attendance"
)]
pub async fn manual_check_out(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<ManualMarkRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner();
    let employee =
        resolve_active_employee(store.pool(), employee_id, &payload.organization_uuid).await?;

    let now = config.local_now();
    let machine = AttendanceMachine::new(store.get_ref(), config.classifier());
    let record = machine
        .execute(AttendanceCommand::CheckOut {
            key: RecordKey::new(employee_id, payload.organization_uuid, now.date()),
            at: now,
        })
        .await?;

    info!(employee_id, "manual check-out");
    Ok(HttpResponse::Ok().json(MarkAttendanceResponse::from_record(
        &record,
        "CHECK_OUT",
        format!("{} checked out", employee.full_name()),
    )))
}

/// HR status override for today: ABSENT/ON_LEAVE shells, or corrections
/// while the day is still open.
#[utoipa::path(
    put,
    path = "/api/attendance/status/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = MarkAttendanceResponse),
        (status = 404, description = "Employee or organization not found"),
        (status = 422, description = "Invalid transition")
    ),
    tag = "Attendance"
)]
pub async fn update_status(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let employee_id = path.into_inner();
    let payload = payload.into_inner();
    let employee =
        resolve_active_employee(store.pool(), employee_id, &payload.organization_uuid).await?;

    let machine = AttendanceMachine::new(store.get_ref(), config.classifier());
    let record = machine
        .execute(AttendanceCommand::SetStatus {
            key: RecordKey::new(employee_id, payload.organization_uuid, config.local_today()),
            status: payload.status,
            check_in_time: payload.check_in_time,
        })
        .await?;

    info!(employee_id, status = %record.status, "status override");
    Ok(HttpResponse::Ok().json(MarkAttendanceResponse::from_record(
        &record,
        "STATUS_SET",
        format!("Status for {} set to {}", employee.full_name(), record.status),
    )))
}

// -------------------- read side --------------------

/// Today's state for one employee.
#[utoipa::path(
    get,
    path = "/api/attendance/today/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("organization_uuid", Query, description = "Organization UUID")
    ),
    responses((status = 200, description = "Today's status", body = query::TodayStatus)),
    tag = "Attendance"
)]
pub async fn today_status(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    q: web::Query<OrgQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let key = RecordKey::new(
        path.into_inner(),
        q.into_inner().organization_uuid,
        config.local_today(),
    );
    let status = query::today_status(store.get_ref(), &key).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Organization roster for a date, newest check-in first.
#[utoipa::path(
    get,
    path = "/api/attendance/roster",
    params(
        ("organization_uuid", Query, description = "Organization UUID"),
        ("date", Query, description = "Date (defaults to today)")
    ),
    responses((status = 200, description = "Roster", body = [RosterRow])),
    tag = "Attendance"
)]
pub async fn roster(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    q: web::Query<RosterQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let q = q.into_inner();
    let date = q.date.unwrap_or_else(|| config.local_today());
    let records = query::roster(store.get_ref(), &q.organization_uuid, date).await?;
    let rows = rows_for(store.pool(), &records).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Active employees without any attendance row today; the kiosk operator
/// picks from this list for manual check-in.
#[utoipa::path(
    get,
    path = "/api/attendance/check-in/list",
    params(("organization_uuid", Query, description = "Organization UUID")),
    responses((status = 200, description = "Employees not yet marked", body = [UnmarkedEmployee])),
    tag = "Attendance"
)]
pub async fn check_in_list(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    q: web::Query<OrgQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let q = q.into_inner();
    let today = config.local_today();

    let marked: std::collections::HashSet<u64> =
        query::roster(store.get_ref(), &q.organization_uuid, today)
            .await?
            .into_iter()
            .map(|r| r.employee_id)
            .collect();

    let employees = directory_cache::active_employees(store.pool(), &q.organization_uuid)
        .await
        .map_err(internal)?;

    let unmarked: Vec<UnmarkedEmployee> = employees
        .into_iter()
        .filter(|e| !marked.contains(&e.id))
        .map(|e| UnmarkedEmployee {
            employee_id: e.id,
            employee_name: e.full_name(),
            employee_code: e.employee_code.clone(),
            department: e.department,
        })
        .collect();

    Ok(HttpResponse::Ok().json(unmarked))
}

/// Checked-in-but-not-out employees, oldest check-in first — the
/// operational "who's overdue" view.
#[utoipa::path(
    get,
    path = "/api/attendance/check-out/list",
    params(("organization_uuid", Query, description = "Organization UUID")),
    responses((status = 200, description = "Pending checkouts", body = [RosterRow])),
    tag = "Attendance"
)]
pub async fn pending_checkouts(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    q: web::Query<OrgQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let q = q.into_inner();
    let records =
        query::pending_checkouts(store.get_ref(), &q.organization_uuid, config.local_today())
            .await?;
    let rows = rows_for(store.pool(), &records).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// One employee's attendance between two dates, newest first, with
/// computed working hours.
#[utoipa::path(
    get,
    path = "/api/attendance/history/{employee_id}",
    params(
        ("employee_id", Path, description = "Employee ID"),
        ("organization_uuid", Query, description = "Organization UUID"),
        ("start_date", Query, description = "Range start (inclusive)"),
        ("end_date", Query, description = "Range end (inclusive)")
    ),
    responses((status = 200, description = "History", body = [query::HistoryEntry])),
    tag = "Attendance"
)]
pub async fn history(
    store: web::Data<MySqlAttendanceStore>,
    path: web::Path<u64>,
    q: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let q = q.into_inner();
    let entries = query::history(
        store.get_ref(),
        path.into_inner(),
        &q.organization_uuid,
        q.start_date,
        q.end_date,
    )
    .await?;
    Ok(HttpResponse::Ok().json(entries))
}

/// Per-status record counts for a date, for dashboard summaries.
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(
        ("organization_uuid", Query, description = "Organization UUID"),
        ("date", Query, description = "Date (defaults to today)")
    ),
    responses((status = 200, description = "Daily counts", body = query::DailySummary)),
    tag = "Attendance"
)]
pub async fn daily_summary(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    q: web::Query<RosterQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let q = q.into_inner();
    let date = q.date.unwrap_or_else(|| config.local_today());
    let summary = query::daily_summary(store.get_ref(), &q.organization_uuid, date).await?;
    Ok(HttpResponse::Ok().json(summary))
}
