use crate::api::attendance::{
    HistoryQuery, ManualMarkRequest, MarkAttendanceRequest, MarkAttendanceResponse, OrgQuery,
    RosterQuery, RosterRow, UnmarkedEmployee, UpdateStatusRequest,
};
use crate::api::qr::{QrGenerateRequest, QrGenerateResponse, QrRedeemRequest};
use crate::attendance::qr::QrPurpose;
use crate::attendance::query::{DailySummary, HistoryEntry, TodayStatus};
use crate::model::attendance::{AttendanceStatus, DayState, VerificationType};
use crate::model::employee::EmployeeRef;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "CoreHive Attendance API",
        version = "1.0.0",
        description = r#"
## Attendance Core

Tracks one evolving attendance record per employee per calendar day,
reachable through three channels:

- **Face recognition** — kiosk toggles check-in / check-out
- **QR code** — short-lived signed tokens with an explicit purpose
- **Manual** — HR check-in/check-out and status overrides

Check-in time is classified against configurable thresholds into
PRESENT / LATE / HALF_DAY. Read-side queries cover today's status,
rosters, pending checkouts, history with working hours, and daily
summary counts.

Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::mark_attendance,
        crate::api::attendance::manual_check_in,
        crate::api::attendance::manual_check_out,
        crate::api::attendance::update_status,
        crate::api::attendance::today_status,
        crate::api::attendance::roster,
        crate::api::attendance::check_in_list,
        crate::api::attendance::pending_checkouts,
        crate::api::attendance::history,
        crate::api::attendance::daily_summary,
        crate::api::qr::generate,
        crate::api::qr::redeem,
    ),
    components(schemas(
        MarkAttendanceRequest,
        MarkAttendanceResponse,
        ManualMarkRequest,
        UpdateStatusRequest,
        OrgQuery,
        RosterQuery,
        HistoryQuery,
        RosterRow,
        UnmarkedEmployee,
        QrGenerateRequest,
        QrGenerateResponse,
        QrRedeemRequest,
        QrPurpose,
        TodayStatus,
        HistoryEntry,
        DailySummary,
        AttendanceStatus,
        VerificationType,
        DayState,
        EmployeeRef,
    )),
    tags(
        (name = "Attendance", description = "Attendance marking and queries"),
        (name = "QR", description = "QR token issuance and redemption")
    )
)]
pub struct ApiDoc;
