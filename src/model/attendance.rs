use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// The one authoritative status enum; every layer (adapters, queries,
/// storage) consumes this type, never a DTO-local copy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    HalfDay,
    Absent,
    OnLeave,
}

impl AttendanceStatus {
    /// ABSENT and ON_LEAVE rows never carry a check-in time.
    pub fn is_non_working(self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::OnLeave)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationType {
    FaceRecognition,
    QrCode,
    Manual,
}

/// Where one (employee, day) sits in its lifecycle. A row holding only an
/// ABSENT/ON_LEAVE status with no check-in still counts as NOT_MARKED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DayState {
    NotMarked,
    CheckedIn,
    Completed,
}

/// Identity of the single row per employee per day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub employee_id: u64,
    pub organization_uuid: String,
    pub date: NaiveDate,
}

impl RecordKey {
    pub fn new(employee_id: u64, organization_uuid: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            employee_id,
            organization_uuid: organization_uuid.into(),
            date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub organization_uuid: String,
    pub employee_id: u64,
    pub attendance_date: NaiveDate,
    pub check_in_time: Option<NaiveDateTime>,
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    pub verification_type: Option<VerificationType>,
    pub verification_confidence: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

impl AttendanceRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(
            self.employee_id,
            self.organization_uuid.clone(),
            self.attendance_date,
        )
    }

    pub fn day_state(&self) -> DayState {
        match (self.check_in_time, self.check_out_time) {
            (Some(_), Some(_)) => DayState::Completed,
            (Some(_), None) => DayState::CheckedIn,
            (None, _) => DayState::NotMarked,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.day_state() == DayState::Completed
    }
}
