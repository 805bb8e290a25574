use chrono::NaiveDateTime;

use crate::model::attendance::{AttendanceStatus, RecordKey, VerificationType};

/// Write-once metadata captured at creation and never revised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckInMeta {
    pub verification_confidence: Option<String>,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
    pub notes: Option<String>,
}

/// The closed command set. All three channels (face kiosk, QR scan, HR
/// manual) translate their input into one of these and hand it to the
/// state machine; no channel touches the store directly.
#[derive(Debug, Clone, PartialEq)]
pub enum AttendanceCommand {
    CheckIn {
        key: RecordKey,
        at: NaiveDateTime,
        verification: VerificationType,
        meta: CheckInMeta,
    },
    CheckOut {
        key: RecordKey,
        at: NaiveDateTime,
    },
    SetStatus {
        key: RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    },
}

impl AttendanceCommand {
    pub fn key(&self) -> &RecordKey {
        match self {
            AttendanceCommand::CheckIn { key, .. }
            | AttendanceCommand::CheckOut { key, .. }
            | AttendanceCommand::SetStatus { key, .. } => key,
        }
    }
}
