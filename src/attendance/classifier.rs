use chrono::NaiveTime;

use crate::model::attendance::AttendanceStatus;

/// Maps the clock time of a check-in to a status bucket. Thresholds are
/// inclusive starts of the *later* bucket: checking in exactly at
/// `late_from` is LATE, exactly at `half_day_from` is HALF_DAY. The
/// on-time bucket starts at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusClassifier {
    pub late_from: NaiveTime,
    pub half_day_from: NaiveTime,
}

impl StatusClassifier {
    pub fn new(late_from: NaiveTime, half_day_from: NaiveTime) -> Self {
        debug_assert!(late_from <= half_day_from);
        Self {
            late_from,
            half_day_from,
        }
    }

    pub fn classify(&self, check_in: NaiveTime) -> AttendanceStatus {
        if check_in < self.late_from {
            AttendanceStatus::Present
        } else if check_in < self.half_day_from {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::HalfDay
        }
    }
}
