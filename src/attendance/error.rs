use actix_web::{HttpResponse, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Closed failure taxonomy for the attendance core. Every domain rule
/// violation surfaces as one of these; handlers propagate with `?` and the
/// `ResponseError` impl turns each variant into a stable `{code, message}`
/// body.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum AttendanceError {
    #[display(fmt = "Employee or organization not found")]
    NotFound,

    #[display(fmt = "Already checked in today")]
    AlreadyCheckedIn,

    #[display(fmt = "Already checked out today")]
    AlreadyCheckedOut,

    #[display(fmt = "Attendance for today is already complete")]
    AlreadyCompleted,

    #[display(fmt = "No active check-in found for today")]
    NotCheckedInYet,

    #[display(fmt = "Invalid transition: {}", _0)]
    InvalidTransition(&'static str),

    #[display(fmt = "Invalid or expired QR token")]
    InvalidToken,

    #[display(fmt = "Validation failed: {}", _0)]
    Validation(&'static str),

    #[display(fmt = "Internal error")]
    Internal(String),
}

impl AttendanceError {
    /// Stable machine-readable category, independent of the message text.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::NotFound => "NOT_FOUND",
            AttendanceError::AlreadyCheckedIn => "ALREADY_CHECKED_IN",
            AttendanceError::AlreadyCheckedOut => "ALREADY_CHECKED_OUT",
            AttendanceError::AlreadyCompleted => "ALREADY_COMPLETED",
            AttendanceError::NotCheckedInYet => "NOT_CHECKED_IN_YET",
            AttendanceError::InvalidTransition(_) => "INVALID_TRANSITION",
            AttendanceError::InvalidToken => "INVALID_TOKEN",
            AttendanceError::Validation(_) => "VALIDATION_ERROR",
            AttendanceError::Internal(_) => "INTERNAL",
        }
    }
}

impl actix_web::ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::NotFound => StatusCode::NOT_FOUND,
            AttendanceError::AlreadyCheckedIn
            | AttendanceError::AlreadyCheckedOut
            | AttendanceError::AlreadyCompleted
            | AttendanceError::NotCheckedInYet => StatusCode::CONFLICT,
            AttendanceError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AttendanceError::InvalidToken => StatusCode::UNAUTHORIZED,
            AttendanceError::Validation(_) => StatusCode::BAD_REQUEST,
            AttendanceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AttendanceError::Internal(detail) = self {
            tracing::error!(error = %detail, "attendance operation failed");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "code": self.code(),
            "message": self.to_string(),
        }))
    }
}
