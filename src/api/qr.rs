use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::attendance::{MarkAttendanceResponse, resolve_active_employee};
use crate::attendance::command::{AttendanceCommand, CheckInMeta};
use crate::attendance::error::AttendanceError;
use crate::attendance::machine::AttendanceMachine;
use crate::attendance::qr::{QrPurpose, issue_qr_token, verify_qr_token};
use crate::attendance::store::MySqlAttendanceStore;
use crate::config::Config;
use crate::model::attendance::{RecordKey, VerificationType};

#[derive(Debug, Deserialize, ToSchema)]
pub struct QrGenerateRequest {
    pub employee_id: u64,
    pub organization_uuid: String,
    pub purpose: QrPurpose,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QrGenerateResponse {
    pub token: String,
    pub expires_in_secs: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QrRedeemRequest {
    pub token: String,
    /// Kiosk's organization context; must match the claim.
    pub organization_uuid: String,
    pub device_info: Option<String>,
    pub ip_address: Option<String>,
}

/// Issue a short-lived signed token carrying {employee, organization,
/// purpose}. Nothing is stored; the token is the claim.
#[utoipa::path(
    post,
    path = "/api/qr/generate",
    request_body = QrGenerateRequest,
    responses(
        (status = 200, description = "Token issued", body = QrGenerateResponse),
        (status = 404, description = "Employee or organization not found")
    ),
    tag = "QR"
)]
pub async fn generate(
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    payload: web::Json<QrGenerateRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let payload = payload.into_inner();
    resolve_active_employee(store.pool(), payload.employee_id, &payload.organization_uuid)
        .await?;

    let token = issue_qr_token(
        payload.employee_id,
        &payload.organization_uuid,
        payload.purpose,
        &config.jwt_secret,
        config.qr_token_ttl,
    )?;

    info!(employee_id = payload.employee_id, purpose = %payload.purpose, "qr token issued");
    Ok(HttpResponse::Ok().json(QrGenerateResponse {
        token,
        expires_in_secs: config.qr_token_ttl,
    }))
}

/// Redeem a scanned token. The claim's purpose selects the command
/// deterministically; a CHECK_IN token against an already-checked-in day
/// fails with ALREADY_CHECKED_IN instead of silently toggling.
#[utoipa::path(
    post,
    path = "/api/qr/attendance",
    request_body = QrRedeemRequest,
    responses(
        (status = 200, description = "Attendance marked", body = MarkAttendanceResponse),
        (status = 401, description = "Invalid or expired token"),
        (status = 409, description = "Transition refused")
    ),
    tag = "QR"
)]
pub async fn redeem(
    req: HttpRequest,
    store: web::Data<MySqlAttendanceStore>,
    config: web::Data<Config>,
    payload: web::Json<QrRedeemRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let payload = payload.into_inner();
    let claim = verify_qr_token(&payload.token, &payload.organization_uuid, &config.jwt_secret)?;

    let employee =
        resolve_active_employee(store.pool(), claim.employee_id, &claim.organization_uuid)
            .await?;

    let now = config.local_now();
    let key = RecordKey::new(claim.employee_id, claim.organization_uuid.clone(), now.date());
    let machine = AttendanceMachine::new(store.get_ref(), config.classifier());

    let (record, action, message) = match claim.purpose {
        QrPurpose::CheckIn => {
            let ip = payload
                .ip_address
                .or_else(|| req.connection_info().realip_remote_addr().map(String::from));
            let record = machine
                .execute(AttendanceCommand::CheckIn {
                    key,
                    at: now,
                    verification: VerificationType::QrCode,
                    meta: CheckInMeta {
                        device_info: payload.device_info,
                        ip_address: ip,
                        ..CheckInMeta::default()
                    },
                })
                .await?;
            (
                record,
                "CHECK_IN",
                format!("Welcome {}, checked in via QR", employee.full_name()),
            )
        }
        QrPurpose::CheckOut => {
            let record = machine
                .execute(AttendanceCommand::CheckOut { key, at: now })
                .await?;
            (
                record,
                "CHECK_OUT",
                format!("Goodbye {}, checked out via QR", employee.full_name()),
            )
        }
    };

    info!(employee_id = record.employee_id, action, "qr redeemed");
    Ok(HttpResponse::Ok().json(MarkAttendanceResponse::from_record(&record, action, message)))
}
