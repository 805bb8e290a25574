use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::attendance::error::AttendanceError;

/// Declared intent embedded in the token; redemption obeys this strictly
/// instead of inferring from the day's current state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum QrPurpose {
    CheckIn,
    CheckOut,
}

/// Ephemeral, self-contained bearer claim. Lives only inside the signed
/// token; never stored. Effective single-use is enforced downstream by the
/// state machine's AlreadyCheckedIn/AlreadyCheckedOut guards.
#[derive(Debug, Serialize, Deserialize)]
pub struct QrAttendanceClaim {
    pub employee_id: u64,
    pub organization_uuid: String,
    pub purpose: QrPurpose,
    pub exp: usize,
    pub jti: String,
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or(0)
}

/// Issue a short-lived signed QR token for one employee and purpose.
pub fn issue_qr_token(
    employee_id: u64,
    organization_uuid: &str,
    purpose: QrPurpose,
    secret: &str,
    ttl_secs: usize,
) -> Result<String, AttendanceError> {
    let claims = QrAttendanceClaim {
        employee_id,
        organization_uuid: organization_uuid.to_string(),
        purpose,
        exp: now() + ttl_secs,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AttendanceError::Internal(e.to_string()))
}

/// Validate signature and expiry and extract the claim. Any failure,
/// including an organization mismatch against the caller's context,
/// collapses to `InvalidToken`.
pub fn verify_qr_token(
    token: &str,
    caller_organization_uuid: &str,
    secret: &str,
) -> Result<QrAttendanceClaim, AttendanceError> {
    let claim = decode::<QrAttendanceClaim>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AttendanceError::InvalidToken)?;

    if claim.organization_uuid != caller_organization_uuid {
        return Err(AttendanceError::InvalidToken);
    }
    Ok(claim)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_and_verify_round_trip() {
        let token = issue_qr_token(7, "org-1", QrPurpose::CheckIn, SECRET, 600).unwrap();
        let claim = verify_qr_token(&token, "org-1", SECRET).unwrap();
        assert_eq!(claim.employee_id, 7);
        assert_eq!(claim.organization_uuid, "org-1");
        assert_eq!(claim.purpose, QrPurpose::CheckIn);
    }

    #[test]
    fn expired_token_is_invalid() {
        // jsonwebtoken's default leeway is 60s; expire well past it
        let claims = QrAttendanceClaim {
            employee_id: 7,
            organization_uuid: "org-1".into(),
            purpose: QrPurpose::CheckIn,
            exp: now().saturating_sub(600),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            verify_qr_token(&token, "org-1", SECRET).unwrap_err(),
            AttendanceError::InvalidToken
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_qr_token(7, "org-1", QrPurpose::CheckOut, SECRET, 600).unwrap();
        assert_eq!(
            verify_qr_token(&token, "org-1", "other-secret").unwrap_err(),
            AttendanceError::InvalidToken
        );
    }

    #[test]
    fn organization_mismatch_is_invalid() {
        let token = issue_qr_token(7, "org-1", QrPurpose::CheckIn, SECRET, 600).unwrap();
        assert_eq!(
            verify_qr_token(&token, "org-2", SECRET).unwrap_err(),
            AttendanceError::InvalidToken
        );
    }

    #[test]
    fn malformed_token_is_invalid() {
        assert_eq!(
            verify_qr_token("not-a-jwt", "org-1", SECRET).unwrap_err(),
            AttendanceError::InvalidToken
        );
    }

    mod redemption {
        use super::*;
        use crate::attendance::classifier::StatusClassifier;
        use crate::attendance::command::{AttendanceCommand, CheckInMeta};
        use crate::attendance::machine::AttendanceMachine;
        use crate::attendance::testing::MemStore;
        use crate::model::attendance::{AttendanceStatus, RecordKey, VerificationType};
        use chrono::{NaiveDate, NaiveTime};

        fn command_for(claim: &QrAttendanceClaim, at: chrono::NaiveDateTime) -> AttendanceCommand {
            let key = RecordKey::new(claim.employee_id, claim.organization_uuid.clone(), at.date());
            match claim.purpose {
                QrPurpose::CheckIn => AttendanceCommand::CheckIn {
                    key,
                    at,
                    verification: VerificationType::QrCode,
                    meta: CheckInMeta::default(),
                },
                QrPurpose::CheckOut => AttendanceCommand::CheckOut { key, at },
            }
        }

        #[actix_web::test]
        async fn check_in_token_redeems_once_then_conflicts() {
            let store = MemStore::new();
            let machine = AttendanceMachine::new(
                &store,
                StatusClassifier::new(
                    NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
                    NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                ),
            );
            let redeemed_at = NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(9, 5, 0)
                .unwrap();

            let token = issue_qr_token(7, "org-1", QrPurpose::CheckIn, SECRET, 600).unwrap();
            let claim = verify_qr_token(&token, "org-1", SECRET).unwrap();
            let record = machine.execute(command_for(&claim, redeemed_at)).await.unwrap();
            assert_eq!(record.status, AttendanceStatus::Present);

            // a freshly reissued CHECK_IN token still hits the idempotency guard
            let token = issue_qr_token(7, "org-1", QrPurpose::CheckIn, SECRET, 600).unwrap();
            let claim = verify_qr_token(&token, "org-1", SECRET).unwrap();
            let err = machine
                .execute(command_for(&claim, redeemed_at))
                .await
                .unwrap_err();
            assert_eq!(err, AttendanceError::AlreadyCheckedIn);
        }
    }
}
