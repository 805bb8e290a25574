use crate::attendance::classifier::StatusClassifier;
use crate::attendance::command::AttendanceCommand;
use crate::attendance::error::AttendanceError;
use crate::attendance::store::{AttendanceStore, NewRecord, StoreError};
use crate::model::attendance::{AttendanceRecord, RecordKey, VerificationType};
use chrono::NaiveDateTime;

use crate::attendance::command::CheckInMeta;
use crate::model::attendance::AttendanceStatus;

/// The single authoritative transition function. Every channel funnels
/// its normalized command through here; nothing else mutates the store.
pub struct AttendanceMachine<'a, S> {
    store: &'a S,
    classifier: StatusClassifier,
}

impl<'a, S: AttendanceStore> AttendanceMachine<'a, S> {
    pub fn new(store: &'a S, classifier: StatusClassifier) -> Self {
        Self { store, classifier }
    }

    pub async fn execute(
        &self,
        command: AttendanceCommand,
    ) -> Result<AttendanceRecord, AttendanceError> {
        match command {
            AttendanceCommand::CheckIn {
                key,
                at,
                verification,
                meta,
            } => self.check_in(key, at, verification, meta).await,
            AttendanceCommand::CheckOut { key, at } => self.check_out(key, at).await,
            AttendanceCommand::SetStatus {
                key,
                status,
                check_in_time,
            } => self.set_status(key, status, check_in_time).await,
        }
    }

    async fn check_in(
        &self,
        key: RecordKey,
        at: NaiveDateTime,
        verification: VerificationType,
        meta: CheckInMeta,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let rec = NewRecord {
            key: key.clone(),
            check_in_time: Some(at),
            status: self.classifier.classify(at.time()),
            verification_type: Some(verification),
            meta,
        };

        match self.store.insert_new(&rec).await {
            Ok(created) => Ok(created),
            Err(StoreError::Duplicate) => {
                // Lost the insert race or genuinely re-submitted; the
                // existing row decides which failure this is.
                let existing = self
                    .find_record(&key)
                    .await?
                    .ok_or_else(|| AttendanceError::Internal("duplicate without row".into()))?;
                if existing.check_out_time.is_some() {
                    Err(AttendanceError::AlreadyCompleted)
                } else if existing.check_in_time.is_some() {
                    Err(AttendanceError::AlreadyCheckedIn)
                } else {
                    // ABSENT/ON_LEAVE shell: check-in refused until HR
                    // changes the day's status.
                    Err(AttendanceError::InvalidTransition(
                        "day is marked absent or on leave; change the status before checking in",
                    ))
                }
            }
            Err(StoreError::Database(e)) => Err(AttendanceError::Internal(e.to_string())),
        }
    }

    async fn check_out(
        &self,
        key: RecordKey,
        at: NaiveDateTime,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let updated = self
            .store
            .complete_check_out(&key, at)
            .await
            .map_err(Self::store_err)?;

        if updated {
            return self
                .find_record(&key)
                .await?
                .ok_or_else(|| AttendanceError::Internal("checked-out row vanished".into()));
        }

        match self.find_record(&key).await? {
            Some(rec) if rec.check_out_time.is_some() => Err(AttendanceError::AlreadyCheckedOut),
            _ => Err(AttendanceError::NotCheckedInYet),
        }
    }

    async fn set_status(
        &self,
        key: RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        if status.is_non_working() && check_in_time.is_some() {
            return Err(AttendanceError::InvalidTransition(
                "a check-in time cannot be attached to ABSENT or ON_LEAVE",
            ));
        }

        if self.try_apply_status(&key, status, check_in_time).await? {
            return self
                .find_record(&key)
                .await?
                .ok_or_else(|| AttendanceError::Internal("updated row vanished".into()));
        }

        match self.find_record(&key).await? {
            // The conditional update only misses an existing row once
            // check-out has happened; the day is closed.
            Some(_) => Err(AttendanceError::InvalidTransition(
                "cannot change status after checkout",
            )),
            None => {
                let rec = NewRecord {
                    key: key.clone(),
                    check_in_time,
                    status,
                    verification_type: Some(VerificationType::Manual),
                    meta: CheckInMeta::default(),
                };
                match self.store.insert_new(&rec).await {
                    Ok(created) => Ok(created),
                    Err(StoreError::Duplicate) => {
                        // A concurrent writer created the row first; retry
                        // the conditional update once against it.
                        if self.try_apply_status(&key, status, check_in_time).await? {
                            self.find_record(&key).await?.ok_or_else(|| {
                                AttendanceError::Internal("updated row vanished".into())
                            })
                        } else {
                            Err(AttendanceError::InvalidTransition(
                                "cannot change status after checkout",
                            ))
                        }
                    }
                    Err(StoreError::Database(e)) => {
                        Err(AttendanceError::Internal(e.to_string()))
                    }
                }
            }
        }
    }

    async fn try_apply_status(
        &self,
        key: &RecordKey,
        status: AttendanceStatus,
        check_in_time: Option<NaiveDateTime>,
    ) -> Result<bool, AttendanceError> {
        self.store
            .apply_status(key, status, check_in_time)
            .await
            .map_err(Self::store_err)
    }

    async fn find_record(
        &self,
        key: &RecordKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceError> {
        self.store.find(key).await.map_err(Self::store_err)
    }

    fn store_err(e: StoreError) -> AttendanceError {
        match e {
            StoreError::Duplicate => AttendanceError::AlreadyCheckedIn,
            StoreError::Database(e) => AttendanceError::Internal(e.to_string()),
        }
    }
}
