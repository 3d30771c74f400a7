//! Attendance domain: check-in state machine and statistics.

pub mod state;
pub mod stats;

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::{NaiveDateTime, NaiveTime};
use self::state::{Transition, TransitionError};
use sqlx::MySqlPool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Which step of the day's state machine this call performed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkAction {
    CheckIn,
    CheckOut,
}

pub struct Marked {
    pub action: MarkAction,
    pub record: AttendanceRecord,
}

/// How this record entered the system.
pub struct Provenance {
    pub marked_by_face: bool,
    pub confidence: Option<f64>,
}

/// Drive the state machine for (user, today) against storage.
///
/// The unique key on (user_id, date) makes this idempotent under races:
/// a concurrent first check-in surfaces as a duplicate-key error, which
/// is replayed as a fetch plus the follow-up transition, so two
/// simultaneous attempts never create two records.
pub async fn mark_attendance(
    pool: &MySqlPool,
    user_id: u64,
    now: NaiveDateTime,
    late_after: NaiveTime,
    provenance: Provenance,
    location: Option<String>,
) -> Result<Marked, MarkError> {
    let date = now.date();

    let existing = fetch_record(pool, user_id, date).await?;
    match state::next_transition(existing.as_ref(), now, late_after)? {
        Transition::CheckIn { status } => {
            match insert_check_in(pool, user_id, now, status, &provenance, &location, existing)
                .await
            {
                Ok(marked) => Ok(marked),
                Err(MarkError::Db(e)) if is_duplicate_key(&e) => {
                    // Lost the race to a concurrent check-in; replay as
                    // the follow-up transition on the row that won.
                    let current = fetch_record(pool, user_id, date).await?;
                    match state::next_transition(current.as_ref(), now, late_after)? {
                        Transition::CheckOut => apply_check_out(pool, user_id, now, date).await,
                        Transition::CheckIn { .. } => Err(MarkError::Db(e)),
                    }
                }
                Err(e) => Err(e),
            }
        }
        Transition::CheckOut => apply_check_out(pool, user_id, now, date).await,
    }
}

async fn fetch_record(
    pool: &MySqlPool,
    user_id: u64,
    date: chrono::NaiveDate,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    sqlx::query_as::<_, AttendanceRecord>(
        "SELECT * FROM attendance_records WHERE user_id = ? AND date = ?",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

async fn insert_check_in(
    pool: &MySqlPool,
    user_id: u64,
    now: NaiveDateTime,
    status: AttendanceStatus,
    provenance: &Provenance,
    location: &Option<String>,
    existing: Option<AttendanceRecord>,
) -> Result<Marked, MarkError> {
    let date = now.date();

    match existing {
        // Administratively created absence: fill the check-in in place.
        Some(record) => {
            sqlx::query(
                r#"
                UPDATE attendance_records
                SET check_in_time = ?, status = ?, marked_by_face = ?,
                    confidence_score = ?, location = COALESCE(?, location)
                WHERE id = ? AND check_in_time IS NULL
                "#,
            )
            .bind(now)
            .bind(status)
            .bind(provenance.marked_by_face)
            .bind(provenance.confidence)
            .bind(location)
            .bind(record.id)
            .execute(pool)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO attendance_records
                    (user_id, date, check_in_time, status, marked_by_face, confidence_score, location)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(user_id)
            .bind(date)
            .bind(now)
            .bind(status)
            .bind(provenance.marked_by_face)
            .bind(provenance.confidence)
            .bind(location)
            .execute(pool)
            .await?;
        }
    }

    let record = fetch_record(pool, user_id, date)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(Marked {
        action: MarkAction::CheckIn,
        record,
    })
}

async fn apply_check_out(
    pool: &MySqlPool,
    user_id: u64,
    now: NaiveDateTime,
    date: chrono::NaiveDate,
) -> Result<Marked, MarkError> {
    let result = sqlx::query(
        r#"
        UPDATE attendance_records
        SET check_out_time = ?
        WHERE user_id = ? AND date = ? AND check_out_time IS NULL
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(date)
    .execute(pool)
    .await?;

    // A concurrent call already closed the record.
    if result.rows_affected() == 0 {
        return Err(TransitionError::AlreadyCompleted.into());
    }

    let record = fetch_record(pool, user_id, date)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;
    Ok(Marked {
        action: MarkAction::CheckOut,
        record,
    })
}

/// MySQL integrity-constraint violation (SQLSTATE 23000), the signature
/// of losing an insert race on the (user_id, date) unique key.
pub fn is_duplicate_key(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23000"),
        _ => false,
    }
}
