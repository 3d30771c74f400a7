//! Per-(user, date) check-in state machine.
//!
//! no-record -> checked-in -> checked-in-and-out, terminal for the day.
//! The decision is pure; `mark_attendance` in the parent module applies
//! it against storage.

use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("Already checked in and out for today")]
    AlreadyCompleted,
    #[error("check-out time must be after check-in time")]
    CheckOutNotAfterCheckIn,
}

/// What the next identification (or manual tap) should do.
#[derive(Debug, PartialEq)]
pub enum Transition {
    CheckIn { status: AttendanceStatus },
    CheckOut,
}

/// Status derived from the check-in instant: at or before the boundary
/// counts as present, anything after is late.
pub fn derive_status(check_in: NaiveDateTime, late_after: NaiveTime) -> AttendanceStatus {
    if check_in.time() <= late_after {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

/// Decide the transition for today's record, if any. A record that
/// exists without a check-in (an administratively created absence) is
/// treated the same as no record: the check-in fills it.
pub fn next_transition(
    existing: Option<&AttendanceRecord>,
    now: NaiveDateTime,
    late_after: NaiveTime,
) -> Result<Transition, TransitionError> {
    match existing {
        None => Ok(Transition::CheckIn {
            status: derive_status(now, late_after),
        }),
        Some(record) => match (record.check_in_time, record.check_out_time) {
            (None, _) => Ok(Transition::CheckIn {
                status: derive_status(now, late_after),
            }),
            (Some(check_in), None) => {
                if now <= check_in {
                    Err(TransitionError::CheckOutNotAfterCheckIn)
                } else {
                    Ok(Transition::CheckOut)
                }
            }
            (Some(_), Some(_)) => Err(TransitionError::AlreadyCompleted),
        },
    }
}

/// Ordering invariant for explicit record edits: a check-out, when both
/// timestamps are set, must be strictly after the check-in.
pub fn validate_interval(
    check_in: Option<NaiveDateTime>,
    check_out: Option<NaiveDateTime>,
) -> Result<(), TransitionError> {
    if let (Some(check_in), Some(check_out)) = (check_in, check_out) {
        if check_out <= check_in {
            return Err(TransitionError::CheckOutNotAfterCheckIn);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn boundary() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    fn record(
        check_in: Option<NaiveDateTime>,
        check_out: Option<NaiveDateTime>,
    ) -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            user_id: 42,
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            check_in_time: check_in,
            check_out_time: check_out,
            status: AttendanceStatus::Absent,
            marked_by_face: false,
            confidence_score: None,
            location: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn first_event_checks_in_present_before_boundary() {
        let t = next_transition(None, at(8, 59, 59), boundary()).unwrap();
        assert_eq!(
            t,
            Transition::CheckIn {
                status: AttendanceStatus::Present
            }
        );
    }

    #[test]
    fn boundary_instant_is_still_present() {
        let t = next_transition(None, at(9, 0, 0), boundary()).unwrap();
        assert_eq!(
            t,
            Transition::CheckIn {
                status: AttendanceStatus::Present
            }
        );
    }

    #[test]
    fn after_boundary_is_late() {
        let t = next_transition(None, at(9, 0, 1), boundary()).unwrap();
        assert_eq!(
            t,
            Transition::CheckIn {
                status: AttendanceStatus::Late
            }
        );
    }

    #[test]
    fn second_event_checks_out() {
        let rec = record(Some(at(8, 30, 0)), None);
        let t = next_transition(Some(&rec), at(17, 0, 0), boundary()).unwrap();
        assert_eq!(t, Transition::CheckOut);
    }

    #[test]
    fn third_event_is_rejected() {
        let rec = record(Some(at(8, 30, 0)), Some(at(17, 0, 0)));
        let err = next_transition(Some(&rec), at(18, 0, 0), boundary()).unwrap_err();
        assert_eq!(err, TransitionError::AlreadyCompleted);
    }

    #[test]
    fn check_out_at_or_before_check_in_is_rejected() {
        let rec = record(Some(at(8, 30, 0)), None);
        let err = next_transition(Some(&rec), at(8, 30, 0), boundary()).unwrap_err();
        assert_eq!(err, TransitionError::CheckOutNotAfterCheckIn);

        let err = next_transition(Some(&rec), at(8, 0, 0), boundary()).unwrap_err();
        assert_eq!(err, TransitionError::CheckOutNotAfterCheckIn);
    }

    #[test]
    fn record_without_check_in_accepts_a_check_in() {
        let rec = record(None, None);
        let t = next_transition(Some(&rec), at(10, 0, 0), boundary()).unwrap();
        assert_eq!(
            t,
            Transition::CheckIn {
                status: AttendanceStatus::Late
            }
        );
    }

    #[test]
    fn interval_validation_matches_transition_rule() {
        assert!(validate_interval(Some(at(9, 0, 0)), Some(at(9, 0, 1))).is_ok());
        assert_eq!(
            validate_interval(Some(at(9, 0, 0)), Some(at(9, 0, 0))).unwrap_err(),
            TransitionError::CheckOutNotAfterCheckIn
        );
        assert!(validate_interval(Some(at(9, 0, 0)), None).is_ok());
        assert!(validate_interval(None, None).is_ok());
    }
}
