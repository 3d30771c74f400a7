use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Named attendance-taking window. Labels when attendance is expected to
/// be taken; records are not validated against it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceSession {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "2026-01-15T08:00:00", format = "date-time", value_type = String)]
    pub start_time: NaiveDateTime,
    #[schema(example = "2026-01-15T10:00:00", format = "date-time", value_type = String)]
    pub end_time: NaiveDateTime,
    pub is_active: bool,
    pub created_by: u64,
    pub location: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl AttendanceSession {
    /// Active and `now` within [start, end].
    pub fn is_ongoing(&self, now: NaiveDateTime) -> bool {
        self.is_active && self.start_time <= now && now <= self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session(active: bool) -> AttendanceSession {
        let day = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        AttendanceSession {
            id: 1,
            name: "morning roll call".into(),
            description: None,
            start_time: day.and_hms_opt(8, 0, 0).unwrap(),
            end_time: day.and_hms_opt(10, 0, 0).unwrap(),
            is_active: active,
            created_by: 1,
            location: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ongoing_inside_window() {
        let s = session(true);
        let inside = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(s.is_ongoing(inside));
        // boundaries are inclusive
        assert!(s.is_ongoing(s.start_time));
        assert!(s.is_ongoing(s.end_time));
    }

    #[test]
    fn not_ongoing_outside_window_or_inactive() {
        let s = session(true);
        let before = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(7, 59, 59)
            .unwrap();
        assert!(!s.is_ongoing(before));

        let inactive = session(false);
        let inside = NaiveDate::from_ymd_opt(2026, 1, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        assert!(!inactive.is_ongoing(inside));
    }
}
