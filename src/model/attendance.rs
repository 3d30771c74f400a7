use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    sqlx::Type,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[sqlx(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

/// One row per (user, date). Created on the first check-in of the day,
/// mutated once to add the check-out, then closed.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-01-15T08:55:00", format = "date-time", value_type = Option<String>)]
    pub check_in_time: Option<NaiveDateTime>,
    #[schema(example = "2026-01-15T17:01:00", format = "date-time", value_type = Option<String>)]
    pub check_out_time: Option<NaiveDateTime>,
    pub status: AttendanceStatus,
    /// Provenance: true when the record came from the recognition path.
    pub marked_by_face: bool,
    pub confidence_score: Option<f64>,
    pub location: Option<String>,
    pub notes: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Worked duration, available once both timestamps are set.
    pub fn duration(&self) -> Option<Duration> {
        match (self.check_in_time, self.check_out_time) {
            (Some(check_in), Some(check_out)) => Some(check_out - check_in),
            _ => None,
        }
    }
}
