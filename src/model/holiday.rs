use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Non-working calendar day. Only adjusts the working-day denominator in
/// attendance percentages.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    pub id: u64,
    pub name: String,
    #[schema(example = "2026-01-26", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub description: Option<String>,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
