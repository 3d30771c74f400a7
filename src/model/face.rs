use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Stored face embedding. One active row per user; re-registration
/// replaces the vector in place.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FaceEncoding {
    pub id: u64,
    pub user_id: u64,
    /// JSON array of f64, as produced by the embedding extractor.
    pub encoding_data: String,
    pub tolerance: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FaceEncoding {
    pub fn encoding(&self) -> Result<Vec<f64>, serde_json::Error> {
        serde_json::from_str(&self.encoding_data)
    }

    pub fn encode(values: &[f64]) -> String {
        serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Metadata projection of a stored encoding. The raw vector never leaves
/// the service.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct FaceEncodingMeta {
    pub id: u64,
    pub user_id: u64,
    pub tolerance: f64,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

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
#[sqlx(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecognitionOutcome {
    Success,
    Failed,
    NoFace,
    MultipleFaces,
    UnknownPerson,
}

/// Append-only log row for one identification attempt. Never mutated.
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct RecognitionLog {
    pub id: u64,
    pub user_id: Option<u64>,
    pub outcome: RecognitionOutcome,
    pub confidence_score: Option<f64>,
    pub location: Option<String>,
    pub error_message: Option<String>,
    /// Seconds spent on the attempt, extraction included.
    pub processing_time: Option<f64>,
    #[schema(format = "date-time", value_type = String)]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_round_trips_through_json() {
        let stored = FaceEncoding::encode(&[0.25, -1.5, 3.0]);
        let row = FaceEncoding {
            id: 1,
            user_id: 7,
            encoding_data: stored,
            tolerance: 0.6,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(row.encoding().unwrap(), vec![0.25, -1.5, 3.0]);
    }

    #[test]
    fn outcome_uses_snake_case_wire_names() {
        assert_eq!(RecognitionOutcome::NoFace.as_ref(), "no_face");
        assert_eq!(RecognitionOutcome::MultipleFaces.to_string(), "multiple_faces");
        assert_eq!(
            "unknown_person".parse::<RecognitionOutcome>().unwrap(),
            RecognitionOutcome::UnknownPerson
        );
    }
}
