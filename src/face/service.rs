//! Recognition pipeline: extract -> match -> log.
//!
//! One service in front of whichever extractor backend is configured.
//! Every identification attempt, success or failure, appends exactly one
//! row to `recognition_logs`.

use crate::face::extractor::EmbeddingExtractor;
use crate::face::matcher::{self, MatchOutcome};
use crate::model::face::{FaceEncoding, RecognitionOutcome};
use crate::model::user::User;
use crate::utils::gallery_cache;
use actix_web::web;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("No face detected in the image")]
    NoFace,
    #[error("Multiple faces detected. Please use an image with only one face")]
    MultipleFaces,
    #[error("No registered faces found")]
    EmptyGallery,
    #[error("Face not recognized")]
    UnknownPerson { confidence: f64 },
    #[error("face recognition failed: {0}")]
    Failed(String),
}

impl RecognitionError {
    pub fn outcome(&self) -> RecognitionOutcome {
        match self {
            RecognitionError::NoFace => RecognitionOutcome::NoFace,
            RecognitionError::MultipleFaces => RecognitionOutcome::MultipleFaces,
            RecognitionError::EmptyGallery | RecognitionError::UnknownPerson { .. } => {
                RecognitionOutcome::UnknownPerson
            }
            RecognitionError::Failed(_) => RecognitionOutcome::Failed,
        }
    }

    pub fn confidence(&self) -> Option<f64> {
        match self {
            RecognitionError::UnknownPerson { confidence } => Some(*confidence),
            _ => None,
        }
    }
}

/// A positive identification.
pub struct Identification {
    pub user: User,
    pub confidence: f64,
    /// Seconds spent on the whole attempt.
    pub processing_time: f64,
}

pub struct FaceService {
    extractor: Arc<dyn EmbeddingExtractor>,
    tolerance: f64,
}

impl FaceService {
    pub fn new(extractor: Arc<dyn EmbeddingExtractor>, tolerance: f64) -> Self {
        FaceService {
            extractor,
            tolerance,
        }
    }

    /// Identify the single face in `image` against the active gallery.
    pub async fn recognize(
        &self,
        pool: &MySqlPool,
        image: Vec<u8>,
        location: Option<String>,
    ) -> Result<Identification, RecognitionError> {
        let started = Instant::now();
        let result = self.recognize_inner(pool, image).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(ident) => {
                log_attempt(
                    pool,
                    RecognitionOutcome::Success,
                    Some(ident.user.id),
                    Some(ident.confidence),
                    location.as_deref(),
                    None,
                    elapsed,
                )
                .await;
            }
            Err(err) => {
                log_attempt(
                    pool,
                    err.outcome(),
                    None,
                    err.confidence(),
                    location.as_deref(),
                    Some(&err.to_string()),
                    elapsed,
                )
                .await;
            }
        }

        result.map(|mut ident| {
            ident.processing_time = elapsed;
            ident
        })
    }

    async fn recognize_inner(
        &self,
        pool: &MySqlPool,
        image: Vec<u8>,
    ) -> Result<Identification, RecognitionError> {
        let query = self.extract_single(image).await?;

        let gallery = gallery_cache::active_gallery(pool)
            .await
            .map_err(|e| RecognitionError::Failed(e.to_string()))?;

        match matcher::identify(&query, &gallery, self.tolerance) {
            MatchOutcome::EmptyGallery => Err(RecognitionError::EmptyGallery),
            MatchOutcome::UnknownPerson { confidence } => {
                Err(RecognitionError::UnknownPerson { confidence })
            }
            MatchOutcome::Match {
                user_id,
                confidence,
            } => {
                let user = sqlx::query_as::<_, User>(
                    "SELECT * FROM users WHERE id = ? AND is_active = TRUE",
                )
                .bind(user_id)
                .fetch_optional(pool)
                .await
                .map_err(|e| RecognitionError::Failed(e.to_string()))?
                .ok_or_else(|| {
                    RecognitionError::Failed(format!("matched user {user_id} not found or inactive"))
                })?;

                Ok(Identification {
                    user,
                    confidence,
                    processing_time: 0.0,
                })
            }
        }
    }

    /// Register or replace a user's face encoding.
    pub async fn register(
        &self,
        pool: &MySqlPool,
        user_id: u64,
        image: Vec<u8>,
    ) -> Result<(), RecognitionError> {
        let encoding = self.extract_single(image).await?;
        let data = FaceEncoding::encode(&encoding);

        sqlx::query(
            r#"
            INSERT INTO face_encodings (user_id, encoding_data, tolerance, is_active)
            VALUES (?, ?, ?, TRUE)
            ON DUPLICATE KEY UPDATE
                encoding_data = VALUES(encoding_data),
                tolerance = VALUES(tolerance),
                is_active = TRUE
            "#,
        )
        .bind(user_id)
        .bind(&data)
        .bind(self.tolerance)
        .execute(pool)
        .await
        .map_err(|e| RecognitionError::Failed(e.to_string()))?;

        gallery_cache::invalidate().await;
        Ok(())
    }

    /// Run the (possibly process-spawning) extractor off the async
    /// executor and enforce the exactly-one-face rule.
    async fn extract_single(&self, image: Vec<u8>) -> Result<Vec<f64>, RecognitionError> {
        let extractor = Arc::clone(&self.extractor);
        let mut faces = web::block(move || extractor.extract(&image))
            .await
            .map_err(|e| RecognitionError::Failed(e.to_string()))?
            .map_err(|e| RecognitionError::Failed(e.to_string()))?;

        if faces.len() > 1 {
            return Err(RecognitionError::MultipleFaces);
        }
        match faces.pop() {
            Some(face) => Ok(face),
            None => Err(RecognitionError::NoFace),
        }
    }
}

/// Append one immutable log row. A failed insert is reported but never
/// fails the attempt it was recording.
async fn log_attempt(
    pool: &MySqlPool,
    outcome: RecognitionOutcome,
    user_id: Option<u64>,
    confidence: Option<f64>,
    location: Option<&str>,
    error_message: Option<&str>,
    processing_time: f64,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO recognition_logs
            (user_id, outcome, confidence_score, location, error_message, processing_time)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(outcome)
    .bind(confidence)
    .bind(location)
    .bind(error_message)
    .bind(processing_time)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::error!(error = %e, outcome = %outcome, "Failed to write recognition log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_log_outcomes() {
        assert_eq!(RecognitionError::NoFace.outcome(), RecognitionOutcome::NoFace);
        assert_eq!(
            RecognitionError::MultipleFaces.outcome(),
            RecognitionOutcome::MultipleFaces
        );
        assert_eq!(
            RecognitionError::EmptyGallery.outcome(),
            RecognitionOutcome::UnknownPerson
        );
        assert_eq!(
            RecognitionError::UnknownPerson { confidence: 0.2 }.outcome(),
            RecognitionOutcome::UnknownPerson
        );
        assert_eq!(
            RecognitionError::Failed("db down".into()).outcome(),
            RecognitionOutcome::Failed
        );
    }

    #[test]
    fn only_near_misses_carry_confidence() {
        assert_eq!(
            RecognitionError::UnknownPerson { confidence: 0.42 }.confidence(),
            Some(0.42)
        );
        assert_eq!(RecognitionError::NoFace.confidence(), None);
        assert_eq!(RecognitionError::EmptyGallery.confidence(), None);
    }
}
