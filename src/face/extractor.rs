//! Embedding extractor backends.
//!
//! The extractor maps image bytes to zero-or-more fixed-length vectors,
//! one per detected face. Which backend runs is a deployment decision
//! (`FACE_BACKEND`), not a code-level one: the service only ever sees the
//! trait.

use crate::config::Config;
use serde::Deserialize;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("extractor backend failed: {0}")]
    Backend(String),
    #[error("extractor produced malformed output: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("extractor i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait EmbeddingExtractor: Send + Sync {
    /// One embedding per face found in the image. An empty list means no
    /// face was detected; it is not an error at this layer.
    fn extract(&self, image: &[u8]) -> Result<Vec<Vec<f64>>, ExtractorError>;
}

/// Null-object backend: face detection is switched off. Every request
/// resolves to "no face detected", and the rest of the pipeline behaves
/// exactly as it will once a real backend is configured.
pub struct DisabledExtractor;

impl EmbeddingExtractor for DisabledExtractor {
    fn extract(&self, _image: &[u8]) -> Result<Vec<Vec<f64>>, ExtractorError> {
        Ok(Vec::new())
    }
}

/// External-process backend. The configured command receives the raw
/// image on stdin and must print `{"faces": [[..], ..]}` on stdout; a
/// non-zero exit is an infra failure, never a "no face" result.
pub struct CommandExtractor {
    program: String,
}

#[derive(Deserialize)]
struct ExtractorReply {
    faces: Vec<Vec<f64>>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>) -> Self {
        CommandExtractor {
            program: program.into(),
        }
    }
}

impl EmbeddingExtractor for CommandExtractor {
    fn extract(&self, image: &[u8]) -> Result<Vec<Vec<f64>>, ExtractorError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(image)?,
            None => return Err(ExtractorError::Backend("stdin unavailable".into())),
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::Backend(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let reply: ExtractorReply = serde_json::from_slice(&output.stdout)?;
        Ok(reply.faces)
    }
}

/// Pick the backend named by `FACE_BACKEND`.
pub fn from_config(config: &Config) -> Result<Arc<dyn EmbeddingExtractor>, ExtractorError> {
    match config.face_backend.as_str() {
        "disabled" => Ok(Arc::new(DisabledExtractor)),
        "command" => match &config.face_extractor_cmd {
            Some(program) => Ok(Arc::new(CommandExtractor::new(program.clone()))),
            None => Err(ExtractorError::Backend(
                "FACE_BACKEND=command requires FACE_EXTRACTOR_CMD".into(),
            )),
        },
        other => Err(ExtractorError::Backend(format!(
            "unknown FACE_BACKEND '{other}' (expected 'disabled' or 'command')"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_detects_nothing() {
        let faces = DisabledExtractor.extract(b"not really an image").unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn reply_parsing_accepts_multiple_faces() {
        let reply: ExtractorReply =
            serde_json::from_str(r#"{"faces": [[0.1, 0.2], [0.3, 0.4]]}"#).unwrap();
        assert_eq!(reply.faces.len(), 2);
        assert_eq!(reply.faces[0], vec![0.1, 0.2]);
    }

    #[test]
    fn reply_parsing_rejects_garbage() {
        assert!(serde_json::from_str::<ExtractorReply>("not json").is_err());
    }
}
