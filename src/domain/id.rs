use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::error::PipelineError;

/// Processor-assigned event identifier, globally unique per logical event.
/// Sole key for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PipelineError::MalformedPayload(
                "event id must be non-empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Customer/subscription identifier the processor reports the event against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Result<Self, PipelineError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PipelineError::MalformedPayload(
                "subject id must be non-empty".into(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}
