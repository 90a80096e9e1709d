//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::ClassificationRecord;

/// Error type for classifier operations
///
/// Every variant is terminal for the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    /// Transport failure, timeout, rejected credential or non-2xx status
    #[error("Classification service unreachable: {0}")]
    Unreachable(String),
    /// The body could not be read as JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// Valid JSON that does not satisfy the verdict schema
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

/// Discriminant of [`ClassificationError`] for presentation layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationErrorKind {
    Unreachable,
    MalformedResponse,
    InvalidSchema,
}

impl fmt::Display for ClassificationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unreachable => "unreachable",
            Self::MalformedResponse => "malformed_response",
            Self::InvalidSchema => "invalid_schema",
        })
    }
}

impl ClassificationError {
    pub fn kind(&self) -> ClassificationErrorKind {
        match self {
            Self::Unreachable(_) => ClassificationErrorKind::Unreachable,
            Self::MalformedResponse(_) => ClassificationErrorKind::MalformedResponse,
            Self::InvalidSchema(_) => ClassificationErrorKind::InvalidSchema,
        }
    }

    /// Short text suitable for an alert or banner
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => {
                "Failed to analyze email. Please check your API key or network connection."
            }
            Self::MalformedResponse(_) => {
                "Failed to analyze email. The classification service returned an unreadable response."
            }
            Self::InvalidSchema(_) => {
                "Failed to analyze email. The classification service returned an invalid verdict."
            }
        }
    }
}

/// Port for LLM-based email classification
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the text, returning a freshly stamped record
    async fn classify(&self, text: &str) -> Result<ClassificationRecord, ClassificationError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock frozen at a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
