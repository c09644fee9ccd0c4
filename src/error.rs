use std::fmt;

use thiserror::Error;

use crate::docs::types::Format;

/// Boxed collaborator error, kept as the `source` of a typed failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures while turning a source into a `FileDataset`.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported format '{hint}' (expected csv, xlsx/xls/ods or pdf)")]
    UnsupportedFormat { hint: String },
    #[error("malformed {format} source: {reason}")]
    Read { format: Format, reason: String },
    #[error("could not reach '{target}': {source}")]
    Transport {
        target: String,
        #[source]
        source: BoxError,
    },
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            IngestError::Read { .. } => FailureKind::Read,
            IngestError::Transport { .. } => FailureKind::Transport,
        }
    }

    pub(crate) fn read(format: Format, reason: impl fmt::Display) -> Self {
        IngestError::Read {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(target: impl Into<String>, source: anyhow::Error) -> Self {
        IngestError::Transport {
            target: target.into(),
            source: source.into(),
        }
    }
}

/// Coarse failure class recorded for each file a batch could not ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnsupportedFormat,
    Read,
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnsupportedFormat => "unsupported_format",
            FailureKind::Read => "read_error",
            FailureKind::Transport => "transport_error",
        };
        f.write_str(s)
    }
}

/// Failures while answering a question.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("no files have been ingested yet")]
    EmptyContext,
    #[error("generation failed: {0}")]
    Generation(#[source] BoxError),
}

impl AskError {
    /// Text shown to a user who asked before loading anything.
    pub const EMPTY_CONTEXT_GUIDANCE: &'static str =
        "Please provide a file for related questions.";
}
