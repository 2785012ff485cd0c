use std::fmt;

use bytes::Bytes;
use wp_export_core::{MergeOutcome, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub url: String,
    pub content_type: Option<String>,
    /// Parsed `X-WP-TotalPages` header, when the endpoint is paginated.
    pub total_pages: Option<u32>,
    pub byte_len: u64,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} after {attempts} attempt(s): {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: 1,
        }
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    /// The local destination could not be created or written.
    Write,
}

impl FailureKind {
    /// Local write failures and malformed URLs are not worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Write | FailureKind::InvalidUrl)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Write => write!(f, "local write failed"),
        }
    }
}

/// Progress notifications emitted while an export runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    StageEntered(Stage),
    PageFetched {
        collection: &'static str,
        page: u32,
        total_pages: u32,
    },
    RecordMerged {
        collection: &'static str,
        key: String,
        outcome: MergeOutcome,
    },
    PostExported {
        slug: String,
    },
}
