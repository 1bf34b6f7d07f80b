//! Client error types.

use std::fmt;

use chrono::{DateTime, Utc};
use graphwork_auth::Audience;
use thiserror::Error;

use crate::workflow::{WorkflowState, WorkflowStep};

/// Error from a single authenticated request.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Server answered with a non-2xx status.
    #[error("request rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body, for diagnostics.
        body: String,
    },

    /// A 2xx response whose body is not the JSON we expected.
    #[error("malformed response body: {0}")]
    MalformedBody(String),

    /// The call was cancelled through the client's cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// The token was issued for a different resource than this client targets.
    #[error("token audience '{actual}' does not match client audience '{expected}'")]
    AudienceMismatch { expected: Audience, actual: Audience },

    /// The token's validity window has passed.
    #[error("bearer token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    /// Transport failure (connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl HttpError {
    /// HTTP status if the server rejected the request.
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
            || matches!(
                self,
                HttpError::AudienceMismatch { .. } | HttpError::TokenExpired(_)
            )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, HttpError::Cancelled)
    }
}

/// Error while traversing a paginated collection.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// Fetching the page at `cursor` failed; items from earlier pages stay valid.
    #[error("failed to fetch page {cursor}: {source}")]
    PageFetchFailed {
        cursor: String,
        #[source]
        source: HttpError,
    },

    /// An entry of the page's `value` array is not an object.
    #[error("item {index} of page {cursor} is not an object")]
    MalformedItem { cursor: String, index: usize },
}

impl PaginationError {
    /// The cursor of the page that failed.
    pub fn cursor(&self) -> &str {
        match self {
            PaginationError::PageFetchFailed { cursor, .. }
            | PaginationError::MalformedItem { cursor, .. } => cursor,
        }
    }

    /// The underlying HTTP error, if the page could not be fetched.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            PaginationError::PageFetchFailed { source, .. } => Some(source),
            PaginationError::MalformedItem { .. } => None,
        }
    }
}

/// Why the copy/transform workflow stopped.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("no drive found for site '{site_id}'")]
    DriveNotFound { site_id: String },

    #[error("no template found in '{path}'")]
    NoTemplateFound { path: String },

    #[error("folder '{path}' not found")]
    FolderNotFound { path: String },

    #[error("copy request rejected ({status})")]
    CopyRejected { status: u16 },

    #[error("copy '{path}' is not visible")]
    CopyNotVisible { path: String },

    #[error("range unreadable: {reason}")]
    RangeUnreadable { reason: String },

    #[error("range write rejected ({status})")]
    WriteRejected { status: u16 },

    /// Transport failure, cancellation or an unexpected status during `step`.
    #[error("{step} failed: {source}")]
    Request {
        step: WorkflowStep,
        #[source]
        source: HttpError,
    },

    /// Listing the source folder failed.
    #[error("listing source folder failed: {0}")]
    Listing(#[source] PaginationError),
}

impl WorkflowError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            WorkflowError::Request { source, .. } => source.is_cancelled(),
            WorkflowError::Listing(e) => e.http().is_some_and(HttpError::is_cancelled),
            _ => false,
        }
    }
}

/// A terminal workflow error plus how far the run got.
#[derive(Debug, Error)]
pub struct WorkflowFailure {
    /// Last step that completed, `None` if the first step failed.
    pub last_completed: Option<WorkflowStep>,
    /// Progress at the time of failure (e.g. the name of an orphaned copy).
    pub state: WorkflowState,
    #[source]
    pub error: WorkflowError,
}

impl fmt::Display for WorkflowFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last_completed {
            Some(step) => write!(
                f,
                "workflow stopped after step {} ({}): {}",
                step.index(),
                step,
                self.error
            ),
            None => write!(f, "workflow stopped before completing any step: {}", self.error),
        }
    }
}

/// Result type for single requests.
pub type Result<T> = std::result::Result<T, HttpError>;
