//! Error types for platform operations.
//!
//! Errors are categorized so the reconcile flows can tell transient failures
//! (retried only while waiting), benign ones (ignored), and everything else
//! (propagated with the original remote code and message).

use crate::types::ResourceKind;
use declarative::WaitError;
use std::time::Duration;
use thiserror::Error;

/// Categories of platform errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limiting (transient)
    Throttling,
    /// Resource does not exist
    NotFound,
    /// More than one match where one was required
    Ambiguous,
    /// Name already taken
    Conflict,
    /// Backing artifact already gone (benign during deletion)
    MissingSource,
    /// Caller supplied an invalid combination of parameters
    InvalidInput,
    /// Waited too long for a mutation to become observable
    Timeout,
    /// Transport failure talking to the control plane
    Network,
    /// Any other rejection from the control plane
    Remote,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether the waiter should swallow this error and keep polling.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Throttling)
    }

    /// Whether this error can be safely ignored (operation effectively done).
    pub fn is_ignorable(&self) -> bool {
        matches!(self, Self::MissingSource)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Throttling => "Request rate exceeded",
            Self::NotFound => "Resource not found",
            Self::Ambiguous => "Ambiguous match",
            Self::Conflict => "Resource already exists",
            Self::MissingSource => "Source bundle missing",
            Self::InvalidInput => "Invalid request",
            Self::Timeout => "Timed out waiting",
            Self::Network => "Network connectivity issue",
            Self::Remote => "Rejected by the platform",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Throttling => "Wait a moment and run the command again",
            Self::NotFound => "Check the application and resource names",
            Self::Ambiguous => "Use a more specific name so exactly one resource matches",
            Self::Conflict => "Pick another name or manage the existing resource",
            Self::MissingSource => "No action needed - the artifact is already gone",
            Self::InvalidInput => "Check the command parameters",
            Self::Timeout => "Increase --wait-timeout or inspect the resource on the platform",
            Self::Network => "Check the endpoint and your connection, then try again",
            Self::Remote => "Check the error code and message returned by the platform",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The control plane is rate limiting requests
    #[error("throttled: {message}")]
    Throttling {
        /// Message returned by the platform
        message: String,
    },

    /// Resource does not exist
    #[error("{message}")]
    NotFound {
        /// Kind of resource that was looked up
        kind: ResourceKind,
        /// Name used in the lookup
        name: String,
        /// Message returned by the platform, or a local description
        message: String,
    },

    /// More than one resource matched a unique-name query
    #[error("expected one {kind} named '{query}', found {count}")]
    AmbiguousMatch {
        /// Kind of resource queried
        kind: ResourceKind,
        /// Query term
        query: String,
        /// Number of matches
        count: usize,
    },

    /// Create rejected because the name is taken
    #[error("{message}")]
    AlreadyExists {
        /// Kind of resource
        kind: ResourceKind,
        /// Name that is already taken
        name: String,
        /// Message returned by the platform
        message: String,
    },

    /// Version deleted but its source bundle could not be removed
    #[error("source bundle for version {label} could not be deleted: {message}")]
    SourceBundleMissing {
        /// Version label
        label: String,
        /// Message returned by the platform
        message: String,
    },

    /// Any other rejection, with the original code and message
    #[error("{code}: {message}")]
    Remote {
        /// Error code returned by the platform
        code: String,
        /// Message returned by the platform
        message: String,
    },

    /// Waited too long for a mutation to become observable
    #[error("timed out after {}s waiting for {waiting_for} ({polls} polls)", .elapsed.as_secs())]
    Timeout {
        /// Condition that was never met
        waiting_for: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of polls performed
        polls: u32,
    },

    /// Caller supplied an invalid combination of parameters
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Version cleanup stopped part way through
    #[error(
        "cleanup aborted at version {failed} after removing {}: {source}; not processed: {}",
        .removed.len(),
        .not_processed.join(", ")
    )]
    CleanupAborted {
        /// Label whose deletion failed
        failed: String,
        /// Why it failed
        source: Box<Error>,
        /// Labels removed before the failure
        removed: Vec<String>,
        /// Labels never attempted
        not_processed: Vec<String>,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {message}")]
    Http {
        /// Error description
        message: String,
        /// Status code, if a response was received
        status: Option<u16>,
    },

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Throttling { .. } => ErrorCategory::Throttling,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::AmbiguousMatch { .. } => ErrorCategory::Ambiguous,
            Error::AlreadyExists { .. } => ErrorCategory::Conflict,
            Error::SourceBundleMissing { .. } => ErrorCategory::MissingSource,
            Error::Remote { .. } => ErrorCategory::Remote,
            Error::Timeout { .. } => ErrorCategory::Timeout,
            Error::InvalidRequest(_) => ErrorCategory::InvalidInput,
            Error::CleanupAborted { source, .. } => source.category(),
            Error::Http { .. } => ErrorCategory::Network,
            Error::Json(_) | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether the waiter should keep polling after this error.
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    /// Whether this error can be safely ignored.
    pub fn is_ignorable(&self) -> bool {
        self.category().is_ignorable()
    }

    /// Whether this error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is a name-already-taken rejection.
    pub fn is_already_exists(&self) -> bool {
        self.category() == ErrorCategory::Conflict
    }

    /// Create an error from a raw control plane rejection.
    ///
    /// Analyzes the code and message to categorize the error appropriately.
    /// `kind` and `name` identify the resource the failed call addressed.
    pub fn from_remote(code: &str, message: &str, kind: ResourceKind, name: &str) -> Self {
        let message = message.trim();
        let lower = message.to_lowercase();

        if code == "Throttling" || code == "ThrottlingException" {
            return Error::Throttling {
                message: message.to_string(),
            };
        }

        if code == "SourceBundleDeletionFailure" {
            return Error::SourceBundleMissing {
                label: name.to_string(),
                message: message.to_string(),
            };
        }

        if lower.contains("already exists") {
            return Error::AlreadyExists {
                kind,
                name: name.to_string(),
                message: message.to_string(),
            };
        }

        if describes_missing(kind, &lower) {
            return Error::NotFound {
                kind,
                name: name.to_string(),
                message: message.to_string(),
            };
        }

        Error::Remote {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// A resource observed missing locally, e.g. after a wait.
    pub fn not_found(kind: ResourceKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
            message: format!("{kind} not found: {name}"),
        }
    }

    /// Create an HTTP error.
    pub fn http(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Http {
            message: message.into(),
            status,
        }
    }
}

/// Whether a lowercased remote message says the addressed resource is missing.
///
/// A call addressing one kind can fail because a referenced resource of
/// another kind is missing (an environment update naming an unknown
/// version); that stays a remote error.
fn describes_missing(kind: ResourceKind, lower: &str) -> bool {
    let (phrase, mentioned) = match kind {
        ResourceKind::Application => (
            "no application named",
            lower.contains("application") && !lower.contains("application version"),
        ),
        ResourceKind::Version => ("no application version named", lower.contains("version")),
        ResourceKind::Environment => ("no environment found", lower.contains("environment")),
        ResourceKind::Template => ("no configuration template named", lower.contains("template")),
    };
    lower.contains(phrase) || (mentioned && lower.contains("not found"))
}

impl From<WaitError<Error>> for Error {
    fn from(err: WaitError<Error>) -> Self {
        match err {
            WaitError::TimedOut {
                predicate,
                elapsed,
                polls,
            } => Self::Timeout {
                waiting_for: predicate,
                elapsed,
                polls,
            },
            WaitError::Failed(e) => e,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::http(format!("HTTP {code}"), Some(code)),
            other => Self::http(other.to_string(), None),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidRequest(format!("invalid endpoint URL: {err}"))
    }
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, Error>;
