//! Error types for Prospector.
//!
//! Library crates use [`ProspectorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-attempt provider failures (`Network`, `Http`, `RateLimited`) are
//! classified as transient or not by [`ProspectorError::is_transient`]; the
//! retry policy wraps the last one in [`ProspectorError::TransientFailure`]
//! once its attempt budget is spent.

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for all Prospector operations.
#[derive(Debug, thiserror::Error)]
pub enum ProspectorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed request parameters (e.g., an inverted size range).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Missing or rejected provider credentials.
    #[error("{provider}: authentication failed: {message}")]
    ProviderAuth { provider: String, message: String },

    /// Transport-level failure (connect, timeout, body read).
    #[error("{provider}: network error: {message}")]
    Network { provider: String, message: String },

    /// Non-success HTTP status that is not auth or rate limiting.
    #[error("{provider}: HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider asked us to slow down.
    #[error("{provider}: rate limited")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    /// A transient failure persisted through every retry attempt.
    #[error("transient failure after {attempts} attempt(s): {last}")]
    TransientFailure {
        attempts: u32,
        #[source]
        last: Box<ProspectorError>,
    },

    /// Response body did not match the expected schema.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Output sink rejected or failed to accept the batch.
    #[error("sink error: {0}")]
    Sink(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ProspectorError>;

impl ProspectorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a network error for the named provider.
    pub fn network(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Create an auth error for the named provider.
    pub fn auth(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ProviderAuth {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map a non-success HTTP status into the failure taxonomy.
    ///
    /// 401/403 are auth failures, 429 is rate limiting, everything else is an
    /// `Http` error whose transience depends on the status class.
    pub fn from_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        let provider = provider.into();
        match status {
            401 | 403 => Self::ProviderAuth {
                provider,
                message: format!("HTTP {status}: {}", message.into()),
            },
            429 => Self::RateLimited {
                provider,
                retry_after,
            },
            _ => Self::Http {
                provider,
                status,
                message: message.into(),
            },
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::RateLimited { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this failure must abort the whole run rather than one candidate.
    pub fn is_batch_fatal(&self) -> bool {
        match self {
            Self::ProviderAuth { .. } | Self::Config { .. } => true,
            Self::TransientFailure { last, .. } => last.is_batch_fatal(),
            _ => false,
        }
    }

    /// Provider-supplied throttling hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ProspectorError::config("missing output dir");
        assert_eq!(err.to_string(), "config error: missing output dir");

        let err = ProspectorError::validation("size range 500-250 is inverted");
        assert!(err.to_string().contains("500-250"));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ProspectorError::from_status("hunter", 401, "bad key", None),
            ProspectorError::ProviderAuth { .. }
        ));
        assert!(matches!(
            ProspectorError::from_status("apollo", 403, "forbidden", None),
            ProspectorError::ProviderAuth { .. }
        ));

        let limited =
            ProspectorError::from_status("hunter", 429, "", Some(Duration::from_secs(7)));
        assert!(limited.is_transient());
        assert_eq!(limited.retry_after(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn transience_by_status_class() {
        assert!(ProspectorError::from_status("llm", 503, "unavailable", None).is_transient());
        assert!(!ProspectorError::from_status("llm", 422, "bad request", None).is_transient());
        assert!(ProspectorError::network("llm", "timed out").is_transient());
        assert!(!ProspectorError::parse("bad json").is_transient());
        assert!(!ProspectorError::auth("llm", "no key").is_transient());
    }

    #[test]
    fn transient_failure_keeps_last_error() {
        let err = ProspectorError::TransientFailure {
            attempts: 3,
            last: Box::new(ProspectorError::network("apollo", "connection reset")),
        };
        assert!(err.to_string().contains("3 attempt(s)"));
        assert!(err.to_string().contains("connection reset"));
        assert!(!err.is_transient());
        assert!(!err.is_batch_fatal());
    }

    #[test]
    fn auth_is_batch_fatal() {
        assert!(ProspectorError::auth("hunter", "invalid key").is_batch_fatal());
        assert!(!ProspectorError::network("hunter", "reset").is_batch_fatal());
    }
}
