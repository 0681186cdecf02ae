//! Error types for the turn engine
//!
//! - Generation failures, split into retryable and terminal
//! - Document store failures
//! - Turn-level failures wrapping both

use reqgraph_model::ModelError;
use std::time::Duration;

/// Failure of one generation-service call
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Provider throttled the call
    #[error("rate limited")]
    RateLimited {
        /// Provider-suggested wait
        retry_after: Option<Duration>,
    },

    /// Call did not complete in time
    #[error("generation timed out")]
    Timeout,

    /// Provider unreachable or failing
    #[error("generation service unavailable: {0}")]
    Unavailable(String),

    /// Provider refused the request
    #[error("generation request rejected: {0}")]
    Rejected(String),

    /// Retryable failures kept recurring
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// Check if another attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout)
    }

    /// Wait the provider asked for, if any
    #[inline]
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Document persistence failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Project id cannot name a stored document
    #[error("invalid project id: '{0}'")]
    InvalidProjectId(String),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be read or written
    #[error("document error: {0}")]
    Model(#[from] ModelError),
}

/// Failure of a whole turn
///
/// A failed turn never writes the stored document.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Primary generation call failed
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Loading or saving the document failed
    #[error("store failed: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be read
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if repeating the turn may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Generation(GenerationError::Exhausted { .. }) => true,
            Self::Generation(err) => err.is_retryable(),
            Self::Store(StoreError::Io(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_throttling_and_timeouts_retry() {
        assert!(GenerationError::Timeout.is_retryable());
        assert!(GenerationError::RateLimited { retry_after: None }.is_retryable());
        assert!(!GenerationError::Unavailable("down".into()).is_retryable());
        assert!(!GenerationError::Rejected("bad".into()).is_retryable());
    }

    #[test]
    fn exhausted_display_names_last_error() {
        let err = GenerationError::Exhausted {
            attempts: 3,
            last: Box::new(GenerationError::Timeout),
        };
        assert_eq!(err.to_string(), "gave up after 3 attempt(s): generation timed out");
        assert!(!err.is_retryable());
        assert!(EngineError::from(err).is_retryable());
    }

    #[test]
    fn retry_after_only_from_rate_limits() {
        let wait = Duration::from_secs(2);
        assert_eq!(
            GenerationError::RateLimited { retry_after: Some(wait) }.retry_after(),
            Some(wait)
        );
        assert_eq!(GenerationError::Timeout.retry_after(), None);
    }
}
