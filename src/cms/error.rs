//! Errors returned at the CMS boundary

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CmsError {
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("access denied: {0}")]
    Unauthorized(String),
    #[error("{doc_type} `{uid}` not found")]
    NotFound { doc_type: String, uid: String },
    #[error("malformed content: {0}")]
    Malformed(String),
    #[error("CMS returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl CmsError {
    pub fn malformed(err: impl std::fmt::Display) -> Self {
        Self::Malformed(err.to_string())
    }

    /// Map a transport error, keeping timeouts distinguishable
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Failures worth retrying by repeating the same action
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(CmsError::Network("reset".into()).is_transient());
        assert!(CmsError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!CmsError::Unauthorized("bad token".into()).is_transient());
        assert!(!CmsError::malformed("missing title").is_transient());
    }

    #[test]
    fn test_not_found_message() {
        let err = CmsError::NotFound {
            doc_type: "posts".into(),
            uid: "missing".into(),
        };
        assert_eq!(err.to_string(), "posts `missing` not found");
    }
}
