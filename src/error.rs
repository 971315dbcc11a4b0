//! Error types shared by the loader, extractor and stores

use thiserror::Error;

/// Failure to obtain playlist text. The previous channel list stays in place.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playlist load cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Cancelled => false,
            FetchError::Status(code) => !(400..500).contains(code),
            FetchError::Io(e) => e.kind() != std::io::ErrorKind::NotFound,
            FetchError::Request(_) | FetchError::Timeout(_) => true,
        }
    }
}

impl From<ureq::Error> for FetchError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => FetchError::Status(code),
            ureq::Error::Timeout(t) => FetchError::Timeout(t.to_string()),
            ureq::Error::Io(e) => FetchError::Io(e),
            other => FetchError::Request(other.to_string()),
        }
    }
}

/// Malformed metadata line. Never leaves the extractor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseEntryError {
    #[error("line does not start with #EXTINF:")]
    MissingMarker,

    #[error("attribute {0} has no closing quote")]
    UnterminatedAttribute(&'static str),
}

/// Favorites/settings file could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt store: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(FetchError::Status(404).to_string(), "HTTP error: 404");
        assert_eq!(FetchError::Cancelled.to_string(), "Playlist load cancelled");
        assert_eq!(
            ParseEntryError::UnterminatedAttribute("tvg-logo").to_string(),
            "attribute tvg-logo has no closing quote"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::Status(404).is_retryable());
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Timeout("global".to_string()).is_retryable());
    }
}
