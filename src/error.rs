// MIT License - Copyright (c) 2026 Peter Wright
// Error types

/// All errors that can occur in the tuxedo-bridge library.
///
/// Status queries never surface these: a failed query degrades into the
/// synthetic `"Error"` status instead. They are returned by commands,
/// session refreshes and configuration checks.
#[derive(Debug, thiserror::Error)]
pub enum TuxedoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timeout: {url}")]
    Timeout { url: String },

    #[error("Panel returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Invalid response: {details}")]
    InvalidResponse { details: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl TuxedoError {
    /// Classify a reqwest error, pulling timeouts and status codes out into
    /// their own variants so log lines stay readable.
    pub fn from_request(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TuxedoError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            TuxedoError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            // The request URL carries the alarm code in its query
            TuxedoError::Http(err.without_url())
        }
    }

    /// Whether this error came from the network round trip rather than from
    /// the content of a response or local configuration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TuxedoError::Http(_) | TuxedoError::Timeout { .. } | TuxedoError::HttpStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TuxedoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(TuxedoError::Timeout { url: "http://x".into() }.is_transport());
        assert!(TuxedoError::HttpStatus { status: 500, url: "http://x".into() }.is_transport());
        assert!(!TuxedoError::InvalidResponse { details: "no Status".into() }.is_transport());
        assert!(!TuxedoError::InvalidConfig { reason: "empty host".into() }.is_transport());
    }

    #[test]
    fn test_display() {
        let err = TuxedoError::HttpStatus {
            status: 503,
            url: "http://panel/home.html".into(),
        };
        assert_eq!(err.to_string(), "Panel returned HTTP 503 for http://panel/home.html");
    }
}
