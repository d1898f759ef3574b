//! Error type for a single registry lookup attempt

/// Failure of one bulk-lookup request.
///
/// Every variant is treated as transient by the fetch loop: the whole batch
/// is retried until the attempt budget runs out.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Request did not complete within the deadline
    Timeout,
    /// Response body was not the JSON shape we expect
    Decode(String),
    /// Registry answered with an explicit error structure
    Registry(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
            Self::Registry(msg) => write!(f, "registry error: {msg}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Classify a reqwest error. The URL is stripped so the polite-pool
    /// `mailto` does not end up in logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Timeout;
        }
        if e.is_decode() {
            return Self::Decode(e.without_url().to_string());
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
