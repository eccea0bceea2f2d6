use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The connectivity probe reports no usable network
    #[error("Offline: no active network")]
    Offline,

    /// Empty or missing URL / cache key
    #[error("Empty URL")]
    EmptyUrl,

    /// Transport-level I/O failure
    #[error("Network Error: {0}")]
    Network(String),

    /// Server answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    /// Request exceeded the configured timeout
    #[error("Timeout Error: {0}")]
    Timeout(String),

    /// JSON or payload parsing errors
    #[error("Parse Error: {0}")]
    Parse(String),

    /// Image or base64 decoding errors
    #[error("Decode Error: {0}")]
    Decode(String),

    /// Local file-system errors
    #[error("IO Error: {0}")]
    Io(String),

    /// Persistent cache store errors
    #[error("Cache Error: {0}")]
    Cache(String),

    /// Resource was not produced by the collaborator
    #[error("Not Found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    Config(String),
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(format!("JSON deserialization error: {}", err))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

impl From<redis::RedisError> for FetchError {
    fn from(err: redis::RedisError) -> Self {
        FetchError::Cache(format!("Redis error: {}", err))
    }
}

impl From<base64::DecodeError> for FetchError {
    fn from(err: base64::DecodeError) -> Self {
        FetchError::Decode(format!("base64: {}", err))
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        FetchError::Config(format!("Anyhow error: {}", err))
    }
}

impl FetchError {
    /// Whether a caller-side retry could plausibly succeed. Nothing inside
    /// this crate retries.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FetchError::Offline => true,    // Network may come back
            FetchError::EmptyUrl => false,
            FetchError::Network(_) => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Timeout(_) => true,
            FetchError::Parse(_) => false,  // Same payload parses the same way
            FetchError::Decode(_) => false,
            FetchError::Io(_) => true,
            FetchError::Cache(_) => true,   // Redis might recover
            FetchError::NotFound(_) => false,
            FetchError::Config(_) => false,
        }
    }

    /// Categorizes error for log grouping
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            FetchError::Offline
            | FetchError::Network(_)
            | FetchError::Status { .. }
            | FetchError::Timeout(_) => ErrorCategory::Network,
            FetchError::Parse(_) | FetchError::Decode(_) | FetchError::NotFound(_) => {
                ErrorCategory::Data
            }
            FetchError::Io(_) | FetchError::Cache(_) => ErrorCategory::Infrastructure,
            FetchError::EmptyUrl | FetchError::Config(_) => ErrorCategory::Configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    Infrastructure,
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_recoverable_client_errors_are_not() {
        let server = FetchError::Status { status: 503, url: "https://a".into() };
        let client = FetchError::Status { status: 404, url: "https://a".into() };
        assert!(server.is_recoverable());
        assert!(!client.is_recoverable());
        assert_eq!(client.categorize(), ErrorCategory::Network);
    }

    #[test]
    fn test_json_error_maps_to_parse() {
        let err: FetchError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, FetchError::Parse(_)));
        assert!(!err.is_recoverable());
        assert_eq!(err.categorize(), ErrorCategory::Data);
    }

    #[test]
    fn test_io_error_maps_to_io() {
        let err: FetchError = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert_eq!(err, FetchError::Io("disk full".to_string()));
    }
}
