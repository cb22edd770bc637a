use std::{fmt, io};

/// Crate-wide `Result` type using [`DumpError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, DumpError>;

/// Top-level error type for scrolldump operations.
///
/// Every step failure ends up here before it is rendered into the
/// `{"error": ...}` payload.
#[derive(Debug)]
pub enum DumpError {
    /// The job state is missing required fields.
    Validation(ValidationError),

    /// Errors talking to the search engine.
    Search(SearchError),

    /// Errors writing a page to the object store.
    Store(StoreError),

    /// Errors dispatching a continuation.
    Schedule(ScheduleError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// JSON (de)serialization errors.
    Json(serde_json::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Job state validation errors.
#[derive(Debug)]
pub enum ValidationError {
    /// One or more required fields are empty or absent.
    ///
    /// `state` is the offending state rendered as JSON.
    InvalidParameters {
        missing: Vec<&'static str>,
        state: String,
    },
}

/// Search engine errors.
#[derive(Debug)]
pub enum SearchError {
    /// Transport failure (connect, timeout, reset).
    Network(String),

    /// Malformed or unexpected response.
    Protocol(String),

    /// The open request succeeded but carried no cursor token.
    MissingCursor { endpoint: String, collection: String },

    /// The scroll response reported failed shards.
    ShardFailure { failed: u64, total: u64 },
}

/// Object store errors.
#[derive(Debug)]
pub enum StoreError {
    /// Transport or service failure.
    Network(String),

    /// The store refused the write.
    Permission(String),
}

/// Continuation dispatch errors.
#[derive(Debug)]
pub enum ScheduleError {
    /// Transport or service failure while invoking the continuation.
    Network(String),

    /// The invocation was accepted but the target reported a failure.
    Rejected(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl ValidationError {
    /// Required fields that were empty or absent.
    ///
    /// Empty when the payload could not be parsed at all.
    pub fn missing(&self) -> &[&'static str] {
        match self {
            ValidationError::InvalidParameters { missing, .. } => missing,
        }
    }
}

impl DumpError {
    /// Short machine-readable kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DumpError::Validation(_) => "validation",
            DumpError::Search(SearchError::Network(_)) => "network",
            DumpError::Search(SearchError::ShardFailure { .. }) => "shard_failure",
            DumpError::Search(_) => "protocol",
            DumpError::Store(StoreError::Network(_)) => "network",
            DumpError::Store(StoreError::Permission(_)) => "permission",
            DumpError::Schedule(_) => "network",
            DumpError::Config(_) => "config",
            DumpError::Io(_) => "io",
            DumpError::Json(_) => "serialization",
            DumpError::Generic(_) => "generic",
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for DumpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::Validation(e) => write!(f, "{e}"),
            DumpError::Search(e) => write!(f, "{e}"),
            DumpError::Store(e) => write!(f, "Object store error: {e}"),
            DumpError::Schedule(e) => write!(f, "Continuation error: {e}"),
            DumpError::Config(e) => write!(f, "Configuration error: {e}"),
            DumpError::Io(e) => write!(f, "I/O error: {e}"),
            DumpError::Json(e) => write!(f, "Serialization error: {e}"),
            DumpError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidParameters { state, .. } => {
                write!(f, "Invalid Parameters: {state}")
            }
        }
    }
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::Network(msg) => write!(f, "Search request failed: {msg}"),
            SearchError::Protocol(msg) => write!(f, "Unexpected search response: {msg}"),
            SearchError::MissingCursor {
                endpoint,
                collection,
            } => write!(f, "Can not get the scroll_id: {endpoint} {collection}"),
            SearchError::ShardFailure { failed, total } => write!(
                f,
                "Scroll request has failed on {failed} shards out of {total}."
            ),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Network(msg) => write!(f, "{msg}"),
            StoreError::Permission(msg) => write!(f, "Permission denied: {msg}"),
        }
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Network(msg) => write!(f, "{msg}"),
            ScheduleError::Rejected(msg) => write!(f, "Invocation rejected: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for DumpError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for SearchError {}
impl std::error::Error for StoreError {}
impl std::error::Error for ScheduleError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to DumpError ========================= */

impl From<io::Error> for DumpError {
    fn from(err: io::Error) -> Self {
        DumpError::Io(err)
    }
}

impl From<serde_json::Error> for DumpError {
    fn from(err: serde_json::Error) -> Self {
        DumpError::Json(err)
    }
}

impl From<ValidationError> for DumpError {
    fn from(err: ValidationError) -> Self {
        DumpError::Validation(err)
    }
}

impl From<SearchError> for DumpError {
    fn from(err: SearchError) -> Self {
        DumpError::Search(err)
    }
}

impl From<StoreError> for DumpError {
    fn from(err: StoreError) -> Self {
        DumpError::Store(err)
    }
}

impl From<ScheduleError> for DumpError {
    fn from(err: ScheduleError) -> Self {
        DumpError::Schedule(err)
    }
}

impl From<ConfigError> for DumpError {
    fn from(err: ConfigError) -> Self {
        DumpError::Config(err)
    }
}

impl From<String> for DumpError {
    fn from(msg: String) -> Self {
        DumpError::Generic(msg)
    }
}

impl From<&str> for DumpError {
    fn from(msg: &str) -> Self {
        DumpError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_failure_message() {
        let err: DumpError = SearchError::ShardFailure {
            failed: 2,
            total: 5,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Scroll request has failed on 2 shards out of 5."
        );
        assert_eq!(err.kind(), "shard_failure");
    }

    #[test]
    fn test_missing_cursor_message() {
        let err = SearchError::MissingCursor {
            endpoint: "http://es:9200".to_string(),
            collection: "logs".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Can not get the scroll_id: http://es:9200 logs"
        );
    }

    #[test]
    fn test_invalid_parameters_message() {
        let err = ValidationError::InvalidParameters {
            missing: vec!["destination_bucket"],
            state: r#"{"destination_bucket": ""}"#.to_string(),
        };
        assert_eq!(err.missing(), ["destination_bucket"]);
        assert_eq!(
            err.to_string(),
            r#"Invalid Parameters: {"destination_bucket": ""}"#
        );
        assert_eq!(DumpError::from(err).kind(), "validation");
    }

    #[test]
    fn test_permission_kind() {
        let err: DumpError = StoreError::Permission("AccessDenied".into()).into();
        assert_eq!(err.kind(), "permission");
        assert!(err.to_string().contains("AccessDenied"));
    }
}
