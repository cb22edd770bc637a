use serde::{Deserialize, Serialize};

use super::DumpError;

/// Payload returned across the invocation boundary.
///
/// Serializes to exactly one of `{"acknowledged": true}` or
/// `{"error": "<message>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepResponse {
    /// The step completed (continuation scheduled or export finished).
    Acknowledged { acknowledged: bool },

    /// The step failed; nothing was scheduled.
    Error { error: String },
}

impl StepResponse {
    /// The success acknowledgement.
    pub fn acknowledged() -> Self {
        StepResponse::Acknowledged { acknowledged: true }
    }

    /// Build an error descriptor from a free-form message.
    pub fn error(message: impl Into<String>) -> Self {
        StepResponse::Error {
            error: message.into(),
        }
    }

    /// Whether this is the success acknowledgement.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, StepResponse::Acknowledged { acknowledged: true })
    }

    /// The error message, if this is an error descriptor.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            StepResponse::Error { error } => Some(error),
            StepResponse::Acknowledged { .. } => None,
        }
    }

    /// Convert to a compact JSON value.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            StepResponse::Acknowledged { acknowledged } => {
                serde_json::json!({ "acknowledged": acknowledged })
            }
            StepResponse::Error { error } => serde_json::json!({ "error": error }),
        }
    }
}

impl From<&DumpError> for StepResponse {
    fn from(err: &DumpError) -> Self {
        StepResponse::error(err.to_string())
    }
}

impl<T> From<super::Result<T>> for StepResponse {
    fn from(result: super::Result<T>) -> Self {
        match result {
            Ok(_) => StepResponse::acknowledged(),
            Err(e) => StepResponse::from(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SearchError;

    #[test]
    fn test_acknowledged_shape() {
        let json = serde_json::to_string(&StepResponse::acknowledged()).unwrap();
        assert_eq!(json, r#"{"acknowledged":true}"#);
    }

    #[test]
    fn test_error_shape() {
        let err = DumpError::from(SearchError::Protocol("no hits".into()));
        let response = StepResponse::from(&err);
        assert_eq!(
            response.to_value(),
            serde_json::json!({ "error": "Unexpected search response: no hits" })
        );
        assert!(!response.is_acknowledged());
    }

    #[test]
    fn test_deserialize_both_shapes() {
        let ok: StepResponse = serde_json::from_str(r#"{"acknowledged": true}"#).unwrap();
        assert!(ok.is_acknowledged());

        let err: StepResponse = serde_json::from_str(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(err.error_message(), Some("boom"));
    }
}
