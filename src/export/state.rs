//! Job state carried between export steps
//!
//! A `JobState` is both the input and (with an updated cursor) the output of
//! one step. It is resolved once from a raw [`JobPayload`], which is where
//! configuration defaults are applied.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ExportDefaults;
use crate::error::{Result, ValidationError};

/// Opaque server-issued pagination token.
///
/// Never empty: an empty token on the wire is read as "no cursor".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Wrap a token, returning `None` for an empty one.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw invocation payload, before defaults are applied.
///
/// Accepts the legacy field names (`source_host`, `source_index`,
/// `s3_bucket`, `s3_prefix`, `scroll_id`, `scroll`, `scan_options`,
/// `bulk_options`) so older triggers keep working. A payload may use either
/// name for a field but not both; giving `cursor` and `scroll_id` together
/// is a duplicate-field error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(default, alias = "source_host", skip_serializing_if = "Option::is_none")]
    pub source_endpoint: Option<String>,

    #[serde(default, alias = "source_index", skip_serializing_if = "Option::is_none")]
    pub source_collection: Option<String>,

    #[serde(default, alias = "s3_bucket", skip_serializing_if = "Option::is_none")]
    pub destination_bucket: Option<String>,

    #[serde(default, alias = "s3_prefix", skip_serializing_if = "Option::is_none")]
    pub destination_prefix: Option<String>,

    #[serde(default, alias = "scroll_id", skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    #[serde(default, alias = "scroll", skip_serializing_if = "Option::is_none")]
    pub page_ttl: Option<String>,

    #[serde(default, alias = "scan_options", skip_serializing_if = "Option::is_none")]
    pub query_options: Option<Map<String, Value>>,

    #[serde(default, alias = "bulk_options", skip_serializing_if = "Option::is_none")]
    pub fetch_options: Option<Map<String, Value>>,
}

impl JobPayload {
    /// Parse a payload from an arbitrary JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Apply defaults and produce a `JobState`.
    ///
    /// Missing required fields become empty strings; the step's validation
    /// gate rejects them before any side effect.
    pub fn resolve(self, defaults: &ExportDefaults) -> JobState {
        JobState {
            source_endpoint: self.source_endpoint.unwrap_or_default(),
            source_collection: self.source_collection.unwrap_or_default(),
            destination_bucket: self.destination_bucket.unwrap_or_default(),
            destination_prefix: self.destination_prefix.unwrap_or_default(),
            cursor: self.cursor.and_then(Cursor::new),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            page_ttl: self
                .page_ttl
                .filter(|ttl| !ttl.is_empty())
                .unwrap_or_else(|| defaults.page_ttl.clone()),
            query_options: self
                .query_options
                .unwrap_or_else(|| defaults.query_options.clone()),
            fetch_options: self
                .fetch_options
                .unwrap_or_else(|| defaults.fetch_options.clone()),
        }
    }
}

/// Fully resolved state of one export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub source_endpoint: String,
    pub source_collection: String,
    pub destination_bucket: String,
    #[serde(default)]
    pub destination_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    pub page_size: u32,
    pub page_ttl: String,
    #[serde(default)]
    pub query_options: Map<String, Value>,
    #[serde(default)]
    pub fetch_options: Map<String, Value>,
}

impl JobState {
    /// A fresh (not yet started) job with the given defaults.
    pub fn new(
        source_endpoint: impl Into<String>,
        source_collection: impl Into<String>,
        destination_bucket: impl Into<String>,
        defaults: &ExportDefaults,
    ) -> Self {
        JobPayload {
            source_endpoint: Some(source_endpoint.into()),
            source_collection: Some(source_collection.into()),
            destination_bucket: Some(destination_bucket.into()),
            ..JobPayload::default()
        }
        .resolve(defaults)
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.source_endpoint.is_empty() {
            missing.push("source_endpoint");
        }
        if self.source_collection.is_empty() {
            missing.push("source_collection");
        }
        if self.destination_bucket.is_empty() {
            missing.push("destination_bucket");
        }
        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Validation gate run once per step before any side effect.
    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }
        let state = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        Err(ValidationError::InvalidParameters { missing, state }.into())
    }

    /// A copy of this state positioned at `cursor`.
    pub fn with_cursor(&self, cursor: Cursor) -> JobState {
        JobState {
            cursor: Some(cursor),
            ..self.clone()
        }
    }

    /// A copy of this state with `prefix` as its destination prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> JobState {
        self.destination_prefix = prefix.into();
        self
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} -> s3://{}/{}",
            self.source_endpoint, self.source_collection, self.destination_bucket,
            self.destination_prefix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> ExportDefaults {
        ExportDefaults::default()
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let payload = JobPayload::from_value(json!({
            "source_endpoint": "http://es:9200",
            "source_collection": "logs",
            "destination_bucket": "dumps",
        }))
        .unwrap();
        let state = payload.resolve(&defaults());

        assert_eq!(state.destination_prefix, "");
        assert_eq!(state.cursor, None);
        assert_eq!(state.page_size, 10);
        assert_eq!(state.page_ttl, "1m");
        assert!(state.query_options.is_empty());
        assert!(state.is_valid());
    }

    #[test]
    fn test_legacy_field_names() {
        let payload = JobPayload::from_value(json!({
            "source_host": "es:9200",
            "source_index": "logs",
            "s3_bucket": "dumps",
            "s3_prefix": "2024/",
            "scroll_id": "c2Nhbjs1Ow==",
            "scroll": "2m",
            "scan_options": { "q": "level:error" },
        }))
        .unwrap();
        let state = payload.resolve(&defaults());

        assert_eq!(state.source_endpoint, "es:9200");
        assert_eq!(state.destination_prefix, "2024/");
        assert_eq!(state.cursor.as_ref().map(Cursor::as_str), Some("c2Nhbjs1Ow=="));
        assert_eq!(state.page_ttl, "2m");
        assert_eq!(state.query_options["q"], json!("level:error"));
    }

    #[test]
    fn test_new_and_legacy_name_together_rejected() {
        let err = JobPayload::from_value(json!({
            "source_endpoint": "http://es:9200",
            "source_collection": "logs",
            "destination_bucket": "dumps",
            "cursor": "abc",
            "scroll_id": "def",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("duplicate field"), "{err}");
    }

    #[test]
    fn test_empty_cursor_is_absent() {
        let payload = JobPayload {
            cursor: Some(String::new()),
            ..JobPayload::default()
        };
        assert_eq!(payload.resolve(&defaults()).cursor, None);
        assert!(Cursor::new("").is_none());
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let state = JobPayload {
            source_endpoint: Some("http://es:9200".into()),
            ..JobPayload::default()
        }
        .resolve(&defaults());

        assert_eq!(
            state.missing_fields(),
            vec!["source_collection", "destination_bucket"]
        );
        let message = state.validate().unwrap_err().to_string();
        assert!(message.starts_with("Invalid Parameters: "));
        assert!(message.contains("http://es:9200"));
    }

    #[test]
    fn test_with_cursor_preserves_other_fields() {
        let mut state = JobState::new("http://es:9200", "logs", "dumps", &defaults());
        state.query_options.insert("q".into(), json!("*"));
        let cursor = Cursor::new("abc").unwrap();

        let next = state.with_cursor(cursor.clone());

        assert_eq!(next.cursor, Some(cursor));
        assert_eq!(state.cursor, None);
        assert_eq!(
            JobState {
                cursor: None,
                ..next
            },
            state
        );
    }

    #[test]
    fn test_json_round_trip_with_special_cursor() {
        let mut state = JobState::new("https://search.internal:9243/", "logs-*", "dumps", &defaults())
            .with_prefix("exports/été");
        state.fetch_options.insert("filter_path".into(), json!(["hits.hits._source"]));
        let state = state.with_cursor(
            Cursor::new("DXF1ZXJ5QW5kRmV0Y2gBAAAAAAAAAD4W+/=\"\\\n\u{2603}").unwrap(),
        );

        let json = state.to_json().unwrap();
        let back: JobState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);

        let resolved = JobPayload::from_value(state.to_value().unwrap())
            .unwrap()
            .resolve(&defaults());
        assert_eq!(resolved, state);
    }
}
