//! Page writers for export operations
//!
//! This module provides a unified interface for storing a rendered page in an
//! object store, and the page rendering and key derivation shared by every
//! writer.
//!
//! A page body is each record serialized as JSON on its own line. Keys are
//! `{prefix}/dumpdata-{UTC %Y-%m-%d-%H-%M-%S}-{md5(body)}`, so identical
//! content written within the same second lands on the same key.

use std::io;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;

use crate::error::Result;

pub mod file;
pub mod log;
pub mod s3;

pub use file::FilePageWriter;
pub use self::log::LogPageWriter;
pub use s3::S3PageWriter;

/// Trait for durably storing a page body under a key
///
/// Implementations do not retry; a failed write fails the step.
#[async_trait]
pub trait PageWriter: Send + Sync {
    /// Store `body` at `bucket`/`key`
    ///
    /// # Arguments
    /// * `bucket` - Destination bucket
    /// * `key` - Object key, see [`object_key`]
    /// * `body` - Newline-delimited JSON records
    async fn write(&self, bucket: &str, key: &str, body: String) -> Result<()>;
}

/// A page ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub key: String,
    pub body: String,
    pub records: usize,
}

impl RenderedPage {
    /// Render `records` and derive the key at time `now`.
    pub fn new(prefix: &str, records: &[Value], now: DateTime<Utc>) -> Result<Self> {
        let body = render_body(records)?;
        Ok(Self {
            key: object_key(prefix, &body, now),
            body,
            records: records.len(),
        })
    }
}

/// Serialize records one per line, non-ASCII left as is.
pub fn render_body(records: &[Value]) -> Result<String> {
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        lines.push(to_spaced_json(record)?);
    }
    Ok(lines.join("\n"))
}

/// Object key for `body` written at `now`.
pub fn object_key(prefix: &str, body: &str, now: DateTime<Utc>) -> String {
    let name = format!(
        "dumpdata-{}-{:x}",
        now.format("%Y-%m-%d-%H-%M-%S"),
        md5::compute(body.as_bytes())
    );
    join_key(prefix, &name)
}

fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{prefix}{name}")
    } else {
        format!("{prefix}/{name}")
    }
}

/// Compact JSON with `", "` and `": "` separators.
///
/// Keeps bodies byte-compatible with dumps produced by earlier exporters.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn to_spaced_json(value: &Value) -> Result<String> {
    let mut buf = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, secs).unwrap()
    }

    #[test]
    fn test_render_body_format() {
        let records = vec![
            json!({ "_id": "1", "_source": { "name": "Zoë", "tags": ["a", "b"] } }),
            json!({ "_id": "2", "_source": {} }),
        ];
        let body = render_body(&records).unwrap();
        assert_eq!(
            body,
            "{\"_id\": \"1\", \"_source\": {\"name\": \"Zoë\", \"tags\": [\"a\", \"b\"]}}\n\
             {\"_id\": \"2\", \"_source\": {}}"
        );
    }

    #[test]
    fn test_render_body_preserves_key_order() {
        let record: Value = serde_json::from_str(r#"{"z": 1, "a": 2}"#).unwrap();
        assert_eq!(render_body(&[record]).unwrap(), r#"{"z": 1, "a": 2}"#);
    }

    #[test]
    fn test_render_body_keeps_number_text() {
        let record: Value = serde_json::from_str(
            r#"{"n": 123456789012345678901234567890, "d": 3.141592653589793238462643, "e": 1e400}"#,
        )
        .unwrap();
        assert_eq!(
            render_body(&[record]).unwrap(),
            r#"{"n": 123456789012345678901234567890, "d": 3.141592653589793238462643, "e": 1e400}"#
        );
    }

    #[test]
    fn test_object_key_format() {
        let key = object_key("exports/logs", "", at(7));
        assert_eq!(
            key,
            "exports/logs/dumpdata-2024-03-09-14-05-07-d41d8cd98f00b204e9800998ecf8427e"
        );
    }

    #[test]
    fn test_object_key_prefix_join() {
        assert!(object_key("", "x", at(0)).starts_with("dumpdata-"));
        assert!(object_key("a/", "x", at(0)).starts_with("a/dumpdata-"));
        assert!(object_key("a", "x", at(0)).starts_with("a/dumpdata-"));
    }

    #[test]
    fn test_same_body_same_second_same_key() {
        let records = vec![json!({ "_id": "1" })];
        let first = RenderedPage::new("p", &records, at(1)).unwrap();
        let second = RenderedPage::new("p", &records, at(1)).unwrap();
        assert_eq!(first.key, second.key);

        let other = RenderedPage::new("p", &[json!({ "_id": "2" })], at(1)).unwrap();
        assert_ne!(first.key, other.key);
    }
}
