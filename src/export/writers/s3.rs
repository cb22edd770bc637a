//! S3 page writer
//!
//! Stores each page as a single `PutObject`.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};

use crate::error::{Result, StoreError};

use super::PageWriter;

/// Error codes meaning the caller lacks rights on the bucket or key.
const PERMISSION_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "AccountProblem",
];

/// Writer backed by Amazon S3
#[derive(Debug, Clone)]
pub struct S3PageWriter {
    client: Client,
}

impl S3PageWriter {
    /// Create a writer with a pre-built S3 client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create a writer using the standard AWS SDK config chain
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

#[async_trait]
impl PageWriter for S3PageWriter {
    async fn write(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        debug!("Putting {} bytes to s3://{}/{}", body.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("application/x-ndjson")
            .body(ByteStream::from(body.into_bytes()))
            .send()
            .await
            .map_err(|e| {
                let message = format!("{}", DisplayErrorContext(&e));
                if is_permission_code(e.code()) {
                    StoreError::Permission(message)
                } else {
                    StoreError::Network(message)
                }
            })?;

        info!("Put Object: s3://{}/{}", bucket, key);
        Ok(())
    }
}

fn is_permission_code(code: Option<&str>) -> bool {
    code.is_some_and(|code| PERMISSION_CODES.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_codes() {
        assert!(is_permission_code(Some("AccessDenied")));
        assert!(!is_permission_code(Some("SlowDown")));
        assert!(!is_permission_code(None));
    }
}
