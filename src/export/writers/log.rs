//! Log-only page writer used in debug mode.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::Result;

use super::PageWriter;

/// Writer that logs what would have been stored and discards the body
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPageWriter;

#[async_trait]
impl PageWriter for LogPageWriter {
    async fn write(&self, bucket: &str, key: &str, body: String) -> Result<()> {
        debug!("S3 Bucket: {}", bucket);
        debug!("S3 Object Key: {}", key);
        debug!("S3 Docs: {}", body.lines().count());
        debug!("S3 Body: {}", body.lines().next().unwrap_or_default());

        info!("Put Object: s3://{}/{}", bucket, key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_writer_accepts_any_page() {
        let writer = LogPageWriter;
        assert!(tokio_test::block_on(writer.write("bucket", "key", String::new())).is_ok());
        assert!(tokio_test::block_on(writer.write("bucket", "key", "{}\n{}".into())).is_ok());
    }
}
