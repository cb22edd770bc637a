//! AWS Lambda entry point
//!
//! Each invocation receives a `JobState` payload, runs one export step and
//! returns `{"acknowledged": true}` or `{"error": ...}`. Continuations are
//! dispatched as asynchronous invocations of the running function. In debug
//! mode the continuation runs inline and pages are only logged.

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{DumpError, Result, StepResponse};
use crate::export::{
    ContinuationScheduler, CursorClient, ElasticsearchClient, ExportJob, InlineScheduler,
    LambdaScheduler, LogPageWriter, PageWriter, S3PageWriter,
};

/// Collaborators shared by every invocation of a warm function
pub struct Handler {
    config: Config,
    cursors: Arc<dyn CursorClient>,
    writer: Arc<dyn PageWriter>,
    lambda: aws_sdk_lambda::Client,
}

impl Handler {
    /// Build clients from the configuration and the AWS SDK config chain
    pub async fn from_config(config: Config) -> Result<Self> {
        let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

        let cursors = Arc::new(ElasticsearchClient::new(config.search_timeout())?);
        let writer: Arc<dyn PageWriter> = if config.debug {
            Arc::new(LogPageWriter)
        } else {
            Arc::new(S3PageWriter::new(aws_sdk_s3::Client::new(&sdk)))
        };

        Ok(Self {
            config,
            cursors,
            writer,
            lambda: aws_sdk_lambda::Client::new(&sdk),
        })
    }

    /// Handle one invocation payload
    ///
    /// # Arguments
    /// * `payload` - Raw `JobState` JSON
    /// * `invoked_function` - ARN of the running function
    pub async fn respond(&self, payload: Value, invoked_function: &str) -> StepResponse {
        if self.config.debug {
            let queue = Arc::new(InlineScheduler::new());
            let job = self.job(queue.clone());
            return job.handle_inline(payload, &queue).await;
        }

        let target = target_function(&self.config, invoked_function);
        let scheduler = Arc::new(LambdaScheduler::new(self.lambda.clone(), target));
        self.job(scheduler).handle(payload).await
    }

    async fn invoke(&self, event: LambdaEvent<Value>) -> std::result::Result<Value, Error> {
        let LambdaEvent { payload, context } = event;
        debug!("Invocation {}", context.request_id);

        let response = self.respond(payload, &context.invoked_function_arn).await;
        Ok(response.to_value())
    }

    fn job(&self, scheduler: Arc<dyn ContinuationScheduler>) -> ExportJob {
        ExportJob::new(
            self.cursors.clone(),
            self.writer.clone(),
            scheduler,
            self.config.export.clone(),
        )
    }
}

/// Function that receives continuations
fn target_function(config: &Config, invoked_function: &str) -> String {
    config
        .scheduler
        .function_name
        .clone()
        .unwrap_or_else(|| invoked_function.to_string())
}

/// Serve invocations until the runtime shuts down
pub async fn serve(config: Config) -> Result<()> {
    info!("Starting Lambda runtime (debug: {})", config.debug);

    let handler = Arc::new(Handler::from_config(config).await?);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = handler.clone();
        async move { handler.invoke(event).await }
    }))
    .await
    .map_err(|e| DumpError::Generic(format!("Lambda runtime error: {e}")))
}

/// Whether the process was started by the Lambda runtime
pub fn is_lambda_environment() -> bool {
    std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_defaults_to_invoked_function() {
        let config = Config::default();
        let arn = "arn:aws:lambda:eu-west-1:123456789012:function:dump";
        assert_eq!(target_function(&config, arn), arn);
    }

    #[test]
    fn test_target_from_config() {
        let mut config = Config::default();
        config.scheduler.function_name = Some("dump-worker".to_string());
        assert_eq!(target_function(&config, "arn:ignored"), "dump-worker");
    }
}
