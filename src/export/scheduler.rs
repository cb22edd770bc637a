//! Continuation scheduling
//!
//! An export never loops in-process across pages: each step hands its
//! successor state to a `ContinuationScheduler`. In production that is an
//! asynchronous self-invocation of the running function; in debug and local
//! runs the `InlineScheduler` queues the state and the job driver runs it
//! before returning, so depth is bounded by iterations instead of stack.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use aws_sdk_lambda::Client;
use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::{InvocationType, LogType};
use tracing::debug;

use crate::error::{Result, ScheduleError};

use super::state::JobState;

/// Re-enters the export with `state` as its sole input.
#[async_trait]
pub trait ContinuationScheduler: Send + Sync {
    /// Dispatch the continuation. Does not wait for its outcome.
    async fn schedule(&self, state: JobState) -> Result<()>;
}

/// Fire-and-forget self-invocation through AWS Lambda
#[derive(Debug, Clone)]
pub struct LambdaScheduler {
    client: Client,
    function_name: String,
}

impl LambdaScheduler {
    /// Create a scheduler targeting `function_name` (name or ARN)
    pub fn new(client: Client, function_name: impl Into<String>) -> Self {
        Self {
            client,
            function_name: function_name.into(),
        }
    }
}

#[async_trait]
impl ContinuationScheduler for LambdaScheduler {
    async fn schedule(&self, state: JobState) -> Result<()> {
        let payload = serde_json::to_vec(&state)?;

        let output = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::Event)
            .log_type(LogType::None)
            .payload(Blob::new(payload))
            .send()
            .await
            .map_err(|e| ScheduleError::Network(format!("{}", DisplayErrorContext(&e))))?;

        if let Some(function_error) = output.function_error() {
            return Err(ScheduleError::Rejected(function_error.to_string()).into());
        }

        debug!(
            "Scheduled continuation on {} (status {})",
            self.function_name,
            output.status_code()
        );
        Ok(())
    }
}

/// Queues continuations for the in-process driver
///
/// See `ExportJob::run_inline`.
#[derive(Debug, Default)]
pub struct InlineScheduler {
    pending: Mutex<VecDeque<JobState>>,
}

impl InlineScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next queued continuation, if any
    pub fn take(&self) -> Option<JobState> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContinuationScheduler for InlineScheduler {
    async fn schedule(&self, state: JobState) -> Result<()> {
        debug!("Queued inline continuation at cursor {:?}", state.cursor);
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportDefaults;
    use crate::export::state::Cursor;

    #[tokio::test]
    async fn test_inline_scheduler_is_fifo() {
        let scheduler = InlineScheduler::new();
        let base = JobState::new("http://es:9200", "logs", "dumps", &ExportDefaults::default());

        scheduler
            .schedule(base.with_cursor(Cursor::new("a").unwrap()))
            .await
            .unwrap();
        scheduler
            .schedule(base.with_cursor(Cursor::new("b").unwrap()))
            .await
            .unwrap();

        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.take().unwrap().cursor, Cursor::new("a"));
        assert_eq!(scheduler.take().unwrap().cursor, Cursor::new("b"));
        assert!(scheduler.take().is_none());
        assert!(scheduler.is_empty());
    }
}
