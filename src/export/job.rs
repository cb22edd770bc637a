//! Export job state machine
//!
//! One call to [`ExportJob::step`] performs exactly one transition:
//!
//! - `START` (no cursor): open the query, schedule a continuation carrying
//!   the new cursor.
//! - `PAGING` (cursor present): advance the cursor, then either finish
//!   (`DONE`), or write the page and schedule the next continuation.
//! - Any error is `FAILED`: reported, never retried, nothing scheduled.
//!
//! Open, advance, write and schedule run strictly in sequence.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ExportDefaults;
use crate::error::{DumpError, Result, SearchError, StepResponse, ValidationError};

use super::cursor::{AdvanceRequest, CursorClient, OpenRequest};
use super::scheduler::{ContinuationScheduler, InlineScheduler};
use super::state::{Cursor, JobPayload, JobState};
use super::writers::{PageWriter, RenderedPage};

/// Outcome of one successful step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A cursor was opened and the first continuation scheduled.
    Started { cursor: Cursor },

    /// A page was written and the next continuation scheduled.
    Paged {
        key: String,
        records: usize,
        cursor: Cursor,
    },

    /// End of stream; nothing scheduled.
    Finished { reason: FinishReason },
}

/// Why an export stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The server returned no next cursor.
    CursorExhausted,
    /// The page was empty while a cursor was still returned.
    EmptyPage,
}

/// Totals of an inline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Steps executed, including the final one
    pub steps: u64,
    /// Pages written
    pub pages: u64,
    /// Records written
    pub records: u64,
    /// Time taken in milliseconds
    pub elapsed_ms: u64,
}

/// Scroll-driven export state machine
///
/// Orchestrates the cursor client, page writer and continuation scheduler.
/// Holds no per-job state: everything a step needs arrives in its `JobState`.
pub struct ExportJob {
    /// Search engine pagination
    cursors: Arc<dyn CursorClient>,
    /// Object store
    writer: Arc<dyn PageWriter>,
    /// Continuation dispatch
    scheduler: Arc<dyn ContinuationScheduler>,
    /// Defaults for fields a payload omits
    defaults: ExportDefaults,
}

impl ExportJob {
    /// Create a new export job
    pub fn new(
        cursors: Arc<dyn CursorClient>,
        writer: Arc<dyn PageWriter>,
        scheduler: Arc<dyn ContinuationScheduler>,
        defaults: ExportDefaults,
    ) -> Self {
        Self {
            cursors,
            writer,
            scheduler,
            defaults,
        }
    }

    /// Resolve a raw invocation payload into a `JobState`
    pub fn resolve(&self, payload: Value) -> Result<JobState> {
        let raw = payload.to_string();
        let payload = JobPayload::from_value(payload).map_err(|_| {
            ValidationError::InvalidParameters {
                missing: Vec::new(),
                state: raw,
            }
        })?;
        Ok(payload.resolve(&self.defaults))
    }

    /// Invocation entry point
    ///
    /// Runs one step and translates the outcome into the response payload.
    /// Never fails: every error is logged and returned as `{"error": ...}`.
    pub async fn handle(&self, payload: Value) -> StepResponse {
        let result = match self.resolve(payload) {
            Ok(state) => self.step(state).await,
            Err(e) => Err(e),
        };
        respond(result)
    }

    /// Invocation entry point for debug mode
    ///
    /// Like [`handle`](Self::handle) but drains `queue` before returning, so
    /// the whole export runs inside this call. `queue` must be the scheduler
    /// this job was built with.
    pub async fn handle_inline(&self, payload: Value, queue: &InlineScheduler) -> StepResponse {
        let result = match self.resolve(payload) {
            Ok(state) => self.run_inline(state, queue).await,
            Err(e) => Err(e),
        };
        respond(result)
    }

    /// Run `state` and every continuation it schedules on `queue`
    ///
    /// Stops at the first failed step.
    pub async fn run_inline(&self, state: JobState, queue: &InlineScheduler) -> Result<ExportSummary> {
        let start_time = Instant::now();
        let mut summary = ExportSummary::default();
        let mut next = Some(state);

        while let Some(state) = next {
            let transition = self.step(state).await?;
            summary.steps += 1;

            if let Transition::Paged { records, .. } = transition {
                summary.pages += 1;
                summary.records += records as u64;

                // Log progress periodically
                if summary.pages % 10 == 0 {
                    info!(
                        "Progress: {} documents exported ({} pages)",
                        summary.records, summary.pages
                    );
                }
            }

            next = queue.take();
        }

        summary.elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Export completed: {} documents, {} pages, {} ms",
            summary.records, summary.pages, summary.elapsed_ms
        );
        Ok(summary)
    }

    /// Execute one transition for `state`
    pub async fn step(&self, state: JobState) -> Result<Transition> {
        state.validate()?;

        debug!("Scroll ID: {:?}", state.cursor);

        match state.cursor.clone() {
            None => self.start(state).await,
            Some(cursor) => self.page(state, cursor).await,
        }
    }

    /// `START -> PAGING`
    async fn start(&self, state: JobState) -> Result<Transition> {
        let cursor = self
            .cursors
            .open(OpenRequest {
                endpoint: &state.source_endpoint,
                collection: &state.source_collection,
                ttl: &state.page_ttl,
                size: state.page_size,
                options: &state.query_options,
            })
            .await?;

        info!("Started: {}", state);
        self.scheduler.schedule(state.with_cursor(cursor.clone())).await?;

        Ok(Transition::Started { cursor })
    }

    /// `PAGING -> PAGING | DONE`
    async fn page(&self, state: JobState, cursor: Cursor) -> Result<Transition> {
        let page = self
            .cursors
            .advance(AdvanceRequest {
                endpoint: &state.source_endpoint,
                cursor: &cursor,
                ttl: &state.page_ttl,
                options: &state.fetch_options,
            })
            .await?;

        if page.shards.failed > 0 {
            return Err(SearchError::ShardFailure {
                failed: page.shards.failed,
                total: page.shards.total,
            }
            .into());
        }

        let next_cursor = match page.next_cursor.clone() {
            None => return Ok(self.finish(&state, FinishReason::CursorExhausted)),
            Some(next) => next,
        };

        // TODO: confirm end-of-stream with one more advance; engines that never
        // send a trailing empty page may be cut short here.
        if page.is_empty() {
            if let Err(e) = self.cursors.release(&state.source_endpoint, &next_cursor).await {
                warn!("Failed to release scroll: {}", e);
            }
            return Ok(self.finish(&state, FinishReason::EmptyPage));
        }

        let rendered = RenderedPage::new(&state.destination_prefix, &page.records, Utc::now())?;
        debug!("Writing {} documents to {}", rendered.records, rendered.key);

        self.writer
            .write(&state.destination_bucket, &rendered.key, rendered.body)
            .await?;

        self.scheduler
            .schedule(state.with_cursor(next_cursor.clone()))
            .await?;

        Ok(Transition::Paged {
            key: rendered.key,
            records: rendered.records,
            cursor: next_cursor,
        })
    }

    fn finish(&self, state: &JobState, reason: FinishReason) -> Transition {
        info!("Finished: {} ({:?})", state, reason);
        Transition::Finished { reason }
    }
}

fn respond<T>(result: Result<T>) -> StepResponse {
    match &result {
        Err(DumpError::Validation(v)) => {
            error!(kind = "validation", missing = ?v.missing(), "{}", v)
        }
        Err(e) => error!(kind = e.kind(), "{}", e),
        Ok(_) => {}
    }
    StepResponse::from(result)
}
