//! Scroll-driven export of search results into an object store
//!
//! The export system is built on three collaborators:
//!
//! 1. **CursorClient**: opens and advances a server-side pagination cursor
//! 2. **PageWriter**: stores one rendered page under a content-derived key
//! 3. **ContinuationScheduler**: re-enters the export with the updated state
//!
//! These are orchestrated by the **ExportJob**, which performs exactly one
//! page step per invocation. The only state that survives between steps is
//! the serialized `JobState` handed to the scheduler.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use scrolldump::config::ExportDefaults;
//! use scrolldump::export::{
//!     ElasticsearchClient, ExportJob, InlineScheduler, JobState, LogPageWriter,
//! };
//!
//! # async fn example() -> scrolldump::Result<()> {
//! let defaults = ExportDefaults::default();
//! let queue = Arc::new(InlineScheduler::new());
//! let job = ExportJob::new(
//!     Arc::new(ElasticsearchClient::new(Duration::from_secs(60))?),
//!     Arc::new(LogPageWriter),
//!     queue.clone(),
//!     defaults.clone(),
//! );
//!
//! let state = JobState::new("http://localhost:9200", "logs", "dumps", &defaults);
//! let summary = job.run_inline(state, &queue).await?;
//! println!("{} documents", summary.records);
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod job;
pub mod scheduler;
pub mod state;
pub mod writers;

pub use cursor::{CursorClient, ElasticsearchClient, Page, ShardStats};
pub use job::{ExportJob, ExportSummary, FinishReason, Transition};
pub use scheduler::{ContinuationScheduler, InlineScheduler, LambdaScheduler};
pub use state::{Cursor, JobPayload, JobState};
pub use writers::{FilePageWriter, LogPageWriter, PageWriter, S3PageWriter};
