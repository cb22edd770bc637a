//! Scrolldump Library
//!
//! Exports the full result set of a search-engine query into an object store,
//! page by page, using a server-side scroll cursor. Instead of looping
//! in-process, every step re-triggers the export with the updated cursor, so
//! an export of any size fits within short-lived invocations.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and the step response payload
//! - `export`: Job state, collaborators and the export state machine
//! - `runtime`: AWS Lambda entry point
//!
//! # Example
//!
//! ```
//! use scrolldump::config::ExportDefaults;
//! use scrolldump::export::JobPayload;
//!
//! let payload = JobPayload::from_value(serde_json::json!({
//!     "source_endpoint": "http://localhost:9200",
//!     "source_collection": "logs",
//!     "destination_bucket": "dumps",
//! }))
//! .unwrap();
//!
//! let state = payload.resolve(&ExportDefaults::default());
//! assert!(state.is_valid());
//! assert!(state.cursor.is_none());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod runtime;

// Re-export commonly used types
pub use config::Config;
pub use error::{DumpError, Result, StepResponse};
pub use export::{ExportJob, JobState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
