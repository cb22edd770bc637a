//! Error handling module for export steps.
//!
//! This module provides:
//! - Application-specific error types, one enum per collaborator
//! - The `{"acknowledged": true}` / `{"error": ...}` step payload
//!
//! # Example
//!
//! ```rust
//! use scrolldump::error::{DumpError, SearchError, StepResponse};
//!
//! let err = DumpError::from(SearchError::ShardFailure { failed: 1, total: 3 });
//! let response = StepResponse::from(&err);
//! assert_eq!(
//!     response.error_message(),
//!     Some("Scroll request has failed on 1 shards out of 3.")
//! );
//! ```

pub mod kinds;
pub mod response;

// Re-export commonly used types
pub use kinds::{
    ConfigError, DumpError, Result, ScheduleError, SearchError, StoreError, ValidationError,
};
pub use response::StepResponse;
