//! Concurrent screenplay parse pipeline.
//!
//! Orchestrates the pure engine stages from `slugline-core` around the
//! analysis boundary from `slugline-nlp`: per-revision parsing on a
//! bounded worker pool, content-hash dedup with single-flight, an
//! in-memory revision store, parse summaries and breakdown reports,
//! and revision diffing with scene-key carry-over.

pub mod config;
pub mod error;
pub mod parser;
pub mod service;
pub mod store;
pub mod summary;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use parser::{parse_revision, SubmitRequest};
pub use service::{ParseService, Submitted};
pub use store::RevisionStore;
pub use summary::{breakdown, summarize, BreakdownElement, BreakdownReport, ParseSummary};
