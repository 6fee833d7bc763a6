//! Pure screenplay-parsing domain logic.
//!
//! Covers the full structural pipeline: format normalization, line
//! classification, scene segmentation, dialogue/character attribution,
//! production-element tagging, metrics, and cross-revision diffing.
//! No I/O, no async, no network: every stage is a function over its
//! input so each can be tested in isolation. The orchestration crate
//! owns all external concerns (analysis service, caching, worker pool).

pub mod attribute;
pub mod classify;
pub mod config;
pub mod diff;
pub mod error;
pub mod hashing;
pub mod heading;
pub mod lexicon;
pub mod metrics;
pub mod normalize;
pub mod segment;
pub mod tag;
pub mod types;
