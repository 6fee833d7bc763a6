//! Client crate for the text-analysis sidecar.
//!
//! Screenplay parsing only needs two things from NLP: part-of-speech
//! tokens and named-entity spans. This crate defines the wire contract
//! for the analysis service ([`api`]), an [`Analyzer`] trait to abstract
//! over backends, an HTTP implementation ([`HttpAnalyzer`]) and a
//! deterministic offline fallback ([`StubAnalyzer`]).

pub mod analyzer;
pub mod api;
pub mod client;
pub mod error;
pub mod stub;

pub use analyzer::Analyzer;
pub use api::{Analysis, EntityLabel, EntitySpan, Token};
pub use client::HttpAnalyzer;
pub use error::AnalysisError;
pub use stub::StubAnalyzer;
