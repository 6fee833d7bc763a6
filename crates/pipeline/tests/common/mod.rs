//! Shared fixtures for pipeline integration tests.

use std::sync::Arc;

use slugline_core::config::EngineConfig;
use slugline_nlp::Analyzer;
use slugline_pipeline::{ParseService, PipelineConfig, PipelineError, SubmitRequest, Submitted};

/// Two scenes, one speaking character, lexicon hits in both.
pub const TWO_SCENE_SCRIPT: &str = "\
Title: Night Errand

INT. KITCHEN - DAY

ANNA grabs a knife from the counter.

ANNA
Toast, please.

EXT. STREET - NIGHT

ANNA hails a taxi.

ANNA
Wait for me.
";

/// Service over the given analyzer with default configuration.
pub fn service_with(analyzer: Arc<dyn Analyzer>) -> Arc<ParseService> {
    ParseService::new(analyzer, EngineConfig::default(), PipelineConfig::default())
}

/// Submit a fixture script, detecting format from a Fountain filename.
pub async fn submit(service: &ParseService, text: &str) -> Result<Submitted, PipelineError> {
    service
        .submit(SubmitRequest {
            bytes: text.as_bytes(),
            declared_format: None,
            filename: Some("fixture.fountain"),
            production: None,
        })
        .await
}
