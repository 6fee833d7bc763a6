//! Concurrent parse service.
//!
//! [`ParseService`] runs revision parses on a bounded worker pool,
//! dedups by content hash, and keeps parsed revisions in an in-memory
//! store for lookups, diffing, and breakdown reports. At most one
//! parse per content hash is ever in flight: concurrent submitters of
//! the same bytes share a watch slot instead of duplicating work.

use std::collections::HashMap;
use std::sync::Arc;

use slugline_core::config::EngineConfig;
use slugline_core::diff::{self, RevisionDiff};
use slugline_core::hashing;
use slugline_core::segment::Scene;
use slugline_core::types::{ParsedRevision, RevisionId};
use slugline_nlp::Analyzer;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::parser::{parse_revision, SubmitRequest};
use crate::store::RevisionStore;
use crate::summary::{breakdown, summarize, BreakdownReport, ParseSummary};

/// Result slot shared between a running parse and its waiters.
type ParseSlot = Option<Result<Arc<ParsedRevision>, PipelineError>>;

/// Outcome of one ingest call.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub revision_id: RevisionId,
    /// True when the content hash was already parsed or in flight.
    pub deduplicated: bool,
    pub summary: ParseSummary,
    pub parsed: Arc<ParsedRevision>,
}

/// Shared parse service handle.
///
/// Created once via [`ParseService::new`]; the returned `Arc` can be
/// cheaply cloned into tasks and request handlers.
pub struct ParseService {
    analyzer: Arc<dyn Analyzer>,
    engine_config: EngineConfig,
    pipeline_config: PipelineConfig,
    store: RwLock<RevisionStore>,
    /// One watch slot per in-flight content hash.
    in_flight: Mutex<HashMap<String, watch::Receiver<ParseSlot>>>,
    workers: Arc<Semaphore>,
    /// Cancelled during shutdown -- queued parses abort.
    cancel: CancellationToken,
}

/// What a submitter holds after checking the in-flight table.
enum Claim {
    /// This submitter runs the parse and fills the slot.
    Run(watch::Sender<ParseSlot>),
    /// Another submitter is already parsing the same bytes.
    Wait(watch::Receiver<ParseSlot>),
}

impl ParseService {
    pub fn new(
        analyzer: Arc<dyn Analyzer>,
        engine_config: EngineConfig,
        pipeline_config: PipelineConfig,
    ) -> Arc<Self> {
        let workers = Arc::new(Semaphore::new(pipeline_config.workers.max(1)));
        let store = RwLock::new(RevisionStore::new(pipeline_config.cache_capacity));
        Arc::new(Self {
            analyzer,
            engine_config,
            pipeline_config,
            store,
            in_flight: Mutex::new(HashMap::new()),
            workers,
            cancel: CancellationToken::new(),
        })
    }

    /// Ingest one document: parse it, or return the stored parse when
    /// the same bytes were already submitted.
    pub async fn submit(&self, request: SubmitRequest<'_>) -> Result<Submitted, PipelineError> {
        let content_hash = hashing::sha256_hex(request.bytes);

        if let Some(parsed) = self.store.read().await.by_hash(&content_hash) {
            tracing::debug!(hash = %content_hash, "Ingest served from cache");
            return Ok(self.submitted(parsed, true));
        }

        let claim = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&content_hash) {
                Some(rx) => Claim::Wait(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    in_flight.insert(content_hash.clone(), rx);
                    Claim::Run(tx)
                }
            }
        };

        match claim {
            Claim::Wait(rx) => {
                let parsed = await_slot(rx).await?;
                Ok(self.submitted(parsed, true))
            }
            Claim::Run(tx) => {
                let result = self.run_parse(request).await;
                self.in_flight.lock().await.remove(&content_hash);
                let _ = tx.send(Some(result.clone()));
                Ok(self.submitted(result?, false))
            }
        }
    }

    /// Parsed revision by id.
    pub async fn revision(&self, id: RevisionId) -> Result<Arc<ParsedRevision>, PipelineError> {
        self.store
            .read()
            .await
            .by_id(&id)
            .ok_or(PipelineError::RevisionNotFound(id))
    }

    /// Parsed revision by content hash.
    pub async fn revision_by_hash(&self, hash: &str) -> Option<Arc<ParsedRevision>> {
        self.store.read().await.by_hash(hash)
    }

    /// Scene lookup by revision id and stable scene key.
    pub async fn scene(&self, revision: RevisionId, key: &str) -> Result<Scene, PipelineError> {
        let store = self.store.read().await;
        if store.by_id(&revision).is_none() {
            return Err(PipelineError::RevisionNotFound(revision));
        }
        store
            .find_scene(&revision, key)
            .ok_or_else(|| PipelineError::SceneNotFound {
                revision,
                key: key.to_string(),
            })
    }

    /// Diff two stored revisions.
    pub async fn diff(
        &self,
        old_id: RevisionId,
        new_id: RevisionId,
    ) -> Result<RevisionDiff, PipelineError> {
        let old = self.revision(old_id).await?;
        let new = self.revision(new_id).await?;
        let diff = diff::diff_revisions(&old, &new, &self.engine_config);
        tracing::info!(
            old = %old_id,
            new = %new_id,
            scene_deltas = diff.scenes.len(),
            element_deltas = diff.elements.len(),
            "Revision diff computed",
        );
        Ok(diff)
    }

    /// Diff two stored revisions and rewrite the new revision's scene
    /// keys so matched scenes keep their old identity. The store keeps
    /// the rewritten parse; reapplying is a no-op.
    pub async fn diff_and_carry(
        &self,
        old_id: RevisionId,
        new_id: RevisionId,
    ) -> Result<(RevisionDiff, Arc<ParsedRevision>), PipelineError> {
        let diff = self.diff(old_id, new_id).await?;
        let mut store = self.store.write().await;
        let new = store
            .by_id(&new_id)
            .ok_or(PipelineError::RevisionNotFound(new_id))?;
        let carried = Arc::new(diff::apply_scene_keys(&new, &diff.key_map));
        store.replace(Arc::clone(&carried));
        Ok((diff, carried))
    }

    /// Breakdown report for a stored revision.
    pub async fn breakdown(&self, id: RevisionId) -> Result<BreakdownReport, PipelineError> {
        let parsed = self.revision(id).await?;
        Ok(breakdown(&parsed))
    }

    /// Gracefully shut down: in-flight parses finish, queued ones abort.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down parse service");
        self.cancel.cancel();
        self.workers.close();
    }

    // ---- private helpers ----

    async fn run_parse(
        &self,
        request: SubmitRequest<'_>,
    ) -> Result<Arc<ParsedRevision>, PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let _permit = self
            .workers
            .acquire()
            .await
            .map_err(|_| PipelineError::Cancelled)?;
        // Work still queued at shutdown aborts here; once past this
        // check the parse runs to completion.
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let parsed = parse_revision(
            self.analyzer.as_ref(),
            &self.engine_config,
            self.pipeline_config.analysis_attempts,
            request,
        )
        .await?;
        let parsed = Arc::new(parsed);

        self.store.write().await.insert(Arc::clone(&parsed));
        Ok(parsed)
    }

    fn submitted(&self, parsed: Arc<ParsedRevision>, deduplicated: bool) -> Submitted {
        Submitted {
            revision_id: parsed.revision.id,
            deduplicated,
            summary: summarize(&parsed),
            parsed,
        }
    }
}

/// Wait for a running parse of the same bytes to finish.
async fn await_slot(
    mut rx: watch::Receiver<ParseSlot>,
) -> Result<Arc<ParsedRevision>, PipelineError> {
    loop {
        if let Some(result) = rx.borrow().clone() {
            return result;
        }
        if rx.changed().await.is_err() {
            // The running submitter dropped without publishing.
            return Err(PipelineError::Cancelled);
        }
    }
}
