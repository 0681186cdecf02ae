//! Turn engine
//!
//! One turn, end to end:
//!
//! 1. replay a cached outcome for a repeated idempotency key
//! 2. load the document (missing means empty)
//! 3. call the generation service with the rendered graph, recent history
//!    and the user's text
//! 4. parse the reply; a malformed reply is handed back as a resend request
//! 5. apply patches to a working copy and re-grade touched open items
//! 6. partial recompute rooted at the touched labels
//! 7. run the four analyses concurrently on one snapshot, then apply their
//!    decisions in fixed order
//! 8. diff, save, record history, cache the outcome
//!
//! Nothing is written until step 8, so a failed turn leaves the stored
//! document as it was.

use crate::classifier::{PhraseClassifier, SeverityClassifier};
use crate::config::EngineConfig;
use crate::error::{EngineError, GenerationError};
use crate::generation::{BackoffGate, GenerationService, RetryingGenerator};
use crate::history::{Exchange, HistoryStore};
use crate::idempotency::IdempotencyStore;
use crate::prompt::{analysis_request, turn_request};
use crate::store::DocumentStore;
use crate::turn::{TurnOutcome, TurnRequest};
use reqgraph_delta::{apply_patches, parse_delta};
use reqgraph_graph::{finalize, recompute_partial, EdgeSet};
use reqgraph_model::{Diagnostic, Document, Label};
use reqgraph_refine::{
    apply_refinements, Analysis, AnalysisKind, CallInference, OwnershipResolution, ProvenanceLog,
    RefineContext, RefinementOutcomes, Reorientation,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Orchestrates turns against a document store
pub struct TurnEngine {
    config: EngineConfig,
    generator: RetryingGenerator,
    store: Arc<dyn DocumentStore>,
    history: Arc<HistoryStore>,
    idempotency: IdempotencyStore,
    classifier: Arc<dyn SeverityClassifier>,
}

impl fmt::Debug for TurnEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnEngine")
            .field("config", &self.config)
            .field("generator", &self.generator)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl TurnEngine {
    /// Engine with stores and classifier built from `config`
    #[must_use]
    pub fn new(
        config: EngineConfig,
        service: Arc<dyn GenerationService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let gate = BackoffGate::new(config.retry);
        Self {
            generator: RetryingGenerator::new(service, gate),
            store,
            history: Arc::new(HistoryStore::new(config.history_limit)),
            idempotency: IdempotencyStore::new(config.idempotency),
            classifier: Arc::new(PhraseClassifier::new(&config.severity)),
            config,
        }
    }

    /// With a backoff gate shared with other engines
    #[must_use]
    pub fn with_gate(mut self, gate: BackoffGate) -> Self {
        self.generator = RetryingGenerator::new(self.generator.inner(), gate);
        self
    }

    /// With a shared history store
    #[must_use]
    pub fn with_history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// With a shared idempotency store
    #[must_use]
    pub fn with_idempotency(mut self, idempotency: IdempotencyStore) -> Self {
        self.idempotency = idempotency;
        self
    }

    /// With a custom severity classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn SeverityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    #[inline]
    #[must_use]
    pub fn gate(&self) -> &BackoffGate {
        self.generator.gate()
    }

    /// Run one turn
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Generation`] when the primary call fails and
    /// [`EngineError::Store`] when the document cannot be loaded or saved.
    /// The stored document is unchanged in both cases.
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnOutcome, EngineError> {
        let project_id = request.project_id.as_str();

        if let Some(key) = &request.idempotency_key {
            if let Some(cached) = self.idempotency.get(project_id, key).await {
                tracing::info!(project_id, key = %key, "Replaying cached turn outcome");
                return Ok((*cached).clone());
            }
        }

        let before = self.store.load(project_id).await?.unwrap_or_default();
        let history = self.history.recent(project_id);
        let prompt = turn_request(&self.config.prompts, &before, &history, &request.user_text);
        let reply = self.generator.invoke(prompt).await?;

        let parsed = parse_delta(&reply);
        if parsed.malformed {
            tracing::warn!(project_id, "Reply had an unreadable change region, asking for a resend");
            return Ok(TurnOutcome::resend(parsed.trailing_text, before));
        }

        let mut working = before.clone();
        let applied = apply_patches(&mut working, &parsed.patches);
        let mut diagnostics = applied.diagnostics.clone();

        if let Some(severity) = self.classifier.classify(&request.user_text) {
            for label in &applied.touched {
                if let Some(item) = working.get_mut(label) {
                    item.open_items.set_all_severities(severity);
                }
            }
            tracing::debug!(project_id, severity = %severity, touched = applied.touched.len(), "Re-graded open items");
        }

        let recomputed = recompute_partial(&mut working, &applied.roots());
        diagnostics.extend(recomputed.diagnostics);

        let mut failed_analyses = Vec::new();
        if !applied.touched.is_empty() {
            let (refined, failed) = self
                .refine(&mut working, &applied.touched, &request.user_text)
                .await;
            diagnostics.extend(refined);
            failed_analyses = failed;
        }
        finalize(&mut working);

        let diffs = EdgeSet::diff(&EdgeSet::from_document(&before), &EdgeSet::from_document(&working));
        self.store.save(project_id, &working).await?;
        self.history.append(
            project_id,
            Exchange::new(request.user_text.clone(), parsed.trailing_text.clone()),
        );

        tracing::info!(
            project_id,
            touched = applied.touched.len(),
            cancelled = applied.cancelled.len(),
            diffs = diffs.len(),
            diagnostics = diagnostics.len(),
            "Turn committed"
        );

        let outcome = TurnOutcome {
            assistant_text: parsed.trailing_text,
            document: working,
            diffs,
            resend_requested: false,
            touched: applied.touched,
            diagnostics,
            failed_analyses,
        };
        if let Some(key) = &request.idempotency_key {
            self.idempotency
                .insert(project_id, key, Arc::new(outcome.clone()))
                .await;
        }
        Ok(outcome)
    }

    /// Run the analyses on a snapshot and apply their decisions
    ///
    /// Returns the refused decisions and the analyses whose call failed.
    async fn refine(
        &self,
        document: &mut Document,
        roots: &BTreeSet<Label>,
        turn_text: &str,
    ) -> (Vec<Diagnostic>, Vec<AnalysisKind>) {
        let snapshot = Arc::new(document.clone());
        let ctx = RefineContext::new(&snapshot, roots, turn_text, self.config.refine_settings());

        let (calls, orientation, ownership, logs) = tokio::join!(
            self.run_analysis(&ctx, &CallInference),
            self.run_analysis(&ctx, &Reorientation),
            self.run_analysis(&ctx, &OwnershipResolution),
            self.run_analysis(&ctx, &ProvenanceLog),
        );

        let mut failed = Vec::new();
        let outcomes = RefinementOutcomes {
            calls: settle(AnalysisKind::CallInference, calls, &mut failed),
            orientation: settle(AnalysisKind::Reorientation, orientation, &mut failed),
            ownership: settle(AnalysisKind::Ownership, ownership, &mut failed),
            logs: settle(AnalysisKind::Provenance, logs, &mut failed),
        };
        if outcomes.is_empty() {
            return (Vec::new(), failed);
        }

        let report = apply_refinements(document, &outcomes);
        (report.diagnostics, failed)
    }

    async fn run_analysis<A: Analysis>(
        &self,
        ctx: &RefineContext<'_>,
        analysis: &A,
    ) -> Result<Option<A::Output>, GenerationError> {
        let kind = analysis.kind();
        if !self.config.analyses.enabled(kind) {
            return Ok(None);
        }
        let Some(request) = analysis.prepare(ctx) else {
            tracing::debug!(analysis = %kind, "No candidates, skipping call");
            return Ok(None);
        };
        let reply = self
            .generator
            .invoke(analysis_request(&self.config.prompts, request))
            .await?;
        Ok(Some(analysis.parse(ctx, &reply)))
    }
}

fn settle<T>(
    kind: AnalysisKind,
    result: Result<Option<T>, GenerationError>,
    failed: &mut Vec<AnalysisKind>,
) -> Option<T> {
    match result {
        Ok(output) => output,
        Err(err) => {
            tracing::warn!(analysis = %kind, error = %err, "Analysis dropped after generation failure");
            failed.push(kind);
            None
        }
    }
}
