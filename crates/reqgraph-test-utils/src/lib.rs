//! Testing utilities for the reqgraph workspace
//!
//! Shared fixtures, a scripted generation service, and engine setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reqgraph_core::{
    EngineConfig, GenerationError, GenerationRequest, GenerationService, InMemoryDocumentStore,
    Purpose, RetryPolicy, TurnEngine,
};
use reqgraph_model::{Definition, Document, Item, Label, Status};
use reqgraph_refine::AnalysisKind;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

pub fn label(text: &str) -> Label {
    text.parse().unwrap()
}

pub fn item(text: &str, definition: &str) -> Item {
    let mut item = Item::new(label(text));
    item.status = Status::Draft;
    item.definition = Definition::split(definition);
    item
}

pub fn document(items: impl IntoIterator<Item = Item>) -> Document {
    items.into_iter().collect()
}

/// Labels of `text`'s dependencies, as strings
pub fn dependencies(document: &Document, text: &str) -> Vec<String> {
    document
        .get(&label(text))
        .unwrap()
        .dependencies
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Labels of `text`'s dependants, as strings
pub fn dependants(document: &Document, text: &str) -> Vec<String> {
    document
        .get(&label(text))
        .unwrap()
        .dependants
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Checkout use case, its customer, and a charge process that points back
pub fn checkout_document() -> Document {
    document([
        item(
            "UC-1_Checkout",
            "Definition: ROLE-1_Customer completes a purchase | Flow: PROC-1_Charge takes payment",
        ),
        item("ROLE-1_Customer", "Definition: Someone who buys"),
        item("PROC-1_Charge", "Definition: Charges the card, started from UC-1_Checkout"),
    ])
}

/// Two components both referencing the same entity
pub fn shared_entity_document() -> Document {
    document([
        item("COMP-1_Api", "Definition: Writes ENT-1_Order"),
        item("COMP-2_Batch", "Definition: Reconciles ENT-1_Order nightly"),
        item("ENT-1_Order", "Definition: A placed order"),
    ])
}

/// A worker component referenced by a use case and depending on a process
pub fn worker_document() -> Document {
    document([
        item("COMP-1_Api", "Definition: Hands jobs to COMP-2_Worker | Kind: service"),
        item("COMP-2_Worker", "Definition: Runs PROC-1_Charge | Kind: worker"),
        item("PROC-1_Charge", "Definition: Charges the card"),
        item("UC-1_Checkout", "Definition: Pays via PROC-1_Charge"),
    ])
}

/// Replies from queues, one queue per purpose
///
/// An exhausted turn queue fails with `Unavailable`; an exhausted analysis
/// queue answers with empty text. Every request is recorded.
#[derive(Default)]
pub struct ScriptedGenerator {
    turns: Mutex<VecDeque<Result<String, GenerationError>>>,
    analyses: Mutex<HashMap<AnalysisKind, VecDeque<Result<String, GenerationError>>>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, reply: impl Into<String>) -> Self {
        self.turns.lock().push_back(Ok(reply.into()));
        self
    }

    pub fn with_turn_error(self, err: GenerationError) -> Self {
        self.turns.lock().push_back(Err(err));
        self
    }

    pub fn with_analysis(self, kind: AnalysisKind, reply: impl Into<String>) -> Self {
        self.analyses
            .lock()
            .entry(kind)
            .or_default()
            .push_back(Ok(reply.into()));
        self
    }

    pub fn with_analysis_error(self, kind: AnalysisKind, err: GenerationError, times: usize) -> Self {
        {
            let mut analyses = self.analyses.lock();
            let queue = analyses.entry(kind).or_default();
            for _ in 0..times {
                queue.push_back(Err(err.clone()));
            }
        }
        self
    }

    /// Every request seen so far
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, purpose: Purpose) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|request| request.purpose == purpose)
            .count()
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let purpose = request.purpose;
        self.calls.lock().push(request);
        match purpose {
            Purpose::Turn => self
                .turns
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Unavailable("script ended".to_string()))),
            Purpose::Analysis(kind) => self
                .analyses
                .lock()
                .get_mut(&kind)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(String::new())),
        }
    }
}

/// Engine config that retries immediately, for tests without a paused clock
pub fn test_config() -> EngineConfig {
    EngineConfig::new().with_retry(RetryPolicy::immediate(3))
}

/// Engine over an in-memory store, seeded with `seed` under project `"p"`
pub fn setup_test_engine(
    script: Arc<ScriptedGenerator>,
    seed: Option<Document>,
) -> (TurnEngine, Arc<InMemoryDocumentStore>) {
    setup_test_engine_with(test_config(), script, seed)
}

pub fn setup_test_engine_with(
    config: EngineConfig,
    script: Arc<ScriptedGenerator>,
    seed: Option<Document>,
) -> (TurnEngine, Arc<InMemoryDocumentStore>) {
    let store = Arc::new(InMemoryDocumentStore::new());
    if let Some(seed) = seed {
        store.insert("p", seed);
    }
    let engine = TurnEngine::new(config, script, store.clone());
    (engine, store)
}
