//! reqgraph Core - Turn Engine
//!
//! Drives one conversational turn against a requirements graph:
//! - Calls the generation service through a shared retry/backoff gate
//! - Parses and applies the reply's changes on a working copy
//! - Recomputes the touched part of the dependency graph
//! - Runs the second-pass analyses concurrently and applies their decisions
//! - Saves the result only once the whole turn succeeded
//!
//! # Example
//!
//! ```rust,ignore
//! use reqgraph_core::{EngineConfig, InMemoryDocumentStore, TurnEngine, TurnRequest};
//! use std::sync::Arc;
//!
//! # async fn example(service: Arc<dyn reqgraph_core::GenerationService>) -> Result<(), reqgraph_core::EngineError> {
//! let engine = TurnEngine::new(EngineConfig::new(), service, Arc::new(InMemoryDocumentStore::new()));
//! let outcome = engine
//!     .handle_turn(TurnRequest::new("shop", "Add a checkout use case"))
//!     .await?;
//!
//! println!("{}", outcome.assistant_text);
//! for diff in &outcome.diffs {
//!     println!("{diff}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod history;
#[cfg(feature = "http")]
pub mod http;
pub mod idempotency;
pub mod prompt;
pub mod store;
pub mod turn;

pub use classifier::{PhraseClassifier, SeverityClassifier};
pub use config::{
    AnalysisToggles, EngineConfig, IdempotencyConfig, PromptTemplates, RetryPolicy, SeverityPhrases,
};
pub use engine::TurnEngine;
pub use error::{EngineError, GenerationError, StoreError};
pub use generation::{
    BackoffGate, GenerationRequest, GenerationService, Message, Purpose, RetryingGenerator, Role,
};
pub use history::{Exchange, HistoryStore};
#[cfg(feature = "http")]
pub use http::{HttpGenerationConfig, HttpGenerationService};
pub use idempotency::IdempotencyStore;
pub use store::{DocumentStore, FileDocumentStore, InMemoryDocumentStore};
pub use turn::{TurnOutcome, TurnRequest};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reqgraph_model::{Label, Severity};
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Replies in order; analysis calls get an empty reply
    struct Turns(Mutex<VecDeque<String>>);

    #[async_trait]
    impl GenerationService for Turns {
        async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError> {
            match request.purpose {
                Purpose::Turn => self
                    .0
                    .lock()
                    .pop_front()
                    .ok_or_else(|| GenerationError::Unavailable("no more turns".into())),
                Purpose::Analysis(_) => Ok(String::new()),
            }
        }
    }

    #[tokio::test]
    async fn two_turns_build_a_graph() {
        let service = Arc::new(Turns(Mutex::new(
            [
                "### CHANGES\nROLE-1_Customer\n- [definition]: Buys things\n### REPLY\nAdded the customer.",
                "### CHANGES\nUC-1_Checkout\n- [definition]: ROLE-1_Customer pays\n- [open_items]: tax rules\n### REPLY\nAdded checkout.",
            ]
            .map(String::from)
            .into(),
        )));
        let store = Arc::new(InMemoryDocumentStore::new());
        let engine = TurnEngine::new(EngineConfig::new(), service, store.clone());

        let first = engine.handle_turn(TurnRequest::new("shop", "add a customer")).await.unwrap();
        assert_eq!(first.assistant_text, "Added the customer.");
        assert!(first.diffs.is_empty());

        let second = engine
            .handle_turn(TurnRequest::new("shop", "checkout, tax rules later"))
            .await
            .unwrap();
        assert_eq!(second.diffs.len(), 1);
        assert_eq!(second.diffs[0].to_string(), "+ UC-1_Checkout -> ROLE-1_Customer");

        let checkout: Label = "UC-1_Checkout".parse().unwrap();
        let stored = store.load("shop").await.unwrap().unwrap();
        let item = stored.get(&checkout).unwrap();
        assert_eq!(item.open_items.iter().next().unwrap().severity, Severity::High);
        assert_eq!(engine.history().recent("shop").len(), 2);
    }
}
