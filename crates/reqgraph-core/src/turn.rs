//! Turn input and output

use reqgraph_graph::RelationshipDiff;
use reqgraph_model::{Diagnostic, Document, Label};
use reqgraph_refine::AnalysisKind;
use std::collections::BTreeSet;

/// One user turn against a project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
    pub project_id: String,
    pub user_text: String,
    /// Repeating a key replays the first outcome
    pub idempotency_key: Option<String>,
}

impl TurnRequest {
    #[inline]
    #[must_use]
    pub fn new(project_id: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_text: user_text.into(),
            idempotency_key: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Result of a turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    /// Text shown to the user
    pub assistant_text: String,
    /// Graph after the turn
    pub document: Document,
    /// Edge changes against the graph before the turn
    pub diffs: Vec<RelationshipDiff>,
    /// The reply could not be read; the user should resend
    pub resend_requested: bool,
    /// Items the turn's patches touched
    pub touched: BTreeSet<Label>,
    /// Changes that were dropped instead of applied
    pub diagnostics: Vec<Diagnostic>,
    /// Analyses whose generation call failed
    pub failed_analyses: Vec<AnalysisKind>,
}

impl TurnOutcome {
    /// Outcome of a malformed reply: raw text back, graph unchanged
    #[must_use]
    pub fn resend(assistant_text: impl Into<String>, document: Document) -> Self {
        Self {
            assistant_text: assistant_text.into(),
            document,
            diffs: Vec::new(),
            resend_requested: true,
            touched: BTreeSet::new(),
            diagnostics: Vec::new(),
            failed_analyses: Vec::new(),
        }
    }
}
