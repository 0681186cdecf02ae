//! Cross-family call-edge inference among INT/PROC/UI/API

use crate::analysis::{parse_arrow, reply_lines, strip_keyword, Analysis, AnalysisKind, AnalysisRequest, RefineContext};
use reqgraph_model::{Family, Label};
use std::collections::BTreeSet;
use std::fmt::Write;

/// Families whose mutual edges are call edges
pub const CALL_FAMILIES: [Family; 4] = [Family::Proc, Family::Ui, Family::Int, Family::Api];

/// Whether an edge between these labels is a cross-family call edge
#[must_use]
pub fn is_call_edge(a: &Label, b: &Label) -> bool {
    a.family() != b.family()
        && CALL_FAMILIES.contains(&a.family())
        && CALL_FAMILIES.contains(&b.family())
}

/// Decisions of the call-inference analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallDecisions {
    /// Candidates whose mutual call edges are cleared and re-applied
    pub scope: BTreeSet<Label>,
    /// `(caller, callee)` edges that should exist
    pub calls: Vec<(Label, Label)>,
    /// `(caller, callee)` edges that must go
    pub removals: Vec<(Label, Label)>,
    /// Callers whose target could not be determined
    pub unresolved: Vec<(Label, String)>,
}

impl CallDecisions {
    /// Whether the reply held any decision
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.removals.is_empty() && self.unresolved.is_empty()
    }
}

/// Call-edge inference
#[derive(Debug, Clone, Copy, Default)]
pub struct CallInference;

impl CallInference {
    fn candidates(ctx: &RefineContext<'_>) -> BTreeSet<Label> {
        ctx.scope()
            .into_iter()
            .filter(|label| CALL_FAMILIES.contains(&label.family()))
            .collect()
    }
}

impl Analysis for CallInference {
    type Output = CallDecisions;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::CallInference
    }

    fn prepare(&self, ctx: &RefineContext<'_>) -> Option<AnalysisRequest> {
        let candidates = Self::candidates(ctx);
        let families: BTreeSet<Family> = candidates.iter().map(Label::family).collect();
        if families.len() < 2 {
            return None;
        }

        let mut body = String::from("Candidates:\n");
        for label in &candidates {
            let _ = writeln!(body, "- {label}");
        }
        body.push_str("\nCurrent call edges:\n");
        let document = ctx.document();
        let mut any = false;
        for (dependant, dependency) in document.edges() {
            if candidates.contains(&dependant)
                && candidates.contains(&dependency)
                && is_call_edge(&dependant, &dependency)
            {
                let _ = writeln!(body, "- {dependant} -> {dependency}");
                any = true;
            }
        }
        if !any {
            body.push_str("(none)\n");
        }
        body.push_str("\nItems:\n");
        body.push_str(&ctx.excerpt(&candidates));

        Some(AnalysisRequest {
            kind: self.kind(),
            body,
        })
    }

    fn parse(&self, ctx: &RefineContext<'_>, reply: &str) -> CallDecisions {
        let scope = Self::candidates(ctx);
        let mut decisions = CallDecisions {
            scope: scope.clone(),
            ..CallDecisions::default()
        };
        let in_scope = |edge: &(Label, Label)| scope.contains(&edge.0) && scope.contains(&edge.1);

        for line in reply_lines(reply) {
            if let Some(rest) = strip_keyword(line, "CALL") {
                if let Some(edge) = parse_arrow(ctx, rest).filter(in_scope) {
                    decisions.calls.push(edge);
                }
            } else if let Some(rest) = strip_keyword(line, "REMOVE") {
                if let Some(edge) = parse_arrow(ctx, rest).filter(in_scope) {
                    decisions.removals.push(edge);
                }
            } else if let Some(rest) = strip_keyword(line, "UNRESOLVED") {
                let Some((label, note)) = rest.split_once(':') else {
                    continue;
                };
                if let Some(label) = ctx.resolve(label).filter(|label| scope.contains(label)) {
                    decisions.unresolved.push((label, note.trim().to_string()));
                }
            } else {
                tracing::debug!(analysis = %self.kind(), line, "Ignoring reply line");
            }
        }
        decisions
    }
}
