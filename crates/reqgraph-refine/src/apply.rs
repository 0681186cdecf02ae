//! Fixed-order application of analysis decisions
//!
//! Analyses finish in any order; their decisions are applied here in one
//! sequence so the result depends only on the decisions themselves:
//!
//! 1. clear and re-apply cross-family call edges among the call scope
//! 2. call-edge removals
//! 3. same-family orientation and drops
//! 4. ownership rewrites
//! 5. open items for unresolved callers
//! 6. provenance log lines
//!
//! Every edge decision is re-checked against liveness and the permission
//! matrix first. `dependants` is rebuilt at the end.

use crate::calls::{is_call_edge, CallDecisions};
use crate::orientation::OrientationDecisions;
use crate::ownership::{unlink_mentions, OwnershipDecision};
use crate::provenance::LogDecisions;
use reqgraph_graph::{permits, write_edges, EdgeSet};
use reqgraph_model::{Diagnostic, DiagnosticKind, Document, Label, OpenItem, Severity};
use std::collections::BTreeSet;

/// Decisions gathered from one turn's analyses
///
/// `None` means the analysis was disabled, had no candidates, or failed.
#[derive(Debug, Clone, Default)]
pub struct RefinementOutcomes {
    pub calls: Option<CallDecisions>,
    pub orientation: Option<OrientationDecisions>,
    pub ownership: Option<Vec<OwnershipDecision>>,
    pub logs: Option<LogDecisions>,
}

impl RefinementOutcomes {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_none()
            && self.orientation.is_none()
            && self.ownership.is_none()
            && self.logs.is_none()
    }
}

/// What applying the decisions changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefinementReport {
    pub edges_added: usize,
    pub edges_removed: usize,
    /// Items whose text was rewritten or annotated
    pub annotated: BTreeSet<Label>,
    /// Decisions that were refused
    pub diagnostics: Vec<Diagnostic>,
}

struct Applier<'d> {
    document: &'d mut Document,
    edges: EdgeSet,
    report: RefinementReport,
}

impl Applier<'_> {
    /// Liveness and matrix check for `dependant -> dependency`
    fn check(&self, dependant: &Label, dependency: &Label) -> Result<(), Diagnostic> {
        let Some(from) = self.document.get_live(dependant) else {
            return Err(Diagnostic::new(
                dependency.clone(),
                DiagnosticKind::DeadEndpoint(dependant.clone()),
            ));
        };
        let Some(to) = self.document.get_live(dependency) else {
            return Err(Diagnostic::new(
                dependant.clone(),
                DiagnosticKind::DeadEndpoint(dependency.clone()),
            ));
        };
        if permits(from, to) {
            Ok(())
        } else {
            Err(Diagnostic::new(
                dependant.clone(),
                DiagnosticKind::IllegalEdge(dependency.clone()),
            ))
        }
    }

    fn add(&mut self, dependant: &Label, dependency: &Label) {
        match self.check(dependant, dependency) {
            Ok(()) => {
                if self.edges.insert(dependant.clone(), dependency.clone()) {
                    self.report.edges_added += 1;
                }
            }
            Err(diagnostic) => {
                tracing::warn!(label = %diagnostic.label, "Refused refinement edge: {}", diagnostic);
                self.report.diagnostics.push(diagnostic);
            }
        }
    }

    fn remove(&mut self, dependant: &Label, dependency: &Label) {
        if self.edges.remove(dependant, dependency) {
            self.report.edges_removed += 1;
        }
    }

    fn remove_either(&mut self, a: &Label, b: &Label) {
        self.remove(a, b);
        self.remove(b, a);
    }

    fn calls(&mut self, decisions: &CallDecisions) {
        if decisions.is_empty() {
            return;
        }
        let existing: Vec<(Label, Label)> = self
            .edges
            .iter()
            .filter(|(dependant, dependency)| {
                decisions.scope.contains(*dependant)
                    && decisions.scope.contains(*dependency)
                    && is_call_edge(dependant, dependency)
            })
            .map(|(dependant, dependency)| (dependant.clone(), dependency.clone()))
            .collect();
        for (dependant, dependency) in &existing {
            self.edges.remove(dependant, dependency);
        }
        for (caller, callee) in &decisions.calls {
            if !is_call_edge(caller, callee) {
                continue;
            }
            if existing.iter().any(|(a, b)| a == caller && b == callee) {
                self.edges.insert(caller.clone(), callee.clone());
            } else {
                self.add(caller, callee);
            }
        }
        self.report.edges_removed += existing
            .iter()
            .filter(|(dependant, dependency)| !self.edges.contains(dependant, dependency))
            .count();
    }

    fn removals(&mut self, decisions: &CallDecisions) {
        for (caller, callee) in &decisions.removals {
            self.remove(caller, callee);
        }
    }

    fn orientation(&mut self, decisions: &OrientationDecisions) {
        for (dependant, dependency) in &decisions.orient {
            self.remove_either(dependant, dependency);
            self.add(dependant, dependency);
        }
        for (a, b) in &decisions.drop {
            self.remove_either(a, b);
        }
    }

    fn ownership(&mut self, decisions: &[OwnershipDecision]) {
        for decision in decisions {
            if !self.document.is_live(&decision.element) {
                self.report.diagnostics.push(Diagnostic::warn(
                    decision.element.clone(),
                    DiagnosticKind::DeadEndpoint(decision.element.clone()),
                ));
                continue;
            }
            for loser in decision.non_owners() {
                let Some(item) = self.document.get_mut(loser).filter(|item| item.is_live()) else {
                    continue;
                };
                if unlink_mentions(item, &decision.element) {
                    self.report.annotated.insert(loser.clone());
                }
                self.remove_either(loser, &decision.element);
            }
            match &decision.owner {
                Some(owner) => self.add(owner, &decision.element),
                None => {
                    let names: Vec<String> =
                        decision.claimants.iter().map(ToString::to_string).collect();
                    let note = OpenItem::new(
                        format!("Ownership undecided between {}", names.join(" and ")),
                        Severity::High,
                    );
                    if let Some(item) = self.document.get_mut(&decision.element) {
                        if item.open_items.push_unique(note) {
                            self.report.annotated.insert(decision.element.clone());
                        }
                    }
                    tracing::info!(element = %decision.element, claimants = names.len(), "Ownership left undecided");
                }
            }
        }
    }

    fn unresolved(&mut self, decisions: &CallDecisions) {
        for (caller, note) in &decisions.unresolved {
            let Some(item) = self.document.get_mut(caller).filter(|item| item.is_live()) else {
                continue;
            };
            let text = if note.is_empty() {
                "Call target unresolved".to_string()
            } else {
                format!("Call target unresolved: {note}")
            };
            if item.open_items.push_unique(OpenItem::new(text, Severity::Med)) {
                self.report.annotated.insert(caller.clone());
            }
        }
    }

    fn logs(&mut self, decisions: &LogDecisions) {
        for (label, line) in &decisions.lines {
            if let Some(item) = self.document.get_mut(label).filter(|item| item.is_live()) {
                item.ask_log.append(line);
                self.report.annotated.insert(label.clone());
            }
        }
    }
}

/// Apply every present outcome to `document` in the fixed order
pub fn apply_refinements(document: &mut Document, outcomes: &RefinementOutcomes) -> RefinementReport {
    let edges = EdgeSet::from_document(document);
    let mut applier = Applier {
        document,
        edges,
        report: RefinementReport::default(),
    };

    if let Some(calls) = &outcomes.calls {
        applier.calls(calls);
        applier.removals(calls);
    }
    if let Some(orientation) = &outcomes.orientation {
        applier.orientation(orientation);
    }
    if let Some(ownership) = &outcomes.ownership {
        applier.ownership(ownership);
    }
    if let Some(calls) = &outcomes.calls {
        applier.unresolved(calls);
    }
    if let Some(logs) = &outcomes.logs {
        applier.logs(logs);
    }

    let Applier { document, edges, report } = applier;
    write_edges(document, &edges);
    tracing::debug!(
        added = report.edges_added,
        removed = report.edges_removed,
        annotated = report.annotated.len(),
        refused = report.diagnostics.len(),
        "Applied refinements"
    );
    report
}
