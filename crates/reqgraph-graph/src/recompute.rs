//! Dependency graph recomputation
//!
//! Edges are derived, never authored: textual references become unordered
//! pairs, the permission matrix orients each pair, and component edges must
//! be justified by the dependant component's own text. `dependants` is
//! always rebuilt as the exact transpose of `dependencies`.

use crate::edges::EdgeSet;
use crate::extract::ReferenceMap;
use crate::matrix::{orient, Orientation};
use reqgraph_model::{Diagnostic, DiagnosticKind, Document, Family, Label};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of a recompute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecomputeReport {
    /// Edges in the document afterwards
    pub edges: usize,
    /// Mention pairs no direction was allowed for
    pub diagnostics: Vec<Diagnostic>,
}

/// Recompute every edge from scratch
pub fn recompute_full(document: &mut Document) -> RecomputeReport {
    let refs = ReferenceMap::from_document(document);
    let mut edges = EdgeSet::new();
    let mut diagnostics = Vec::new();

    for (first, second) in refs.pairs() {
        orient_pair(document, &refs, &first, &second, &mut edges, &mut diagnostics);
    }

    write_edges(document, &edges);
    tracing::debug!(edges = edges.len(), "Full recompute");
    RecomputeReport {
        edges: edges.len(),
        diagnostics,
    }
}

/// Recompute only edges touching `roots`
///
/// Edges between two non-root items are kept as they are; every edge
/// touching a root is cleared and re-derived. Roots may name removed items,
/// which simply clears their edges.
pub fn recompute_partial(document: &mut Document, roots: &BTreeSet<Label>) -> RecomputeReport {
    let roots: BTreeSet<Label> = roots
        .iter()
        .map(|root| document.resolve(root).cloned().unwrap_or_else(|| root.clone()))
        .collect();

    let mut edges = EdgeSet::from_document(document);
    edges.retain(|dependant, dependency| {
        !roots.contains(dependant)
            && !roots.contains(dependency)
            && document.is_live(dependant)
            && document.is_live(dependency)
    });

    let refs = ReferenceMap::from_document(document);
    let mut diagnostics = Vec::new();
    for (first, second) in refs.pairs() {
        if roots.contains(&first) || roots.contains(&second) {
            orient_pair(document, &refs, &first, &second, &mut edges, &mut diagnostics);
        }
    }

    write_edges(document, &edges);
    tracing::debug!(roots = roots.len(), edges = edges.len(), "Partial recompute");
    RecomputeReport {
        edges: edges.len(),
        diagnostics,
    }
}

fn orient_pair(
    document: &Document,
    refs: &ReferenceMap,
    first: &Label,
    second: &Label,
    edges: &mut EdgeSet,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (Some(a), Some(b)) = (document.get_live(first), document.get_live(second)) else {
        return;
    };

    let (dependant, dependency) =
        match orient(a, b, refs.mentions(first, second), refs.mentions(second, first)) {
            Orientation::Forward => (first, second),
            Orientation::Backward => (second, first),
            Orientation::Forbidden => {
                tracing::debug!(first = %first, second = %second, "No legal direction for mention pair");
                diagnostics.push(Diagnostic::new(
                    first.clone(),
                    DiagnosticKind::IllegalEdge(second.clone()),
                ));
                return;
            }
        };

    let touches_component =
        dependant.family() == Family::Comp || dependency.family() == Family::Comp;
    if touches_component && !refs.mentions(dependant, dependency) {
        tracing::debug!(
            dependant = %dependant,
            dependency = %dependency,
            "Component edge not justified by the component's own text"
        );
        return;
    }

    edges.insert(dependant.clone(), dependency.clone());
}

/// Replace every item's dependencies with `edges`, then finalize
pub fn write_edges(document: &mut Document, edges: &EdgeSet) {
    let mut by_dependant: BTreeMap<Label, BTreeSet<Label>> = BTreeMap::new();
    for (dependant, dependency) in edges.iter() {
        by_dependant
            .entry(dependant.clone())
            .or_default()
            .insert(dependency.clone());
    }
    for item in document.items_mut() {
        item.dependencies = by_dependant.remove(&item.label).unwrap_or_default();
    }
    finalize(document);
}

/// Drop edges to dead endpoints and rebuild `dependants` as the transpose
pub fn finalize(document: &mut Document) {
    let live: BTreeSet<Label> = document.live_labels().cloned().collect();
    let mut dependants: BTreeMap<Label, BTreeSet<Label>> = BTreeMap::new();

    for item in document.items_mut() {
        if !item.is_live() {
            item.dependencies.clear();
            continue;
        }
        item.dependencies.retain(|dependency| live.contains(dependency));
        for dependency in &item.dependencies {
            dependants
                .entry(dependency.clone())
                .or_default()
                .insert(item.label.clone());
        }
    }

    for item in document.items_mut() {
        item.dependants = dependants.remove(&item.label).unwrap_or_default();
    }
}
