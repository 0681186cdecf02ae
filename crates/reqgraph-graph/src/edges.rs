//! Edge sets and relationship diffs

use reqgraph_model::{Document, Label};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Directed dependency edges `(dependant, dependency)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: BTreeSet<(Label, Label)>,
}

/// Whether an edge appeared or disappeared
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeChange {
    Added,
    Removed,
}

/// One incremental relationship change
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipDiff {
    pub dependant: Label,
    pub dependency: Label,
    pub change: EdgeChange,
}

impl EdgeSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dependency edges of every live item
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        Self {
            edges: document.edges(),
        }
    }

    pub fn insert(&mut self, dependant: Label, dependency: Label) -> bool {
        self.edges.insert((dependant, dependency))
    }

    pub fn remove(&mut self, dependant: &Label, dependency: &Label) -> bool {
        self.edges.remove(&(dependant.clone(), dependency.clone()))
    }

    #[must_use]
    pub fn contains(&self, dependant: &Label, dependency: &Label) -> bool {
        self.edges.contains(&(dependant.clone(), dependency.clone()))
    }

    /// Keep edges matching `keep`
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Label, &Label) -> bool,
    {
        self.edges.retain(|(dependant, dependency)| keep(dependant, dependency));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Label)> {
        self.edges.iter().map(|(dependant, dependency)| (dependant, dependency))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Changes that turn `before` into `after`
    ///
    /// Removals come first, each group in label order.
    #[must_use]
    pub fn diff(before: &EdgeSet, after: &EdgeSet) -> Vec<RelationshipDiff> {
        let removed = before.edges.difference(&after.edges).map(|(dependant, dependency)| {
            RelationshipDiff {
                dependant: dependant.clone(),
                dependency: dependency.clone(),
                change: EdgeChange::Removed,
            }
        });
        let added = after.edges.difference(&before.edges).map(|(dependant, dependency)| {
            RelationshipDiff {
                dependant: dependant.clone(),
                dependency: dependency.clone(),
                change: EdgeChange::Added,
            }
        });
        removed.chain(added).collect()
    }
}

impl FromIterator<(Label, Label)> for EdgeSet {
    fn from_iter<T: IntoIterator<Item = (Label, Label)>>(iter: T) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RelationshipDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.change {
            EdgeChange::Added => '+',
            EdgeChange::Removed => '-',
        };
        write!(f, "{sign} {} -> {}", self.dependant, self.dependency)
    }
}
