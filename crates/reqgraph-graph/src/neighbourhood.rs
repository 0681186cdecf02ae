//! Undirected neighbourhood queries
//!
//! Adjacency is the union of dependency edges and textual mentions between
//! live items.

use crate::extract::ReferenceMap;
use petgraph::graphmap::UnGraphMap;
use reqgraph_model::{Document, Label};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Graph over live items for "within k hops" lookups
#[derive(Debug, Clone, Default)]
pub struct Neighbourhood {
    labels: Vec<Label>,
    index: BTreeMap<Label, usize>,
    graph: UnGraphMap<usize, ()>,
}

impl Neighbourhood {
    /// Build from a document's edges and mentions
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        Self::build(document, &ReferenceMap::from_document(document))
    }

    /// Build from a document and an already computed mention map
    #[must_use]
    pub fn build(document: &Document, refs: &ReferenceMap) -> Self {
        let labels: Vec<Label> = document.live_labels().cloned().collect();
        let index: BTreeMap<Label, usize> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| (label.clone(), i))
            .collect();

        let mut graph = UnGraphMap::new();
        for i in 0..labels.len() {
            graph.add_node(i);
        }
        for item in document.live_items() {
            let Some(&from) = index.get(&item.label) else {
                continue;
            };
            for target in item.dependencies.iter().chain(refs.targets(&item.label)) {
                if let Some(&to) = index.get(target) {
                    if from != to {
                        graph.add_edge(from, to, ());
                    }
                }
            }
        }

        Self {
            labels,
            index,
            graph,
        }
    }

    /// Labels within `hops` of any root, roots included
    ///
    /// Roots that are not live items are ignored.
    #[must_use]
    pub fn within<'a>(&self, roots: impl IntoIterator<Item = &'a Label>, hops: usize) -> BTreeSet<Label> {
        let mut depth: BTreeMap<usize, usize> = BTreeMap::new();
        let mut queue: VecDeque<usize> = VecDeque::new();
        for root in roots {
            if let Some(&node) = self.index.get(root) {
                if depth.insert(node, 0).is_none() {
                    queue.push_back(node);
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            let next = depth[&node] + 1;
            if next > hops {
                continue;
            }
            for neighbour in self.graph.neighbors(node) {
                if !depth.contains_key(&neighbour) {
                    depth.insert(neighbour, next);
                    queue.push_back(neighbour);
                }
            }
        }

        depth.keys().map(|node| self.labels[*node].clone()).collect()
    }

    /// Direct neighbours of one label
    #[must_use]
    pub fn neighbours(&self, label: &Label) -> BTreeSet<Label> {
        let mut out = self.within([label], 1);
        out.remove(label);
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
