//! reqgraph Dependency Graph
//!
//! Derives directed dependency edges from the label mentions in item text.
//!
//! # Pipeline
//!
//! 1. **Extract**: find label mentions in each live item's definition and
//!    open items ([`ReferenceMap`])
//! 2. **Pair**: collapse mentions into unordered pairs
//! 3. **Orient**: apply the type-pair permission matrix ([`permits`]) and
//!    its tie-breaks ([`orient`])
//! 4. **Filter**: keep component edges only when the dependant component's
//!    own text names the other end
//! 5. **Finalize**: rebuild `dependants` as the transpose ([`finalize`])
//!
//! # Example
//!
//! ```rust
//! use reqgraph_graph::recompute_full;
//! use reqgraph_model::{Definition, Document, Item, Label};
//!
//! let mut checkout = Item::new("UC-1_Checkout".parse().unwrap());
//! checkout.definition = Definition::split("Definition: ROLE-1_Customer pays");
//! let customer = Item::new("ROLE-1_Customer".parse().unwrap());
//! let mut doc: Document = [checkout, customer].into_iter().collect();
//!
//! recompute_full(&mut doc);
//! let customer: Label = "ROLE-1_Customer".parse().unwrap();
//! assert_eq!(doc.get(&customer).unwrap().dependants.len(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod edges;
pub mod extract;
pub mod matrix;
pub mod neighbourhood;
pub mod recompute;

pub use edges::{EdgeChange, EdgeSet, RelationshipDiff};
pub use extract::{extract_labels, replace_mentions, ReferenceMap};
pub use matrix::{orient, permits, Orientation};
pub use neighbourhood::Neighbourhood;
pub use recompute::{finalize, recompute_full, recompute_partial, write_edges, RecomputeReport};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
