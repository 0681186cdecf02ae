//! reqgraph Second-Pass Refinement
//!
//! Generation-backed analyses that settle relationships the primary
//! recompute cannot disambiguate alone.
//!
//! # Core Concepts
//!
//! - **[`Analysis`]**: builds one request from a read-only snapshot and turns
//!   the reply into typed decisions. It never mutates the graph.
//! - **[`RefineContext`]**: the shared snapshot, touched roots and their
//!   neighbourhood.
//! - **[`apply_refinements`]**: applies every analysis's decisions in a fixed
//!   order, re-checking each edge against liveness and the permission matrix.
//!
//! # Analyses
//!
//! | Analysis | Reply lines |
//! |----------|-------------|
//! | [`CallInference`] | `CALL a -> b`, `REMOVE a -> b`, `UNRESOLVED a: note` |
//! | [`Reorientation`] | `ORIENT a -> b`, `DROP a b` |
//! | [`OwnershipResolution`] | `OWNER element = component` or `= UNDECIDED` |
//! | [`ProvenanceLog`] | `LOG label: line` |

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod analysis;
pub mod apply;
pub mod calls;
mod excerpt;
pub mod orientation;
pub mod ownership;
pub mod provenance;

pub use analysis::{Analysis, AnalysisKind, AnalysisRequest, RefineContext, RefineSettings};
pub use apply::{apply_refinements, RefinementOutcomes, RefinementReport};
pub use calls::{is_call_edge, CallDecisions, CallInference, CALL_FAMILIES};
pub use excerpt::build_excerpt;
pub use orientation::{OrientationDecisions, Reorientation};
pub use ownership::{unlink_mentions, OwnershipDecision, OwnershipResolution};
pub use provenance::{LogDecisions, ProvenanceLog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
