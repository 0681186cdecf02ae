//! reqgraph Delta Protocol
//!
//! The trusted boundary between generated text and the requirements graph.
//!
//! # Core Operations
//!
//! - **Parse**: read generated text into a [`PatchSet`] and trailing reply
//!   text, tolerating any malformation
//! - **Apply**: fold patches into a [`Document`](reqgraph_model::Document),
//!   honoring status locks and per-family segment sets
//! - **View**: produce the redacted JSON the UI reads
//!
//! # Architecture
//!
//! ```text
//! generated text → parse_delta → PatchSet → apply_patches → Document' + ApplyReport
//!                                                              ↓
//!                                                        redacted_view → UI
//! ```
//!
//! # Example
//!
//! ```rust
//! use reqgraph_delta::{apply_patches, parse_delta};
//! use reqgraph_model::{Document, Status};
//!
//! let parsed = parse_delta("### CHANGES\nUC-1_Checkout\n- [definition]: Customer pays\n### REPLY\nAdded.");
//! let mut doc = Document::new();
//! let report = apply_patches(&mut doc, &parsed.patches);
//!
//! assert_eq!(parsed.trailing_text, "Added.");
//! assert_eq!(report.created.len(), 1);
//! assert_eq!(doc.live_items().next().unwrap().status, Status::Draft);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod applier;
pub mod parser;
pub mod patch;
pub mod view;

pub use applier::{apply_patches, ApplyReport};
pub use parser::{parse_delta, ParsedDelta};
pub use patch::{Patch, PatchSet};
pub use view::redacted_view;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
