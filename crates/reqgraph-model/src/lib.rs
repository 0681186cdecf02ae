//! reqgraph Item Model
//!
//! Typed requirements items and the label grammar that keys them.
//!
//! # Core Concepts
//!
//! - [`Family`]: One of ten item categories, each with its own [`Section`]
//!   and allowed definition [`Segment`]s
//! - [`Label`]: `<FAMILY>[-]<N>_<NAME>` identifier with a total order
//! - [`Item`]: A node of the requirements graph
//! - [`Document`]: The full item set, convertible to and from the
//!   section-keyed wire format
//!
//! # Example
//!
//! ```rust
//! use reqgraph_model::{Definition, Label, Segment};
//!
//! let label: Label = "UC-1_Checkout".parse().unwrap();
//! assert_eq!(label.section().wire_name(), "UseCases");
//!
//! let definition = Definition::split("Flow: pay | Definition: Customer buys");
//! assert_eq!(definition.get(Segment::Flow), Some("pay"));
//! assert_eq!(definition.render(), "Definition: Customer buys | Flow: pay");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod diagnostic;
mod document;
mod error;
mod family;
mod item;
mod label;
mod notes;
mod segment;
mod status;

pub mod render;
pub mod wire;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use document::Document;
pub use error::ModelError;
pub use family::{ComponentKind, Family, IntegrationDirection, Section};
pub use item::Item;
pub use label::{Label, LabelKey};
pub use notes::{AskLog, OpenItem, OpenItems, Severity};
pub use segment::{Definition, Segment, SEGMENT_SEPARATOR};
pub use status::Status;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn document_wire_roundtrip_keeps_typed_content() {
        let raw = r#"{
            "UseCases": {
                "UC-1_Checkout": {
                    "status": "partial",
                    "definition": "Definition: Customer pays | Flow: cart then pay",
                    "open_items": "tax rules [high]; currency [low]",
                    "ask_log": "asked about checkout",
                    "cancelled": false,
                    "dependencies": "ROLE-1_Customer",
                    "dependants": ""
                }
            },
            "_meta": {"version": 3}
        }"#;

        let doc = Document::from_json_str(raw).unwrap();
        let label: Label = "UC-1_Checkout".parse().unwrap();
        let item = doc.get(&label).unwrap();

        assert_eq!(item.status, Status::Partial);
        assert_eq!(item.definition.get(Segment::Flow), Some("cart then pay"));
        assert_eq!(item.open_items.len(), 2);
        assert_eq!(item.dependencies.len(), 1);

        let json = doc.to_json_value();
        assert_eq!(json["_meta"]["version"], 3);
        assert_eq!(
            json["UseCases"]["UC-1_Checkout"]["open_items"],
            "tax rules [high]; currency [low]"
        );
    }
}
