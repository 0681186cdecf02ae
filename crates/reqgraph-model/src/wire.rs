//! Wire format
//!
//! The persisted document is an outer mapping from section name to an inner
//! mapping from label to item record. Every field of the record is a plain
//! string (or bool) so the format stays readable by the UI and by older
//! tooling; the typed [`Document`] is built from it on entry and rendered
//! back on exit.

use crate::document::Document;
use crate::error::ModelError;
use crate::family::{Family, Section};
use crate::item::Item;
use crate::label::Label;
use crate::notes::{AskLog, OpenItems};
use crate::segment::Definition;
use crate::status::Status;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Separator used for dependency lists
pub const LIST_SEPARATOR: &str = ", ";

/// Section-keyed document as stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    /// Opaque metadata, passed through unchanged
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,

    /// Section name → label → record
    #[serde(flatten)]
    pub sections: IndexMap<String, IndexMap<String, WireItem>>,
}

/// One item record as stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireItem {
    pub status: String,
    pub definition: String,
    pub open_items: String,
    pub ask_log: String,
    pub cancelled: bool,
    pub dependencies: String,
    pub dependants: String,
}

impl WireItem {
    fn into_item(self, label: Label) -> Result<Item, ModelError> {
        let mut item = Item::new(label);
        item.status = self.status.parse::<Status>()?;
        item.definition = Definition::split(&self.definition);
        item.open_items = OpenItems::parse(&self.open_items);
        item.ask_log = AskLog::parse(&self.ask_log);
        item.cancelled = self.cancelled;
        item.dependencies = parse_label_list(&item.label, &self.dependencies);
        item.dependants = parse_label_list(&item.label, &self.dependants);
        Ok(item)
    }

    fn from_item(item: &Item) -> Self {
        Self {
            status: item.status.as_str().to_string(),
            definition: item.definition.render(),
            open_items: item.open_items.render(),
            ask_log: item.ask_log.render(),
            cancelled: item.cancelled,
            dependencies: join_labels(&item.dependencies),
            dependants: join_labels(&item.dependants),
        }
    }
}

/// Render a label set as the `", "`-joined wire list
#[must_use]
pub fn join_labels(labels: &BTreeSet<Label>) -> String {
    labels
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn parse_label_list(owner: &Label, raw: &str) -> BTreeSet<Label> {
    raw.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match Label::parse(part) {
            Ok(label) => Some(label),
            Err(_) => {
                tracing::warn!(label = %owner, entry = part, "Skipping invalid label in edge list");
                None
            }
        })
        .collect()
}

impl TryFrom<WireDocument> for Document {
    type Error = ModelError;

    fn try_from(wire: WireDocument) -> Result<Self, Self::Error> {
        let mut items = BTreeMap::new();
        for (section_name, records) in wire.sections {
            let section = Section::from_wire_name(&section_name)
                .ok_or_else(|| ModelError::UnknownSection(section_name.clone()))?;
            for (raw_label, record) in records {
                let label = Label::parse(&raw_label)?;
                if label.section() != section {
                    return Err(ModelError::SectionMismatch {
                        label: raw_label,
                        section: section_name.clone(),
                    });
                }
                let item = record.into_item(label.clone())?;
                items.insert(label, item);
            }
        }
        Ok(Document::from_parts(items, wire.meta))
    }
}

impl From<Document> for WireDocument {
    fn from(document: Document) -> Self {
        let (items, meta) = document.into_parts();
        let mut sections: IndexMap<String, IndexMap<String, WireItem>> = IndexMap::new();
        for family in Family::ALL {
            let records: IndexMap<String, WireItem> = items
                .values()
                .filter(|item| item.family() == family)
                .map(|item| (item.label.to_string(), WireItem::from_item(item)))
                .collect();
            if !records.is_empty() {
                sections.insert(family.section().wire_name().to_string(), records);
            }
        }
        Self { meta, sections }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_sections_are_omitted() {
        let doc = Document::from_json_value(json!({
            "UseCases": {},
            "Entities": {"ENT-1_Order": {"status": "draft"}}
        }))
        .unwrap();
        let out = doc.to_json_value();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["Entities"]);
    }

    #[test]
    fn sections_render_in_family_order() {
        let doc = Document::from_json_value(json!({
            "NFRs": {"NFR-1_Latency": {}},
            "A": {"A1_Canvas": {}},
            "UseCases": {"UC-1_Checkout": {}}
        }))
        .unwrap();
        let wire = WireDocument::from(doc);
        let keys: Vec<&str> = wire.sections.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "UseCases", "NFRs"]);
    }

    #[test]
    fn misplaced_item_is_rejected() {
        let err = Document::from_json_value(json!({
            "UseCases": {"ENT-1_Order": {}}
        }))
        .unwrap_err();
        assert!(matches!(err, ModelError::SectionMismatch { .. }));
    }

    #[test]
    fn unknown_section_is_rejected() {
        let err = Document::from_json_value(json!({"Widgets": {}})).unwrap_err();
        assert!(matches!(err, ModelError::UnknownSection(_)));
    }

    #[test]
    fn invalid_edge_entries_are_skipped() {
        let doc = Document::from_json_value(json!({
            "UseCases": {"UC-1_Checkout": {"dependencies": "ROLE-1_Customer, not a label"}}
        }))
        .unwrap();
        let item = doc.get(&"UC-1_Checkout".parse().unwrap()).unwrap();
        assert_eq!(join_labels(&item.dependencies), "ROLE-1_Customer");
    }

    #[test]
    fn record_fields_render_as_strings() {
        let doc = Document::from_json_value(json!({
            "Processes": {"PROC-1_Charge": {
                "status": "partial",
                "definition": "Flow: capture | Definition: Charges",
                "dependencies": "ENT-1_Order,API-1_Payments"
            }}
        }))
        .unwrap();
        let out = doc.to_json_value();
        let record = &out["Processes"]["PROC-1_Charge"];
        assert_eq!(record["definition"], "Definition: Charges | Flow: capture");
        assert_eq!(record["dependencies"], "ENT-1_Order, API-1_Payments");
        assert_eq!(record["status"], "partial");
        assert_eq!(record["cancelled"], false);
    }
}
