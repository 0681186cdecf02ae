//! The requirements document: every item, keyed by label

use crate::error::ModelError;
use crate::family::Section;
use crate::item::Item;
use crate::label::{Label, LabelKey};
use crate::wire::WireDocument;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Full item set plus pass-through metadata
///
/// Sections are derived from labels, so a section with no items simply
/// does not exist. Serializes to the section-keyed wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireDocument", into = "WireDocument")]
pub struct Document {
    items: BTreeMap<Label, Item>,
    metadata: Option<Value>,
}

impl Document {
    /// Create empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a wire JSON document
    ///
    /// # Errors
    /// Returns [`ModelError`] for malformed JSON, unknown sections, invalid
    /// labels or misplaced items.
    pub fn from_json_str(raw: &str) -> Result<Self, ModelError> {
        let wire: WireDocument = serde_json::from_str(raw)?;
        Self::try_from(wire)
    }

    /// Parse a wire JSON value
    ///
    /// # Errors
    /// See [`Document::from_json_str`].
    pub fn from_json_value(value: Value) -> Result<Self, ModelError> {
        let wire: WireDocument = serde_json::from_value(value)?;
        Self::try_from(wire)
    }

    /// Serialize to the wire JSON value
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        serde_json::to_value(WireDocument::from(self.clone())).unwrap_or(Value::Null)
    }

    /// Serialize to pretty wire JSON
    ///
    /// # Errors
    /// Returns [`ModelError::Json`] if serialization fails.
    pub fn to_json_string_pretty(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string_pretty(&WireDocument::from(self.clone()))?)
    }

    #[inline]
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&Item> {
        self.items.get(label)
    }

    #[inline]
    pub fn get_mut(&mut self, label: &Label) -> Option<&mut Item> {
        self.items.get_mut(label)
    }

    /// Live (non-cancelled) item
    #[must_use]
    pub fn get_live(&self, label: &Label) -> Option<&Item> {
        self.items.get(label).filter(|item| item.is_live())
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.items.contains_key(label)
    }

    /// Whether `label` names a live item
    #[must_use]
    pub fn is_live(&self, label: &Label) -> bool {
        self.get_live(label).is_some()
    }

    /// Insert or replace an item
    pub fn insert(&mut self, item: Item) -> Option<Item> {
        self.items.insert(item.label.clone(), item)
    }

    /// Remove an item
    pub fn remove(&mut self, label: &Label) -> Option<Item> {
        self.items.remove(label)
    }

    /// All items (cancelled tombstones included) in label order
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.values_mut()
    }

    /// Live items in label order
    pub fn live_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|item| item.is_live())
    }

    /// Live labels in label order
    pub fn live_labels(&self) -> impl Iterator<Item = &Label> {
        self.live_items().map(|item| &item.label)
    }

    /// Items of one section, in label order
    pub fn section(&self, section: Section) -> impl Iterator<Item = &Item> {
        self.items
            .values()
            .filter(move |item| item.section() == section)
    }

    /// Sections that currently hold at least one item
    #[must_use]
    pub fn sections(&self) -> BTreeSet<Section> {
        self.items.keys().map(Label::section).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pass-through metadata
    #[must_use]
    pub fn metadata(&self) -> Option<&Value> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Option<Value>) {
        self.metadata = metadata;
    }

    /// Case-insensitive index of live labels
    #[must_use]
    pub fn key_index(&self) -> HashMap<LabelKey, Label> {
        self.live_labels()
            .map(|label| (label.key(), label.clone()))
            .collect()
    }

    /// Existing label a spelling refers to (case and hyphen insensitive)
    #[must_use]
    pub fn resolve(&self, label: &Label) -> Option<&Label> {
        if let Some((existing, _)) = self.items.get_key_value(label) {
            return Some(existing);
        }
        let key = label.key();
        self.items.keys().find(|existing| existing.key() == key)
    }

    /// Live label with the same family and number but a different name
    #[must_use]
    pub fn number_collision(&self, label: &Label) -> Option<&Label> {
        let key = label.key();
        self.live_labels().find(|existing| {
            existing.family() == label.family()
                && existing.number() == label.number()
                && existing.key() != key
        })
    }

    /// Directed edges `(dependant, dependency)` between live items
    #[must_use]
    pub fn edges(&self) -> BTreeSet<(Label, Label)> {
        self.live_items()
            .flat_map(|item| {
                item.dependencies
                    .iter()
                    .map(move |dependency| (item.label.clone(), dependency.clone()))
            })
            .collect()
    }

    /// Content fingerprint of the wire form
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(&WireDocument::from(self.clone())).unwrap_or_default();
        blake3::hash(&canonical).to_hex().to_string()
    }

    pub(crate) fn from_parts(items: BTreeMap<Label, Item>, metadata: Option<Value>) -> Self {
        Self { items, metadata }
    }

    pub(crate) fn into_parts(self) -> (BTreeMap<Label, Item>, Option<Value>) {
        (self.items, self.metadata)
    }
}

impl FromIterator<Item> for Document {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        let items = iter
            .into_iter()
            .map(|item| (item.label.clone(), item))
            .collect();
        Self::from_parts(items, None)
    }
}
