//! Reference extraction
//!
//! Finds label mentions in free text and resolves them against the live
//! items of a document.

use once_cell::sync::Lazy;
use regex::Regex;
use reqgraph_model::{Document, Label};
use std::collections::{BTreeMap, BTreeSet};

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:A|UC|PROC|COMP|ROLE|UI|ENT|INT|API|NFR)-?[0-9]+_[A-Za-z0-9_]+")
        .expect("reference pattern is valid")
});

/// Every label spelled in `text`, in order of appearance
#[must_use]
pub fn extract_labels(text: &str) -> Vec<Label> {
    REFERENCE
        .find_iter(text)
        .filter_map(|m| Label::parse(m.as_str()).ok())
        .collect()
}

/// Replace every mention of `target` (any spelling) with `replacement`
#[must_use]
pub fn replace_mentions(text: &str, target: &Label, replacement: &str) -> String {
    let key = target.key();
    REFERENCE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let found = &caps[0];
            match Label::parse(found) {
                Ok(label) if label.key() == key => replacement.to_string(),
                _ => found.to_string(),
            }
        })
        .into_owned()
}

/// Outgoing textual references of every live item
///
/// Mentions are resolved case-insensitively to the canonical spelling.
/// Self-references and mentions of absent or cancelled labels are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceMap {
    mentions: BTreeMap<Label, BTreeSet<Label>>,
}

impl ReferenceMap {
    /// Build from a document
    #[must_use]
    pub fn from_document(document: &Document) -> Self {
        let index = document.key_index();
        let mentions = document
            .live_items()
            .map(|item| {
                let targets: BTreeSet<Label> = extract_labels(&item.reference_text())
                    .into_iter()
                    .filter_map(|mention| index.get(&mention.key()).cloned())
                    .filter(|target| *target != item.label)
                    .collect();
                (item.label.clone(), targets)
            })
            .collect();
        Self { mentions }
    }

    /// Whether `from`'s own text mentions `to`
    #[must_use]
    pub fn mentions(&self, from: &Label, to: &Label) -> bool {
        self.mentions
            .get(from)
            .is_some_and(|targets| targets.contains(to))
    }

    /// Labels mentioned by `from`
    pub fn targets(&self, from: &Label) -> impl Iterator<Item = &Label> {
        self.mentions.get(from).into_iter().flatten()
    }

    /// Unordered mention pairs `(lower, higher)` in the total order
    #[must_use]
    pub fn pairs(&self) -> BTreeSet<(Label, Label)> {
        self.mentions
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |to| {
                    if from < to {
                        (from.clone(), to.clone())
                    } else {
                        (to.clone(), from.clone())
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_model::{Definition, Item};

    fn item(label: &str, definition: &str) -> Item {
        let mut item = Item::new(label.parse().unwrap());
        item.definition = Definition::split(definition);
        item
    }

    #[test]
    fn extracts_mixed_spellings() {
        let found: Vec<String> = extract_labels("Uses proc1_charge and (ENT-2_Order), not ENT-3 Order")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(found, vec!["PROC1_charge", "ENT-2_Order"]);
    }

    #[test]
    fn ignores_embedded_words() {
        assert!(extract_labels("metadata_UC-1_X").is_empty());
    }

    #[test]
    fn replaces_only_the_target() {
        let target: Label = "ENT-1_Order".parse().unwrap();
        let out = replace_mentions("reads ent1_order and ENT-2_Line", &target, "ENT-1 Order");
        assert_eq!(out, "reads ENT-1 Order and ENT-2_Line");
    }

    #[test]
    fn resolves_to_live_canonical_labels() {
        let mut cancelled = item("ENT-2_Gone", "");
        cancelled.cancelled = true;
        let doc: Document = [
            item("UC-1_Checkout", "Definition: uc-1_checkout uses proc-1_charge, ENT-2_Gone, API-9_Missing"),
            item("PROC-1_Charge", ""),
            cancelled,
        ]
        .into_iter()
        .collect();

        let refs = ReferenceMap::from_document(&doc);
        let checkout: Label = "UC-1_Checkout".parse().unwrap();
        let targets: Vec<String> = refs.targets(&checkout).map(ToString::to_string).collect();
        assert_eq!(targets, vec!["PROC-1_Charge"]);
    }

    #[test]
    fn pairs_are_unordered() {
        let doc: Document = [
            item("UC-1_Checkout", "Definition: PROC-1_Charge"),
            item("PROC-1_Charge", "Definition: UC-1_Checkout"),
        ]
        .into_iter()
        .collect();
        assert_eq!(ReferenceMap::from_document(&doc).pairs().len(), 1);
    }
}
