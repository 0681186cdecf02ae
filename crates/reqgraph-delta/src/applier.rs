//! Patch applier
//!
//! Folds a [`PatchSet`] into a document. Definitions are rebuilt from
//! segments on every overlay, so the stored form is always the canonical
//! render. Dropped changes are reported as [`Diagnostic`]s, never errors.

use crate::patch::{Patch, PatchSet};
use reqgraph_model::{Diagnostic, DiagnosticKind, Document, Item, Label, Status};
use std::collections::BTreeSet;

/// What a patch set did to a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Live items a non-cancelling patch created or changed
    pub touched: BTreeSet<Label>,
    /// Items created by this patch set
    pub created: BTreeSet<Label>,
    /// Items removed by a cancel
    pub cancelled: BTreeSet<Label>,
    /// Changes that were dropped
    pub diagnostics: Vec<Diagnostic>,
}

impl ApplyReport {
    /// Labels a partial recompute must be rooted at
    #[must_use]
    pub fn roots(&self) -> BTreeSet<Label> {
        self.touched.union(&self.cancelled).cloned().collect()
    }

    /// Whether the document changed at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.cancelled.is_empty()
    }
}

/// Apply every patch in order
///
/// Labels are resolved case-insensitively against existing items. The
/// definition lock is decided by the item's status before its first patch
/// in this set, so a block cannot unlock itself.
pub fn apply_patches(document: &mut Document, patches: &PatchSet) -> ApplyReport {
    let mut report = ApplyReport::default();

    for (label, label_patches) in patches.iter() {
        let target = document.resolve(label).cloned().unwrap_or_else(|| label.clone());
        let mut gate: Option<Status> = document.get(&target).map(|item| item.status);

        for patch in label_patches {
            if patch.is_cancel() {
                if document.remove(&target).is_some() {
                    tracing::info!(label = %target, "Cancelled item");
                    report.touched.remove(&target);
                    report.cancelled.insert(target.clone());
                } else {
                    report
                        .diagnostics
                        .push(Diagnostic::warn(target.clone(), DiagnosticKind::MissingCancelTarget));
                }
                gate = None;
                continue;
            }

            if !ensure_item(document, &target, &mut report) {
                break;
            }
            let Some(item) = document.get_mut(&target) else {
                break;
            };
            let before = item.clone();
            apply_one(item, patch, gate, &mut report);
            item.cancelled = false;
            if *item != before || report.created.contains(&target) {
                report.touched.insert(target.clone());
            }
        }
    }

    tracing::debug!(
        touched = report.touched.len(),
        created = report.created.len(),
        cancelled = report.cancelled.len(),
        diagnostics = report.diagnostics.len(),
        "Applied patches"
    );
    report
}

/// Make sure `target` exists; returns false if creation was refused
fn ensure_item(document: &mut Document, target: &Label, report: &mut ApplyReport) -> bool {
    if document.contains(target) {
        return true;
    }
    if let Some(existing) = document.number_collision(target) {
        let kind = DiagnosticKind::LabelCollision(existing.clone());
        report.diagnostics.push(Diagnostic::warn(target.clone(), kind));
        return false;
    }
    let mut item = Item::new(target.clone());
    item.status = Status::Draft;
    document.insert(item);
    report.created.insert(target.clone());
    tracing::info!(label = %target, "Created item");
    true
}

fn apply_one(item: &mut Item, patch: &Patch, gate: Option<Status>, report: &mut ApplyReport) {
    match patch {
        Patch::StatusChange(status) => item.status = *status,
        Patch::SegmentOverlay(segments) => {
            if let Some(locked) = gate.filter(|status| status.is_locked()) {
                report.diagnostics.push(Diagnostic::warn(
                    item.label.clone(),
                    DiagnosticKind::StatusGated(locked),
                ));
                return;
            }
            let family = item.family();
            item.definition.overlay(segments);
            for segment in item.definition.retain_allowed(family) {
                report.diagnostics.push(Diagnostic::warn(
                    item.label.clone(),
                    DiagnosticKind::DisallowedSegment(segment),
                ));
            }
        }
        Patch::OpenItemsReplace(open_items) => item.open_items = open_items.clone(),
        Patch::AskLogAppend(text) => item.ask_log.append(text),
        Patch::Cancel => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_delta;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use reqgraph_model::{Definition, OpenItems, Segment};

    fn label(text: &str) -> Label {
        text.parse().unwrap()
    }

    fn apply_text(document: &mut Document, text: &str) -> ApplyReport {
        let parsed = parse_delta(text);
        assert!(!parsed.malformed);
        apply_patches(document, &parsed.patches)
    }

    fn complete_item(text: &str) -> Item {
        let mut item = Item::new(label(text));
        item.status = Status::Complete;
        item.definition = Definition::split("Definition: frozen");
        item
    }

    #[test]
    fn new_item_defaults_to_draft() {
        let mut doc = Document::new();
        let report = apply_text(&mut doc, "### CHANGES\nUC-1_Checkout\n- [definition]: pay\n");
        let item = doc.get(&label("UC-1_Checkout")).unwrap();
        assert_eq!(item.status, Status::Draft);
        assert_eq!(item.definition.render(), "Definition: pay");
        assert!(report.created.contains(&label("UC-1_Checkout")));
    }

    #[test]
    fn explicit_status_overrides_draft() {
        let mut doc = Document::new();
        apply_text(&mut doc, "### CHANGES\nUC-1_Checkout [partial]\n- [notes]: x\n");
        assert_eq!(doc.get(&label("UC-1_Checkout")).unwrap().status, Status::Partial);
    }

    #[test]
    fn overlay_merges_and_reorders() {
        let mut doc = Document::new();
        let mut item = Item::new(label("PROC-1_Charge"));
        item.definition = Definition::split("Notes: careful | Definition: Charges");
        doc.insert(item);

        apply_text(&mut doc, "### CHANGES\nPROC-1_Charge\n- [flow]: auth then capture\n- [notes]: updated\n");
        let item = doc.get(&label("PROC-1_Charge")).unwrap();
        assert_eq!(
            item.definition.render(),
            "Definition: Charges | Flow: auth then capture | Notes: updated"
        );
        assert_eq!(item.status, Status::Empty);
    }

    #[test]
    fn disallowed_segment_is_dropped_with_diagnostic() {
        let mut doc = Document::new();
        let report = apply_text(
            &mut doc,
            "### CHANGES\nPROC-1_Charge\n- [definition]: x\n- [contract]: POST /charge\n",
        );
        let item = doc.get(&label("PROC-1_Charge")).unwrap();
        assert_eq!(item.definition.get(Segment::Contract), None);
        assert_eq!(
            report.diagnostics[0].kind,
            DiagnosticKind::DisallowedSegment(Segment::Contract)
        );
    }

    #[test]
    fn locked_item_keeps_definition_but_moves_open_items() {
        let mut doc: Document = [complete_item("ENT-1_Order")].into_iter().collect();
        let report = apply_text(
            &mut doc,
            "### CHANGES\nENT-1_Order\n- [definition]: changed\n- [open_items]: late gap [low]\n- [ask_log]: noted\n",
        );
        let item = doc.get(&label("ENT-1_Order")).unwrap();
        assert_eq!(item.definition.render(), "Definition: frozen");
        assert_eq!(item.open_items.render(), "late gap [low]");
        assert_eq!(item.ask_log.render(), "noted");
        assert!(matches!(
            report.diagnostics[0].kind,
            DiagnosticKind::StatusGated(Status::Complete)
        ));
    }

    #[test]
    fn refused_overlay_does_not_touch_the_item() {
        let mut doc: Document = [complete_item("ENT-1_Order")].into_iter().collect();
        let report = apply_text(&mut doc, "### CHANGES\nENT-1_Order\n- [definition]: changed\n");
        assert!(report.touched.is_empty());
        assert!(report.roots().is_empty());
        assert!(matches!(
            report.diagnostics[0].kind,
            DiagnosticKind::StatusGated(Status::Complete)
        ));

        let report = apply_text(&mut doc, "### CHANGES\nENT-1_Order\n- [definition]: changed\n- [notes]: x\n- [open_items]: late gap\n");
        assert_eq!(report.touched.len(), 1);
    }

    #[test]
    fn unlocking_in_the_same_block_does_not_open_the_definition() {
        let mut doc: Document = [complete_item("ENT-1_Order")].into_iter().collect();
        apply_text(&mut doc, "### CHANGES\nENT-1_Order [partial]\n- [definition]: changed\n");
        let item = doc.get(&label("ENT-1_Order")).unwrap();
        assert_eq!(item.status, Status::Partial);
        assert_eq!(item.definition.render(), "Definition: frozen");
    }

    #[test]
    fn cancel_removes_item_and_section() {
        let mut doc: Document = [Item::new(label("COMP-2_Worker"))].into_iter().collect();
        let report = apply_text(&mut doc, "### CHANGES\nCOMP-2_Worker\n- [cancelled]: true\n");
        assert!(doc.is_empty());
        assert!(doc.sections().is_empty());
        assert!(report.cancelled.contains(&label("COMP-2_Worker")));
        assert!(report.roots().contains(&label("COMP-2_Worker")));
    }

    #[test]
    fn cancel_of_missing_label_is_reported() {
        let mut doc = Document::new();
        let report = apply_text(&mut doc, "### CHANGES\nUI-9_Ghost\n- [definition]: delete\n");
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::MissingCancelTarget);
        assert!(report.is_empty());
    }

    #[test]
    fn colliding_number_is_refused() {
        let mut doc: Document = [Item::new(label("UC-1_Checkout"))].into_iter().collect();
        let report = apply_text(&mut doc, "### CHANGES\nUC-1_Payment\n- [definition]: x\n");
        assert!(doc.get(&label("UC-1_Payment")).is_none());
        assert_eq!(
            report.diagnostics[0].kind,
            DiagnosticKind::LabelCollision(label("UC-1_Checkout"))
        );
    }

    #[test]
    fn references_resolve_case_insensitively() {
        let mut doc: Document = [Item::new(label("UC-1_Checkout"))].into_iter().collect();
        let report = apply_text(&mut doc, "### CHANGES\nuc1_checkout\n- [notes]: hi\n");
        assert_eq!(doc.len(), 1);
        assert!(report.touched.contains(&label("UC-1_Checkout")));
        assert!(report.created.is_empty());
    }

    #[test]
    fn tombstone_is_revived_by_a_patch() {
        let mut tombstone = Item::new(label("UI-1_Cart"));
        tombstone.cancelled = true;
        let mut doc: Document = [tombstone].into_iter().collect();
        apply_text(&mut doc, "### CHANGES\nUI-1_Cart\n- [flow]: open\n");
        assert!(doc.get(&label("UI-1_Cart")).unwrap().is_live());
    }

    #[test]
    fn ask_log_appends() {
        let mut item = Item::new(label("A1_Canvas"));
        item.ask_log.append("first");
        let mut doc: Document = [item].into_iter().collect();
        apply_text(&mut doc, "### CHANGES\nA1_Canvas\n- [ask_log]: second\n");
        assert_eq!(doc.get(&label("A1_Canvas")).unwrap().ask_log.render(), "first\nsecond");
    }

    proptest! {
        #[test]
        fn locked_definitions_never_change(
            locked in prop::sample::select(vec![Status::Complete, Status::Waived]),
            body in "[a-z ]{1,30}",
            segment in prop::sample::select(Segment::ALL.to_vec()),
        ) {
            let mut item = Item::new(label("UC-1_Checkout"));
            item.status = locked;
            item.definition = Definition::split("Definition: frozen | Flow: fixed");
            let before = item.definition.clone();
            let mut doc: Document = [item].into_iter().collect();

            let mut patches = PatchSet::new();
            let mut overlay = std::collections::BTreeMap::new();
            overlay.insert(segment, body);
            patches.extend(
                label("UC-1_Checkout"),
                [
                    Patch::StatusChange(Status::Draft),
                    Patch::SegmentOverlay(overlay),
                    Patch::OpenItemsReplace(OpenItems::parse("gap [high]")),
                ],
            );
            apply_patches(&mut doc, &patches);

            let after = doc.get(&label("UC-1_Checkout")).unwrap();
            prop_assert_eq!(&after.definition, &before);
            prop_assert_eq!(after.open_items.render(), "gap [high]");
        }
    }
}
