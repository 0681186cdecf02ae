//! Parse and apply generated turns against fixture documents

use pretty_assertions::assert_eq;
use reqgraph_delta::{apply_patches, parse_delta, redacted_view};
use reqgraph_model::{DiagnosticKind, Segment, Status};
use reqgraph_test_utils::{checkout_document, label, worker_document};

#[test]
fn reply_creates_and_extends_items() {
    let mut doc = checkout_document();
    let parsed = parse_delta(
        "Sure.\n### CHANGES\n## UC-1_Checkout [partial]\n- [flow]: review cart, PROC-1_Charge, confirm\n- [open_items]: tax rules [high]\n\nENT-1_Order\n- [definition]: A placed order\n### REPLY\nAdded the order entity.",
    );
    assert!(!parsed.malformed);
    assert_eq!(parsed.trailing_text, "Sure.\n\nAdded the order entity.");

    let report = apply_patches(&mut doc, &parsed.patches);
    assert_eq!(
        report.touched.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["ENT-1_Order", "UC-1_Checkout"]
    );
    assert_eq!(
        report.created.iter().map(ToString::to_string).collect::<Vec<_>>(),
        vec!["ENT-1_Order"]
    );

    let checkout = doc.get(&label("UC-1_Checkout")).unwrap();
    assert_eq!(checkout.status, Status::Partial);
    assert_eq!(
        checkout.definition.get(Segment::Flow),
        Some("review cart, PROC-1_Charge, confirm")
    );
    assert_eq!(
        checkout.definition.get(Segment::Definition),
        Some("ROLE-1_Customer completes a purchase")
    );
    assert_eq!(checkout.open_items.len(), 1);
    assert_eq!(doc.get(&label("ENT-1_Order")).unwrap().status, Status::Draft);
}

#[test]
fn complete_items_refuse_definition_changes() {
    let mut doc = checkout_document();
    doc.get_mut(&label("ROLE-1_Customer")).unwrap().status = Status::Complete;

    let parsed = parse_delta(
        "### CHANGES\nROLE-1_Customer\n- [definition]: Anyone at all\n- [open_items]: loyalty tiers\n",
    );
    let report = apply_patches(&mut doc, &parsed.patches);

    let customer = doc.get(&label("ROLE-1_Customer")).unwrap();
    assert_eq!(customer.definition.get(Segment::Definition), Some("Someone who buys"));
    assert_eq!(customer.open_items.len(), 1);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::StatusGated(Status::Complete)));
}

#[test]
fn cancel_removes_the_item() {
    let mut doc = worker_document();
    let parsed = parse_delta("### CHANGES\nCOMP-2_Worker\n- [cancelled]: true\n### REPLY\nGone.");
    let report = apply_patches(&mut doc, &parsed.patches);

    assert!(report.touched.is_empty());
    assert!(report.cancelled.contains(&label("COMP-2_Worker")));
    assert!(!doc.contains(&label("COMP-2_Worker")));
    assert!(redacted_view(&doc)["Components"].get("COMP-2_Worker").is_none());
}

#[test]
fn labels_resolve_case_insensitively() {
    let mut doc = checkout_document();
    let parsed = parse_delta("### CHANGES\nuc-1_checkout\n- [notes]: mobile first\n");
    let report = apply_patches(&mut doc, &parsed.patches);

    assert!(report.created.is_empty());
    assert_eq!(doc.len(), 3);
    assert_eq!(
        doc.get(&label("UC-1_Checkout")).unwrap().definition.get(Segment::Notes),
        Some("mobile first")
    );
}
