//! Plain-text rendering of the live graph
//!
//! This is the text the generation service sees: sections in family order,
//! one block per live item.

use crate::document::Document;
use crate::family::Family;
use crate::item::Item;
use crate::wire::join_labels;
use std::fmt::Write;

/// Render every live item, grouped by section
#[must_use]
pub fn render_document(document: &Document) -> String {
    let mut out = String::new();
    for family in Family::ALL {
        let mut items = document
            .section(family.section())
            .filter(|item| item.is_live())
            .peekable();
        if items.peek().is_none() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "## {}", family.section());
        for item in items {
            out.push_str(&render_item(item));
        }
    }
    out
}

/// Render one item block
#[must_use]
pub fn render_item(item: &Item) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "### {} [{}]", item.label, item.status);
    for (segment, body) in item.definition.iter() {
        let _ = writeln!(out, "{}: {}", segment.title(), body);
    }
    if !item.open_items.is_empty() {
        let _ = writeln!(out, "Open items: {}", item.open_items.render());
    }
    if !item.dependencies.is_empty() {
        let _ = writeln!(out, "Depends on: {}", join_labels(&item.dependencies));
    }
    if !item.dependants.is_empty() {
        let _ = writeln!(out, "Dependants: {}", join_labels(&item.dependants));
    }
    out
}
