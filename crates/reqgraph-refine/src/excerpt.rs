//! Bounded text excerpts of a neighbourhood

use reqgraph_model::render::render_item;
use reqgraph_model::{Document, Label};
use std::collections::BTreeSet;

/// Render live items of `labels`, roots first, until `budget` characters
///
/// Whole items only: an item that would overflow the budget is left out and
/// counted in a closing note.
#[must_use]
pub fn build_excerpt(
    document: &Document,
    roots: &BTreeSet<Label>,
    labels: &BTreeSet<Label>,
    budget: usize,
) -> String {
    let ordered = labels
        .iter()
        .filter(|label| roots.contains(*label))
        .chain(labels.iter().filter(|label| !roots.contains(*label)));

    let mut out = String::new();
    let mut omitted = 0usize;
    for label in ordered {
        let Some(item) = document.get_live(label) else {
            continue;
        };
        let block = render_item(item);
        if out.len() + block.len() > budget {
            omitted += 1;
            continue;
        }
        out.push_str(&block);
    }
    if omitted > 0 {
        out.push_str(&format!("({omitted} more items omitted)\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_model::{Definition, Item};

    fn item(label: &str) -> Item {
        let mut item = Item::new(label.parse().unwrap());
        item.definition = Definition::split("Definition: some text about this item");
        item
    }

    #[test]
    fn roots_come_first_and_budget_holds() {
        let doc: Document = [item("UC-1_A"), item("PROC-1_B"), item("ENT-1_C")]
            .into_iter()
            .collect();
        let labels: BTreeSet<Label> = doc.live_labels().cloned().collect();
        let roots: BTreeSet<Label> = ["ENT-1_C".parse().unwrap()].into_iter().collect();

        let full = build_excerpt(&doc, &roots, &labels, 10_000);
        assert!(full.starts_with("### ENT-1_C"));

        let one_block = render_item(doc.get(&"ENT-1_C".parse().unwrap()).unwrap()).len();
        let tight = build_excerpt(&doc, &roots, &labels, one_block);
        assert!(tight.starts_with("### ENT-1_C"));
        assert!(tight.ends_with("(2 more items omitted)\n"));
    }
}
