//! UI-facing read view

use reqgraph_model::{Document, Segment};
use serde_json::Value;

/// Wire JSON with cancelled items dropped, References stripped and
/// code-like bodies escaped onto one line
#[must_use]
pub fn redacted_view(document: &Document) -> Value {
    let mut view: Document = document
        .live_items()
        .cloned()
        .map(|mut item| {
            item.definition.remove(Segment::References);
            item.definition.map_bodies(|segment, body| {
                if segment.is_code_like() {
                    escape_code(body)
                } else {
                    body.to_string()
                }
            });
            item
        })
        .collect();
    view.set_metadata(document.metadata().cloned());
    view.to_json_value()
}

fn escape_code(body: &str) -> String {
    body.replace('\n', "\\n").replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_model::{Definition, Item};
    use serde_json::json;

    #[test]
    fn drops_cancelled_and_references() {
        let mut api = Item::new("API-1_Orders".parse().unwrap());
        api.definition = Definition::split("Definition: Orders API | References: ENT-1_Order");
        let mut gone = Item::new("API-2_Old".parse().unwrap());
        gone.cancelled = true;
        let mut doc: Document = [api, gone].into_iter().collect();
        doc.set_metadata(Some(json!({"rev": 1})));

        let view = redacted_view(&doc);
        assert_eq!(view["APIs"]["API-1_Orders"]["definition"], "Definition: Orders API");
        assert!(view["APIs"].get("API-2_Old").is_none());
        assert_eq!(view["_meta"]["rev"], 1);
    }

    #[test]
    fn escapes_code_like_bodies() {
        let mut ent = Item::new("ENT-1_Order".parse().unwrap());
        ent.definition.set(Segment::Definition, "An order\nwith lines");
        ent.definition.set(Segment::Contract, "id: uuid\nstate: a|b");
        let doc: Document = [ent].into_iter().collect();

        let view = redacted_view(&doc);
        assert_eq!(
            view["Entities"]["ENT-1_Order"]["definition"],
            "Definition: An order\nwith lines | Contract: id: uuid\\nstate: a\\|b"
        );
    }

    #[test]
    fn source_document_is_untouched() {
        let mut ent = Item::new("ENT-1_Order".parse().unwrap());
        ent.definition.set(Segment::References, "UC-1_Checkout");
        let doc: Document = [ent].into_iter().collect();
        let _ = redacted_view(&doc);
        let item = doc.get(&"ENT-1_Order".parse().unwrap()).unwrap();
        assert_eq!(item.definition.get(Segment::References), Some("UC-1_Checkout"));
    }
}
