//! Component-ownership resolution
//!
//! An element mentioned by more than one component gets a single owner.
//! Non-owners keep their text but the element's label in it is rewritten to
//! the unlinkable form, so the next recompute no longer sees a reference.

use crate::analysis::{reply_lines, strip_keyword, Analysis, AnalysisKind, AnalysisRequest, RefineContext};
use reqgraph_graph::replace_mentions;
use reqgraph_model::{Family, Item, Label};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

/// Ownership decision for one contested element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipDecision {
    pub element: Label,
    /// Components whose text mentions the element
    pub claimants: BTreeSet<Label>,
    /// `None` when the reply was UNDECIDED
    pub owner: Option<Label>,
}

impl OwnershipDecision {
    /// Claimants that lose the element
    pub fn non_owners(&self) -> impl Iterator<Item = &Label> {
        self.claimants
            .iter()
            .filter(move |claimant| Some(*claimant) != self.owner.as_ref())
    }
}

/// Component-ownership resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipResolution;

impl OwnershipResolution {
    /// Contested element → claimants, restricted to the roots' neighbourhood
    fn candidates(ctx: &RefineContext<'_>) -> BTreeMap<Label, BTreeSet<Label>> {
        let mut claims: BTreeMap<Label, BTreeSet<Label>> = BTreeMap::new();
        for component in ctx
            .document()
            .live_items()
            .filter(|item| item.family() == Family::Comp)
        {
            for target in ctx.refs().targets(&component.label) {
                if target.family() != Family::Comp {
                    claims
                        .entry(target.clone())
                        .or_default()
                        .insert(component.label.clone());
                }
            }
        }

        let scope = ctx.scope();
        claims.retain(|element, claimants| {
            claimants.len() > 1
                && (scope.contains(element) || claimants.iter().any(|c| scope.contains(c)))
        });
        claims
    }
}

impl Analysis for OwnershipResolution {
    type Output = Vec<OwnershipDecision>;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Ownership
    }

    fn prepare(&self, ctx: &RefineContext<'_>) -> Option<AnalysisRequest> {
        let claims = Self::candidates(ctx);
        if claims.is_empty() {
            return None;
        }
        let mut body = String::from("Contested elements:\n");
        let mut labels = BTreeSet::new();
        for (element, claimants) in &claims {
            let names: Vec<String> = claimants.iter().map(ToString::to_string).collect();
            let _ = writeln!(body, "- {element} claimed by {}", names.join(", "));
            labels.insert(element.clone());
            labels.extend(claimants.iter().cloned());
        }
        body.push_str("\nItems:\n");
        body.push_str(&ctx.excerpt(&labels));
        Some(AnalysisRequest {
            kind: self.kind(),
            body,
        })
    }

    fn parse(&self, ctx: &RefineContext<'_>, reply: &str) -> Vec<OwnershipDecision> {
        let claims = Self::candidates(ctx);
        let mut decisions: BTreeMap<Label, OwnershipDecision> = BTreeMap::new();

        for line in reply_lines(reply) {
            let Some(rest) = strip_keyword(line, "OWNER") else {
                tracing::debug!(analysis = %self.kind(), line, "Ignoring reply line");
                continue;
            };
            let Some((element, owner)) = rest.split_once('=') else {
                continue;
            };
            let Some(element) = ctx.resolve(element) else {
                continue;
            };
            let Some(claimants) = claims.get(&element) else {
                continue;
            };
            let owner_text = owner.trim().trim_matches('`');
            let owner = if owner_text.eq_ignore_ascii_case("undecided") {
                None
            } else {
                match ctx.resolve(owner_text) {
                    Some(owner) if claimants.contains(&owner) => Some(owner),
                    _ => {
                        tracing::debug!(element = %element, owner = owner_text, "Owner is not a claimant");
                        continue;
                    }
                }
            };
            decisions.insert(
                element.clone(),
                OwnershipDecision {
                    element,
                    claimants: claimants.clone(),
                    owner,
                },
            );
        }
        decisions.into_values().collect()
    }
}

/// Rewrite every mention of `element` in `item`'s text to the unlinkable form
///
/// Returns whether anything changed.
pub fn unlink_mentions(item: &mut Item, element: &Label) -> bool {
    let replacement = element.unlinkable();
    let before = (item.definition.clone(), item.open_items.clone());
    item.definition
        .map_bodies(|_, body| replace_mentions(body, element, &replacement));
    item.open_items
        .map_texts(|text| replace_mentions(text, element, &replacement));
    before != (item.definition.clone(), item.open_items.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RefineSettings;
    use reqgraph_model::{Definition, Document};

    fn item(label: &str, definition: &str) -> Item {
        let mut item = Item::new(label.parse().unwrap());
        item.definition = Definition::split(definition);
        item
    }

    fn doc() -> Document {
        [
            item("COMP-1_Api", "Definition: writes ENT-1_Order"),
            item("COMP-2_Batch", "Definition: reconciles ENT-1_Order"),
            item("COMP-3_Web", "Definition: renders UI-1_Cart"),
            item("ENT-1_Order", ""),
            item("UI-1_Cart", ""),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn contested_elements_need_two_claimants() {
        let doc = doc();
        let roots: BTreeSet<Label> = ["ENT-1_Order".parse().unwrap()].into_iter().collect();
        let ctx = RefineContext::new(&doc, &roots, "", RefineSettings::default());
        let request = OwnershipResolution.prepare(&ctx).unwrap();
        assert!(request
            .body
            .contains("- ENT-1_Order claimed by COMP-1_Api, COMP-2_Batch\n"));
        assert!(!request.body.contains("UI-1_Cart claimed"));
    }

    #[test]
    fn parses_owner_and_undecided() {
        let doc = doc();
        let roots: BTreeSet<Label> = ["ENT-1_Order".parse().unwrap()].into_iter().collect();
        let ctx = RefineContext::new(&doc, &roots, "", RefineSettings::default());

        let decided = OwnershipResolution.parse(&ctx, "OWNER ENT-1_Order = COMP-2_Batch");
        assert_eq!(decided[0].owner.as_ref().unwrap().to_string(), "COMP-2_Batch");
        let losers: Vec<String> = decided[0].non_owners().map(ToString::to_string).collect();
        assert_eq!(losers, vec!["COMP-1_Api"]);

        let undecided = OwnershipResolution.parse(&ctx, "OWNER ENT-1_Order = UNDECIDED");
        assert!(undecided[0].owner.is_none());
        assert_eq!(undecided[0].non_owners().count(), 2);

        assert!(OwnershipResolution
            .parse(&ctx, "OWNER ENT-1_Order = COMP-3_Web")
            .is_empty());
    }

    #[test]
    fn unlinking_rewrites_definition_and_open_items() {
        let mut component = item("COMP-1_Api", "Definition: writes ENT-1_Order");
        component.open_items = reqgraph_model::OpenItems::parse("schema of ent-1_order [low]");
        let element: Label = "ENT-1_Order".parse().unwrap();

        assert!(unlink_mentions(&mut component, &element));
        assert_eq!(component.definition.render(), "Definition: writes ENT-1 Order");
        assert_eq!(component.open_items.render(), "schema of ENT-1 Order [low]");
        assert!(!unlink_mentions(&mut component, &element));
    }
}
