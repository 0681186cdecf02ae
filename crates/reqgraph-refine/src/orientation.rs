//! Same-family re-orientation for pairs that mention each other

use crate::analysis::{parse_arrow, reply_lines, strip_keyword, Analysis, AnalysisKind, AnalysisRequest, RefineContext};
use reqgraph_model::{Family, Label};
use std::collections::BTreeSet;
use std::fmt::Write;

const REORIENTED_FAMILIES: [Family; 3] = [Family::Proc, Family::Ui, Family::Ent];

/// Decisions of the re-orientation analysis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrientationDecisions {
    /// `(dependant, dependency)` for each settled pair
    pub orient: Vec<(Label, Label)>,
    /// Pairs where neither depends on the other
    pub drop: Vec<(Label, Label)>,
}

/// Same-family re-orientation
#[derive(Debug, Clone, Copy, Default)]
pub struct Reorientation;

impl Reorientation {
    /// Unordered `(lower, higher)` pairs with reciprocal mentions
    fn candidates(ctx: &RefineContext<'_>) -> BTreeSet<(Label, Label)> {
        let scope = ctx.scope();
        ctx.refs()
            .pairs()
            .into_iter()
            .filter(|(a, b)| {
                a.family() == b.family()
                    && REORIENTED_FAMILIES.contains(&a.family())
                    && (scope.contains(a) || scope.contains(b))
                    && ctx.refs().mentions(a, b)
                    && ctx.refs().mentions(b, a)
            })
            .collect()
    }
}

impl Analysis for Reorientation {
    type Output = OrientationDecisions;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Reorientation
    }

    fn prepare(&self, ctx: &RefineContext<'_>) -> Option<AnalysisRequest> {
        let pairs = Self::candidates(ctx);
        if pairs.is_empty() {
            return None;
        }
        let mut body = String::from("Pairs:\n");
        let mut labels = BTreeSet::new();
        for (a, b) in pairs {
            let _ = writeln!(body, "- {a} <-> {b}");
            labels.insert(a);
            labels.insert(b);
        }
        body.push_str("\nItems:\n");
        body.push_str(&ctx.excerpt(&labels));
        Some(AnalysisRequest {
            kind: self.kind(),
            body,
        })
    }

    fn parse(&self, ctx: &RefineContext<'_>, reply: &str) -> OrientationDecisions {
        let pairs = Self::candidates(ctx);
        let is_candidate = |a: &Label, b: &Label| {
            pairs.contains(&(a.clone(), b.clone())) || pairs.contains(&(b.clone(), a.clone()))
        };
        let mut decisions = OrientationDecisions::default();

        for line in reply_lines(reply) {
            if let Some(rest) = strip_keyword(line, "ORIENT") {
                if let Some((dependant, dependency)) = parse_arrow(ctx, rest) {
                    if is_candidate(&dependant, &dependency) {
                        decisions.orient.push((dependant, dependency));
                    }
                }
            } else if let Some(rest) = strip_keyword(line, "DROP") {
                let mut ends = rest
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|part| !part.is_empty())
                    .filter_map(|part| ctx.resolve(part));
                if let (Some(a), Some(b)) = (ends.next(), ends.next()) {
                    if is_candidate(&a, &b) {
                        decisions.drop.push((a, b));
                    }
                }
            } else {
                tracing::debug!(analysis = %self.kind(), line, "Ignoring reply line");
            }
        }
        decisions
    }
}
