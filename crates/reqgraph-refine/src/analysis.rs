//! Analysis trait and the shared read-only context
//!
//! An analysis never touches the graph. It builds one request from a
//! snapshot, and turns the reply into typed decisions that
//! [`apply_refinements`](crate::apply_refinements) later applies in a fixed
//! order.

use crate::excerpt::build_excerpt;
use reqgraph_graph::{Neighbourhood, ReferenceMap};
use reqgraph_model::{Document, Label, LabelKey};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// The four second-pass analyses
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    /// Cross-family call edges among INT/PROC/UI/API
    CallInference,
    /// Direction of same-family pairs that mention each other
    Reorientation,
    /// Which component owns an element claimed by several
    Ownership,
    /// Short per-item provenance lines for the latest turn
    Provenance,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::CallInference,
        AnalysisKind::Reorientation,
        AnalysisKind::Ownership,
        AnalysisKind::Provenance,
    ];

    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::CallInference => "call_inference",
            AnalysisKind::Reorientation => "reorientation",
            AnalysisKind::Ownership => "ownership",
            AnalysisKind::Provenance => "provenance",
        }
    }

    /// Built-in instruction sent ahead of the request body
    #[must_use]
    pub fn default_instruction(self) -> &'static str {
        match self {
            AnalysisKind::CallInference => {
                "You review call relationships between processes, UI surfaces, integrations and APIs. \
                 List every call edge that should exist among the candidates, one per line, as \
                 `CALL <caller> -> <callee>`. List edges that must go as `REMOVE <caller> -> <callee>`. \
                 If a caller's target cannot be determined, write `UNRESOLVED <caller>: <what is missing>`. \
                 Use only candidate labels. Write nothing else."
            }
            AnalysisKind::Reorientation => {
                "Each pair below mentions the other. Decide which item depends on which. \
                 Answer one line per pair: `ORIENT <dependant> -> <dependency>`, or `DROP <a> <b>` \
                 if neither depends on the other. Write nothing else."
            }
            AnalysisKind::Ownership => {
                "Several components reference the same element. For each element, name the single \
                 owning component as `OWNER <element> = <component>`, or `OWNER <element> = UNDECIDED` \
                 if the text does not settle it. Write nothing else."
            }
            AnalysisKind::Provenance => {
                "Summarize what the latest turn changed for each touched item in one short line: \
                 `LOG <label>: <summary>`. Only use the touched labels. Write nothing else."
            }
        }
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One generation call an analysis wants made
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub kind: AnalysisKind,
    /// Candidate listing plus the bounded excerpt
    pub body: String,
}

/// Bounds for the neighbourhood and excerpt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineSettings {
    /// Hops from a root that count as its neighbourhood
    pub hops: usize,
    /// Character budget of one excerpt
    pub excerpt_budget_chars: usize,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            hops: 2,
            excerpt_budget_chars: 6_000,
        }
    }
}

/// Read-only view shared by every analysis of one turn
#[derive(Debug)]
pub struct RefineContext<'a> {
    document: &'a Document,
    roots: BTreeSet<Label>,
    refs: ReferenceMap,
    neighbourhood: Neighbourhood,
    keys: HashMap<LabelKey, Label>,
    turn_text: &'a str,
    settings: RefineSettings,
}

impl<'a> RefineContext<'a> {
    /// Index a snapshot
    ///
    /// Roots are resolved to live canonical labels; dead roots are dropped.
    #[must_use]
    pub fn new(
        document: &'a Document,
        roots: &BTreeSet<Label>,
        turn_text: &'a str,
        settings: RefineSettings,
    ) -> Self {
        let refs = ReferenceMap::from_document(document);
        let neighbourhood = Neighbourhood::build(document, &refs);
        let keys = document.key_index();
        let roots = roots
            .iter()
            .filter_map(|root| keys.get(&root.key()).cloned())
            .collect();
        Self {
            document,
            roots,
            refs,
            neighbourhood,
            keys,
            turn_text,
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.document
    }

    /// Live touched labels
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &BTreeSet<Label> {
        &self.roots
    }

    #[inline]
    #[must_use]
    pub fn refs(&self) -> &ReferenceMap {
        &self.refs
    }

    #[inline]
    #[must_use]
    pub fn turn_text(&self) -> &str {
        self.turn_text
    }

    /// Live labels within the configured hops of any root
    #[must_use]
    pub fn scope(&self) -> BTreeSet<Label> {
        self.neighbourhood.within(&self.roots, self.settings.hops)
    }

    /// Resolve a label spelled in a reply to a live canonical label
    #[must_use]
    pub fn resolve(&self, text: &str) -> Option<Label> {
        let text = text.trim().trim_matches(|c: char| c == '`' || c == '*' || c == ',' || c == '.');
        let label = Label::parse(text).ok()?;
        self.keys.get(&label.key()).cloned()
    }

    /// Render the given labels within the excerpt budget, roots first
    #[must_use]
    pub fn excerpt(&self, labels: &BTreeSet<Label>) -> String {
        build_excerpt(
            self.document,
            &self.roots,
            labels,
            self.settings.excerpt_budget_chars,
        )
    }
}

/// A second-pass analysis
///
/// `prepare` returns `None` when there are no candidates; no call is made
/// then. `parse` must tolerate arbitrary text and ignore lines it cannot
/// read.
pub trait Analysis: Send + Sync + fmt::Debug {
    /// Typed decisions
    type Output: Send + fmt::Debug;

    fn kind(&self) -> AnalysisKind;

    fn prepare(&self, ctx: &RefineContext<'_>) -> Option<AnalysisRequest>;

    fn parse(&self, ctx: &RefineContext<'_>, reply: &str) -> Self::Output;
}

/// Non-empty reply lines with list bullets removed
pub(crate) fn reply_lines(reply: &str) -> impl Iterator<Item = &str> {
    reply
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| !line.is_empty())
}

/// Text after a case-insensitive leading keyword
pub(crate) fn strip_keyword<'l>(line: &'l str, keyword: &str) -> Option<&'l str> {
    let head = line.get(..keyword.len())?;
    let rest = &line[keyword.len()..];
    (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace))
        .then(|| rest.trim())
}

/// `a -> b` with both ends resolved
pub(crate) fn parse_arrow(ctx: &RefineContext<'_>, text: &str) -> Option<(Label, Label)> {
    let (from, to) = text.split_once("->")?;
    Some((ctx.resolve(from)?, ctx.resolve(to)?))
}
