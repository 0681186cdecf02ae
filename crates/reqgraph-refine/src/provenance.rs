//! Provenance-log synthesis

use crate::analysis::{reply_lines, strip_keyword, Analysis, AnalysisKind, AnalysisRequest, RefineContext};
use reqgraph_model::Label;
use std::fmt::Write;

/// Longest log line kept; longer summaries are cut at a char boundary
pub const MAX_LOG_LINE_CHARS: usize = 200;

/// One line per touched item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogDecisions {
    pub lines: Vec<(Label, String)>,
}

impl LogDecisions {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Summarizes the latest turn into per-item ask-log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct ProvenanceLog;

impl Analysis for ProvenanceLog {
    type Output = LogDecisions;

    fn kind(&self) -> AnalysisKind {
        AnalysisKind::Provenance
    }

    fn prepare(&self, ctx: &RefineContext<'_>) -> Option<AnalysisRequest> {
        if ctx.roots().is_empty() {
            return None;
        }
        let mut body = String::from("Touched items:\n");
        for label in ctx.roots() {
            let _ = writeln!(body, "- {label}");
        }
        body.push_str("\nLatest turn:\n");
        body.push_str(ctx.turn_text().trim());
        body.push_str("\n\nItems:\n");
        body.push_str(&ctx.excerpt(ctx.roots()));
        Some(AnalysisRequest {
            kind: self.kind(),
            body,
        })
    }

    fn parse(&self, ctx: &RefineContext<'_>, reply: &str) -> LogDecisions {
        let mut decisions = LogDecisions::default();
        for line in reply_lines(reply) {
            let Some(rest) = strip_keyword(line, "LOG") else {
                tracing::debug!(analysis = %self.kind(), line, "Ignoring reply line");
                continue;
            };
            let Some((label, text)) = rest.split_once(':') else {
                continue;
            };
            let Some(label) = ctx.resolve(label).filter(|l| ctx.roots().contains(l)) else {
                continue;
            };
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let text: String = text.chars().take(MAX_LOG_LINE_CHARS).collect();
            decisions.lines.push((label, text));
        }
        decisions
    }
}
