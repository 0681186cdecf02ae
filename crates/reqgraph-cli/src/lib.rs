//! reqgraph CLI
//!
//! Offline commands over local files. Nothing here calls a generation
//! service: `apply` takes a reply that was already produced.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use anyhow::{bail, Context};
use reqgraph_core::{PhraseClassifier, SeverityClassifier};
use reqgraph_delta::{apply_patches, parse_delta, redacted_view, ParsedDelta};
use reqgraph_graph::{finalize, recompute_full, recompute_partial, EdgeSet, RelationshipDiff};
use reqgraph_model::render::render_document;
use reqgraph_model::{Diagnostic, Document};
use std::fmt::Write as _;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber; `RUST_LOG` overrides the `info` default
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read a wire document; a missing file is an empty document
///
/// # Errors
///
/// Fails when the file exists but cannot be read or is not a wire document.
pub fn load_document(path: &Path) -> anyhow::Result<Document> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No document yet, starting empty");
        return Ok(Document::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Document::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Write a wire document as pretty JSON
///
/// # Errors
///
/// Fails when the document cannot be serialized or the file written.
pub fn save_document(path: &Path, document: &Document) -> anyhow::Result<()> {
    let json = document.to_json_string_pretty()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

/// Human-readable listing of what a reply proposes
#[must_use]
pub fn describe_reply(parsed: &ParsedDelta) -> String {
    let mut out = String::new();
    if parsed.malformed {
        out.push_str("malformed: the change region holds no readable block\n");
    }
    for (label, patches) in parsed.patches.iter() {
        let _ = writeln!(out, "{label}");
        for patch in patches {
            let _ = writeln!(out, "  {patch}");
        }
    }
    for warning in &parsed.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    if !parsed.trailing_text.is_empty() {
        let _ = writeln!(out, "---\n{}", parsed.trailing_text);
    }
    out
}

/// What applying a reply did
#[derive(Debug, Clone, Default)]
pub struct ApplySummary {
    pub assistant_text: String,
    pub diffs: Vec<RelationshipDiff>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Apply an already generated reply the way a turn would, minus refinement
///
/// With `user_text`, touched open items are re-graded by the default
/// phrase classifier.
///
/// # Errors
///
/// Fails on a malformed reply; the document is left unchanged.
pub fn apply_reply(
    document: &mut Document,
    reply: &str,
    user_text: Option<&str>,
) -> anyhow::Result<ApplySummary> {
    let parsed = parse_delta(reply);
    if parsed.malformed {
        bail!("reply is malformed, nothing applied");
    }

    let before = EdgeSet::from_document(document);
    let applied = apply_patches(document, &parsed.patches);
    let mut diagnostics = applied.diagnostics.clone();

    if let Some(severity) = user_text.and_then(|text| PhraseClassifier::default().classify(text)) {
        for label in &applied.touched {
            if let Some(item) = document.get_mut(label) {
                item.open_items.set_all_severities(severity);
            }
        }
    }

    diagnostics.extend(recompute_partial(document, &applied.roots()).diagnostics);
    finalize(document);

    Ok(ApplySummary {
        assistant_text: parsed.trailing_text,
        diffs: EdgeSet::diff(&before, &EdgeSet::from_document(document)),
        diagnostics,
    })
}

/// Rebuild every edge; returns the resulting changes
pub fn recompute(document: &mut Document) -> (Vec<RelationshipDiff>, Vec<Diagnostic>) {
    let before = EdgeSet::from_document(document);
    let report = recompute_full(document);
    let diffs = EdgeSet::diff(&before, &EdgeSet::from_document(document));
    (diffs, report.diagnostics)
}

/// Redacted view as pretty JSON
///
/// # Errors
///
/// Fails only if the view cannot be serialized.
pub fn view(document: &Document) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&redacted_view(document))?)
}

/// Prompt-style text rendering
#[must_use]
pub fn render(document: &Document) -> String {
    render_document(document)
}

/// One line per diff, then one per diagnostic
#[must_use]
pub fn format_changes(diffs: &[RelationshipDiff], diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diff in diffs {
        let _ = writeln!(out, "{diff}");
    }
    for diagnostic in diagnostics {
        let _ = writeln!(out, "dropped: {diagnostic}");
    }
    out
}
