//! Tolerant delta parser
//!
//! Turns free-form generated text into a [`PatchSet`] plus the free text
//! meant for the user. The parser never fails: text it cannot read is
//! handed back as trailing text, and a change region that holds no
//! recognisable block marks the turn malformed.
//!
//! # Layout
//!
//! ```text
//! ### CHANGES
//! ## UC-1_Checkout [partial]
//! - [definition]: Customer pays for the cart
//! - [flow]: review cart, pay, confirm
//! - [open_items]: tax rules [high]; currency [low]
//! ### REPLY
//! Added the checkout flow.
//! ```

use crate::patch::{Patch, PatchSet};
use once_cell::sync::Lazy;
use regex::Regex;
use reqgraph_model::{Label, OpenItems, Segment, Status};
use std::collections::BTreeMap;

static CHANGES_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*###[ \t]*changes[ \t]*:?[ \t]*\r?$").expect("changes anchor is valid")
});

static REPLY_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*###[ \t]*reply[ \t]*:?[ \t]*\r?$").expect("reply anchor is valid")
});

static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^([ \t]*)((?:[#>*+\-]+[ \t]*)*)[`*]*((?i:A|UC|PROC|COMP|ROLE|UI|ENT|INT|API|NFR)-?[0-9]+_[A-Za-z0-9_]+)([`*]*)(.*?)[ \t]*\r?$",
    )
    .expect("block header pattern is valid")
});

static HEADER_STATUS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:[:\-][ \t]*)?[\[(]?[ \t]*(?:status[ \t]*[:=]?[ \t]*)?([A-Za-z]+)[ \t]*[\])]?[ \t]*:?$")
        .expect("header status pattern is valid")
});

static SUB_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:[-*+][ \t]*)?\[([A-Za-z_ \-]+)\][ \t]*:?[ \t]?(.*?)\r?$")
        .expect("sub-block pattern is valid")
});

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*```[A-Za-z]*[ \t]*\r?$").expect("code fence pattern is valid"));

/// Result of parsing one generated turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDelta {
    /// Patches per label
    pub patches: PatchSet,
    /// Free text for the user
    pub trailing_text: String,
    /// A change region was present but held no readable block
    pub malformed: bool,
    /// Sub-blocks that were skipped
    pub warnings: Vec<String>,
}

impl ParsedDelta {
    /// Whether any change was proposed
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.patches.is_empty()
    }
}

/// Parse generated text
#[must_use]
pub fn parse_delta(text: &str) -> ParsedDelta {
    let changes = CHANGES_ANCHOR.find(text);
    let reply_from = changes.map_or(0, |m| m.end());
    let reply = REPLY_ANCHOR.find_at(text, reply_from);

    let (region, trailing) = match (changes, reply) {
        (None, None) => {
            return ParsedDelta {
                trailing_text: text.trim().to_string(),
                ..ParsedDelta::default()
            };
        }
        (Some(c), None) => (&text[c.end()..], join_trailing(&[&text[..c.start()]])),
        (Some(c), Some(r)) => (
            &text[c.end()..r.start()],
            join_trailing(&[&text[..c.start()], &text[r.end()..]]),
        ),
        (None, Some(r)) => (&text[..r.start()], join_trailing(&[&text[r.end()..]])),
    };

    let RegionParse {
        patches,
        warnings,
        blocks,
    } = parse_region(region);

    if blocks == 0 && !region.trim().is_empty() {
        tracing::warn!(
            region_len = region.len(),
            "Change region holds no readable block"
        );
        return ParsedDelta {
            patches: PatchSet::new(),
            trailing_text: text.to_string(),
            malformed: true,
            warnings,
        };
    }

    tracing::debug!(
        labels = patches.len(),
        blocks,
        warnings = warnings.len(),
        "Parsed delta"
    );
    ParsedDelta {
        patches,
        trailing_text: trailing,
        malformed: false,
        warnings,
    }
}

fn join_trailing(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

struct RegionParse {
    patches: PatchSet,
    warnings: Vec<String>,
    blocks: usize,
}

struct Block {
    label: Label,
    status: Option<Status>,
    subs: Vec<(String, Vec<String>)>,
}

fn parse_region(region: &str) -> RegionParse {
    let mut out = RegionParse {
        patches: PatchSet::new(),
        warnings: Vec::new(),
        blocks: 0,
    };
    let mut current: Option<Block> = None;

    for line in region.lines() {
        let in_body = current.as_ref().is_some_and(|block| !block.subs.is_empty());
        if let Some((label, status)) = parse_header(line, in_body) {
            if let Some(block) = current.take() {
                finish_block(block, &mut out);
            }
            current = Some(Block {
                label,
                status,
                subs: Vec::new(),
            });
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        if let Some(caps) = SUB_BLOCK.captures(line) {
            block
                .subs
                .push((caps[1].to_string(), vec![caps[2].to_string()]));
            continue;
        }

        match block.subs.last_mut() {
            Some((_, body)) => body.push(line.trim_end().to_string()),
            None if CODE_FENCE.is_match(line) || line.trim().is_empty() => {}
            None => {
                tracing::debug!(label = %block.label, line, "Ignoring text outside a sub-block");
            }
        }
    }

    if let Some(block) = current.take() {
        finish_block(block, &mut out);
    }
    out
}

/// Read a block header line
///
/// Inside an open sub-block body, indented or bulleted label lines are list
/// entries of that body, not headers. A header may carry a status token; any
/// other trailing text is a title and is only accepted after a `#` or bold
/// marker, in brackets, or after a separator outside a body.
fn parse_header(line: &str, in_body: bool) -> Option<(Label, Option<Status>)> {
    let caps = BLOCK_HEADER.captures(line)?;
    let markers = caps[2].trim_end();
    let bulleted = markers.contains(['-', '+', '>']) || markers == "*";
    if in_body && (!caps[1].is_empty() || bulleted) {
        return None;
    }
    let label = Label::parse(&caps[3]).ok()?;

    let rest = caps[5].trim().trim_matches(|c: char| c == '*' || c == '`').trim();
    if rest.is_empty() {
        return Some((label, None));
    }
    let status = HEADER_STATUS
        .captures(rest)
        .and_then(|status_caps| Status::from_token(&status_caps[1]));
    if status.is_some() {
        return Some((label, status));
    }

    let heading = markers.contains('#') || caps[4].contains("**");
    let bracketed = rest.starts_with(['(', '[']);
    let separated = !in_body && rest.starts_with(['-', ':', '|', '\u{2013}', '\u{2014}']);
    if heading || bracketed || separated {
        tracing::debug!(label = %label, title = rest, "Ignoring header title");
        Some((label, None))
    } else {
        None
    }
}

fn finish_block(block: Block, out: &mut RegionParse) {
    out.blocks += 1;

    let mut cancel = false;
    let mut status = block.status;
    let mut overlay: BTreeMap<Segment, String> = BTreeMap::new();
    let mut open_items: Option<OpenItems> = None;
    let mut ask_log: Vec<String> = Vec::new();

    for (raw_name, lines) in block.subs {
        let body = strip_fences(&lines);
        if body.eq_ignore_ascii_case("delete") {
            cancel = true;
            continue;
        }
        let name = raw_name.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match name.as_str() {
            "status" => match Status::from_token(&body) {
                Some(parsed) => status = Some(parsed),
                None => out.warnings.push(warn_skip(&block.label, &raw_name, "unknown status")),
            },
            "cancelled" | "cancel" => {
                if matches!(body.to_ascii_lowercase().as_str(), "true" | "yes") {
                    cancel = true;
                }
            }
            "open_items" => open_items = Some(OpenItems::parse(&list_to_semicolons(&body))),
            "ask_log" => {
                if !body.is_empty() {
                    ask_log.push(body);
                }
            }
            _ => match Segment::from_name(&name) {
                Some(segment) => {
                    overlay.insert(segment, body);
                }
                None => out
                    .warnings
                    .push(warn_skip(&block.label, &raw_name, "unknown sub-block")),
            },
        }
    }

    let patches = if cancel {
        vec![Patch::Cancel]
    } else {
        let mut patches = Vec::new();
        if let Some(status) = status {
            patches.push(Patch::StatusChange(status));
        }
        if !overlay.is_empty() {
            patches.push(Patch::SegmentOverlay(overlay));
        }
        if let Some(items) = open_items {
            patches.push(Patch::OpenItemsReplace(items));
        }
        if !ask_log.is_empty() {
            patches.push(Patch::AskLogAppend(ask_log.join("\n")));
        }
        patches
    };

    if !patches.is_empty() {
        out.patches.extend(block.label, patches);
    }
}

fn strip_fences(lines: &[String]) -> String {
    lines
        .iter()
        .filter(|line| !CODE_FENCE.is_match(line))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Bulleted multi-line lists become one semicolon list
fn list_to_semicolons(body: &str) -> String {
    body.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '+']).trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn warn_skip(label: &Label, name: &str, reason: &str) -> String {
    tracing::warn!(label = %label, sub_block = name, reason, "Skipping sub-block");
    format!("{label}: skipped [{name}] ({reason})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn label(text: &str) -> Label {
        text.parse().unwrap()
    }

    #[test]
    fn no_anchor_is_all_trailing() {
        let parsed = parse_delta("Just chatting about UC-1_Checkout.");
        assert!(!parsed.malformed);
        assert!(parsed.patches.is_empty());
        assert_eq!(parsed.trailing_text, "Just chatting about UC-1_Checkout.");
    }

    #[test]
    fn parses_blocks_and_reply() {
        let text = "Intro\n### CHANGES\n## UC-1_Checkout [partial]\n- [definition]: Customer pays\n- [flow]: cart\n  then pay\n- [open_items]: tax [high]; currency\n### REPLY\nDone.";
        let parsed = parse_delta(text);
        assert!(!parsed.malformed);
        assert_eq!(parsed.trailing_text, "Intro\n\nDone.");

        let patches = parsed.patches.get(&label("UC-1_Checkout")).unwrap();
        assert_eq!(patches[0], Patch::StatusChange(Status::Partial));
        let Patch::SegmentOverlay(overlay) = &patches[1] else {
            panic!("expected overlay, got {:?}", patches[1]);
        };
        assert_eq!(overlay[&Segment::Definition], "Customer pays");
        assert_eq!(overlay[&Segment::Flow], "cart\n  then pay");
        let Patch::OpenItemsReplace(items) = &patches[2] else {
            panic!("expected open items");
        };
        assert_eq!(items.render(), "tax [high]; currency [med]");
    }

    #[test]
    fn header_status_forms() {
        for header in [
            "## PROC-1_Charge [draft]",
            "**PROC-1_Charge** (status: draft)",
            "- PROC-1_Charge: draft",
            "### PROC-1_Charge",
        ] {
            let text = format!("### CHANGES\n{header}\n- [notes]: x\n");
            let parsed = parse_delta(&text);
            assert!(!parsed.malformed, "{header}");
            assert!(parsed.patches.get(&label("PROC-1_Charge")).is_some(), "{header}");
        }
    }

    #[test]
    fn reply_only_region_precedes_anchor() {
        let text = "ENT-1_Order\n- [definition]: An order\n### REPLY\nAdded order.";
        let parsed = parse_delta(text);
        assert_eq!(parsed.trailing_text, "Added order.");
        assert_eq!(parsed.patches.len(), 1);
    }

    #[test]
    fn delete_body_cancels() {
        let parsed = parse_delta("### CHANGES\nCOMP-2_Worker\n- [definition]: delete\n");
        assert_eq!(
            parsed.patches.get(&label("COMP-2_Worker")).unwrap(),
            &[Patch::Cancel]
        );

        let parsed = parse_delta("### CHANGES\nCOMP-2_Worker\n- [cancelled]: true\n- [notes]: x\n");
        assert_eq!(
            parsed.patches.get(&label("COMP-2_Worker")).unwrap(),
            &[Patch::Cancel]
        );
    }

    #[test]
    fn unknown_sub_block_is_skipped_not_malformed() {
        let parsed = parse_delta("### CHANGES\nUC-1_Checkout\n- [mood]: happy\n- [notes]: ok\n");
        assert!(!parsed.malformed);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.patches.get(&label("UC-1_Checkout")).unwrap().len(), 1);
    }

    #[test]
    fn region_without_blocks_is_malformed() {
        let text = "### CHANGES\nI changed some things\n### REPLY\nok";
        let parsed = parse_delta(text);
        assert!(parsed.malformed);
        assert!(parsed.patches.is_empty());
        assert_eq!(parsed.trailing_text, text);
    }

    #[test]
    fn blank_region_is_not_malformed() {
        let parsed = parse_delta("### CHANGES\n\n### REPLY\nNothing to change.");
        assert!(!parsed.malformed);
        assert_eq!(parsed.trailing_text, "Nothing to change.");
    }

    #[test]
    fn blocks_for_same_label_accumulate() {
        let text = "### CHANGES\nUC-1_A\n- [notes]: one\nUC-1_A\n- [ask_log]: asked\n";
        let parsed = parse_delta(text);
        let patches = parsed.patches.get(&label("UC-1_A")).unwrap();
        assert_eq!(patches.len(), 2);
        assert!(matches!(patches[1], Patch::AskLogAppend(_)));
    }

    #[test]
    fn anchors_are_case_insensitive() {
        let parsed = parse_delta("### changes\nNFR-1_Latency\n- [decision]: p99 < 200ms\n### Reply\nok");
        assert_eq!(parsed.patches.len(), 1);
        assert_eq!(parsed.trailing_text, "ok");
    }

    #[test]
    fn bulleted_open_items_are_joined() {
        let parsed = parse_delta("### CHANGES\nUC-1_A\n- [open_items]:\n  - who pays [high]\n  - refunds\n");
        let Patch::OpenItemsReplace(items) = &parsed.patches.get(&label("UC-1_A")).unwrap()[0] else {
            panic!("expected open items");
        };
        assert_eq!(items.render(), "who pays [high]; refunds [med]");
    }

    fn definition_of<'a>(parsed: &'a ParsedDelta, text: &str) -> Option<&'a str> {
        parsed.patches.get(&label(text))?.iter().find_map(|patch| match patch {
            Patch::SegmentOverlay(overlay) => overlay.get(&Segment::Definition).map(String::as_str),
            _ => None,
        })
    }

    #[test]
    fn titled_headers_open_their_own_block() {
        for second in ["## UC-2_Refund - Refund flow", "### UC-2_Refund (new)", "**UC-2_Refund** Refund flow"] {
            let text = format!(
                "### CHANGES\n## UC-1_Checkout\n- [definition]: pay\n{second}\n- [definition]: refund money\n### REPLY\nok"
            );
            let parsed = parse_delta(&text);
            assert_eq!(parsed.patches.len(), 2, "{second}");
            assert_eq!(definition_of(&parsed, "UC-1_Checkout"), Some("pay"), "{second}");
            assert_eq!(definition_of(&parsed, "UC-2_Refund"), Some("refund money"), "{second}");
        }
    }

    #[test]
    fn prose_mentioning_a_label_stays_in_the_body() {
        let text = "### CHANGES\nUC-1_Checkout\n- [flow]: first\nPROC-1_Charge takes payment\n";
        let parsed = parse_delta(text);
        assert_eq!(parsed.patches.len(), 1);
        let Patch::SegmentOverlay(overlay) = &parsed.patches.get(&label("UC-1_Checkout")).unwrap()[0] else {
            panic!("expected overlay");
        };
        assert_eq!(overlay[&Segment::Flow], "first\nPROC-1_Charge takes payment");
    }

    #[test]
    fn bulleted_labels_in_a_body_are_list_entries() {
        for list in ["  - PROC-1_Charge\n  - PROC-2_Ship", "- PROC-1_Charge\n- PROC-2_Ship", "  * PROC-1_Charge\n  * PROC-2_Ship"] {
            let text = format!(
                "### CHANGES\n## UC-1_Checkout\n- [flow]:\n{list}\n- [notes]: keep receipts\n### REPLY\nok"
            );
            let parsed = parse_delta(&text);
            assert_eq!(parsed.patches.len(), 1, "{list}");
            let Patch::SegmentOverlay(overlay) = &parsed.patches.get(&label("UC-1_Checkout")).unwrap()[0] else {
                panic!("expected overlay for {list}");
            };
            assert!(overlay[&Segment::Flow].contains("PROC-1_Charge"), "{list}");
            assert!(overlay[&Segment::Flow].contains("PROC-2_Ship"), "{list}");
            assert_eq!(overlay[&Segment::Notes], "keep receipts");
        }
    }

    const HEADER_POOL: [&str; 5] = ["UC-1_Checkout", "UC-2_Refund", "PROC-1_Charge", "COMP-1_Api", "ENT-1_Order"];
    const ENTRY_POOL: [&str; 4] = ["PROC-7_Ship", "ENT-9_Line", "API-4_Pay", "UI-3_Cart"];

    fn header_line(text: &str, style: usize) -> String {
        match style {
            0 => text.to_string(),
            1 => format!("## {text}"),
            2 => format!("## {text} - Refund flow"),
            3 => format!("### {text} (new)"),
            _ => format!("**{text}** [draft]"),
        }
    }

    proptest! {
        #[test]
        fn patches_only_name_header_labels(
            headers in prop::sample::subsequence(HEADER_POOL.to_vec(), 1..=HEADER_POOL.len()),
            styles in prop::collection::vec(0usize..5, HEADER_POOL.len()),
            entries in prop::collection::vec((prop::sample::select(ENTRY_POOL.to_vec()), any::<bool>()), 0..4),
        ) {
            let mut text = String::from("### CHANGES\n");
            for (i, header) in headers.iter().enumerate() {
                text.push_str(&header_line(header, styles[i]));
                text.push_str(&format!("\n- [definition]: text {i}\n- [flow]:\n"));
                for (entry, indented) in &entries {
                    let indent = if *indented { "  " } else { "" };
                    text.push_str(&format!("{indent}- {entry}\n"));
                }
            }
            text.push_str("### REPLY\nok");

            let parsed = parse_delta(&text);
            prop_assert!(!parsed.malformed);
            prop_assert_eq!(parsed.patches.len(), headers.len());
            let header_labels: Vec<Label> = headers.iter().map(|header| label(header)).collect();
            for parsed_label in parsed.patches.labels() {
                prop_assert!(header_labels.contains(parsed_label), "{}", parsed_label);
            }
            for (i, header) in headers.iter().enumerate() {
                let expected = format!("text {i}");
                prop_assert_eq!(definition_of(&parsed, header), Some(expected.as_str()));
            }
        }
    }

    proptest! {
        #[test]
        fn never_panics_and_malformed_keeps_text(text in "[\\PC\\n]{0,200}") {
            let parsed = parse_delta(&text);
            if parsed.malformed {
                prop_assert!(parsed.patches.is_empty());
                prop_assert_eq!(parsed.trailing_text, text);
            }
        }
    }
}
