//! Definition segments
//!
//! A definition is stored on the wire as one string of named segments,
//! `Capitalized: body`, joined with `" | "`. [`Definition`] is the typed
//! form: an ordered segment map that renders in the fixed preferred order.

use crate::family::Family;
use std::collections::BTreeMap;
use std::fmt;

/// Separator between rendered segments
pub const SEGMENT_SEPARATOR: &str = " | ";

/// Named part of a definition
///
/// Declaration order is the preferred render order: definition, flow,
/// notes, kind, contract, contracts, snippets, outcomes, decision, then the
/// remaining segments lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    Definition,
    Flow,
    Notes,
    Kind,
    Contract,
    Contracts,
    Snippets,
    Outcomes,
    Decision,
    /// Explicit user-authored relationship field
    References,
}

impl Segment {
    /// All segments in render order
    pub const ALL: [Segment; 10] = [
        Segment::Definition,
        Segment::Flow,
        Segment::Notes,
        Segment::Kind,
        Segment::Contract,
        Segment::Contracts,
        Segment::Snippets,
        Segment::Outcomes,
        Segment::Decision,
        Segment::References,
    ];

    /// Lower-cased name, as used by the delta protocol
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Segment::Definition => "definition",
            Segment::Flow => "flow",
            Segment::Notes => "notes",
            Segment::Kind => "kind",
            Segment::Contract => "contract",
            Segment::Contracts => "contracts",
            Segment::Snippets => "snippets",
            Segment::Outcomes => "outcomes",
            Segment::Decision => "decision",
            Segment::References => "references",
        }
    }

    /// Capitalized name, as rendered in definitions
    #[inline]
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Segment::Definition => "Definition",
            Segment::Flow => "Flow",
            Segment::Notes => "Notes",
            Segment::Kind => "Kind",
            Segment::Contract => "Contract",
            Segment::Contracts => "Contracts",
            Segment::Snippets => "Snippets",
            Segment::Outcomes => "Outcomes",
            Segment::Decision => "Decision",
            Segment::References => "References",
        }
    }

    /// Case-insensitive name lookup
    #[must_use]
    pub fn from_name(name: &str) -> Option<Segment> {
        let name = name.trim();
        Segment::ALL
            .into_iter()
            .find(|segment| segment.name().eq_ignore_ascii_case(name))
    }

    /// Whether bodies of this segment hold code or contract text
    #[inline]
    #[must_use]
    pub fn is_code_like(self) -> bool {
        matches!(
            self,
            Segment::Contract | Segment::Contracts | Segment::Snippets
        )
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Typed definition: segment → body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definition {
    segments: BTreeMap<Segment, String>,
}

impl Definition {
    /// Create empty definition
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a wire definition string into segments
    ///
    /// A part without a recognised `Name:` prefix continues the previous
    /// segment, or opens the Definition segment when it comes first.
    /// Repeated segments: the later one wins.
    #[must_use]
    pub fn split(raw: &str) -> Self {
        let mut segments: BTreeMap<Segment, String> = BTreeMap::new();
        let mut current: Option<Segment> = None;

        for part in raw.split(SEGMENT_SEPARATOR) {
            if let Some((segment, body)) = parse_prefix(part) {
                segments.insert(segment, body.trim().to_string());
                current = Some(segment);
                continue;
            }

            let piece = part.trim();
            if piece.is_empty() {
                continue;
            }
            let segment = current.unwrap_or(Segment::Definition);
            let body = segments.entry(segment).or_default();
            if !body.is_empty() {
                body.push_str(SEGMENT_SEPARATOR);
            }
            body.push_str(piece);
            current = Some(segment);
        }

        Self { segments }
    }

    /// Render to the wire string
    #[must_use]
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .filter(|(_, body)| !body.is_empty())
            .map(|(segment, body)| format!("{}: {}", segment.title(), body))
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }

    /// Body of a segment
    #[inline]
    #[must_use]
    pub fn get(&self, segment: Segment) -> Option<&str> {
        self.segments.get(&segment).map(String::as_str)
    }

    /// Set a segment body; an empty body removes the segment
    pub fn set(&mut self, segment: Segment, body: impl Into<String>) {
        let body = body.into().trim().to_string();
        if body.is_empty() {
            self.segments.remove(&segment);
        } else {
            self.segments.insert(segment, body);
        }
    }

    /// Remove a segment
    pub fn remove(&mut self, segment: Segment) -> Option<String> {
        self.segments.remove(&segment)
    }

    /// Overlay segments; overlay bodies win
    pub fn overlay<'a, I>(&mut self, overlay: I)
    where
        I: IntoIterator<Item = (&'a Segment, &'a String)>,
    {
        for (segment, body) in overlay {
            self.set(*segment, body.clone());
        }
    }

    /// Drop segments the family does not allow
    ///
    /// Returns the dropped segments so callers can report them.
    pub fn retain_allowed(&mut self, family: Family) -> Vec<Segment> {
        let dropped: Vec<Segment> = self
            .segments
            .keys()
            .copied()
            .filter(|segment| !family.allows(*segment))
            .collect();
        for segment in &dropped {
            self.segments.remove(segment);
        }
        dropped
    }

    /// Rewrite every body in place
    pub fn map_bodies<F>(&mut self, mut f: F)
    where
        F: FnMut(Segment, &str) -> String,
    {
        for (segment, body) in &mut self.segments {
            *body = f(*segment, body);
        }
    }

    /// Iterate segments in render order
    pub fn iter(&self) -> impl Iterator<Item = (Segment, &str)> {
        self.segments
            .iter()
            .map(|(segment, body)| (*segment, body.as_str()))
    }

    /// Whether no segment has content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.values().all(String::is_empty)
    }

    /// All bodies joined with newlines, for reference extraction
    #[must_use]
    pub fn text(&self) -> String {
        self.segments
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn parse_prefix(part: &str) -> Option<(Segment, &str)> {
    let trimmed = part.trim_start();
    let (name, body) = trimmed.split_once(':')?;
    Segment::from_name(name).map(|segment| (segment, body))
}
