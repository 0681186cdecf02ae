//! Open items and the ask log
//!
//! Both are always-allowed item fields, not definition segments.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static SUFFIX_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\[(]\s*(high|med|medium|low)\s*[\])]\s*$").expect("suffix tag pattern is valid")
});

static PREFIX_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:[\[(]\s*(high|med|medium|low)\s*[\])]|(high|med|medium|low)\s*:)\s*")
        .expect("prefix tag pattern is valid")
});

/// Severity of an open item
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    #[default]
    Med,
    Low,
}

impl Severity {
    /// Wire token
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Med => "med",
            Severity::Low => "low",
        }
    }

    fn from_tag(tag: &str) -> Severity {
        match tag.to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Med,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gap in an item's specification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpenItem {
    pub text: String,
    pub severity: Severity,
}

impl OpenItem {
    #[must_use]
    pub fn new(text: impl Into<String>, severity: Severity) -> Self {
        Self {
            text: text.into().trim().to_string(),
            severity,
        }
    }

    /// Parse one entry; untagged entries default to `med`
    #[must_use]
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        if let Some(caps) = SUFFIX_TAG.captures(entry) {
            let severity = Severity::from_tag(&caps[1]);
            let text = entry[..caps.get(0).map_or(entry.len(), |m| m.start())].trim();
            return (!text.is_empty()).then(|| Self::new(text, severity));
        }
        if let Some(caps) = PREFIX_TAG.captures(entry) {
            let tag = caps.get(1).or_else(|| caps.get(2)).map_or("med", |m| m.as_str());
            let text = entry[caps.get(0).map_or(0, |m| m.end())..].trim();
            return (!text.is_empty()).then(|| Self::new(text, Severity::from_tag(tag)));
        }
        Some(Self::new(entry, Severity::Med))
    }
}

impl fmt::Display for OpenItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.text, self.severity)
    }
}

/// Semicolon-separated list of open items
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenItems(Vec<OpenItem>);

impl OpenItems {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the wire form
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(raw.split(';').filter_map(OpenItem::parse).collect())
    }

    /// Render the wire form
    #[must_use]
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Append an item unless one with the same text exists
    ///
    /// Returns whether the item was added.
    pub fn push_unique(&mut self, item: OpenItem) -> bool {
        if self.0.iter().any(|existing| existing.text == item.text) {
            return false;
        }
        self.0.push(item);
        true
    }

    /// Set every item's severity
    pub fn set_all_severities(&mut self, severity: Severity) {
        for item in &mut self.0 {
            item.severity = severity;
        }
    }

    /// Rewrite every item's text in place
    pub fn map_texts<F>(&mut self, mut f: F)
    where
        F: FnMut(&str) -> String,
    {
        for item in &mut self.0 {
            item.text = f(&item.text);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OpenItem> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All texts joined with newlines, for reference extraction
    #[must_use]
    pub fn text(&self) -> String {
        self.0
            .iter()
            .map(|item| item.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<OpenItem> for OpenItems {
    fn from_iter<T: IntoIterator<Item = OpenItem>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Append-only provenance log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskLog(Vec<String>);

impl AskLog {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the newline-joined wire form
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let mut log = Self::new();
        log.append(raw);
        log
    }

    /// Append one or more lines; blank lines are skipped
    pub fn append(&mut self, text: &str) {
        self.0.extend(
            text.lines()
                .map(str::trim_end)
                .filter(|line| !line.trim().is_empty())
                .map(ToString::to_string),
        );
    }

    /// Render the wire form
    #[must_use]
    pub fn render(&self) -> String {
        self.0.join("\n")
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
