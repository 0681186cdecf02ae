//! Patches: per-turn instructions folded into items

use indexmap::IndexMap;
use reqgraph_model::{Label, OpenItems, Segment, Status};
use std::collections::BTreeMap;
use std::fmt;

/// One proposed change to one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Set the status explicitly
    StatusChange(Status),
    /// Overlay definition segments; overlay bodies win
    SegmentOverlay(BTreeMap<Segment, String>),
    /// Replace the open items wholesale
    OpenItemsReplace(OpenItems),
    /// Append to the ask log
    AskLogAppend(String),
    /// Remove the item
    Cancel,
}

impl Patch {
    #[inline]
    #[must_use]
    pub fn is_cancel(&self) -> bool {
        matches!(self, Patch::Cancel)
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Patch::StatusChange(status) => write!(f, "status -> {status}"),
            Patch::SegmentOverlay(segments) => {
                let names: Vec<&str> = segments.keys().map(|segment| segment.name()).collect();
                write!(f, "overlay [{}]", names.join(", "))
            }
            Patch::OpenItemsReplace(items) => write!(f, "open_items = {}", items.render()),
            Patch::AskLogAppend(text) => write!(f, "ask_log += {}", text.replace('\n', " / ")),
            Patch::Cancel => f.write_str("cancel"),
        }
    }
}

/// Patches per label, in the order labels first appeared
///
/// Blocks for the same label accumulate in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    patches: IndexMap<Label, Vec<Patch>>,
}

impl PatchSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append patches for `label`
    pub fn extend(&mut self, label: Label, patches: impl IntoIterator<Item = Patch>) {
        self.patches.entry(label).or_default().extend(patches);
    }

    /// Patches for one label
    #[must_use]
    pub fn get(&self, label: &Label) -> Option<&[Patch]> {
        self.patches.get(label).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &[Patch])> {
        self.patches
            .iter()
            .map(|(label, patches)| (label, patches.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.patches.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

impl<'a> IntoIterator for &'a PatchSet {
    type Item = (&'a Label, &'a Vec<Patch>);
    type IntoIter = indexmap::map::Iter<'a, Label, Vec<Patch>>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
