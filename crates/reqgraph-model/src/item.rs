//! Requirements graph node

use crate::family::{ComponentKind, Family, IntegrationDirection, Section};
use crate::label::Label;
use crate::notes::{AskLog, OpenItems};
use crate::segment::{Definition, Segment};
use crate::status::Status;
use std::collections::BTreeSet;

/// A labeled node of the requirements graph
///
/// `dependencies` and `dependants` are host-derived: only the recomputer
/// and the refinement applier write them, and they are exact transposes
/// across the document after every recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub label: Label,
    pub status: Status,
    pub definition: Definition,
    pub open_items: OpenItems,
    pub ask_log: AskLog,
    pub cancelled: bool,
    pub dependencies: BTreeSet<Label>,
    pub dependants: BTreeSet<Label>,
}

impl Item {
    /// Create an empty item with no status
    #[must_use]
    pub fn new(label: Label) -> Self {
        Self {
            label,
            status: Status::Empty,
            definition: Definition::new(),
            open_items: OpenItems::new(),
            ask_log: AskLog::new(),
            cancelled: false,
            dependencies: BTreeSet::new(),
            dependants: BTreeSet::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> Family {
        self.label.family()
    }

    #[inline]
    #[must_use]
    pub fn section(&self) -> Section {
        self.label.section()
    }

    /// Not cancelled
    #[inline]
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.cancelled
    }

    /// Kind segment body, if any
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.definition.get(Segment::Kind)
    }

    /// Component kind (meaningful for COMP items)
    #[must_use]
    pub fn component_kind(&self) -> ComponentKind {
        ComponentKind::classify(self.kind())
    }

    /// Integration direction (meaningful for INT items)
    #[must_use]
    pub fn integration_direction(&self) -> IntegrationDirection {
        IntegrationDirection::classify(self.kind())
    }

    /// Free text that may mention other labels
    ///
    /// Definition segments (including References) and open items.
    #[must_use]
    pub fn reference_text(&self) -> String {
        let definition = self.definition.text();
        let open_items = self.open_items.text();
        match (definition.is_empty(), open_items.is_empty()) {
            (_, true) => definition,
            (true, false) => open_items,
            (false, false) => format!("{definition}\n{open_items}"),
        }
    }
}
