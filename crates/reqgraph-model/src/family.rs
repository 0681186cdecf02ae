//! Item families and document sections
//!
//! Every label belongs to exactly one [`Family`]; the family fixes the
//! [`Section`] the item lives in and the definition segments it may carry.

use crate::error::ModelError;
use crate::segment::Segment;
use std::fmt;
use std::str::FromStr;

/// Item family, declared in rank order
///
/// The derived `Ord` is the primary key of the label total order:
/// `A < UC < PROC < COMP < ROLE < UI < ENT < INT < API < NFR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    /// Fixed project canvas
    A,
    /// Use case
    Uc,
    /// Process
    Proc,
    /// Runtime component
    Comp,
    /// Role / actor
    Role,
    /// UI surface
    Ui,
    /// Entity
    Ent,
    /// Integration with an external system
    Int,
    /// API
    Api,
    /// Non-functional requirement
    Nfr,
}

impl Family {
    /// All families in rank order
    pub const ALL: [Family; 10] = [
        Family::A,
        Family::Uc,
        Family::Proc,
        Family::Comp,
        Family::Role,
        Family::Ui,
        Family::Ent,
        Family::Int,
        Family::Api,
        Family::Nfr,
    ];

    /// Label prefix (upper case)
    #[inline]
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Family::A => "A",
            Family::Uc => "UC",
            Family::Proc => "PROC",
            Family::Comp => "COMP",
            Family::Role => "ROLE",
            Family::Ui => "UI",
            Family::Ent => "ENT",
            Family::Int => "INT",
            Family::Api => "API",
            Family::Nfr => "NFR",
        }
    }

    /// Section the family's items are stored under
    #[inline]
    #[must_use]
    pub fn section(self) -> Section {
        match self {
            Family::A => Section::A,
            Family::Uc => Section::UseCases,
            Family::Proc => Section::Processes,
            Family::Comp => Section::Components,
            Family::Role => Section::Actors,
            Family::Ui => Section::Ui,
            Family::Ent => Section::Entities,
            Family::Int => Section::Integrations,
            Family::Api => Section::Apis,
            Family::Nfr => Section::Nfrs,
        }
    }

    /// Definition segments this family may carry, in render order
    #[must_use]
    pub fn allowed_segments(self) -> &'static [Segment] {
        use Segment::{
            Contract, Contracts, Decision, Definition, Flow, Kind, Notes, Outcomes, References,
            Snippets,
        };
        match self {
            Family::A => &[Definition, Notes, Decision],
            Family::Uc => &[Definition, Flow, Notes, Outcomes, References],
            Family::Proc => &[Definition, Flow, Notes, Snippets, References],
            Family::Comp => &[Definition, Notes, Kind, Contracts, References],
            Family::Role => &[Definition, Notes, References],
            Family::Ui => &[Definition, Flow, Notes, References],
            Family::Ent => &[Definition, Notes, Contract, References],
            Family::Int => &[Definition, Notes, Kind, Contract, References],
            Family::Api => &[Definition, Notes, Contract, References],
            Family::Nfr => &[Definition, Notes, Decision, References],
        }
    }

    /// Whether `segment` is allowed in this family's definitions
    #[inline]
    #[must_use]
    pub fn allows(self, segment: Segment) -> bool {
        self.allowed_segments().contains(&segment)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Family {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Family::ALL
            .into_iter()
            .find(|family| family.prefix() == upper)
            .ok_or_else(|| ModelError::UnknownFamily(s.to_string()))
    }
}

/// Top-level document section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    A,
    UseCases,
    Processes,
    Components,
    Actors,
    Ui,
    Entities,
    Integrations,
    Apis,
    Nfrs,
}

impl Section {
    /// Name used as the outer key of the wire document
    #[inline]
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Section::A => "A",
            Section::UseCases => "UseCases",
            Section::Processes => "Processes",
            Section::Components => "Components",
            Section::Actors => "Actors",
            Section::Ui => "UI",
            Section::Entities => "Entities",
            Section::Integrations => "Integrations",
            Section::Apis => "APIs",
            Section::Nfrs => "NFRs",
        }
    }

    /// Resolve a wire section name
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Section> {
        Family::ALL
            .into_iter()
            .map(Family::section)
            .find(|section| section.wire_name() == name)
    }

    /// The family stored in this section
    #[must_use]
    pub fn family(self) -> Family {
        match self {
            Section::A => Family::A,
            Section::UseCases => Family::Uc,
            Section::Processes => Family::Proc,
            Section::Components => Family::Comp,
            Section::Actors => Family::Role,
            Section::Ui => Family::Ui,
            Section::Entities => Family::Ent,
            Section::Integrations => Family::Int,
            Section::Apis => Family::Api,
            Section::Nfrs => Family::Nfr,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Declared kind of a COMP item, read from its Kind segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Persistent store; may only own entities
    Datastore,
    /// Service, worker or job; never owns entities directly
    Runtime,
    /// Anything else, including an unset kind
    Other,
}

impl ComponentKind {
    /// Classify free Kind text
    #[must_use]
    pub fn classify(kind: Option<&str>) -> Self {
        let Some(kind) = kind else {
            return ComponentKind::Other;
        };
        let kind = kind.to_ascii_lowercase();
        let words: Vec<&str> = kind
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        if words
            .iter()
            .any(|w| matches!(*w, "datastore" | "database" | "db" | "store"))
        {
            ComponentKind::Datastore
        } else if words
            .iter()
            .any(|w| matches!(*w, "service" | "worker" | "job"))
        {
            ComponentKind::Runtime
        } else {
            ComponentKind::Other
        }
    }
}

/// Declared direction of an INT item, read from its Kind segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrationDirection {
    /// External system calls into us
    Inbound,
    /// We call the external system
    Outbound,
    /// Not declared
    Unspecified,
}

impl IntegrationDirection {
    /// Classify free Kind text
    #[must_use]
    pub fn classify(kind: Option<&str>) -> Self {
        let Some(kind) = kind else {
            return IntegrationDirection::Unspecified;
        };
        let kind = kind.to_ascii_lowercase();
        if kind.contains("inbound") {
            IntegrationDirection::Inbound
        } else if kind.contains("outbound") {
            IntegrationDirection::Outbound
        } else {
            IntegrationDirection::Unspecified
        }
    }
}
