//! Recoverable validation findings
//!
//! A diagnostic records a change that was dropped instead of applied. None
//! of them fail a turn.

use crate::label::Label;
use crate::segment::Segment;
use crate::status::Status;
use std::fmt;

/// What was dropped and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Segment not allowed for the item's family
    DisallowedSegment(Segment),
    /// Segment overlay on a locked item
    StatusGated(Status),
    /// New label reuses the family and number of a live label
    LabelCollision(Label),
    /// Cancel for a label that does not exist
    MissingCancelTarget,
    /// Edge the permission matrix does not allow
    IllegalEdge(Label),
    /// Edge whose other endpoint is absent or cancelled
    DeadEndpoint(Label),
}

/// A dropped change attached to the label it concerned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub label: Label,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    #[inline]
    #[must_use]
    pub fn new(label: Label, kind: DiagnosticKind) -> Self {
        Self { label, kind }
    }

    /// Build and log at `warn`
    #[must_use]
    pub fn warn(label: Label, kind: DiagnosticKind) -> Self {
        let diagnostic = Self::new(label, kind);
        tracing::warn!(label = %diagnostic.label, "{}", diagnostic);
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::DisallowedSegment(segment) => write!(
                f,
                "{}: segment '{}' is not allowed for {} items",
                self.label,
                segment,
                self.label.family()
            ),
            DiagnosticKind::StatusGated(status) => write!(
                f,
                "{}: definition is locked while {}",
                self.label, status
            ),
            DiagnosticKind::LabelCollision(existing) => write!(
                f,
                "{}: {}-{} is already used by {}",
                self.label,
                self.label.family(),
                self.label.number(),
                existing
            ),
            DiagnosticKind::MissingCancelTarget => {
                write!(f, "{}: nothing to cancel", self.label)
            }
            DiagnosticKind::IllegalEdge(dependency) => write!(
                f,
                "{}: may not depend on {}",
                self.label, dependency
            ),
            DiagnosticKind::DeadEndpoint(other) => write!(
                f,
                "{}: {} is absent or cancelled",
                self.label, other
            ),
        }
    }
}
