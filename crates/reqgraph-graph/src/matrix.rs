//! Type-pair permission matrix
//!
//! `X → Y` reads "X depends on Y". Component kind and integration direction
//! come from the items' Kind segments, so the check takes items rather than
//! bare families.

use reqgraph_model::{ComponentKind, Family, IntegrationDirection, Item};

/// Whether `dependant` may depend on `dependency`
#[must_use]
pub fn permits(dependant: &Item, dependency: &Item) -> bool {
    use Family::{Api, Comp, Ent, Int, Nfr, Proc, Role, Ui, Uc, A};

    if dependant.label == dependency.label {
        return false;
    }
    let target = dependency.family();
    match dependant.family() {
        A | Role | Nfr => false,
        Uc => matches!(target, Role | Proc | Ui | Int | Api | Ent | Nfr),
        Proc => match target {
            Proc | Ent | Api | Nfr => true,
            Int => dependency.integration_direction() == IntegrationDirection::Outbound,
            _ => false,
        },
        Comp => match dependant.component_kind() {
            ComponentKind::Datastore => target == Ent,
            ComponentKind::Runtime => matches!(target, Proc | Ui | Int | Api | Nfr | Comp),
            ComponentKind::Other => matches!(target, Proc | Ui | Int | Api | Ent | Nfr | Comp),
        },
        Ui => matches!(target, Ui | Proc | Api | Ent | Nfr),
        Ent => target == Ent,
        Int => match target {
            Api => dependant.integration_direction() == IntegrationDirection::Inbound,
            Ent | Nfr => true,
            _ => false,
        },
        Api => matches!(target, Proc | Ent | Nfr),
    }
}

/// Orientation chosen for a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// First item depends on second
    Forward,
    /// Second item depends on first
    Backward,
    /// Neither direction is allowed
    Forbidden,
}

/// Orient a mention pair
///
/// `first` must precede `second` in the label total order (family rank,
/// then number, then name). When both directions are legal, a one-sided
/// mention decides; otherwise `first` becomes the dependant. Ties follow that
/// same total order rather than text comparison, so `PROC-2` precedes
/// `PROC-10`.
#[must_use]
pub fn orient(first: &Item, second: &Item, first_mentions: bool, second_mentions: bool) -> Orientation {
    match (permits(first, second), permits(second, first)) {
        (true, false) => Orientation::Forward,
        (false, true) => Orientation::Backward,
        (false, false) => Orientation::Forbidden,
        (true, true) if second_mentions && !first_mentions => Orientation::Backward,
        (true, true) => Orientation::Forward,
    }
}
