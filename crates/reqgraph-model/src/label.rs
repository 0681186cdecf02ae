//! Label grammar
//!
//! A label is `<FAMILY>[-]<N>_<NAME>`: a family prefix, an optional hyphen,
//! a positive integer and an alphanumeric/underscore name. Labels carry the
//! total order used wherever determinism matters.

use crate::error::ModelError;
use crate::family::{Family, Section};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

static LABEL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?i:(A|UC|PROC|COMP|ROLE|UI|ENT|INT|API|NFR))(-?)([0-9]+)_([A-Za-z0-9_]+)$")
        .expect("label pattern is valid")
});

/// Unique item identifier
///
/// # Ordering
/// Primary: family rank. Secondary: numeric suffix. Tertiary: label text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    family: Family,
    number: u32,
    name: String,
    hyphenated: bool,
}

/// Case-insensitive identity of a label
///
/// Two spellings that differ only in name case or hyphenation resolve to
/// the same key; references are matched against existing labels by key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelKey {
    family: Family,
    number: u32,
    name: String,
}

impl Label {
    /// Build a label from parts
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidLabel`] if `number` is zero or `name`
    /// contains characters outside `[A-Za-z0-9_]`.
    pub fn new(family: Family, number: u32, name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into();
        let valid_name =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if number == 0 || !valid_name {
            return Err(ModelError::InvalidLabel(format!(
                "{}-{}_{}",
                family.prefix(),
                number,
                name
            )));
        }
        Ok(Self {
            family,
            number,
            name,
            hyphenated: true,
        })
    }

    /// Parse label text
    ///
    /// The family prefix is upper-cased; name case and hyphenation are kept.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidLabel`] for text outside the grammar.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let text = text.trim();
        let caps = LABEL_PATTERN
            .captures(text)
            .ok_or_else(|| ModelError::InvalidLabel(text.to_string()))?;

        let family: Family = caps[1].parse()?;
        let number: u32 = caps[3]
            .parse()
            .map_err(|_| ModelError::InvalidLabel(text.to_string()))?;
        if number == 0 {
            return Err(ModelError::InvalidLabel(text.to_string()));
        }

        Ok(Self {
            family,
            number,
            name: caps[4].to_string(),
            hyphenated: !caps[2].is_empty(),
        })
    }

    /// Whether `text` is a valid label
    #[inline]
    #[must_use]
    pub fn is_valid(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    /// Family
    #[inline]
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Section derived from the family
    #[inline]
    #[must_use]
    pub fn section(&self) -> Section {
        self.family.section()
    }

    /// Numeric suffix
    #[inline]
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Name part
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Case-insensitive identity
    #[must_use]
    pub fn key(&self) -> LabelKey {
        LabelKey {
            family: self.family,
            number: self.number,
            name: self.name.to_ascii_lowercase(),
        }
    }

    /// Rendering of this label that the reference extractor will not match
    ///
    /// `ENT-1_Order_Line` becomes `ENT-1 Order Line`.
    #[must_use]
    pub fn unlinkable(&self) -> String {
        format!(
            "{}-{} {}",
            self.family.prefix(),
            self.number,
            self.name.replace('_', " ")
        )
    }
}

impl LabelKey {
    /// Family of the keyed label
    #[inline]
    #[must_use]
    pub fn family(&self) -> Family {
        self.family
    }

    /// Numeric suffix of the keyed label
    #[inline]
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        // With family and number equal, the texts first differ at the hyphen
        // position ('-' sorts before any digit), then in the name.
        self.family
            .cmp(&other.family)
            .then(self.number.cmp(&other.number))
            .then(other.hyphenated.cmp(&self.hyphenated))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hyphen = if self.hyphenated { "-" } else { "" };
        write!(
            f,
            "{}{}{}_{}",
            self.family.prefix(),
            hyphen,
            self.number,
            self.name
        )
    }
}

impl FromStr for Label {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn label(text: &str) -> Label {
        text.parse().unwrap()
    }

    #[test]
    fn parses_hyphenated_and_plain() {
        let hyphenated = label("UC-12_Checkout");
        assert_eq!(hyphenated.family(), Family::Uc);
        assert_eq!(hyphenated.number(), 12);
        assert_eq!(hyphenated.name(), "Checkout");
        assert_eq!(hyphenated.to_string(), "UC-12_Checkout");

        let plain = label("A1_Project_Canvas");
        assert_eq!(plain.family(), Family::A);
        assert_eq!(plain.to_string(), "A1_Project_Canvas");
    }

    #[test]
    fn family_prefix_is_upper_cased() {
        assert_eq!(label("proc-3_Charge").to_string(), "PROC-3_Charge");
    }

    #[test]
    fn rejects_malformed_labels() {
        for bad in [
            "",
            "UC_Checkout",
            "UC-0_Checkout",
            "UC-1",
            "UC-1_",
            "XX-1_Foo",
            "UC-1_Check out",
            "UC-1_Check-out",
        ] {
            assert!(Label::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn api_is_not_confused_with_canvas() {
        assert_eq!(label("API-2_Orders").family(), Family::Api);
    }

    #[test]
    fn total_order_family_then_number_then_text() {
        let mut labels = vec![
            label("NFR-1_Latency"),
            label("UC-10_Refund"),
            label("UC-2_Checkout"),
            label("A1_Canvas"),
            label("UC-2_Browse"),
        ];
        labels.sort();
        let rendered: Vec<String> = labels.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "A1_Canvas",
                "UC-2_Browse",
                "UC-2_Checkout",
                "UC-10_Refund",
                "NFR-1_Latency"
            ]
        );
    }

    #[test]
    fn key_ignores_case_and_hyphen() {
        assert_eq!(label("UC-1_Checkout").key(), label("uc1_CHECKOUT").key());
        assert_ne!(label("UC-1_Checkout").key(), label("UC-2_Checkout").key());
    }

    #[test]
    fn unlinkable_form_is_not_a_label() {
        let unlinkable = label("ENT-1_Order_Line").unlinkable();
        assert_eq!(unlinkable, "ENT-1 Order Line");
        assert!(!Label::is_valid(&unlinkable));
    }

    #[test]
    fn serde_uses_text_form() {
        let json = serde_json::to_string(&label("INT-4_Stripe")).unwrap();
        assert_eq!(json, "\"INT-4_Stripe\"");
        let back: Label = serde_json::from_str(&json).unwrap();
        assert_eq!(back, label("INT-4_Stripe"));
        assert!(serde_json::from_str::<Label>("\"nope\"").is_err());
    }

    proptest! {
        #[test]
        fn order_agrees_with_text_within_family_and_number(
            a in "[A-Za-z0-9_]{1,8}",
            b in "[A-Za-z0-9_]{1,8}",
            ha in any::<bool>(),
            hb in any::<bool>(),
        ) {
            let fmt = |name: &str, h: bool| format!("UC{}7_{}", if h { "-" } else { "" }, name);
            let (ta, tb) = (fmt(&a, ha), fmt(&b, hb));
            let (la, lb) = (label(&ta), label(&tb));
            prop_assert_eq!(la.cmp(&lb), ta.cmp(&tb));
        }
    }
}
