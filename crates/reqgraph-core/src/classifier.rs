//! Open-item severity from the user's wording
//!
//! A user who defers an answer makes the touched gaps more urgent; a user
//! who waives them makes them less so.

use crate::config::SeverityPhrases;
use reqgraph_model::Severity;

/// Decides whether a turn re-grades the touched items' open items
#[cfg_attr(test, mockall::automock)]
pub trait SeverityClassifier: Send + Sync {
    /// Severity every touched open item should take, if any
    fn classify(&self, user_text: &str) -> Option<Severity>;
}

/// Phrase-list classifier
///
/// Deferred phrases win over waived ones when both appear.
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    deferred: Vec<String>,
    waived: Vec<String>,
}

impl PhraseClassifier {
    #[must_use]
    pub fn new(phrases: &SeverityPhrases) -> Self {
        Self {
            deferred: normalize_all(&phrases.deferred),
            waived: normalize_all(&phrases.waived),
        }
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(&SeverityPhrases::default())
    }
}

impl SeverityClassifier for PhraseClassifier {
    fn classify(&self, user_text: &str) -> Option<Severity> {
        let text = normalize(user_text);
        if self.deferred.iter().any(|phrase| contains_phrase(&text, phrase)) {
            Some(Severity::High)
        } else if self.waived.iter().any(|phrase| contains_phrase(&text, phrase)) {
            Some(Severity::Low)
        } else {
            None
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

fn normalize_all(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|phrase| normalize(phrase))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

/// Whole-word phrase match
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '\'';
    text.match_indices(phrase).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + phrase.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}
