//! Engine configuration
//!
//! Every field has a default, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! history_limit = 10
//!
//! [retry]
//! max_attempts = 6
//!
//! [analyses]
//! provenance = false
//! ```

use crate::error::EngineError;
use reqgraph_refine::{AnalysisKind, RefineSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TURN_INSTRUCTION: &str = "You maintain a requirements graph. The current items are listed below. \
Answer the user. When items must change, start with a `### CHANGES` block: one header per item label \
(optionally with a status such as `[draft]`), followed by `- [segment]: text` lines. Use `- [cancelled]: true` \
to remove an item. Then write `### REPLY` followed by your answer to the user.";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generation retry policy
    pub retry: RetryPolicy,
    /// Conversation turns kept per project and sent with each prompt
    pub history_limit: usize,
    /// Character budget of one refinement excerpt
    pub excerpt_budget_chars: usize,
    /// Hops from a touched item that refinement looks at
    pub neighbourhood_hops: usize,
    /// Replay cache for repeated turns
    pub idempotency: IdempotencyConfig,
    /// Which refinement analyses run
    pub analyses: AnalysisToggles,
    /// Phrases the default severity classifier reacts to
    pub severity: SeverityPhrases,
    /// Instructions sent to the generation service
    pub prompts: PromptTemplates,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] for invalid TOML or mistyped keys.
    pub fn from_toml_str(raw: &str) -> Result<Self, EngineError> {
        toml::from_str(raw).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Read a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Render as TOML
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// With retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// With history limit
    #[inline]
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// With excerpt budget
    #[inline]
    #[must_use]
    pub fn with_excerpt_budget(mut self, chars: usize) -> Self {
        self.excerpt_budget_chars = chars;
        self
    }

    /// With neighbourhood hops
    #[inline]
    #[must_use]
    pub fn with_neighbourhood_hops(mut self, hops: usize) -> Self {
        self.neighbourhood_hops = hops;
        self
    }

    /// With one analysis switched on or off
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, kind: AnalysisKind, enabled: bool) -> Self {
        self.analyses.set(kind, enabled);
        self
    }

    /// Neighbourhood and excerpt bounds for refinement
    #[inline]
    #[must_use]
    pub fn refine_settings(&self) -> RefineSettings {
        RefineSettings {
            hops: self.neighbourhood_hops,
            excerpt_budget_chars: self.excerpt_budget_chars,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let refine = RefineSettings::default();
        Self {
            retry: RetryPolicy::default(),
            history_limit: 20,
            excerpt_budget_chars: refine.excerpt_budget_chars,
            neighbourhood_hops: refine.hops,
            idempotency: IdempotencyConfig::default(),
            analyses: AnalysisToggles::default(),
            severity: SeverityPhrases::default(),
            prompts: PromptTemplates::default(),
        }
    }
}

/// Retry policy for retryable generation failures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per call, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry
    pub base_delay_ms: u64,
    /// Cap on any single backoff
    pub max_delay_ms: u64,
    /// Fraction of the backoff added as random jitter (0.0 - 1.0)
    pub jitter_ratio: f64,
}

impl RetryPolicy {
    /// Exponential backoff for the given streak of throttled attempts
    ///
    /// `base * 2^streak`, capped at `max_delay_ms`, without jitter.
    #[must_use]
    pub fn backoff(&self, streak: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let base = u128::from(self.base_delay_ms);
        let max = u128::from(self.max_delay_ms).max(base);
        let multiplier = 1u128 << streak.min(20);
        let millis = base.saturating_mul(multiplier).min(max);
        Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Policy that never waits, for tests
    #[inline]
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
            max_delay_ms: 0,
            jitter_ratio: 0.0,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_ratio: 0.2,
        }
    }
}

/// Idempotency cache bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdempotencyConfig {
    /// Maximum cached outcomes
    pub capacity: u64,
    /// Seconds an outcome stays replayable
    pub ttl_secs: u64,
}

impl IdempotencyConfig {
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            capacity: 1_024,
            ttl_secs: 3_600,
        }
    }
}

/// Per-analysis enable flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisToggles {
    pub call_inference: bool,
    pub reorientation: bool,
    pub ownership: bool,
    pub provenance: bool,
}

impl AnalysisToggles {
    #[inline]
    #[must_use]
    pub fn enabled(&self, kind: AnalysisKind) -> bool {
        match kind {
            AnalysisKind::CallInference => self.call_inference,
            AnalysisKind::Reorientation => self.reorientation,
            AnalysisKind::Ownership => self.ownership,
            AnalysisKind::Provenance => self.provenance,
        }
    }

    pub fn set(&mut self, kind: AnalysisKind, enabled: bool) {
        match kind {
            AnalysisKind::CallInference => self.call_inference = enabled,
            AnalysisKind::Reorientation => self.reorientation = enabled,
            AnalysisKind::Ownership => self.ownership = enabled,
            AnalysisKind::Provenance => self.provenance = enabled,
        }
    }

    /// Every analysis off
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            call_inference: false,
            reorientation: false,
            ownership: false,
            provenance: false,
        }
    }
}

impl Default for AnalysisToggles {
    fn default() -> Self {
        Self {
            call_inference: true,
            reorientation: true,
            ownership: true,
            provenance: true,
        }
    }
}

/// Phrase lists for the default severity classifier
///
/// Matching is case-insensitive on the user's turn text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityPhrases {
    /// Answer deferred: touched open items become high
    pub deferred: Vec<String>,
    /// Gap waived: touched open items become low
    pub waived: Vec<String>,
}

impl Default for SeverityPhrases {
    fn default() -> Self {
        Self {
            deferred: ["i don't know yet", "not sure yet", "later"]
                .map(String::from)
                .to_vec(),
            waived: ["skip", "not needed", "waive"].map(String::from).to_vec(),
        }
    }
}

/// Instructions sent with generation calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// System instruction of the primary turn call
    pub turn_instruction: String,
    /// Overrides of the built-in analysis instructions, keyed by analysis name
    pub analyses: BTreeMap<String, String>,
}

impl PromptTemplates {
    /// Instruction for `kind`, override first
    #[must_use]
    pub fn analysis_instruction(&self, kind: AnalysisKind) -> &str {
        self.analyses
            .get(kind.name())
            .map_or_else(|| kind.default_instruction(), String::as_str)
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            turn_instruction: DEFAULT_TURN_INSTRUCTION.to_string(),
            analyses: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            history_limit = 5

            [retry]
            max_attempts = 7

            [analyses]
            provenance = false

            [prompts.analyses]
            ownership = "Pick an owner."
            "#,
        )
        .unwrap();

        assert_eq!(config.history_limit, 5);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert!(!config.analyses.enabled(AnalysisKind::Provenance));
        assert!(config.analyses.enabled(AnalysisKind::Ownership));
        assert_eq!(
            config.prompts.analysis_instruction(AnalysisKind::Ownership),
            "Pick an owner."
        );
        assert_eq!(
            config.prompts.analysis_instruction(AnalysisKind::Provenance),
            AnalysisKind::Provenance.default_instruction()
        );
        assert_eq!(config.severity, SeverityPhrases::default());
    }

    #[test]
    fn toml_round_trip() {
        let config = EngineConfig::new()
            .with_history_limit(3)
            .with_analysis(AnalysisKind::CallInference, false);
        let raw = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&raw).unwrap(), config);
    }

    #[test]
    fn mistyped_keys_are_config_errors() {
        let err = EngineConfig::from_toml_str("history_limit = \"many\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            jitter_ratio: 0.0,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(4), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(1_000));
        assert_eq!(RetryPolicy::immediate(3).backoff(2), Duration::ZERO);
    }

    #[test]
    fn refine_settings_follow_config() {
        let settings = EngineConfig::new()
            .with_neighbourhood_hops(1)
            .with_excerpt_budget(100)
            .refine_settings();
        assert_eq!(settings.hops, 1);
        assert_eq!(settings.excerpt_budget_chars, 100);
    }
}
