//! Generation-service seam and retry handling
//!
//! The engine only sees [`GenerationService`]. [`RetryingGenerator`] wraps
//! any service with exponential backoff; its [`BackoffGate`] is shared by
//! every caller in the process, so one caller's throttling pauses its
//! siblings as well.

use crate::config::RetryPolicy;
use crate::error::GenerationError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use reqgraph_refine::AnalysisKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What a generation call is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// Primary call answering the user
    Turn,
    /// One second-pass analysis
    Analysis(AnalysisKind),
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Turn => f.write_str("turn"),
            Purpose::Analysis(kind) => write!(f, "analysis:{kind}"),
        }
    }
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[inline]
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A purpose tag plus the ordered message sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub purpose: Purpose,
    pub messages: Vec<Message>,
}

impl GenerationRequest {
    #[inline]
    #[must_use]
    pub fn new(purpose: Purpose) -> Self {
        Self {
            purpose,
            messages: Vec::new(),
        }
    }

    /// With one more message
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// With several more messages
    #[must_use]
    pub fn with_messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Content of the last user message
    #[must_use]
    pub fn last_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Provider-agnostic text generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Run one request and return the generated text
    ///
    /// # Errors
    ///
    /// Rate limits and timeouts are reported as retryable errors; the caller
    /// decides whether to retry.
    async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}

#[async_trait]
impl GenerationService for Arc<dyn GenerationService> {
    async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        (**self).invoke(request).await
    }
}

#[derive(Debug, Default)]
struct GateState {
    paused_until: Option<Instant>,
    streak: u32,
}

/// Process-wide backoff state shared by every retrying caller
#[derive(Debug, Clone)]
pub struct BackoffGate {
    policy: RetryPolicy,
    state: Arc<Mutex<GateState>>,
}

impl BackoffGate {
    #[must_use]
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Arc::new(Mutex::new(GateState::default())),
        }
    }

    #[inline]
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Consecutive throttled attempts since the last success
    #[must_use]
    pub fn streak(&self) -> u32 {
        self.state.lock().streak
    }

    /// Remaining pause, if any caller set one
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.state.lock().paused_until?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    /// Sleep until no pause is in effect
    pub async fn wait(&self) {
        loop {
            let until = self.state.lock().paused_until;
            match until {
                Some(until) if until > Instant::now() => tokio::time::sleep_until(until).await,
                _ => return,
            }
        }
    }

    /// Record a throttled attempt and pause every caller
    ///
    /// Returns the pause. A provider-suggested wait wins over the computed
    /// backoff; an existing longer pause is never shortened.
    pub fn throttled(&self, retry_after: Option<Duration>) -> Duration {
        let mut state = self.state.lock();
        let delay = retry_after.unwrap_or_else(|| {
            with_jitter(self.policy.backoff(state.streak), self.policy.jitter_ratio)
        });
        state.streak = state.streak.saturating_add(1);
        let until = Instant::now() + delay;
        state.paused_until = Some(state.paused_until.map_or(until, |current| current.max(until)));
        delay
    }

    /// Reset the streak after a successful call
    pub fn succeeded(&self) {
        self.state.lock().streak = 0;
    }
}

fn with_jitter(delay: Duration, ratio: f64) -> Duration {
    let ratio = ratio.clamp(0.0, 1.0);
    if delay.is_zero() || ratio <= 0.0 {
        return delay;
    }
    let extra = rand::rng().random_range(0.0..=ratio);
    delay.mul_f64(1.0 + extra)
}

/// Retries retryable failures through a shared [`BackoffGate`]
#[derive(Clone)]
pub struct RetryingGenerator {
    inner: Arc<dyn GenerationService>,
    gate: BackoffGate,
}

impl fmt::Debug for RetryingGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryingGenerator")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl RetryingGenerator {
    #[must_use]
    pub fn new(inner: Arc<dyn GenerationService>, gate: BackoffGate) -> Self {
        Self { inner, gate }
    }

    #[inline]
    #[must_use]
    pub fn gate(&self) -> &BackoffGate {
        &self.gate
    }

    /// The wrapped service
    #[inline]
    #[must_use]
    pub fn inner(&self) -> Arc<dyn GenerationService> {
        Arc::clone(&self.inner)
    }
}

#[async_trait]
impl GenerationService for RetryingGenerator {
    async fn invoke(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let max_attempts = self.gate.policy().max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            self.gate.wait().await;
            attempt += 1;
            match self.inner.invoke(request.clone()).await {
                Ok(text) => {
                    self.gate.succeeded();
                    return Ok(text);
                }
                Err(err) if err.is_retryable() => {
                    let delay = self.gate.throttled(err.retry_after());
                    if attempt >= max_attempts {
                        tracing::warn!(
                            purpose = %request.purpose,
                            attempt,
                            error = %err,
                            "Generation retries exhausted"
                        );
                        return Err(GenerationError::Exhausted {
                            attempts: attempt,
                            last: Box::new(err),
                        });
                    }
                    tracing::warn!(
                        purpose = %request.purpose,
                        attempt,
                        retry_in_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying generation call"
                    );
                }
                Err(err) => {
                    tracing::warn!(purpose = %request.purpose, attempt, error = %err, "Generation call failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted(Mutex<VecDeque<Result<String, GenerationError>>>);

    impl Scripted {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self(Mutex::new(replies.into())))
        }
        fn remaining(&self) -> usize {
            self.0.lock().len()
        }
    }

    #[async_trait]
    impl GenerationService for Scripted {
        async fn invoke(&self, _request: GenerationRequest) -> Result<String, GenerationError> {
            self.0
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Unavailable("script ended".into())))
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
            jitter_ratio: 0.0,
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(Purpose::Turn).with_message(Message::user("hi"))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_exponential_backoff() {
        let script = Scripted::new(vec![
            Err(GenerationError::RateLimited { retry_after: None }),
            Err(GenerationError::Timeout),
            Ok("done".into()),
        ]);
        let generator = RetryingGenerator::new(script.clone(), BackoffGate::new(policy(4)));

        let start = Instant::now();
        assert_eq!(generator.invoke(request()).await.unwrap(), "done");
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(generator.gate().streak(), 0);
        assert_eq!(script.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let script = Scripted::new(vec![
            Err(GenerationError::Timeout),
            Err(GenerationError::Timeout),
            Ok("too late".into()),
        ]);
        let generator = RetryingGenerator::new(script.clone(), BackoffGate::new(policy(2)));

        let err = generator.invoke(request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 2, .. }));
        assert_eq!(script.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_errors_are_not_retried() {
        let script = Scripted::new(vec![
            Err(GenerationError::Rejected("no".into())),
            Ok("unused".into()),
        ]);
        let generator = RetryingGenerator::new(script.clone(), BackoffGate::new(policy(5)));
        assert!(matches!(
            generator.invoke(request()).await,
            Err(GenerationError::Rejected(_))
        ));
        assert_eq!(script.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_pauses_sibling_callers() {
        let gate = BackoffGate::new(policy(3));
        let sibling = gate.clone();

        let pause = gate.throttled(Some(Duration::from_secs(2)));
        assert_eq!(pause, Duration::from_secs(2));
        assert!(sibling.remaining().is_some());

        let start = Instant::now();
        sibling.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(sibling.remaining().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn longer_pause_is_kept() {
        let gate = BackoffGate::new(policy(3));
        gate.throttled(Some(Duration::from_secs(10)));
        gate.throttled(Some(Duration::from_millis(1)));
        assert!(gate.remaining().unwrap() > Duration::from_secs(5));
        assert_eq!(gate.streak(), 2);
    }

    #[test]
    fn jitter_stays_within_ratio() {
        let base = Duration::from_millis(1_000);
        for _ in 0..50 {
            let jittered = with_jitter(base, 0.5);
            assert!(jittered >= base && jittered <= Duration::from_millis(1_500));
        }
        assert_eq!(with_jitter(base, 0.0), base);
    }

    #[test]
    fn purpose_display() {
        assert_eq!(Purpose::Turn.to_string(), "turn");
        assert_eq!(
            Purpose::Analysis(AnalysisKind::Ownership).to_string(),
            "analysis:ownership"
        );
    }
}
