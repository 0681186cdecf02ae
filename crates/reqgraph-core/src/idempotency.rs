//! Replay cache for repeated turns

use crate::config::IdempotencyConfig;
use crate::turn::TurnOutcome;
use moka::future::Cache;
use std::sync::Arc;

/// Outcomes keyed by project and idempotency key
///
/// Entries expire after the configured TTL and are evicted by size.
#[derive(Debug, Clone)]
pub struct IdempotencyStore {
    inner: Cache<(String, String), Arc<TurnOutcome>>,
}

impl IdempotencyStore {
    #[must_use]
    pub fn new(config: IdempotencyConfig) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(config.capacity)
                .time_to_live(config.ttl())
                .build(),
        }
    }

    pub async fn get(&self, project_id: &str, key: &str) -> Option<Arc<TurnOutcome>> {
        self.inner
            .get(&(project_id.to_string(), key.to_string()))
            .await
    }

    pub async fn insert(&self, project_id: &str, key: &str, outcome: Arc<TurnOutcome>) {
        self.inner
            .insert((project_id.to_string(), key.to_string()), outcome)
            .await;
    }

    pub async fn invalidate(&self, project_id: &str, key: &str) {
        self.inner
            .invalidate(&(project_id.to_string(), key.to_string()))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqgraph_model::Document;

    fn outcome(text: &str) -> Arc<TurnOutcome> {
        Arc::new(TurnOutcome::resend(text, Document::new()))
    }

    #[tokio::test]
    async fn keys_are_scoped_per_project() {
        let store = IdempotencyStore::new(IdempotencyConfig::default());
        store.insert("a", "k1", outcome("first")).await;

        assert_eq!(store.get("a", "k1").await.unwrap().assistant_text, "first");
        assert!(store.get("b", "k1").await.is_none());

        store.invalidate("a", "k1").await;
        assert!(store.get("a", "k1").await.is_none());
    }
}
