//! Bounded per-project conversation history

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One user turn and the reply shown for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    pub at: DateTime<Utc>,
}

impl Exchange {
    #[must_use]
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: assistant.into(),
            at: Utc::now(),
        }
    }
}

/// Keeps the latest `limit` exchanges of each project
#[derive(Debug)]
pub struct HistoryStore {
    limit: usize,
    projects: DashMap<String, VecDeque<Exchange>>,
}

impl HistoryStore {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            projects: DashMap::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Append, dropping the oldest exchanges past the limit
    pub fn append(&self, project_id: &str, exchange: Exchange) {
        if self.limit == 0 {
            return;
        }
        let mut entry = self.projects.entry(project_id.to_string()).or_default();
        entry.push_back(exchange);
        while entry.len() > self.limit {
            entry.pop_front();
        }
    }

    /// Exchanges of a project, oldest first
    #[must_use]
    pub fn recent(&self, project_id: &str) -> Vec<Exchange> {
        self.projects
            .get(project_id)
            .map(|entry| entry.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self, project_id: &str) {
        self.projects.remove(project_id);
    }
}
