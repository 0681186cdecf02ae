//! Document persistence
//!
//! One document per project. Missing documents load as `None`; the engine
//! treats that as an empty graph.

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use reqgraph_model::Document;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load and save project documents
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError`] when the stored document cannot be read.
    async fn load(&self, project_id: &str) -> Result<Option<Document>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] when the document cannot be written.
    async fn save(&self, project_id: &str, document: &Document) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn load(&self, project_id: &str) -> Result<Option<Document>, StoreError> {
        (**self).load(project_id).await
    }

    async fn save(&self, project_id: &str, document: &Document) -> Result<(), StoreError> {
        (**self).save(project_id, document).await
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Document>,
}

impl InMemoryDocumentStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a project
    pub fn insert(&self, project_id: impl Into<String>, document: Document) {
        self.documents.insert(project_id.into(), document);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, project_id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.documents.get(project_id).map(|entry| entry.value().clone()))
    }

    async fn save(&self, project_id: &str, document: &Document) -> Result<(), StoreError> {
        self.documents.insert(project_id.to_string(), document.clone());
        Ok(())
    }
}

/// One pretty-printed JSON file per project under a root directory
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `project_id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidProjectId`] for ids that could escape the
    /// root directory.
    pub fn path_for(&self, project_id: &str) -> Result<PathBuf, StoreError> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !project_id.starts_with('.');
        if !valid {
            return Err(StoreError::InvalidProjectId(project_id.to_string()));
        }
        Ok(self.root.join(format!("{project_id}.json")))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self, project_id: &str) -> Result<Option<Document>, StoreError> {
        let path = self.path_for(project_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(Document::from_json_str(&raw)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, project_id: &str, document: &Document) -> Result<(), StoreError> {
        let path = self.path_for(project_id)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let raw = document.to_json_string_pretty()?;

        // write-then-rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(project_id, path = %path.display(), "Saved document");
        Ok(())
    }
}
