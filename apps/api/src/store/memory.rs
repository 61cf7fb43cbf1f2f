use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::editor::Snapshot;
use crate::store::{ResumeStore, StoredResume};

/// Process-local store. Used when no database is configured, and in tests.
#[derive(Default)]
pub struct InMemoryResumeStore {
    documents: RwLock<HashMap<Uuid, StoredResume>>,
    writes: AtomicUsize,
}

impl InMemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls that reached this store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub async fn insert(&self, resume_id: Uuid, stored: StoredResume) {
        self.documents.write().await.insert(resume_id, stored);
    }
}

#[async_trait]
impl ResumeStore for InMemoryResumeStore {
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>> {
        Ok(self.documents.read().await.get(&resume_id).cloned())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut documents = self.documents.write().await;
        if let Some(stored) = documents.get(&snapshot.resume_id) {
            if stored.revision >= snapshot.revision {
                bail!(
                    "Resume {} already stored at revision {}; write of revision {} superseded",
                    snapshot.resume_id,
                    stored.revision,
                    snapshot.revision
                );
            }
        }
        documents.insert(
            snapshot.resume_id,
            StoredResume {
                document: snapshot.document.clone(),
                revision: snapshot.revision,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::blank_document;

    fn snapshot(resume_id: Uuid, revision: u64, title: &str) -> Snapshot {
        let document = crate::editor::accessor::set(
            &blank_document(),
            &"personalInfo.title".parse().unwrap(),
            crate::editor::Node::string(title),
        )
        .unwrap();
        Snapshot {
            resume_id,
            revision,
            document,
        }
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = InMemoryResumeStore::new();
        assert!(store.load(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = InMemoryResumeStore::new();
        let id = Uuid::new_v4();
        store.save(&snapshot(id, 3, "Engineer")).await.unwrap();

        let stored = store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.revision, 3);
        assert_eq!(
            stored
                .document
                .field("personalInfo")
                .and_then(|p| p.field("title"))
                .and_then(crate::editor::Node::as_str),
            Some("Engineer")
        );
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_superseded_write_is_rejected() {
        let store = InMemoryResumeStore::new();
        let id = Uuid::new_v4();
        store.save(&snapshot(id, 5, "New")).await.unwrap();

        let err = store.save(&snapshot(id, 4, "Old")).await.unwrap_err();
        assert!(err.to_string().contains("superseded"));
        assert!(store.save(&snapshot(id, 5, "Same")).await.is_err());

        let stored = store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.revision, 5);
        assert_eq!(
            stored
                .document
                .field("personalInfo")
                .and_then(|p| p.field("title"))
                .and_then(crate::editor::Node::as_str),
            Some("New")
        );
        assert_eq!(store.write_count(), 3);
    }
}
