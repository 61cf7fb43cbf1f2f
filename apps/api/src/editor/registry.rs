use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::editor::document::{blank_document, normalize_document};
use crate::editor::session::{EditSession, SharedSession};
use crate::editor::sync::SyncHandle;
use crate::store::ResumeStore;

/// An open session together with its persistence task.
#[derive(Clone)]
pub struct SessionHandle {
    pub session: SharedSession,
    pub sync: SyncHandle,
}

/// Per-resume cell. Its lock is held while the session is loaded and while
/// its final write runs, so other resumes never wait on that I/O.
type Slot = Arc<Mutex<Option<SessionHandle>>>;

/// Owns every open edit session, keyed by resume id. Constructed once at
/// startup and handed to the router through `AppState`.
pub struct SessionRegistry {
    store: Arc<dyn ResumeStore>,
    debounce: Duration,
    slots: RwLock<HashMap<Uuid, Slot>>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn ResumeStore>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the open session for `resume_id`, opening it if needed. A
    /// fresh session loads the stored document (normalized), or starts from
    /// the blank template when nothing is stored yet. While the same resume
    /// is closing, this waits for its final write before loading.
    pub async fn open(&self, resume_id: Uuid) -> Result<SessionHandle> {
        loop {
            let slot = self.slots.write().await.entry(resume_id).or_default().clone();
            let mut cell = slot.lock().await;
            if !self.is_registered(resume_id, &slot).await {
                // Closed while we waited; start over with a fresh slot.
                continue;
            }
            if let Some(handle) = cell.as_ref() {
                return Ok(handle.clone());
            }

            let loaded = match self.store.load(resume_id).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    drop(cell);
                    self.forget(resume_id, &slot).await;
                    return Err(e);
                }
            };
            let (document, revision) = match loaded {
                Some(stored) => (normalize_document(stored.document), stored.revision),
                None => (blank_document(), 0),
            };
            info!("Opened edit session for resume {resume_id} at revision {revision}");

            let session = EditSession::new(resume_id, document, revision).into_shared();
            let (sync, _task) =
                SyncHandle::spawn(session.clone(), self.store.clone(), self.debounce).await;
            let handle = SessionHandle { session, sync };
            *cell = Some(handle.clone());
            return Ok(handle);
        }
    }

    pub async fn get(&self, resume_id: Uuid) -> Option<SessionHandle> {
        let slot = self.slots.read().await.get(&resume_id).cloned()?;
        let cell = slot.lock().await;
        cell.clone()
    }

    /// Flushes and drops the session. `false` if it was not open. The
    /// resume stays claimed until the final write has finished.
    pub async fn close(&self, resume_id: Uuid) -> bool {
        let Some(slot) = self.slots.read().await.get(&resume_id).cloned() else {
            return false;
        };
        let mut cell = slot.lock().await;
        let Some(handle) = cell.take() else {
            return false;
        };
        handle.sync.shutdown().await;
        self.forget(resume_id, &slot).await;
        info!("Closed edit session for resume {resume_id}");
        true
    }

    /// Flushes and drops every open session. Called on graceful shutdown.
    pub async fn close_all(&self) {
        let ids: Vec<Uuid> = self.slots.read().await.keys().copied().collect();
        for resume_id in ids {
            self.close(resume_id).await;
        }
    }

    async fn is_registered(&self, resume_id: Uuid, slot: &Slot) -> bool {
        self.slots
            .read()
            .await
            .get(&resume_id)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
    }

    async fn forget(&self, resume_id: Uuid, slot: &Slot) {
        let mut slots = self.slots.write().await;
        if slots.get(&resume_id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(&resume_id);
        }
    }
}
