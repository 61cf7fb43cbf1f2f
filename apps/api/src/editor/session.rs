//! # Edit Session
//!
//! The in-memory owner of one open resume. Every mutation goes through
//! [`EditSession::apply_mutation`], which computes the next document,
//! swaps it in, bumps the revision and publishes the new [`Snapshot`] to all
//! subscribers over a `watch` channel. No I/O happens here.
//!
//! ```text
//!            apply_mutation            flush(rev == current)
//!   Clean ─────────────────▶ Dirty ─────────────────────────▶ Clean
//!                              │  ▲
//!       record_save_failure    ▼  │ apply_mutation
//!                           SaveFailed
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::editor::error::EditError;
use crate::editor::mutation::Mutation;
use crate::editor::node::Node;

/// Session shared between request handlers and its persistence task.
pub type SharedSession = Arc<Mutex<EditSession>>;

/// An immutable view of the document at one revision. Cloning is O(1); the
/// document inside is never mutated after publication.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub resume_id: Uuid,
    pub revision: u64,
    pub document: Node,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    Clean,
    Dirty,
    /// Still dirty, and the last durable write failed.
    SaveFailed { error: String },
}

pub struct EditSession {
    current: Snapshot,
    persisted_revision: u64,
    last_save_error: Option<String>,
    notifier: watch::Sender<Snapshot>,
}

impl EditSession {
    /// Opens a session on a document that is already durable at `revision`.
    pub fn new(resume_id: Uuid, document: Node, revision: u64) -> Self {
        let current = Snapshot {
            resume_id,
            revision,
            document,
        };
        let (notifier, _) = watch::channel(current.clone());
        Self {
            current,
            persisted_revision: revision,
            last_save_error: None,
            notifier,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn persisted_revision(&self) -> u64 {
        self.persisted_revision
    }

    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    /// Receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.notifier.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        if self.persisted_revision >= self.current.revision {
            SessionStatus::Clean
        } else if let Some(error) = &self.last_save_error {
            SessionStatus::SaveFailed {
                error: error.clone(),
            }
        } else {
            SessionStatus::Dirty
        }
    }

    /// Applies one mutation. On success the new document replaces the
    /// current one and every subscriber is notified before this returns. On
    /// failure nothing changes.
    pub fn apply_mutation(&mut self, mutation: &Mutation) -> Result<u64, EditError> {
        let next = match mutation.apply(&self.current.document) {
            Ok(next) => next,
            Err(err) => {
                if err.is_stale_address() {
                    warn!(
                        resume_id = %self.current.resume_id,
                        op = mutation.name(),
                        "Dropped mutation on stale address: {err}"
                    );
                } else {
                    error!(
                        resume_id = %self.current.resume_id,
                        op = mutation.name(),
                        "Rejected mutation: {err}"
                    );
                }
                return Err(err);
            }
        };

        self.current = Snapshot {
            resume_id: self.current.resume_id,
            revision: self.current.revision + 1,
            document: next,
        };
        self.notifier.send_replace(self.current.clone());

        debug!(
            resume_id = %self.current.resume_id,
            revision = self.current.revision,
            op = mutation.name(),
            "Applied mutation"
        );
        Ok(self.current.revision)
    }

    /// Records that the document at `revision` is durable. A write that
    /// completes after newer mutations only raises confidence up to the
    /// revision it captured; the session stays dirty.
    pub fn flush(&mut self, revision: u64) {
        if revision > self.persisted_revision {
            self.persisted_revision = revision;
        }
        if self.persisted_revision >= self.current.revision {
            self.last_save_error = None;
        }
    }

    /// Records a failed durable write. Local state is untouched.
    pub fn record_save_failure(&mut self, revision: u64, message: impl Into<String>) {
        if revision > self.persisted_revision {
            self.last_save_error = Some(message.into());
        }
    }
}

/// Direct accessors and one-call mutations used by tests across the editor.
#[cfg(test)]
impl EditSession {
    pub fn resume_id(&self) -> Uuid {
        self.current.resume_id
    }

    pub fn revision(&self) -> u64 {
        self.current.revision
    }

    pub fn document(&self) -> &Node {
        &self.current.document
    }

    pub fn is_dirty(&self) -> bool {
        self.status() != SessionStatus::Clean
    }

    pub fn set_value(&mut self, path: &str, value: serde_json::Value) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::SetValue {
            path: path.to_string(),
            value,
        })
    }

    pub fn append_entry(
        &mut self,
        array_path: &str,
        template: serde_json::Value,
    ) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::AppendEntry {
            array_path: array_path.to_string(),
            template,
        })
    }

    pub fn remove_entry_at(&mut self, array_path: &str, index: usize) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::RemoveEntryAt {
            array_path: array_path.to_string(),
            index,
        })
    }

    pub fn remove_entry_by_id(&mut self, array_path: &str, id: &str) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::RemoveEntryById {
            array_path: array_path.to_string(),
            id: id.to_string(),
        })
    }

    pub fn add_bullet_point(&mut self, experience_id: &str) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::AddBulletPoint {
            experience_id: experience_id.to_string(),
        })
    }

    pub fn remove_bullet_point(
        &mut self,
        experience_id: &str,
        index: usize,
    ) -> Result<u64, EditError> {
        self.apply_mutation(&Mutation::RemoveBulletPoint {
            experience_id: experience_id.to_string(),
            index,
        })
    }
}
