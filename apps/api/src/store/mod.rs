//! Durable storage for resume documents.
//!
//! The editing engine only ever sees the [`ResumeStore`] trait; whether a
//! snapshot lands in PostgreSQL or in process memory is decided at startup.

mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::editor::{Node, Snapshot};

pub use memory::InMemoryResumeStore;
pub use postgres::PgResumeStore;

/// A document as last written, with the session revision it was written at.
#[derive(Debug, Clone)]
pub struct StoredResume {
    pub document: Node,
    pub revision: u64,
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// `None` when nothing has been stored for `resume_id` yet.
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>>;

    /// Writes the snapshot. Fails, without writing, when the stored revision
    /// is already at or past `snapshot.revision`; a superseded write is never
    /// reported as durable.
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
