use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::editor::{Node, Snapshot};
use crate::models::resume::ResumeRow;
use crate::store::{ResumeStore, StoredResume};

/// PostgreSQL-backed store. One row per resume in `resumes`; the document is
/// kept as jsonb next to the revision it was written at.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn load(&self, resume_id: Uuid) -> Result<Option<StoredResume>> {
        let row: Option<ResumeRow> =
            sqlx::query_as("SELECT id, data, revision, updated_at FROM resumes WHERE id = $1")
                .bind(resume_id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let revision = u64::try_from(row.revision)
            .with_context(|| format!("Resume {resume_id} has negative revision"))?;
        debug!(
            "Loaded resume {} at revision {} (last saved {})",
            row.id, revision, row.updated_at
        );
        Ok(Some(StoredResume {
            document: Node::from(row.data),
            revision,
        }))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let revision =
            i64::try_from(snapshot.revision).context("Revision does not fit in BIGINT")?;

        // Revision guard: only a strictly newer revision replaces the row.
        let result = sqlx::query(
            r#"
            INSERT INTO resumes (id, data, revision, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (id) DO UPDATE
                SET data = EXCLUDED.data,
                    revision = EXCLUDED.revision,
                    updated_at = NOW()
                WHERE resumes.revision < EXCLUDED.revision
            "#,
        )
        .bind(snapshot.resume_id)
        .bind(snapshot.document.to_value())
        .bind(revision)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!(
                "Resume {} already stored at revision {} or later; write superseded",
                snapshot.resume_id,
                snapshot.revision
            );
        }

        info!(
            "Saved resume {} at revision {}",
            snapshot.resume_id, snapshot.revision
        );
        Ok(())
    }
}
