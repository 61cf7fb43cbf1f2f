use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::editor::document::ShapeError;
use crate::editor::{ResumeDocument, Snapshot};

#[derive(Debug, Error)]
pub enum ExportError {
    /// The snapshot cannot be read by the renderer. The caller can fix it.
    #[error("Resume cannot be exported: {0}")]
    Shape(#[from] ShapeError),

    #[error("Export upload failed: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Where an export snapshot was written.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportReceipt {
    pub key: String,
    pub revision: u64,
}

/// Hands immutable snapshots to the out-of-process PDF renderer by
/// uploading them to S3. Read-only with respect to the session.
#[derive(Clone)]
pub struct SnapshotExporter {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl SnapshotExporter {
    pub fn new(s3: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            s3,
            bucket: bucket.into(),
        }
    }

    pub async fn export(&self, snapshot: &Snapshot) -> Result<ExportReceipt, ExportError> {
        let body = render_payload(snapshot)?;
        let key = export_key(snapshot.resume_id, snapshot.revision);

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Uploaded resume snapshot to s3://{}/{}", self.bucket, key);

        Ok(ExportReceipt {
            key,
            revision: snapshot.revision,
        })
    }
}

pub fn export_key(resume_id: Uuid, revision: u64) -> String {
    format!("exports/{resume_id}/r{revision}.json")
}

/// Checks the snapshot against the renderer's document shape and serializes
/// the document exactly as the session holds it.
fn render_payload(snapshot: &Snapshot) -> Result<Vec<u8>, ExportError> {
    let typed = ResumeDocument::from_node(&snapshot.document)?;
    let entries = typed.entries();
    let unnamed = entries.iter().filter(|entry| entry.id().is_empty()).count();
    if unnamed > 0 {
        warn!(
            "Resume {} at revision {} has {unnamed} entries without an id",
            snapshot.resume_id, snapshot.revision
        );
    }
    info!(
        "Exporting resume {} at revision {} ({} entries)",
        snapshot.resume_id,
        snapshot.revision,
        entries.len()
    );
    let body = serde_json::to_vec(&snapshot.document)
        .map_err(|e| anyhow::anyhow!("Failed to serialize snapshot: {e}"))?;
    Ok(body)
}
