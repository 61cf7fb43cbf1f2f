use std::sync::Arc;

use crate::editor::SessionRegistry;
use crate::export::SnapshotExporter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    /// Present only when an export bucket is configured.
    pub exporter: Option<SnapshotExporter>,
}
