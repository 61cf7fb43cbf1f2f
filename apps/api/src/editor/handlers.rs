use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Serialize;
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt};
use uuid::Uuid;

use crate::editor::{Mutation, Node, SessionHandle, SessionStatus, Snapshot};
use crate::errors::AppError;
use crate::export::ExportReceipt;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub resume_id: Uuid,
    pub revision: u64,
    pub status: SessionStatus,
    pub document: Node,
}

#[derive(Serialize)]
pub struct MutationResponse {
    pub revision: u64,
    pub status: SessionStatus,
}

async fn require_session(state: &AppState, resume_id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(resume_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No open session for resume {resume_id}")))
}

async fn view(handle: &SessionHandle) -> SessionView {
    let session = handle.session.lock().await;
    let snapshot = session.snapshot();
    SessionView {
        resume_id: snapshot.resume_id,
        revision: snapshot.revision,
        status: session.status(),
        document: snapshot.document,
    }
}

/// POST /api/v1/sessions/:resume_id
pub async fn handle_open_session(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = state.sessions.open(resume_id).await?;
    Ok(Json(view(&handle).await))
}

/// GET /api/v1/sessions/:resume_id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let handle = require_session(&state, resume_id).await?;
    Ok(Json(view(&handle).await))
}

/// POST /api/v1/sessions/:resume_id/mutations
pub async fn handle_apply_mutation(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Json(mutation): Json<Mutation>,
) -> Result<Json<MutationResponse>, AppError> {
    let handle = require_session(&state, resume_id).await?;
    let mut session = handle.session.lock().await;
    let revision = session.apply_mutation(&mutation)?;
    Ok(Json(MutationResponse {
        revision,
        status: session.status(),
    }))
}

/// GET /api/v1/sessions/:resume_id/events
/// Streams the current snapshot, then every later one. Intermediate
/// snapshots may be skipped when the client falls behind.
pub async fn handle_session_events(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let handle = require_session(&state, resume_id).await?;
    let changes = handle.session.lock().await.subscribe();

    let stream = WatchStream::new(changes).map(|snapshot: Snapshot| {
        let json = serde_json::to_string(&snapshot).unwrap_or_default();
        Ok(Event::default()
            .event("snapshot")
            .id(snapshot.revision.to_string())
            .data(json))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

/// POST /api/v1/sessions/:resume_id/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = require_session(&state, resume_id).await?;
    if !handle.sync.flush_now() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "Persistence task for resume {resume_id} has stopped"
        )));
    }
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/v1/sessions/:resume_id/export
pub async fn handle_export(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<Json<ExportReceipt>, AppError> {
    let exporter = state
        .exporter
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Export storage is not configured".into()))?;
    let handle = require_session(&state, resume_id).await?;
    let snapshot = handle.session.lock().await.snapshot();
    Ok(Json(exporter.export(&snapshot).await?))
}

/// DELETE /api/v1/sessions/:resume_id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.close(resume_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!(
            "No open session for resume {resume_id}"
        )))
    }
}
