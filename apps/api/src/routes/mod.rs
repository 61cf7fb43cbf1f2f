pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::editor::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/sessions/:resume_id",
            post(handlers::handle_open_session)
                .get(handlers::handle_get_session)
                .delete(handlers::handle_close_session),
        )
        .route(
            "/api/v1/sessions/:resume_id/mutations",
            post(handlers::handle_apply_mutation),
        )
        .route(
            "/api/v1/sessions/:resume_id/events",
            get(handlers::handle_session_events),
        )
        .route(
            "/api/v1/sessions/:resume_id/save",
            post(handlers::handle_save),
        )
        .route(
            "/api/v1/sessions/:resume_id/export",
            post(handlers::handle_export),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::editor::SessionRegistry;
    use crate::store::{InMemoryResumeStore, ResumeStore};

    fn app() -> (Router, Arc<InMemoryResumeStore>) {
        let store = Arc::new(InMemoryResumeStore::new());
        let state = AppState {
            sessions: Arc::new(SessionRegistry::new(
                store.clone(),
                Duration::from_millis(20),
            )),
            exporter: None,
        };
        (build_router(state), store)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "folio-api");
    }

    #[tokio::test]
    async fn test_open_then_mutate() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());

        let (status, body) = call(&app, Method::POST, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 0);
        assert_eq!(body["status"]["state"], "clean");
        assert_eq!(body["document"]["experience"], json!([]));

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{uri}/mutations"),
            Some(json!({ "op": "set_value", "path": "personalInfo.email", "value": "a@b.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["revision"], 1);
        assert_eq!(body["status"]["state"], "dirty");

        let (_, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(body["document"]["personalInfo"]["email"], "a@b.com");
    }

    #[tokio::test]
    async fn test_stale_address_is_conflict() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        call(&app, Method::POST, &uri, None).await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{uri}/mutations"),
            Some(json!({ "op": "remove_entry_at", "arrayPath": "skills", "index": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INDEX_OUT_OF_RANGE");

        let (_, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(body["revision"], 0);
    }

    #[tokio::test]
    async fn test_malformed_path_is_bad_request() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        call(&app, Method::POST, &uri, None).await;

        let (status, body) = call(
            &app,
            Method::POST,
            &format!("{uri}/mutations"),
            Some(json!({ "op": "set_value", "path": "experience[x]", "value": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MALFORMED_PATH");
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        let (status, body) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = call(&app, Method::POST, &format!("{uri}/save"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_without_bucket_is_unavailable() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        call(&app, Method::POST, &uri, None).await;
        let (status, body) = call(&app, Method::POST, &format!("{uri}/export"), None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_save_is_accepted() {
        let (app, _) = app();
        let uri = format!("/api/v1/sessions/{}", Uuid::new_v4());
        call(&app, Method::POST, &uri, None).await;
        let (status, _) = call(&app, Method::POST, &format!("{uri}/save"), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_close_persists_and_forgets() {
        let (app, store) = app();
        let id = Uuid::new_v4();
        let uri = format!("/api/v1/sessions/{id}");
        call(&app, Method::POST, &uri, None).await;
        call(
            &app,
            Method::POST,
            &format!("{uri}/mutations"),
            Some(json!({ "op": "append_entry", "arrayPath": "skills", "template": { "name": "Rust" } })),
        )
        .await;

        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let stored = store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.revision, 1);
        assert_eq!(
            stored.document.to_value()["skills"][0]["name"],
            "Rust"
        );
    }
}
