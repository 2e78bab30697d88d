use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::atomic::Ordering;
use student_lets::marketplace::ServiceError;

/// Adds the operational endpoints and the photo download route to the marketplace router.
pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/uploads/:key", get(upload_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn upload_endpoint(
    Extension(state): Extension<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ServiceError> {
    let object = state
        .objects
        .fetch(&key)
        .ok_or_else(|| ServiceError::NotFound(format!("upload {key} not found")))?;

    let content_type = if object.content_type.is_empty() {
        mime_guess::from_path(&key)
            .first_or_octet_stream()
            .to_string()
    } else {
        object.content_type
    };

    Ok(([(header::CONTENT_TYPE, content_type)], object.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryObjectStorage;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use student_lets::config::StorageConfig;
    use student_lets::marketplace::ObjectStorage;
    use tower::ServiceExt;

    fn state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
            objects: Arc::new(InMemoryObjectStorage::new(&StorageConfig {
                public_base_url: "http://localhost:3000/uploads".to_string(),
            })),
        }
    }

    fn app(state: AppState) -> Router {
        with_operational_routes(Router::new()).layer(Extension(state))
    }

    async fn get_status(router: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = router
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn readiness_reflects_listener_state() {
        let (status, _) = get_status(app(state(false)), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = get_status(app(state(true)), "/ready").await;
        assert_eq!(status, StatusCode::OK);
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(payload["status"], "ready");
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        let (status, _) = get_status(app(state(false)), "/health").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn uploaded_photos_are_served_back() {
        let state = state(true);
        let url = state
            .objects
            .upload(b"\x89PNG", "room.png", "image/png")
            .expect("upload succeeds");
        let key = url.rsplit('/').next().expect("key segment").to_string();

        let response = app(state.clone())
            .oneshot(
                Request::builder()
                    .uri(format!("/uploads/{key}"))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("content type"),
            "image/png"
        );

        let (status, _) = get_status(app(state), "/uploads/999-missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
