//! Assembles the axum router: one POST endpoint per logical command
//! family, plus a health probe. Grounded on the teacher's
//! `network::module::NetworkModule::router` layout, trimmed to the
//! command-dispatch shape this crate needs (no connection registry, no
//! WebSocket upgrade -- this server has no cluster fan-out to track).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use emberdb_core::Database;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::command::{
    execute_hash, execute_list, execute_set, execute_string, execute_zset, HashCommand,
    ListCommand, SetCommand, StringCommand, ZSetCommand,
};
use crate::error::ok_envelope;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

pub fn build_router(db: Arc<Database>) -> Router {
    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .route("/health", get(health_handler))
        .route("/string", post(string_handler))
        .route("/hash", post(hash_handler))
        .route("/list", post(list_handler))
        .route("/set", post(set_handler))
        .route("/zset", post(zset_handler))
        .layer(layers)
        .with_state(AppState { db })
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn string_handler(State(state): State<AppState>, Json(cmd): Json<StringCommand>) -> Response {
    match execute_string(cmd, &state.db) {
        Ok(data) => ok_envelope(data),
        Err(e) => e.into_response(),
    }
}

async fn hash_handler(State(state): State<AppState>, Json(cmd): Json<HashCommand>) -> Response {
    match execute_hash(cmd, &state.db) {
        Ok(data) => ok_envelope(data),
        Err(e) => e.into_response(),
    }
}

async fn list_handler(State(state): State<AppState>, Json(cmd): Json<ListCommand>) -> Response {
    match execute_list(cmd, &state.db) {
        Ok(data) => ok_envelope(data),
        Err(e) => e.into_response(),
    }
}

async fn set_handler(State(state): State<AppState>, Json(cmd): Json<SetCommand>) -> Response {
    match execute_set(cmd, &state.db) {
        Ok(data) => ok_envelope(data),
        Err(e) => e.into_response(),
    }
}

async fn zset_handler(State(state): State<AppState>, Json(cmd): Json<ZSetCommand>) -> Response {
    match execute_zset(cmd, &state.db) {
        Ok(data) => ok_envelope(data),
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use emberdb_core::DbConfig;
    use tower::ServiceExt;

    async fn test_db() -> Arc<Database> {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig { aof_path: dir.path().join("aof"), ..DbConfig::default() };
        Arc::new(Database::open(config).unwrap())
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let router = build_router(test_db().await);
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn string_set_then_get_round_trips() {
        let router = build_router(test_db().await);

        let set_body = serde_json::json!({"op": "set", "key": "greeting", "value": "hello"});
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/string")
                    .header("content-type", "application/json")
                    .body(Body::from(set_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let get_body = serde_json::json!({"op": "get", "key": "greeting"});
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/string")
                    .header("content-type", "application/json")
                    .body(Body::from(get_body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_on_missing_key_maps_to_not_found() {
        let router = build_router(test_db().await);
        let body = serde_json::json!({"op": "get", "key": "nope"});
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/string")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
