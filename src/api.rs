// src/api.rs
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::health::{HealthBoard, HealthSnapshot};
use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub board: Arc<HealthBoard>,
}

/// `/health` always; `/metrics` when a recorder was installed.
pub fn create_router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .with_state(state);
    if let Some(m) = metrics {
        router = router.merge(m.router());
    }
    router.layer(TraceLayer::new_for_http())
}

/// 200 when the last pass saw every source working, 503 otherwise.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthSnapshot>) {
    let snap = state.board.snapshot();
    let code = if snap.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(snap))
}
