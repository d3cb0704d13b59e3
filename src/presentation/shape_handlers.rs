// HTTP handlers for the viewport and the shape editing session
use crate::domain::geo::{LatLng, ScreenPoint};
use crate::domain::projection::{ViewportError, WebMercatorViewport};
use crate::domain::shape::{ShapeKind, ShapePreset};
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::error_json;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct ViewportRequest {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub kind: ShapeKind,
    #[serde(default)]
    pub preset: Option<ShapePreset>,
}

pub async fn get_viewport(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, &state.shapes.map_host(), accepts_brotli(&headers)).await
}

/// Pan/zoom/resize the host map. Refused while a shape is being edited.
pub async fn put_viewport(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ViewportRequest>,
) -> Response {
    let viewport = match WebMercatorViewport::new(req.center, req.zoom, req.width, req.height) {
        Ok(viewport) => viewport,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e),
    };
    match state.shapes.set_viewport(viewport) {
        Ok(host) => json_response(StatusCode::OK, &host, accepts_brotli(&headers)).await,
        Err(e @ ViewportError::Locked) => error_json(StatusCode::CONFLICT, e),
        Err(e) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

pub async fn get_shape(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, &state.shapes.snapshot(), accepts_brotli(&headers)).await
}

pub async fn activate_shape(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivateRequest>,
) -> Response {
    let snapshot = state.shapes.activate(req.kind, req.preset);
    json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await
}

pub async fn pointer_down(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(point): Json<ScreenPoint>,
) -> Response {
    let (handle, editor) = state.shapes.pointer_down(point);
    let body = serde_json::json!({ "handle": handle, "editor": editor });
    json_response(StatusCode::OK, &body, accepts_brotli(&headers)).await
}

pub async fn pointer_move(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(point): Json<ScreenPoint>,
) -> Response {
    let snapshot = state.shapes.pointer_move(point);
    json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await
}

pub async fn pointer_up(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.shapes.pointer_up();
    json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await
}

/// Confirm the active shape and return its geographic outline.
pub async fn confirm_shape(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    match state.shapes.confirm().await {
        Some(outcome) => json_response(StatusCode::OK, &outcome, accepts_brotli(&headers)).await,
        None => error_json(StatusCode::CONFLICT, "no shape is being edited"),
    }
}

pub async fn deactivate_shape(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let was_active = state.shapes.deactivate();
    let body = serde_json::json!({ "was_active": was_active });
    json_response(StatusCode::OK, &body, accepts_brotli(&headers)).await
}

pub async fn get_history(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, &state.shapes.history(), accepts_brotli(&headers)).await
}

pub async fn activate_from_history(
    headers: HeaderMap,
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.shapes.activate_from_history(index) {
        Some(snapshot) => json_response(StatusCode::OK, &snapshot, accepts_brotli(&headers)).await,
        None => error_json(StatusCode::NOT_FOUND, format!("no history entry {index}")),
    }
}
