// HTTP handlers for the building registry
use crate::application::building_service::NewBuilding;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::error_json;
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

/// Metadata for a building whose outline comes from the shape being edited.
#[derive(Debug, Deserialize)]
pub struct FromShapeRequest {
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
}

pub async fn list_buildings(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    json_response(StatusCode::OK, &state.buildings.list(), accepts_brotli(&headers)).await
}

pub async fn add_building(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewBuilding>,
) -> Response {
    match state.buildings.add(new).await {
        Ok(building) => json_response(StatusCode::CREATED, &building, accepts_brotli(&headers)).await,
        Err(e) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

/// Confirm the active shape and save its outline as a building.
pub async fn add_building_from_shape(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(req): Json<FromShapeRequest>,
) -> Response {
    // Checked up front so a missing name does not consume the session.
    if req.name.trim().is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "building name is required");
    }
    let Some(outcome) = state.shapes.confirm().await else {
        return error_json(StatusCode::CONFLICT, "no shape is being edited");
    };

    let new = NewBuilding {
        name: req.name,
        description: req.description,
        color: req.color,
        points: outcome.polygon,
    };
    match state.buildings.add(new).await {
        Ok(building) => {
            let body = serde_json::json!({
                "building": building,
                "history_recorded": outcome.history_recorded,
            });
            json_response(StatusCode::CREATED, &body, accepts_brotli(&headers)).await
        }
        Err(e) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

pub async fn delete_building(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.buildings.remove(&id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Merge a JSON array of buildings into the registry.
pub async fn import_buildings(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: String,
) -> Response {
    match state.buildings.import(&body).await {
        Ok(summary) => json_response(StatusCode::OK, &summary, accepts_brotli(&headers)).await,
        Err(e) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

/// The whole registry as a downloadable, dated JSON file.
pub async fn export_buildings(State(state): State<Arc<AppState>>) -> Response {
    let json = match state.buildings.export_json() {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to export buildings: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let filename = format!(
        "attachment; filename=\"buildings_{}.json\"",
        chrono::Local::now().format("%Y-%m-%d")
    );
    let mut response = (
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        json,
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&filename) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}
