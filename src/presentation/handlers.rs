// HTTP request handlers for tiles, provisioning and app assets
use crate::application::provisioning_service::{ProvisionError, ProvisionRequest};
use crate::application::tile_gateway::TileResponse;
use crate::domain::tiles::TileKey;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{bytes_response, content_type_for, empty_response};
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::fmt::Display;
use std::sync::Arc;

/// `{"error": "..."}` with the given status.
pub fn error_json(status: StatusCode, err: impl Display) -> Response {
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Accepts `{y}` with or without the `.png` suffix.
fn parse_tile_row(raw: &str) -> Option<u32> {
    raw.strip_suffix(".png").unwrap_or(raw).parse().ok()
}

/// Serve one tile cache-first, falling back to the origin.
pub async fn get_tile(
    Path((z, x, y)): Path<(u8, u32, String)>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(y) = parse_tile_row(&y) else {
        return error_json(StatusCode::BAD_REQUEST, format!("bad tile row {y:?}"));
    };
    let key = match TileKey::new(z, x, y) {
        Ok(key) => key,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e),
    };

    match state.tiles.serve(key).await {
        TileResponse::Cached(bytes) | TileResponse::Fetched(bytes) => {
            bytes_response(StatusCode::OK, "image/png", bytes)
        }
        TileResponse::Upstream(status) => {
            empty_response(StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY))
        }
        TileResponse::Unavailable => empty_response(StatusCode::NOT_FOUND),
    }
}

/// Start a provisioning run and stream its progress as NDJSON.
/// An empty body provisions the configured region and zoom range.
pub async fn start_provisioning(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ProvisionRequest::default()
    } else {
        match serde_json::from_slice::<ProvisionRequest>(&body) {
            Ok(request) => request,
            Err(e) => return error_json(StatusCode::BAD_REQUEST, e),
        }
    };

    match state.provisioning.start(&request) {
        Ok(rx) => stream_from_receiver(rx).into_response(),
        Err(e @ ProvisionError::Busy) => error_json(StatusCode::CONFLICT, e),
        Err(e @ ProvisionError::ZoomRange { .. }) => error_json(StatusCode::BAD_REQUEST, e),
    }
}

/// Everything else is an app asset: precache first, then the origin.
pub async fn serve_asset(uri: Uri, State(state): State<Arc<AppState>>) -> Response {
    let path = uri.path();
    match state.assets.serve(path).await {
        Some(bytes) => {
            let content_type = if path.ends_with('/') {
                content_type_for("index.html")
            } else {
                content_type_for(path)
            };
            bytes_response(StatusCode::OK, content_type, bytes)
        }
        None => empty_response(StatusCode::NOT_FOUND),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::tile_repository::FetchError;
    use crate::application::test_support::ScriptedTileSource;
    use crate::presentation::app_state::testing::fixture;

    async fn body_bytes(response: Response) -> Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_tile_row() {
        assert_eq!(parse_tile_row("12920.png"), Some(12920));
        assert_eq!(parse_tile_row("7"), Some(7));
        assert_eq!(parse_tile_row("x.png"), None);
    }

    #[tokio::test]
    async fn test_get_tile_fetches_then_serves_cached() {
        let fx = fixture(ScriptedTileSource::new()).await;
        let path = Path((3u8, 1u32, "2.png".to_string()));

        let response = get_tile(path, State(fx.state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        assert_eq!(&body_bytes(response).await[..], b"png:3/1/2");

        let again = get_tile(Path((3, 1, "2.png".to_string())), State(fx.state.clone())).await;
        assert_eq!(again.status(), StatusCode::OK);
        assert_eq!(fx.source.call_count(), 1);
        assert_eq!(fx.store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_tile_offline_placeholder() {
        let key = TileKey::new(3, 1, 2).unwrap();
        let source = ScriptedTileSource::new().failing(key, FetchError::Timeout);
        let fx = fixture(source).await;

        let response = get_tile(Path((3, 1, "2.png".to_string())), State(fx.state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_get_tile_rejects_out_of_grid_keys() {
        let fx = fixture(ScriptedTileSource::new()).await;
        let response = get_tile(Path((3, 8, "0.png".to_string())), State(fx.state)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fx.source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_start_provisioning_streams_events() {
        let fx = fixture(ScriptedTileSource::new()).await;
        let response = start_provisioning(State(fx.state.clone()), Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_bytes(response).await;
        let lines: Vec<serde_json::Value> = body
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| serde_json::from_slice(l).unwrap())
            .collect();
        assert_eq!(lines[0]["event"], "planned");
        assert_eq!(lines[0]["total_tiles"], 7);
        let last = lines.last().unwrap();
        assert_eq!(last["event"], "finished");
        assert_eq!(last["downloaded"], 7);
        assert_eq!(fx.store.len(), 7);
        assert!(lines.iter().any(|l| l["event"] == "zoom_started" && l["zoom"] == 13));
    }

    #[tokio::test]
    async fn test_start_provisioning_rejects_bad_requests() {
        let fx = fixture(ScriptedTileSource::new()).await;
        let bad_zoom = Bytes::from_static(br#"{"min_zoom": 14, "max_zoom": 12}"#);
        let response = start_provisioning(State(fx.state.clone()), bad_zoom).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bad_bounds = Bytes::from_static(
            br#"{"bounds": {"north": 1.0, "south": 2.0, "east": 3.0, "west": 2.0}}"#,
        );
        let response = start_provisioning(State(fx.state), bad_bounds).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_serve_asset_missing_is_404() {
        let fx = fixture(ScriptedTileSource::new()).await;
        let response = serve_asset(Uri::from_static("/app.js"), State(fx.state)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
