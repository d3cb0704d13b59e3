// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    Router,
    routing::{delete, get, post},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::asset_service::AssetService;
use crate::application::building_service::BuildingService;
use crate::application::provisioning_service::{ProvisionRequest, ProvisioningService};
use crate::application::shape_service::ShapeEditingService;
use crate::application::tile_gateway::TileGateway;
use crate::application::tile_repository::AssetOrigin;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::file_kv_store::FileKeyValueStore;
use crate::infrastructure::fs_tile_store::FsTileStore;
use crate::infrastructure::http_origin::{HttpAssetOrigin, HttpTileSource};
use crate::presentation::app_state::AppState;
use crate::presentation::building_handlers::{
    add_building, add_building_from_shape, delete_building, export_buildings, import_buildings,
    list_buildings,
};
use crate::presentation::handlers::{get_tile, health_check, serve_asset, start_provisioning};
use crate::presentation::shape_handlers::{
    activate_from_history, activate_shape, confirm_shape, deactivate_shape, get_history,
    get_shape, get_viewport, pointer_down, pointer_move, pointer_up, put_viewport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Stores and origins (infrastructure layer)
    let tile_store = Arc::new(FsTileStore::new(&config.tiles.cache_dir));
    tracing::info!("Tile cache at {}", tile_store.root().display());
    let tile_source = Arc::new(HttpTileSource::new(&config.tiles)?);
    let kv_store = Arc::new(FileKeyValueStore::new(&config.storage.data_dir));
    let asset_origin = match &config.assets.origin {
        Some(base) => {
            let origin = HttpAssetOrigin::new(base, Duration::from_secs(config.tiles.timeout_secs))?;
            Some(Arc::new(origin) as Arc<dyn AssetOrigin>)
        }
        None => None,
    };

    // Services (application layer)
    let provisioning = Arc::new(ProvisioningService::new(
        tile_store.clone(),
        tile_source.clone(),
        config.provision_defaults()?,
    ));
    let tiles = TileGateway::new(tile_store, tile_source);
    let assets = AssetService::install(&config.assets.root, &config.assets.files, asset_origin).await;
    let shapes = ShapeEditingService::load(config.viewport()?, kv_store.clone()).await;
    let buildings = BuildingService::load(kv_store).await;

    if config.provision.on_startup {
        // Nobody listens to a startup run; its milestones still reach the log.
        provisioning
            .start(&ProvisionRequest::default())
            .context("Failed to start provisioning")?;
    }

    let state = Arc::new(AppState {
        provisioning,
        tiles,
        assets,
        shapes,
        buildings,
    });

    // Build router (presentation layer)
    // JSON handlers compress themselves; only app assets go through CompressionLayer.
    let asset_router = Router::new()
        .fallback(serve_asset)
        .layer(CompressionLayer::new())
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/tiles/:z/:x/:y", get(get_tile))
        .route("/provision", post(start_provisioning))
        .route("/viewport", get(get_viewport).put(put_viewport))
        .route("/shape", get(get_shape))
        .route("/shape/activate", post(activate_shape))
        .route("/shape/pointer/down", post(pointer_down))
        .route("/shape/pointer/move", post(pointer_move))
        .route("/shape/pointer/up", post(pointer_up))
        .route("/shape/confirm", post(confirm_shape))
        .route("/shape/deactivate", post(deactivate_shape))
        .route("/shape/history", get(get_history))
        .route("/shape/history/:index/activate", post(activate_from_history))
        .route("/buildings", get(list_buildings).post(add_building))
        .route("/buildings/from-shape", post(add_building_from_shape))
        .route("/buildings/import", post(import_buildings))
        .route("/buildings/export", get(export_buildings))
        .route("/buildings/:id", delete(delete_building))
        .with_state(state)
        .fallback_service(asset_router)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid server.bind address {:?}", config.server.bind))?;
    tracing::info!("Starting offline map service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
