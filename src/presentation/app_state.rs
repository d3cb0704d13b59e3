// Application state for HTTP handlers
use crate::application::asset_service::AssetService;
use crate::application::building_service::BuildingService;
use crate::application::provisioning_service::ProvisioningService;
use crate::application::shape_service::ShapeEditingService;
use crate::application::tile_gateway::TileGateway;
use std::sync::Arc;

pub struct AppState {
    pub provisioning: Arc<ProvisioningService>,
    pub tiles: TileGateway,
    pub assets: AssetService,
    pub shapes: ShapeEditingService,
    pub buildings: BuildingService,
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use crate::application::provisioning_service::ProvisionDefaults;
    use crate::application::test_support::{
        MemoryKeyValueStore, MemoryTileStore, ScriptedTileSource,
    };
    use crate::domain::geo::{GeoBoundingBox, LatLng};
    use crate::domain::projection::WebMercatorViewport;
    use std::collections::HashMap;
    use std::time::Duration;

    pub struct Fixture {
        pub state: Arc<AppState>,
        pub store: Arc<MemoryTileStore>,
        pub source: Arc<ScriptedTileSource>,
    }

    pub async fn fixture(source: ScriptedTileSource) -> Fixture {
        let store = Arc::new(MemoryTileStore::default());
        let source = Arc::new(source);
        let kv = Arc::new(MemoryKeyValueStore::default());
        let viewport =
            WebMercatorViewport::new(LatLng::new(35.510, 129.4275), 17.0, 800.0, 600.0).unwrap();
        let defaults = ProvisionDefaults {
            bounds: GeoBoundingBox::new(35.525, 35.495, 129.445, 129.410).unwrap(),
            min_zoom: 10,
            max_zoom: 13,
            pacing: Duration::ZERO,
            progress_every: 100,
        };

        let state = Arc::new(AppState {
            provisioning: Arc::new(ProvisioningService::new(
                store.clone(),
                source.clone(),
                defaults,
            )),
            tiles: TileGateway::new(store.clone(), source.clone()),
            assets: AssetService::new(HashMap::new(), None),
            shapes: ShapeEditingService::load(viewport, kv.clone()).await,
            buildings: BuildingService::load(kv).await,
        });
        Fixture {
            state,
            store,
            source,
        }
    }
}
