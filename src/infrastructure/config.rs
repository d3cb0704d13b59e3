use crate::application::provisioning_service::{
    DEFAULT_PACING, DEFAULT_PROGRESS_EVERY, ProvisionDefaults,
};
use crate::domain::geo::{GeoBoundingBox, LatLng};
use crate::domain::projection::WebMercatorViewport;
use crate::domain::tiles::MAX_ZOOM;
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub tiles: TileSettings,
    pub provision: ProvisionSettings,
    pub assets: AssetSettings,
    pub storage: StorageSettings,
    pub map: MapSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TileSettings {
    /// Origin URL with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    pub subdomains: Vec<String>,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub cache_dir: PathBuf,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            subdomains: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            user_agent: "MmapOfflineBuilder/1.0".to_string(),
            timeout_secs: 15,
            cache_dir: PathBuf::from("www/tiles"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RegionSettings {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Default for RegionSettings {
    fn default() -> Self {
        // Bangeo-dong, Dong-gu, Ulsan
        Self {
            north: 35.525,
            south: 35.495,
            east: 129.445,
            west: 129.410,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProvisionSettings {
    pub region: RegionSettings,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub pacing_ms: u64,
    pub progress_every: u64,
    /// Run a provisioning pass in the background when the server starts.
    pub on_startup: bool,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            region: RegionSettings::default(),
            min_zoom: 10,
            max_zoom: 19,
            pacing_ms: DEFAULT_PACING.as_millis() as u64,
            progress_every: DEFAULT_PROGRESS_EVERY,
            on_startup: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AssetSettings {
    pub root: PathBuf,
    pub files: Vec<String>,
    /// Optional upstream used when an asset is not precached.
    pub origin: Option<String>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        let files = [
            "/",
            "/index.html",
            "/app.js",
            "/style.css",
            "/lib/leaflet/leaflet.js",
            "/lib/leaflet/leaflet.css",
            "/lib/leaflet/images/marker-icon.png",
            "/lib/leaflet/images/marker-icon-2x.png",
            "/lib/leaflet/images/marker-shadow.png",
            "/lib/leaflet/images/layers.png",
            "/lib/leaflet/images/layers-2x.png",
        ];
        Self {
            root: PathBuf::from("www"),
            files: files.iter().map(|f| f.to_string()).collect(),
            origin: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Initial view of the host map.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center_lat: 35.510,
            center_lon: 129.4275,
            zoom: 15.0,
            width: 1024.0,
            height: 768.0,
        }
    }
}

impl AppConfig {
    pub fn bounds(&self) -> anyhow::Result<GeoBoundingBox> {
        let r = &self.provision.region;
        GeoBoundingBox::new(r.north, r.south, r.east, r.west).context("Invalid provision.region")
    }

    pub fn viewport(&self) -> anyhow::Result<WebMercatorViewport> {
        let m = &self.map;
        WebMercatorViewport::new(LatLng::new(m.center_lat, m.center_lon), m.zoom, m.width, m.height)
            .context("Invalid map settings")
    }

    pub fn provision_defaults(&self) -> anyhow::Result<ProvisionDefaults> {
        let p = &self.provision;
        if p.min_zoom > p.max_zoom {
            anyhow::bail!(
                "provision.min_zoom ({}) exceeds provision.max_zoom ({})",
                p.min_zoom,
                p.max_zoom
            );
        }
        if p.max_zoom > MAX_ZOOM {
            anyhow::bail!("provision.max_zoom ({}) exceeds {}", p.max_zoom, MAX_ZOOM);
        }
        Ok(ProvisionDefaults {
            bounds: self.bounds()?,
            min_zoom: p.min_zoom,
            max_zoom: p.max_zoom,
            pacing: Duration::from_millis(p.pacing_ms),
            progress_every: p.progress_every,
        })
    }

    fn validate(self) -> anyhow::Result<Self> {
        self.provision_defaults()?;
        self.viewport()?;
        if self.tiles.subdomains.is_empty() {
            anyhow::bail!("tiles.subdomains must list at least one mirror");
        }
        Ok(self)
    }
}

/// Load `config/app.toml` (optional) with `MMAP_*` environment overrides,
/// e.g. `MMAP_SERVER__BIND=127.0.0.1:9000`.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(
            config::Environment::with_prefix("MMAP")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("tiles.subdomains")
                .with_list_parse_key("assets.files")
                .try_parsing(true),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    config.validate()
}

/// Fill a `{s}/{z}/{x}/{y}` URL template.
pub fn expand_url_template(template: &str, mirror: &str, z: u8, x: u32, y: u32) -> String {
    template
        .replace("{s}", mirror)
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}
