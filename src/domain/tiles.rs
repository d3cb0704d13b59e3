// Web Mercator tile indexing and provisioning plans
use super::geo::GeoBoundingBox;
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt;

/// Highest zoom level accepted for externally supplied tile keys.
pub const MAX_ZOOM: u8 = 24;

/// Average size of one raster tile, used only for the size estimate in logs.
const ESTIMATED_TILE_KIB: u64 = 15;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TileKeyError {
    #[error("zoom {0} exceeds the maximum of {MAX_ZOOM}")]
    ZoomTooHigh(u8),
    #[error("tile {x}/{y} is outside the 2^{z} grid")]
    OutOfGrid { z: u8, x: u32, y: u32 },
}

/// Address of one raster tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Validating constructor for keys that arrive from outside (request paths).
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self, TileKeyError> {
        if z > MAX_ZOOM {
            return Err(TileKeyError::ZoomTooHigh(z));
        }
        let side = grid_side(z);
        if u64::from(x) >= side || u64::from(y) >= side {
            return Err(TileKeyError::OutOfGrid { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// Relative storage path, `{z}/{x}/{y}.png`.
    pub fn relative_path(&self) -> String {
        format!("{}/{}/{}.png", self.z, self.x, self.y)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn grid_side(zoom: u8) -> u64 {
    1u64 << zoom
}

fn clamp_to_grid(raw: f64, zoom: u8) -> u32 {
    let max = (grid_side(zoom) - 1) as f64;
    raw.floor().clamp(0.0, max) as u32
}

/// Tile column containing `lon` at `zoom`.
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> u32 {
    let n = grid_side(zoom) as f64;
    clamp_to_grid((lon + 180.0) / 360.0 * n, zoom)
}

/// Tile row containing `lat` at `zoom` (row 0 is the northern edge).
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> u32 {
    let n = grid_side(zoom) as f64;
    let lat_rad = lat.to_radians();
    let merc = lat_rad.tan().asinh();
    clamp_to_grid((1.0 - merc / PI) / 2.0 * n, zoom)
}

/// Rectangle of tiles covering a bounding box at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoomPlan {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
    pub tile_count: u64,
}

impl ZoomPlan {
    pub fn for_bounds(bounds: &GeoBoundingBox, zoom: u8) -> Self {
        let x_min = lon_to_tile_x(bounds.west(), zoom);
        let x_max = lon_to_tile_x(bounds.east(), zoom);
        let y_min = lat_to_tile_y(bounds.north(), zoom);
        let y_max = lat_to_tile_y(bounds.south(), zoom);
        let tile_count = u64::from(x_max - x_min + 1) * u64::from(y_max - y_min + 1);

        Self {
            zoom,
            x_min,
            x_max,
            y_min,
            y_max,
            tile_count,
        }
    }

    /// Keys in ascending x, then ascending y order.
    pub fn keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.x_min..=self.x_max).flat_map(move |x| {
            (self.y_min..=self.y_max).map(move |y| TileKey { z: self.zoom, x, y })
        })
    }
}

/// Zoom plans for every level in an inclusive zoom range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisioningPlan {
    pub zooms: Vec<ZoomPlan>,
    pub total_tiles: u64,
}

impl ProvisioningPlan {
    pub fn new(bounds: &GeoBoundingBox, min_zoom: u8, max_zoom: u8) -> Self {
        let zooms: Vec<ZoomPlan> = (min_zoom..=max_zoom)
            .map(|z| ZoomPlan::for_bounds(bounds, z))
            .collect();
        let total_tiles = zooms.iter().map(|p| p.tile_count).sum();
        Self { zooms, total_tiles }
    }

    pub fn estimated_size_mib(&self) -> u64 {
        (self.total_tiles * ESTIMATED_TILE_KIB + 512) / 1024
    }
}

/// Counters for one provisioning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DownloadTally {
    pub downloaded: u64,
    pub failed: u64,
}

impl DownloadTally {
    pub fn processed(&self) -> u64 {
        self.downloaded + self.failed
    }
}
