// Screen <-> geographic projection for the host map viewport
use super::geo::{LatLng, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Raster tile edge in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// Converts between viewport pixels and geographic coordinates.
pub trait ScreenProjection {
    fn screen_to_geo(&self, point: ScreenPoint) -> LatLng;
    fn geo_to_screen(&self, coord: LatLng) -> ScreenPoint;
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ViewportError {
    #[error("viewport size must be positive, got {width}x{height}")]
    EmptySize { width: f64, height: f64 },
    #[error("zoom {0} is outside 0..=22")]
    Zoom(f64),
    #[error("map interaction is disabled while a shape is being edited")]
    Locked,
}

/// A Web Mercator view: a geographic center shown at the middle of a
/// `width` x `height` pixel container at a (possibly fractional) zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WebMercatorViewport {
    pub center: LatLng,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl WebMercatorViewport {
    pub fn new(center: LatLng, zoom: f64, width: f64, height: f64) -> Result<Self, ViewportError> {
        if !(width > 0.0 && height > 0.0) {
            return Err(ViewportError::EmptySize { width, height });
        }
        if !(0.0..=22.0).contains(&zoom) {
            return Err(ViewportError::Zoom(zoom));
        }
        Ok(Self {
            center,
            zoom,
            width,
            height,
        })
    }

    pub fn size_center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    fn world_size(&self) -> f64 {
        TILE_SIZE * 2f64.powf(self.zoom)
    }

    /// Absolute world pixel of a coordinate at the current zoom.
    fn project(&self, coord: LatLng) -> ScreenPoint {
        let scale = self.world_size();
        let lat = coord.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (coord.lon + 180.0) / 360.0 * scale;
        let y = (1.0 - lat.tan().asinh() / PI) / 2.0 * scale;
        ScreenPoint::new(x, y)
    }

    fn unproject(&self, world: ScreenPoint) -> LatLng {
        let scale = self.world_size();
        let lon = world.x / scale * 360.0 - 180.0;
        let merc = PI * (1.0 - 2.0 * world.y / scale);
        let lat = merc.sinh().atan().to_degrees();
        LatLng::new(lat, lon)
    }

    /// World pixel at the container's top-left corner, rounded like the host map does.
    fn pixel_origin(&self) -> ScreenPoint {
        let c = self.project(self.center);
        ScreenPoint::new(
            (c.x - self.width / 2.0).round(),
            (c.y - self.height / 2.0).round(),
        )
    }
}

impl ScreenProjection for WebMercatorViewport {
    fn screen_to_geo(&self, point: ScreenPoint) -> LatLng {
        self.unproject(point.offset(self.pixel_origin()))
    }

    fn geo_to_screen(&self, coord: LatLng) -> ScreenPoint {
        self.project(coord).minus(self.pixel_origin())
    }
}
