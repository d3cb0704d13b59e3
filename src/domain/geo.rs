// Geographic and screen-space primitives
use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees.
///
/// Serialized as a `[lat, lon]` pair, the layout the host map uses for
/// polygon vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<LatLng> for [f64; 2] {
    fn from(p: LatLng) -> Self {
        [p.lat, p.lon]
    }
}

/// A point in viewport pixel space (origin top-left, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotate this point (taken as an offset from the origin) by `radians`.
    pub fn rotated(self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    pub fn offset(self, by: ScreenPoint) -> Self {
        Self::new(self.x + by.x, self.y + by.y)
    }

    pub fn minus(self, other: ScreenPoint) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    pub fn distance_to(self, other: ScreenPoint) -> f64 {
        let d = self.minus(other);
        d.x.hypot(d.y)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoundsError {
    #[error("north ({north}) must be greater than south ({south})")]
    LatitudeOrder { north: f64, south: f64 },
    #[error("east ({east}) must be greater than west ({west})")]
    LongitudeOrder { east: f64, west: f64 },
    #[error("coordinate out of range: {0}")]
    OutOfRange(f64),
}

/// Bounding box in decimal degrees. Always satisfies north > south and east > west.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct GeoBoundingBox {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

#[derive(Deserialize)]
struct RawBounds {
    north: f64,
    south: f64,
    east: f64,
    west: f64,
}

impl TryFrom<RawBounds> for GeoBoundingBox {
    type Error = BoundsError;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::new(raw.north, raw.south, raw.east, raw.west)
    }
}

impl GeoBoundingBox {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, BoundsError> {
        for lat in [north, south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(BoundsError::OutOfRange(lat));
            }
        }
        for lon in [east, west] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(BoundsError::OutOfRange(lon));
            }
        }
        if north <= south {
            return Err(BoundsError::LatitudeOrder { north, south });
        }
        if east <= west {
            return Err(BoundsError::LongitudeOrder { east, west });
        }
        Ok(Self {
            north,
            south,
            east,
            west,
        })
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn west(&self) -> f64 {
        self.west
    }
}

/// Ordered polygon vertices; the first point is not repeated at the end.
pub type GeoPolygon = Vec<LatLng>;
