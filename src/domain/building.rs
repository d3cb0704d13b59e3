// Building footprint domain model
use super::geo::{GeoPolygon, LatLng};
use serde::{Deserialize, Serialize};

pub const MIN_POLYGON_POINTS: usize = 3;
pub const DEFAULT_DRAW_COLOR: &str = "#e53e3e";
pub const DEFAULT_IMPORT_COLOR: &str = "#2563eb";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildingError {
    #[error("building name is required")]
    MissingName,
    #[error("a building outline needs at least {MIN_POLYGON_POINTS} points, got {0}")]
    TooFewPoints(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    pub color: String,
    pub points: GeoPolygon,
}

impl Building {
    pub fn new(
        id: String,
        name: &str,
        description: &str,
        color: &str,
        points: GeoPolygon,
    ) -> Result<Self, BuildingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BuildingError::MissingName);
        }
        if points.len() < MIN_POLYGON_POINTS {
            return Err(BuildingError::TooFewPoints(points.len()));
        }
        Ok(Self {
            id,
            name: name.to_string(),
            description: description.trim().to_string(),
            color: color.to_string(),
            points,
        })
    }

    fn first_point(&self) -> Option<LatLng> {
        self.points.first().copied()
    }

    /// Same name, same vertex count and same first vertex.
    pub fn looks_like(&self, name: &str, points: &[LatLng]) -> bool {
        self.name == name
            && self.points.len() == points.len()
            && self.first_point() == points.first().copied()
    }
}

/// Loosely typed import record; validated before it becomes a `Building`.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub points: Option<GeoPolygon>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> GeoPolygon {
        vec![
            LatLng::new(35.51, 129.42),
            LatLng::new(35.51, 129.43),
            LatLng::new(35.50, 129.43),
        ]
    }

    #[test]
    fn test_new_validates() {
        let b = Building::new("a1".into(), "  Hall ", " note ", DEFAULT_DRAW_COLOR, square()).unwrap();
        assert_eq!(b.name, "Hall");
        assert_eq!(b.description, "note");

        assert_eq!(
            Building::new("a2".into(), "   ", "", DEFAULT_DRAW_COLOR, square()),
            Err(BuildingError::MissingName)
        );
        assert_eq!(
            Building::new("a3".into(), "Shed", "", DEFAULT_DRAW_COLOR, square()[..2].to_vec()),
            Err(BuildingError::TooFewPoints(2))
        );
    }

    #[test]
    fn test_legacy_desc_field() {
        let b: Building = serde_json::from_str(
            r##"{"id":"x","name":"Gym","desc":"old","color":"#fff","points":[[1,2],[3,4],[5,6]]}"##,
        )
        .unwrap();
        assert_eq!(b.description, "old");
        assert_eq!(b.points[2], LatLng::new(5.0, 6.0));
    }

    #[test]
    fn test_looks_like() {
        let b = Building::new("a1".into(), "Hall", "", DEFAULT_DRAW_COLOR, square()).unwrap();
        assert!(b.looks_like("Hall", &square()));
        assert!(!b.looks_like("Hall", &square()[..2]));
        assert!(!b.looks_like("Annex", &square()));
    }
}
