// Recently confirmed shape presets, most recent first
use super::shape::{ConfirmedShape, ShapePreset};
use serde::{Deserialize, Serialize};

pub const HISTORY_LIMIT: usize = 3;

/// Rotation difference below which a preset counts as unchanged.
const ROTATION_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeHistory {
    entries: Vec<ShapePreset>,
}

impl ShapeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted history. Anything unreadable yields an empty history.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Vec<ShapePreset>>(raw) {
            Ok(mut entries) => {
                entries.truncate(HISTORY_LIMIT);
                Self { entries }
            }
            Err(e) => {
                tracing::warn!("Discarding unreadable shape history: {}", e);
                Self::default()
            }
        }
    }

    pub fn entries(&self) -> &[ShapePreset] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ShapePreset> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Put a preset at the front, dropping the oldest beyond the limit.
    /// Dimensions are stored rounded to whole pixels.
    pub fn record(&mut self, preset: ShapePreset) {
        self.entries.insert(
            0,
            ShapePreset {
                width: preset.width.round(),
                height: preset.height.round(),
                ..preset
            },
        );
        self.entries.truncate(HISTORY_LIMIT);
    }

    /// Record a confirmed shape unless it is its originating preset used as-is.
    /// Returns whether the history changed.
    pub fn record_confirmed(&mut self, shape: &ConfirmedShape) -> bool {
        if is_unchanged(shape) {
            return false;
        }
        self.record(shape.preset());
        true
    }
}

fn is_unchanged(shape: &ConfirmedShape) -> bool {
    let Some(origin) = shape.origin else {
        return false;
    };
    shape.state.width.round() == origin.width.round()
        && shape.state.height.round() == origin.height.round()
        && (shape.state.rotation - origin.rotation).abs() < ROTATION_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::ScreenPoint;
    use crate::domain::shape::{ShapeKind, ShapeState};

    fn preset(width: f64) -> ShapePreset {
        ShapePreset {
            kind: ShapeKind::Rect,
            width,
            height: 50.0,
            rotation: 0.0,
        }
    }

    fn confirmed(width: f64, rotation: f64, origin: Option<ShapePreset>) -> ConfirmedShape {
        ConfirmedShape {
            kind: ShapeKind::Rect,
            state: ShapeState {
                center: ScreenPoint::new(0.0, 0.0),
                width,
                height: 50.0,
                rotation,
            },
            origin,
        }
    }

    #[test]
    fn test_record_is_most_recent_first_and_bounded() {
        let mut history = ShapeHistory::new();
        for w in [10.0, 20.0, 30.0, 40.0] {
            history.record(preset(w));
        }
        let widths: Vec<f64> = history.entries().iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![40.0, 30.0, 20.0]);
    }

    #[test]
    fn test_record_rounds_dimensions() {
        let mut history = ShapeHistory::new();
        history.record(ShapePreset {
            kind: ShapeKind::Ellipse,
            width: 99.6,
            height: 40.2,
            rotation: 0.123,
        });
        let p = history.get(0).unwrap();
        assert_eq!((p.width, p.height, p.rotation), (100.0, 40.0, 0.123));
    }

    #[test]
    fn test_unchanged_history_preset_is_not_recorded() {
        let mut history = ShapeHistory::new();
        for w in [10.0, 20.0, 30.0] {
            history.record(preset(w));
        }
        let before = history.clone();
        let origin = *history.get(2).unwrap();

        assert!(!history.record_confirmed(&confirmed(10.3, 0.005, Some(origin))));
        assert_eq!(history, before);
    }

    #[test]
    fn test_modified_preset_is_recorded() {
        let mut history = ShapeHistory::new();
        history.record(preset(10.0));
        let origin = *history.get(0).unwrap();

        assert!(history.record_confirmed(&confirmed(10.0, 0.02, Some(origin))));
        assert!(history.record_confirmed(&confirmed(11.0, 0.0, Some(origin))));
        assert!(history.record_confirmed(&confirmed(10.0, 0.0, None)));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_from_json_tolerates_garbage() {
        assert!(ShapeHistory::from_json("not json").is_empty());
        assert!(ShapeHistory::from_json(r#"{"w": 1}"#).is_empty());

        let raw = r#"[
            {"mode":"rect","w":1,"h":2,"rotation":0},
            {"mode":"circle","w":3,"h":4,"rotation":0},
            {"kind":"ellipse","width":5,"height":6,"rotation":0},
            {"kind":"rect","width":7,"height":8,"rotation":0}
        ]"#;
        let history = ShapeHistory::from_json(raw);
        assert_eq!(history.len(), 3);
        assert_eq!(history.get(1).unwrap().kind, ShapeKind::Ellipse);
    }
}
