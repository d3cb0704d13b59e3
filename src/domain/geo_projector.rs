// Confirmed shape -> geographic polygon
use super::geo::{GeoPolygon, ScreenPoint};
use super::projection::ScreenProjection;
use super::shape::{ConfirmedShape, Corner, ShapeKind, ShapeState};
use std::f64::consts::TAU;

pub const ELLIPSE_SEGMENTS: usize = 32;

/// Outline vertices in screen space: the 4 corners clockwise from top-left
/// for a rectangle, or `ELLIPSE_SEGMENTS` samples by increasing angle.
pub fn outline(kind: ShapeKind, state: &ShapeState) -> Vec<ScreenPoint> {
    match kind {
        ShapeKind::Rect => Corner::ALL.iter().map(|c| state.corner(*c)).collect(),
        ShapeKind::Ellipse => {
            let (rx, ry) = (state.width / 2.0, state.height / 2.0);
            (0..ELLIPSE_SEGMENTS)
                .map(|i| {
                    let angle = TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                    state.local_to_screen(ScreenPoint::new(rx * angle.cos(), ry * angle.sin()))
                })
                .collect()
        }
    }
}

pub fn project_shape<P>(shape: &ConfirmedShape, projection: &P) -> GeoPolygon
where
    P: ScreenProjection + ?Sized,
{
    outline(shape.kind, &shape.state)
        .into_iter()
        .map(|p| projection.screen_to_geo(p))
        .collect()
}
