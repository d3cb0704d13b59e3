// Shape manipulator - screen-space move/resize/rotate editor
//
// The editor is a plain state machine driven by pointer events. Hosts feed it
// raw positions and read back the shape state and handle layout after each
// call; nothing here knows about the map or about rendering.
use super::geo::ScreenPoint;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SHAPE_SIZE: f64 = 120.0;
pub const MIN_SHAPE_SIZE: f64 = 20.0;

/// Distance of the rotate handle beyond the top edge, in local space.
pub const ROTATE_HANDLE_OFFSET: f64 = 28.0;

/// Pointer distance within which a handle counts as grabbed.
pub const HANDLE_HIT_RADIUS: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    #[serde(alias = "circle")]
    Ellipse,
}

/// Position-free snapshot of a shape, reusable as an activation preset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapePreset {
    #[serde(alias = "mode")]
    pub kind: ShapeKind,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShapeState {
    pub center: ScreenPoint,
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation in radians (screen y points down).
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// Clockwise from the top-left corner of the unrotated shape.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    /// Unit signs of this corner's offset from the center.
    fn signs(self) -> (f64, f64) {
        match self {
            Corner::TopLeft => (-1.0, -1.0),
            Corner::TopRight => (1.0, -1.0),
            Corner::BottomRight => (1.0, 1.0),
            Corner::BottomLeft => (-1.0, 1.0),
        }
    }

    #[cfg(test)]
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomRight => Corner::TopLeft,
            Corner::BottomLeft => Corner::TopRight,
        }
    }
}

impl ShapeState {
    /// Screen position of a point given in the shape's local, unrotated frame.
    pub fn local_to_screen(&self, local: ScreenPoint) -> ScreenPoint {
        local.rotated(self.rotation).offset(self.center)
    }

    pub fn screen_to_local(&self, point: ScreenPoint) -> ScreenPoint {
        point.minus(self.center).rotated(-self.rotation)
    }

    pub fn corner(&self, corner: Corner) -> ScreenPoint {
        let (sx, sy) = corner.signs();
        self.local_to_screen(ScreenPoint::new(
            sx * self.width / 2.0,
            sy * self.height / 2.0,
        ))
    }

    pub fn handles(&self) -> HandleLayout {
        HandleLayout {
            corners: Corner::ALL.map(|c| self.corner(c)),
            rotate: self.local_to_screen(ScreenPoint::new(
                0.0,
                -self.height / 2.0 - ROTATE_HANDLE_OFFSET,
            )),
        }
    }

    fn body_contains(&self, kind: ShapeKind, point: ScreenPoint) -> bool {
        let local = self.screen_to_local(point);
        let (rx, ry) = (self.width / 2.0, self.height / 2.0);
        match kind {
            ShapeKind::Rect => local.x.abs() <= rx && local.y.abs() <= ry,
            ShapeKind::Ellipse => (local.x / rx).powi(2) + (local.y / ry).powi(2) <= 1.0,
        }
    }
}

/// Screen positions of the interactive handles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandleLayout {
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corners: [ScreenPoint; 4],
    pub rotate: ScreenPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "corner")]
pub enum Handle {
    Rotate,
    Resize(Corner),
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorMode {
    Inactive,
    Idle,
    DraggingMove,
    DraggingResize,
    DraggingRotate,
}

#[derive(Debug, Clone, Copy)]
enum Drag {
    Move {
        grab_offset: ScreenPoint,
    },
    Resize {
        corner: Corner,
        start_pointer: ScreenPoint,
        start: ShapeState,
    },
    Rotate {
        start_angle: f64,
        start_rotation: f64,
    },
}

#[derive(Debug, Clone)]
struct Session {
    kind: ShapeKind,
    state: ShapeState,
    drag: Option<Drag>,
    origin: Option<ShapePreset>,
}

/// Final state handed out by `confirm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmedShape {
    pub kind: ShapeKind,
    pub state: ShapeState,
    /// Preset the session was activated from, if any.
    pub origin: Option<ShapePreset>,
}

impl ConfirmedShape {
    pub fn preset(&self) -> ShapePreset {
        ShapePreset {
            kind: self.kind,
            width: self.state.width,
            height: self.state.height,
            rotation: self.state.rotation,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShapeManipulator {
    session: Option<Session>,
}

fn angle_from(center: ScreenPoint, point: ScreenPoint) -> f64 {
    (point.y - center.y).atan2(point.x - center.x)
}

impl ShapeManipulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditorMode {
        match &self.session {
            None => EditorMode::Inactive,
            Some(s) => match s.drag {
                None => EditorMode::Idle,
                Some(Drag::Move { .. }) => EditorMode::DraggingMove,
                Some(Drag::Resize { .. }) => EditorMode::DraggingResize,
                Some(Drag::Rotate { .. }) => EditorMode::DraggingRotate,
            },
        }
    }

    pub fn kind(&self) -> Option<ShapeKind> {
        self.session.as_ref().map(|s| s.kind)
    }

    pub fn state(&self) -> Option<&ShapeState> {
        self.session.as_ref().map(|s| &s.state)
    }

    pub fn handles(&self) -> Option<HandleLayout> {
        self.state().map(ShapeState::handles)
    }

    /// Start a session centered on `viewport_center`. Any session already
    /// running is discarded first; returns true in that case.
    pub fn activate(
        &mut self,
        kind: ShapeKind,
        preset: Option<&ShapePreset>,
        viewport_center: ScreenPoint,
    ) -> bool {
        let replaced = self.deactivate();
        let (width, height, rotation) = match preset {
            Some(p) => (p.width, p.height, p.rotation),
            None => (DEFAULT_SHAPE_SIZE, DEFAULT_SHAPE_SIZE, 0.0),
        };
        self.session = Some(Session {
            kind,
            state: ShapeState {
                center: viewport_center,
                width: width.max(MIN_SHAPE_SIZE),
                height: height.max(MIN_SHAPE_SIZE),
                rotation,
            },
            drag: None,
            origin: preset.copied(),
        });
        replaced
    }

    /// Which handle sits under `point`, checked rotate first, then corners, then the body.
    pub fn hit_test(&self, point: ScreenPoint) -> Option<Handle> {
        let session = self.session.as_ref()?;
        let layout = session.state.handles();

        if layout.rotate.distance_to(point) <= HANDLE_HIT_RADIUS {
            return Some(Handle::Rotate);
        }
        for (corner, pos) in Corner::ALL.iter().zip(layout.corners) {
            if pos.distance_to(point) <= HANDLE_HIT_RADIUS {
                return Some(Handle::Resize(*corner));
            }
        }
        if session.state.body_contains(session.kind, point) {
            return Some(Handle::Body);
        }
        None
    }

    /// Begin a drag on whatever handle is under the pointer. A miss leaves
    /// the editor untouched so the click can reach other controls.
    pub fn pointer_down(&mut self, point: ScreenPoint) -> Option<Handle> {
        let handle = self.hit_test(point)?;
        let session = self.session.as_mut()?;
        let state = session.state;

        session.drag = Some(match handle {
            Handle::Rotate => Drag::Rotate {
                start_angle: angle_from(state.center, point),
                start_rotation: state.rotation,
            },
            Handle::Resize(corner) => Drag::Resize {
                corner,
                start_pointer: point,
                start: state,
            },
            Handle::Body => Drag::Move {
                grab_offset: point.minus(state.center),
            },
        });
        Some(handle)
    }

    /// Apply a pointer move to the active drag. Returns false when no drag is running.
    pub fn pointer_move(&mut self, point: ScreenPoint) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let Some(drag) = session.drag else {
            return false;
        };
        let state = &mut session.state;

        match drag {
            Drag::Move { grab_offset } => {
                state.center = point.minus(grab_offset);
            }
            Drag::Resize {
                corner,
                start_pointer,
                start,
            } => {
                *state = resize_from_corner(&start, corner, point.minus(start_pointer));
            }
            Drag::Rotate {
                start_angle,
                start_rotation,
            } => {
                state.rotation = start_rotation + (angle_from(state.center, point) - start_angle);
            }
        }
        true
    }

    pub fn pointer_up(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.drag = None;
        }
    }

    /// End the session and hand back its final state. `None` when inactive.
    pub fn confirm(&mut self) -> Option<ConfirmedShape> {
        let session = self.session.take()?;
        Some(ConfirmedShape {
            kind: session.kind,
            state: session.state,
            origin: session.origin,
        })
    }

    /// Discard the session. Returns true if one was active.
    pub fn deactivate(&mut self) -> bool {
        self.session.take().is_some()
    }
}

/// Resize `start` by dragging `corner` by the screen-space `delta`, keeping
/// the opposite corner where it was.
fn resize_from_corner(start: &ShapeState, corner: Corner, delta: ScreenPoint) -> ShapeState {
    let local = delta.rotated(-start.rotation);
    let (sx, sy) = corner.signs();

    let width = (start.width + sx * local.x).max(MIN_SHAPE_SIZE);
    let height = (start.height + sy * local.y).max(MIN_SHAPE_SIZE);

    let shift = ScreenPoint::new(
        sx * (width - start.width) / 2.0,
        sy * (height - start.height) / 2.0,
    );

    ShapeState {
        center: start.center.offset(shift.rotated(start.rotation)),
        width,
        height,
        rotation: start.rotation,
    }
}
