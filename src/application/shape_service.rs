// Shape editing service - One editing session against the host map
use crate::application::key_value_store::{KeyValueStore, persist_best_effort};
use crate::domain::geo::{GeoPolygon, ScreenPoint};
use crate::domain::geo_projector::project_shape;
use crate::domain::projection::{ViewportError, WebMercatorViewport};
use crate::domain::shape::{
    EditorMode, Handle, HandleLayout, ShapeKind, ShapeManipulator, ShapePreset, ShapeState,
};
use crate::domain::shape_history::ShapeHistory;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const HISTORY_KEY: &str = "mmap_shape_history";

/// The host map as seen by the editor: its current view and whether the
/// user may pan and zoom it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapHost {
    pub viewport: WebMercatorViewport,
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorSnapshot {
    pub mode: EditorMode,
    pub kind: Option<ShapeKind>,
    pub state: Option<ShapeState>,
    pub handles: Option<HandleLayout>,
    pub map_interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfirmOutcome {
    pub kind: ShapeKind,
    pub polygon: GeoPolygon,
    pub history_recorded: bool,
}

struct Editor {
    manipulator: ShapeManipulator,
    history: ShapeHistory,
    host: MapHost,
}

impl Editor {
    fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            mode: self.manipulator.mode(),
            kind: self.manipulator.kind(),
            state: self.manipulator.state().copied(),
            handles: self.manipulator.handles(),
            map_interactive: self.host.interactive,
        }
    }

    fn activate(&mut self, kind: ShapeKind, preset: Option<&ShapePreset>) {
        let center = self.host.viewport.size_center();
        if self.manipulator.activate(kind, preset, center) {
            tracing::debug!("Replaced running shape session");
        }
        self.host.interactive = false;
    }

    fn end_session(&mut self) {
        self.host.interactive = true;
    }
}

pub struct ShapeEditingService {
    editor: Mutex<Editor>,
    store: Arc<dyn KeyValueStore>,
    /// Held from history snapshot to write so an older list never lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

impl ShapeEditingService {
    pub async fn load(viewport: WebMercatorViewport, store: Arc<dyn KeyValueStore>) -> Self {
        let history = match store.get(HISTORY_KEY).await {
            Some(raw) => ShapeHistory::from_json(&raw),
            None => ShapeHistory::new(),
        };
        if !history.is_empty() {
            tracing::debug!("Restored {} shape presets", history.len());
        }
        Self {
            editor: Mutex::new(Editor {
                manipulator: ShapeManipulator::new(),
                history,
                host: MapHost {
                    viewport,
                    interactive: true,
                },
            }),
            store,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn editor(&self) -> MutexGuard<'_, Editor> {
        self.editor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        self.editor().snapshot()
    }

    pub fn map_host(&self) -> MapHost {
        self.editor().host
    }

    /// Accept a new view from the host. Refused while a shape is being edited,
    /// since the shape's screen position would no longer match the map.
    pub fn set_viewport(&self, viewport: WebMercatorViewport) -> Result<MapHost, ViewportError> {
        let mut editor = self.editor();
        if !editor.host.interactive {
            return Err(ViewportError::Locked);
        }
        editor.host.viewport = viewport;
        Ok(editor.host)
    }

    pub fn activate(&self, kind: ShapeKind, preset: Option<ShapePreset>) -> EditorSnapshot {
        let mut editor = self.editor();
        editor.activate(kind, preset.as_ref());
        editor.snapshot()
    }

    /// Re-enter editing seeded with a history entry. `None` for an unknown index.
    pub fn activate_from_history(&self, index: usize) -> Option<EditorSnapshot> {
        let mut editor = self.editor();
        let preset = *editor.history.get(index)?;
        editor.activate(preset.kind, Some(&preset));
        Some(editor.snapshot())
    }

    pub fn pointer_down(&self, point: ScreenPoint) -> (Option<Handle>, EditorSnapshot) {
        let mut editor = self.editor();
        let handle = editor.manipulator.pointer_down(point);
        (handle, editor.snapshot())
    }

    pub fn pointer_move(&self, point: ScreenPoint) -> EditorSnapshot {
        let mut editor = self.editor();
        editor.manipulator.pointer_move(point);
        editor.snapshot()
    }

    pub fn pointer_up(&self) -> EditorSnapshot {
        let mut editor = self.editor();
        editor.manipulator.pointer_up();
        editor.snapshot()
    }

    pub fn deactivate(&self) -> bool {
        let mut editor = self.editor();
        let was_active = editor.manipulator.deactivate();
        editor.end_session();
        was_active
    }

    /// Finish the session: project the shape onto the map, update the history
    /// and hand the polygon to the caller. `None` when no shape is active.
    pub async fn confirm(&self) -> Option<ConfirmOutcome> {
        let outcome = {
            let mut editor = self.editor();
            let shape = editor.manipulator.confirm()?;
            let polygon = project_shape(&shape, &editor.host.viewport);
            let recorded = editor.history.record_confirmed(&shape);
            editor.end_session();
            ConfirmOutcome {
                kind: shape.kind,
                polygon,
                history_recorded: recorded,
            }
        };

        if outcome.history_recorded {
            self.persist_history().await;
        }
        Some(outcome)
    }

    async fn persist_history(&self) {
        let _writing = self.persist_lock.lock().await;
        let history = self.editor().history.clone();
        match serde_json::to_string(&history) {
            Ok(json) => {
                persist_best_effort(self.store.as_ref(), HISTORY_KEY, &json).await;
            }
            Err(e) => tracing::warn!("Could not encode shape history: {}", e),
        }
    }

    pub fn history(&self) -> Vec<ShapePreset> {
        self.editor().history.entries().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::MemoryKeyValueStore;
    use crate::domain::geo::LatLng;
    use crate::domain::projection::ScreenProjection;
    use crate::infrastructure::file_kv_store::FileKeyValueStore;
    use std::sync::atomic::Ordering;

    fn viewport() -> WebMercatorViewport {
        WebMercatorViewport::new(LatLng::new(35.510, 129.4275), 17.0, 800.0, 600.0).unwrap()
    }

    async fn service(store: Arc<MemoryKeyValueStore>) -> ShapeEditingService {
        ShapeEditingService::load(viewport(), store).await
    }

    #[tokio::test]
    async fn test_activation_locks_map() {
        let svc = service(Arc::new(MemoryKeyValueStore::default())).await;
        let snap = svc.activate(ShapeKind::Rect, None);
        assert_eq!(snap.mode, EditorMode::Idle);
        assert!(!snap.map_interactive);
        assert_eq!(snap.state.unwrap().center, ScreenPoint::new(400.0, 300.0));

        assert_eq!(svc.set_viewport(viewport()), Err(ViewportError::Locked));

        assert!(svc.deactivate());
        assert!(svc.map_host().interactive);
        assert!(svc.set_viewport(viewport()).is_ok());
    }

    #[tokio::test]
    async fn test_confirm_projects_and_records() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let svc = service(store.clone()).await;
        svc.activate(ShapeKind::Rect, None);

        let outcome = svc.confirm().await.unwrap();
        assert_eq!(outcome.kind, ShapeKind::Rect);
        assert_eq!(outcome.polygon.len(), 4);
        assert!(outcome.history_recorded);

        let tl = viewport().geo_to_screen(outcome.polygon[0]);
        assert!((tl.x - 340.0).abs() < 1e-6 && (tl.y - 240.0).abs() < 1e-6);

        assert!(svc.map_host().interactive);
        assert_eq!(svc.snapshot().mode, EditorMode::Inactive);
        let stored = store.raw(HISTORY_KEY).unwrap();
        assert_eq!(ShapeHistory::from_json(&stored).len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_without_session() {
        let svc = service(Arc::new(MemoryKeyValueStore::default())).await;
        assert!(svc.confirm().await.is_none());
    }

    #[tokio::test]
    async fn test_history_preset_reuse_does_not_grow_history() {
        let store = Arc::new(MemoryKeyValueStore::default());
        let svc = service(store.clone()).await;
        for (kind, w) in [(ShapeKind::Rect, 50.0), (ShapeKind::Ellipse, 70.0), (ShapeKind::Rect, 90.0)] {
            svc.activate(
                kind,
                Some(ShapePreset {
                    kind,
                    width: w,
                    height: 40.0,
                    rotation: 0.0,
                }),
            );
            // Nudge it so it is not treated as an unchanged preset.
            let grab = svc.snapshot().handles.unwrap().corners[2];
            svc.pointer_down(grab);
            svc.pointer_move(ScreenPoint::new(grab.x + 3.0, grab.y));
            svc.pointer_up();
            svc.confirm().await.unwrap();
        }
        let before = svc.history();
        assert_eq!(before.len(), 3);

        let snap = svc.activate_from_history(2).unwrap();
        assert_eq!(snap.kind, Some(ShapeKind::Rect));
        assert_eq!(snap.state.unwrap().width, 53.0);
        let outcome = svc.confirm().await.unwrap();

        assert!(!outcome.history_recorded);
        assert_eq!(svc.history(), before);
    }

    #[tokio::test]
    async fn test_activate_from_unknown_history_index() {
        let svc = service(Arc::new(MemoryKeyValueStore::default())).await;
        assert!(svc.activate_from_history(0).is_none());
        assert_eq!(svc.snapshot().mode, EditorMode::Inactive);
    }

    #[tokio::test]
    async fn test_history_survives_reload_and_store_failures() {
        let raw = r#"[{"mode":"circle","w":80,"h":40,"rotation":0.2}]"#;
        let store = Arc::new(MemoryKeyValueStore::with(HISTORY_KEY, raw));
        let svc = service(store.clone()).await;
        assert_eq!(svc.history().len(), 1);
        assert_eq!(svc.history()[0].kind, ShapeKind::Ellipse);

        store.fail_writes.store(true, Ordering::SeqCst);
        svc.activate(ShapeKind::Rect, None);
        let outcome = svc.confirm().await.unwrap();
        assert!(outcome.history_recorded);
        // In-memory history stays authoritative even though the write failed.
        assert_eq!(svc.history().len(), 2);
        assert_eq!(store.raw(HISTORY_KEY).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_pointer_gestures_through_service() {
        let svc = service(Arc::new(MemoryKeyValueStore::default())).await;
        svc.activate(ShapeKind::Rect, None);

        let (handle, snap) = svc.pointer_down(ScreenPoint::new(400.0, 300.0));
        assert_eq!(handle, Some(Handle::Body));
        assert_eq!(snap.mode, EditorMode::DraggingMove);

        let snap = svc.pointer_move(ScreenPoint::new(450.0, 320.0));
        assert_eq!(snap.state.unwrap().center, ScreenPoint::new(450.0, 320.0));
        assert_eq!(svc.pointer_up().mode, EditorMode::Idle);
    }

    #[tokio::test]
    async fn test_overlapping_confirms_persist_latest_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileKeyValueStore::new(dir.path()));
        let svc = ShapeEditingService::load(viewport(), store.clone()).await;

        let sessions = [ShapeKind::Rect, ShapeKind::Ellipse, ShapeKind::Rect].map(|kind| {
            let svc = &svc;
            async move {
                svc.activate(kind, None);
                svc.confirm().await.unwrap()
            }
        });
        let outcomes = futures::future::join_all(sessions).await;
        assert!(outcomes.iter().all(|o| o.history_recorded));
        assert_eq!(svc.history().len(), 3);

        let reloaded = ShapeEditingService::load(viewport(), store).await;
        assert_eq!(reloaded.history(), svc.history());
    }
}
