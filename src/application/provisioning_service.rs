// Provisioning service - Sequential, paced tile acquisition for a region
use crate::application::tile_repository::{FetchError, TileSource, TileStore, mirror_for};
use crate::domain::geo::GeoBoundingBox;
use crate::domain::tiles::{DownloadTally, MAX_ZOOM, ProvisioningPlan, TileKey, ZoomPlan};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};

pub const DEFAULT_PACING: Duration = Duration::from_millis(50);
pub const DEFAULT_PROGRESS_EVERY: u64 = 100;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProvisionError {
    #[error("a provisioning run is already in progress")]
    Busy,
    #[error("invalid zoom range {min}..={max} (max allowed {MAX_ZOOM})")]
    ZoomRange { min: u8, max: u8 },
}

/// Region and zoom range for a run. Missing fields fall back to the service defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisionRequest {
    pub bounds: Option<GeoBoundingBox>,
    pub min_zoom: Option<u8>,
    pub max_zoom: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct ProvisionDefaults {
    pub bounds: GeoBoundingBox,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub pacing: Duration,
    pub progress_every: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProvisionEvent {
    Planned {
        zooms: Vec<ZoomPlan>,
        total_tiles: u64,
        estimated_mib: u64,
    },
    ZoomStarted {
        zoom: u8,
        tiles: u64,
    },
    Progress {
        downloaded: u64,
        failed: u64,
        total: u64,
    },
    Finished {
        downloaded: u64,
        failed: u64,
        total: u64,
        started_at: String,
        elapsed_ms: u64,
    },
}

/// State owned by a single run: counters and the mirror rotation position.
struct ProvisioningRun {
    tally: DownloadTally,
    fetches: usize,
    total: u64,
    events: Option<mpsc::Sender<ProvisionEvent>>,
}

impl ProvisioningRun {
    async fn emit(&self, event: ProvisionEvent) {
        if let Some(tx) = &self.events {
            // A departed listener never stops the run.
            let _ = tx.send(event).await;
        }
    }

    fn progress(&self) -> ProvisionEvent {
        ProvisionEvent::Progress {
            downloaded: self.tally.downloaded,
            failed: self.tally.failed,
            total: self.total,
        }
    }
}

pub struct ProvisioningService {
    store: Arc<dyn TileStore>,
    source: Arc<dyn TileSource>,
    defaults: ProvisionDefaults,
    active: Arc<Mutex<()>>,
}

impl ProvisioningService {
    pub fn new(
        store: Arc<dyn TileStore>,
        source: Arc<dyn TileSource>,
        defaults: ProvisionDefaults,
    ) -> Self {
        Self {
            store,
            source,
            defaults,
            active: Arc::new(Mutex::new(())),
        }
    }

    pub fn plan(&self, request: &ProvisionRequest) -> Result<ProvisioningPlan, ProvisionError> {
        let min = request.min_zoom.unwrap_or(self.defaults.min_zoom);
        let max = request.max_zoom.unwrap_or(self.defaults.max_zoom);
        if min > max || max > MAX_ZOOM {
            return Err(ProvisionError::ZoomRange { min, max });
        }
        let bounds = request.bounds.unwrap_or(self.defaults.bounds);
        Ok(ProvisioningPlan::new(&bounds, min, max))
    }

    /// Plan and launch a run in the background, streaming its events.
    /// Only one run may be active at a time.
    pub fn start(
        self: &Arc<Self>,
        request: &ProvisionRequest,
    ) -> Result<mpsc::Receiver<ProvisionEvent>, ProvisionError> {
        let plan = self.plan(request)?;
        let guard: OwnedMutexGuard<()> = self
            .active
            .clone()
            .try_lock_owned()
            .map_err(|_| ProvisionError::Busy)?;

        let (tx, rx) = mpsc::channel(100);
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            service.run(&plan, Some(tx)).await;
        });
        Ok(rx)
    }

    /// Walk every tile of `plan` in zoom, x, y order and make sure it is in
    /// the store. Failures are counted, never retried within the run.
    pub async fn run(
        &self,
        plan: &ProvisioningPlan,
        events: Option<mpsc::Sender<ProvisionEvent>>,
    ) -> DownloadTally {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut run = ProvisioningRun {
            tally: DownloadTally::default(),
            fetches: 0,
            total: plan.total_tiles,
            events,
        };

        tracing::info!(
            "Provisioning {} tiles over {} zoom levels (~{} MB)",
            plan.total_tiles,
            plan.zooms.len(),
            plan.estimated_size_mib()
        );
        run.emit(ProvisionEvent::Planned {
            zooms: plan.zooms.clone(),
            total_tiles: plan.total_tiles,
            estimated_mib: plan.estimated_size_mib(),
        })
        .await;

        for zoom_plan in &plan.zooms {
            tracing::info!(
                "Zoom {}: {} tiles (x:{}-{}, y:{}-{})",
                zoom_plan.zoom,
                zoom_plan.tile_count,
                zoom_plan.x_min,
                zoom_plan.x_max,
                zoom_plan.y_min,
                zoom_plan.y_max
            );
            run.emit(ProvisionEvent::ZoomStarted {
                zoom: zoom_plan.zoom,
                tiles: zoom_plan.tile_count,
            })
            .await;

            for key in zoom_plan.keys() {
                self.provision_tile(&mut run, key).await;
            }
        }

        let tally = run.tally;
        tracing::info!(
            "Provisioning done. Processed {}/{} (downloaded: {}, failed: {})",
            tally.processed(),
            run.total,
            tally.downloaded,
            tally.failed
        );
        run.emit(ProvisionEvent::Finished {
            downloaded: tally.downloaded,
            failed: tally.failed,
            total: run.total,
            started_at: started_at.to_rfc3339(),
            elapsed_ms: clock.elapsed().as_millis() as u64,
        })
        .await;

        tally
    }

    async fn provision_tile(&self, run: &mut ProvisioningRun, key: TileKey) {
        if self.store.contains(key).await {
            // Cache hits advance the progress cadence too, not only network writes.
            self.record_success(run).await;
            return;
        }

        let mirror = mirror_for(self.source.mirrors(), run.fetches);
        run.fetches += 1;

        match self.source.fetch(mirror, key).await {
            Ok(bytes) => match self.store.put(key, bytes).await {
                Ok(_) => self.record_success(run).await,
                Err(e) => {
                    tracing::warn!("Could not store tile {}: {}", key, e);
                    run.tally.failed += 1;
                }
            },
            Err(FetchError::Status(status)) => {
                tracing::debug!("Tile {} from {} answered {}", key, mirror, status);
                run.tally.failed += 1;
            }
            Err(e) => {
                tracing::debug!("Tile {} from {} failed: {}", key, mirror, e);
                run.tally.failed += 1;
            }
        }

        if !self.defaults.pacing.is_zero() {
            tokio::time::sleep(self.defaults.pacing).await;
        }
    }

    async fn record_success(&self, run: &mut ProvisioningRun) {
        run.tally.downloaded += 1;
        let every = self.defaults.progress_every.max(1);
        if run.tally.downloaded % every == 0 {
            tracing::info!(
                "Downloaded: {}/{} (failed: {})",
                run.tally.downloaded,
                run.total,
                run.tally.failed
            );
            run.emit(run.progress()).await;
        }
    }
}
