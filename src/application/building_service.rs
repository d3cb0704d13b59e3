// Building service - Registry of drawn building footprints
use crate::application::key_value_store::{KeyValueStore, persist_best_effort};
use crate::domain::building::{
    Building, BuildingError, BuildingRecord, DEFAULT_DRAW_COLOR, DEFAULT_IMPORT_COLOR,
    MIN_POLYGON_POINTS,
};
use crate::domain::geo::GeoPolygon;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

pub const BUILDINGS_KEY: &str = "mmap_buildings";

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("import payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("import payload must be a JSON array of buildings")]
    NotAnArray,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    #[serde(default, alias = "desc")]
    pub description: String,
    #[serde(default)]
    pub color: Option<String>,
    pub points: GeoPolygon,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

/// Time-based ids: base-36 milliseconds plus a base-36 sequence suffix.
#[derive(Debug, Default)]
struct IdGenerator {
    seq: AtomicU32,
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

impl IdGenerator {
    fn next(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) % 1_679_616;
        format!("{}{:0>4}", to_base36(millis), to_base36(u64::from(seq)))
    }
}

pub struct BuildingService {
    buildings: RwLock<Vec<Building>>,
    store: Arc<dyn KeyValueStore>,
    ids: IdGenerator,
    /// Held from snapshot to write so the newest list always lands last.
    persist_lock: tokio::sync::Mutex<()>,
}

impl BuildingService {
    /// Load persisted buildings, dropping entries that are not valid outlines.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let buildings = match store.get(BUILDINGS_KEY).await {
            Some(raw) => match serde_json::from_str::<Vec<Building>>(&raw) {
                Ok(list) => list
                    .into_iter()
                    .filter(|b| b.points.len() >= MIN_POLYGON_POINTS)
                    .collect(),
                Err(e) => {
                    tracing::warn!("Discarding unreadable building list: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        tracing::debug!("Loaded {} buildings", buildings.len());

        Self {
            buildings: RwLock::new(buildings),
            store,
            ids: IdGenerator::default(),
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn list(&self) -> Vec<Building> {
        self.buildings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn add(&self, new: NewBuilding) -> Result<Building, BuildingError> {
        let color = new.color.as_deref().unwrap_or(DEFAULT_DRAW_COLOR);
        let building = Building::new(
            self.ids.next(),
            &new.name,
            &new.description,
            color,
            new.points,
        )?;
        {
            let mut buildings = self.buildings.write().unwrap_or_else(PoisonError::into_inner);
            buildings.push(building.clone());
        }
        self.persist().await;
        Ok(building)
    }

    /// Returns false when no building has that id.
    pub async fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut buildings = self.buildings.write().unwrap_or_else(PoisonError::into_inner);
            let before = buildings.len();
            buildings.retain(|b| b.id != id);
            buildings.len() != before
        };
        if removed {
            self.persist().await;
        }
        removed
    }

    /// Merge an exported building list. Records without a name or with fewer
    /// than three points are rejected; records matching an existing building
    /// (name, vertex count, first vertex) are skipped.
    pub async fn import(&self, json: &str) -> Result<ImportSummary, ImportError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Array(items) = value else {
            return Err(ImportError::NotAnArray);
        };

        let mut summary = ImportSummary::default();
        {
            let mut buildings = self.buildings.write().unwrap_or_else(PoisonError::into_inner);
            for item in items {
                let Ok(record) = serde_json::from_value::<BuildingRecord>(item) else {
                    summary.rejected += 1;
                    continue;
                };
                let (Some(name), Some(points)) = (record.name, record.points) else {
                    summary.rejected += 1;
                    continue;
                };
                if buildings.iter().any(|b| b.looks_like(&name, &points)) {
                    summary.duplicates += 1;
                    continue;
                }
                let color = record.color.as_deref().unwrap_or(DEFAULT_IMPORT_COLOR);
                let description = record.description.unwrap_or_default();
                match Building::new(self.ids.next(), &name, &description, color, points) {
                    Ok(building) => {
                        buildings.push(building);
                        summary.imported += 1;
                    }
                    Err(_) => summary.rejected += 1,
                }
            }
        }

        if summary.imported > 0 {
            self.persist().await;
        }
        tracing::info!(
            "Imported {} buildings ({} duplicates, {} rejected)",
            summary.imported,
            summary.duplicates,
            summary.rejected
        );
        Ok(summary)
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.list())
    }

    async fn persist(&self) {
        let _writing = self.persist_lock.lock().await;
        match serde_json::to_string(&self.list()) {
            Ok(json) => {
                persist_best_effort(self.store.as_ref(), BUILDINGS_KEY, &json).await;
            }
            Err(e) => tracing::warn!("Could not encode buildings: {}", e),
        }
    }
}
