// THEORY:
// The registry is the controller-side roster of connected screens: who they are,
// where the last scan found them, and what color they currently show. It is an
// explicit map keyed by a stable `ScreenId` with a small set of bounded
// operations (list, get, upsert, remove), nothing more.
//
// The detection pipeline never touches it. Scan results flow in through the
// `ScanSink` impl and placements flow out to the playback loop, both as plain
// values.

use crate::core_modules::geometry::{NormalizedPoint, NormalizedRect};
use crate::core_modules::pixel::pixel::Rgb;
use crate::core_modules::sampler::ScreenPlacement;
use crate::interfaces::ScanSink;
use crate::pipeline::DetectionReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of one screen device.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScreenId(pub String);

impl ScreenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the controller knows about one screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenRecord {
    pub id: ScreenId,
    pub position: Option<NormalizedPoint>,
    pub area: Option<NormalizedRect>,
    pub color: Rgb,
}

impl ScreenRecord {
    pub fn new(id: ScreenId) -> Self {
        Self {
            id,
            position: None,
            area: None,
            color: Rgb::BLACK,
        }
    }

    /// Where playback should sample this screen, if it has been located.
    pub fn placement(&self) -> Option<ScreenPlacement> {
        self.position.map(|center| ScreenPlacement {
            center,
            area: self.area,
        })
    }
}

/// Registered screens, iterated in identifier order.
#[derive(Debug, Default, Clone)]
pub struct ScreenRegistry {
    screens: BTreeMap<ScreenId, ScreenRecord>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> impl Iterator<Item = &ScreenRecord> {
        self.screens.values()
    }

    pub fn ids(&self) -> Vec<ScreenId> {
        self.screens.keys().cloned().collect()
    }

    pub fn get(&self, id: &ScreenId) -> Option<&ScreenRecord> {
        self.screens.get(id)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Inserts or replaces a record, returning the previous one.
    pub fn upsert(&mut self, record: ScreenRecord) -> Option<ScreenRecord> {
        self.screens.insert(record.id.clone(), record)
    }

    /// Adds a bare record for `id` unless one already exists.
    pub fn register(&mut self, id: ScreenId) -> &mut ScreenRecord {
        self.screens
            .entry(id.clone())
            .or_insert_with(|| ScreenRecord::new(id))
    }

    pub fn remove(&mut self, id: &ScreenId) -> Option<ScreenRecord> {
        self.screens.remove(id)
    }

    pub fn set_color(&mut self, id: &ScreenId, color: Rgb) -> bool {
        match self.screens.get_mut(id) {
            Some(record) => {
                record.color = color;
                true
            }
            None => false,
        }
    }

    /// Writes a scan outcome onto a known screen. Unknown ids are ignored.
    pub fn apply(&mut self, id: &ScreenId, report: &DetectionReport) -> bool {
        let Some(record) = self.screens.get_mut(id) else {
            return false;
        };
        match report {
            DetectionReport::Detected(detection) => {
                record.position = Some(detection.center);
                record.area = Some(detection.area);
            }
            DetectionReport::NotDetected(_) => {
                record.position = None;
                record.area = None;
            }
        }
        true
    }

    /// Forgets every known position, keeping the screens themselves.
    pub fn clear_positions(&mut self) {
        for record in self.screens.values_mut() {
            record.position = None;
            record.area = None;
        }
    }

    /// Sampling placements for every located screen.
    pub fn placements(&self) -> Vec<(ScreenId, ScreenPlacement)> {
        self.screens
            .values()
            .filter_map(|r| r.placement().map(|p| (r.id.clone(), p)))
            .collect()
    }
}

impl ScanSink for ScreenRegistry {
    async fn report(&mut self, screen: &ScreenId, report: &DetectionReport) {
        self.apply(screen, report);
    }

    async fn clear_positions(&mut self) {
        ScreenRegistry::clear_positions(self);
    }
}
