//! Per-entity tracking state
//!
//! `EntityState` is owned by exactly one entity actor. It only changes through
//! [`EntityState::record_update`] and [`EntityState::mark_updated`], both called
//! from the actor's update path.

use std::collections::VecDeque;

use serde::Serialize;

use crate::records::{CatalogNumber, EntitySummary, TelemetryRecord, TrackPoint};

/// Maximum number of track points kept per entity
pub const HISTORY_LIMIT: usize = 100;

/// Current state and bounded ground-track history of one tracked object
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    pub catalog_number: CatalogNumber,
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tle: Option<Vec<String>>,

    /// The last raw record applied to this entity
    pub full_record: Option<TelemetryRecord>,

    /// Wall-clock time of the last accepted update
    pub last_update_millis: Option<i64>,

    /// Oldest first, at most [`HISTORY_LIMIT`] entries
    pub history: VecDeque<TrackPoint>,
}

impl EntityState {
    pub fn new(catalog_number: CatalogNumber) -> Self {
        Self {
            catalog_number,
            name: None,
            latitude: None,
            longitude: None,
            tle: None,
            full_record: None,
            last_update_millis: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT + 1),
        }
    }

    /// Overwrite the current fields from `record`, append a track point taken
    /// at `now_millis` and return the summary to forward to the aggregator.
    pub fn record_update(&mut self, record: TelemetryRecord, now_millis: i64) -> EntitySummary {
        if let Some(key) = record.catalog_number.as_ref() {
            self.catalog_number.clone_from(key);
        }
        self.name.clone_from(&record.name);
        self.latitude = record.latitude;
        self.longitude = record.longitude;
        self.tle.clone_from(&record.tle);

        self.push_track_point(TrackPoint {
            timestamp_millis: now_millis,
            lat: record.latitude.unwrap_or(0.0),
            lng: record.longitude.unwrap_or(0.0),
        });

        let summary = EntitySummary::from_record(self.catalog_number.clone(), &record);
        self.full_record = Some(record);
        summary
    }

    /// Stamp the entity with the time of its last update
    pub fn mark_updated(&mut self, now_millis: i64) {
        self.last_update_millis = Some(now_millis);
    }

    fn push_track_point(&mut self, point: TrackPoint) {
        self.history.push_back(point);
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}
