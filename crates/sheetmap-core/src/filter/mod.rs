// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Radius-based spatial visibility filter.
//!
//! The [`FilterEngine`] is the single source of truth for which point records
//! are visible. It owns the [`FilterState`] (mode, center, radius, enabled) and
//! the overlays that visualise it. Visibility is a pure function of the state
//! and the current records, see [`compute_visibility`]; [`FilterEngine::recompute`]
//! writes the result back to the records and pushes it to a rendering
//! [`VisibilityBackend`].
//!
//! Enabling the filter and having a center are independent: an enabled filter
//! without a center shows everything until a center is applied.

use std::fmt;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dataset::{PointDataset, PointRecord};
use crate::geo::GeoPoint;

/// Default filter radius in meters.
pub const DEFAULT_RADIUS_METERS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("filter radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),
}

/// Where the filter center comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    /// Follow the user's geolocation fix.
    #[default]
    UserLocation,
    /// Use the last point clicked on the map.
    ClickPoint,
}

impl FilterMode {
    pub const ALL: [FilterMode; 2] = [FilterMode::UserLocation, FilterMode::ClickPoint];

    /// Human readable label for selectors.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FilterMode::UserLocation => "📍 My location",
            FilterMode::ClickPoint => "🖱 Map click",
        }
    }
}

/// Filter parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub mode: FilterMode,
    pub center: Option<GeoPoint>,
    pub radius_meters: f64,
    pub enabled: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            mode: FilterMode::default(),
            center: None,
            radius_meters: DEFAULT_RADIUS_METERS,
            enabled: true,
        }
    }
}

impl FilterState {
    /// The center against which distances are measured, if the filter is
    /// currently in effect.
    #[must_use]
    pub fn active_center(&self) -> Option<GeoPoint> {
        if self.enabled {
            self.center
        } else {
            None
        }
    }
}

/// Drawable overlays describing the current filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOverlay {
    /// Circle of the filter radius around the center.
    pub circle: Option<(GeoPoint, f64)>,
    /// Explicit center marker (click-derived centers only by default).
    pub center_marker: Option<GeoPoint>,
}

impl FilterOverlay {
    pub fn clear(&mut self) {
        self.circle = None;
        self.center_marker = None;
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.circle.is_none() && self.center_marker.is_none()
    }
}

/// Aggregate result of a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityCounts {
    pub visible: usize,
    pub total: usize,
}

impl fmt::Display for VisibilityCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.visible, self.total)
    }
}

/// Rendering capability used to realise visibility.
///
/// A shown record is drawn at full opacity and accepts clicks; a hidden record
/// stays known to the renderer but is transparent and must not be clickable.
pub trait VisibilityBackend {
    fn show(&mut self, record: &PointRecord);
    fn hide(&mut self, record: &PointRecord);
}

/// Backend for callers that only read `PointRecord::visible`.
impl VisibilityBackend for () {
    fn show(&mut self, _record: &PointRecord) {}
    fn hide(&mut self, _record: &PointRecord) {}
}

/// Compute per-record visibility for `state`.
///
/// Distance is the great-circle distance in meters; the boundary is inclusive.
#[must_use]
pub fn compute_visibility(state: &FilterState, records: &[PointRecord]) -> Vec<bool> {
    match state.active_center() {
        None => vec![true; records.len()],
        Some(center) => records
            .iter()
            .map(|r| center.distance_meters(&r.position) <= state.radius_meters)
            .collect(),
    }
}

/// Owner of the filter state and its overlays.
#[derive(Debug, Default)]
pub struct FilterEngine {
    state: FilterState,
    overlay: FilterOverlay,
    last_counts: Option<VisibilityCounts>,
}

impl FilterEngine {
    #[must_use]
    pub fn new(state: FilterState) -> Self {
        Self {
            state,
            overlay: FilterOverlay::default(),
            last_counts: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &FilterState {
        &self.state
    }

    #[must_use]
    pub fn overlay(&self) -> &FilterOverlay {
        &self.overlay
    }

    /// Counts emitted by the most recent recompute, if any.
    #[must_use]
    pub fn last_counts(&self) -> Option<VisibilityCounts> {
        self.last_counts
    }

    /// Apply visibility to every record of `dataset` and report the counts.
    pub fn recompute(
        &mut self,
        dataset: &mut PointDataset,
        backend: &mut dyn VisibilityBackend,
    ) -> VisibilityCounts {
        let visibility = compute_visibility(&self.state, dataset.records());

        let mut visible = 0;
        for (record, is_visible) in dataset.records_mut().iter_mut().zip(visibility) {
            record.visible = is_visible;
            if is_visible {
                visible += 1;
                backend.show(record);
            } else {
                backend.hide(record);
            }
        }

        let counts = VisibilityCounts {
            visible,
            total: dataset.len(),
        };
        debug!("Spatial filter recomputed: {} visible", counts);
        self.last_counts = Some(counts);
        counts
    }

    /// Replace the filter center and redraw its overlays.
    ///
    /// `place_marker` defaults to true in click mode and false in user-location
    /// mode, where the user position marker already marks the spot.
    pub fn set_center(&mut self, point: GeoPoint, place_marker: Option<bool>) {
        let place_marker = place_marker.unwrap_or(self.state.mode == FilterMode::ClickPoint);

        self.state.center = Some(point);
        self.overlay.clear();
        self.overlay.circle = Some((point, self.state.radius_meters));
        if place_marker {
            self.overlay.center_marker = Some(point);
        }

        info!(
            "Filter center set to {:.5}, {:.5} (radius {} m)",
            point.latitude, point.longitude, self.state.radius_meters
        );
    }

    /// Store a new radius. Does not recompute and does not redraw the circle;
    /// the new radius takes effect on the next apply.
    pub fn set_radius(&mut self, meters: f64) -> Result<(), FilterError> {
        if !meters.is_finite() || meters <= 0.0 {
            return Err(FilterError::InvalidRadius(meters));
        }
        self.state.radius_meters = meters;
        Ok(())
    }

    /// Enable or disable the filter.
    ///
    /// Disabling clears the center and overlays and shows every record.
    /// Enabling does nothing else: a center must be applied again.
    /// Returns the counts when records were touched.
    pub fn set_enabled(
        &mut self,
        enabled: bool,
        dataset: &mut PointDataset,
        backend: &mut dyn VisibilityBackend,
    ) -> Option<VisibilityCounts> {
        let was_enabled = self.state.enabled;
        self.state.enabled = enabled;

        if was_enabled && !enabled {
            info!("Spatial filter disabled");
            self.state.center = None;
            self.overlay.clear();
            return Some(self.recompute(dataset, backend));
        }
        if !was_enabled && enabled {
            info!("Spatial filter enabled; waiting for a center");
        }
        None
    }

    /// Store the filter mode. Center handling for the new mode is driven by
    /// the session, which knows about geolocation.
    pub fn set_mode(&mut self, mode: FilterMode) {
        if self.state.mode != mode {
            info!("Spatial filter mode: {:?}", mode);
        }
        self.state.mode = mode;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::feed::PointRow;

    /// Records every show/hide call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingBackend {
        pub shown: Vec<usize>,
        pub hidden: Vec<usize>,
    }

    impl VisibilityBackend for RecordingBackend {
        fn show(&mut self, record: &PointRecord) {
            self.shown.push(record.id);
        }

        fn hide(&mut self, record: &PointRecord) {
            self.hidden.push(record.id);
        }
    }

    pub(crate) fn dataset_at(points: &[GeoPoint]) -> PointDataset {
        let rows: Vec<PointRow> = points
            .iter()
            .enumerate()
            .map(|(i, p)| PointRow {
                lat: Some(p.latitude.to_string()),
                lon: Some(p.longitude.to_string()),
                name: format!("point-{i}"),
                description: String::new(),
                color: None,
            })
            .collect();
        let mut dataset = PointDataset::new();
        dataset.load(&rows);
        dataset
    }

    pub(crate) fn center() -> GeoPoint {
        GeoPoint::new(51.5, -0.1)
    }

    /// A point due north of `center()` whose computed distance does not exceed `meters`.
    pub(crate) fn point_at(meters: f64) -> GeoPoint {
        let mut point = center().offset_north(meters);
        while center().distance_meters(&point) > meters {
            point.latitude -= 1e-12;
        }
        point
    }

    fn ring_dataset(distances: &[f64]) -> PointDataset {
        let points: Vec<_> = distances.iter().map(|d| point_at(*d)).collect();
        dataset_at(&points)
    }

    fn visibility(dataset: &PointDataset) -> Vec<bool> {
        dataset.records().iter().map(|r| r.visible).collect()
    }

    #[test]
    fn test_distance_scenario_counts_four_of_five() {
        let mut dataset = ring_dataset(&[50.0, 200.0, 999.0, 1000.0, 1001.0]);
        let mut engine = FilterEngine::default();
        let mut backend = RecordingBackend::default();

        engine.set_center(center(), None);
        let counts = engine.recompute(&mut dataset, &mut backend);

        assert_eq!(visibility(&dataset), [true, true, true, true, false]);
        assert_eq!(counts, VisibilityCounts { visible: 4, total: 5 });
        assert_eq!(counts.to_string(), "4 / 5");
        assert_eq!(backend.shown, [0, 1, 2, 3]);
        assert_eq!(backend.hidden, [4]);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let records = ring_dataset(&[500.0]);
        let distance = center().distance_meters(&records.records()[0].position);

        let mut state = FilterState {
            center: Some(center()),
            radius_meters: distance,
            ..Default::default()
        };
        assert_eq!(compute_visibility(&state, records.records()), [true]);

        state.radius_meters = distance - 1e-6;
        assert_eq!(compute_visibility(&state, records.records()), [false]);
    }

    #[test]
    fn test_enabled_without_center_shows_everything() {
        let mut dataset = ring_dataset(&[10.0, 10_000.0]);
        let mut engine = FilterEngine::default();
        assert!(engine.state().enabled);
        assert!(engine.state().center.is_none());

        let counts = engine.recompute(&mut dataset, &mut ());
        assert_eq!(counts, VisibilityCounts { visible: 2, total: 2 });
    }

    #[test]
    fn test_disable_shows_everything_and_clears_center() {
        let mut dataset = ring_dataset(&[10.0, 5000.0, 9000.0]);
        let mut engine = FilterEngine::default();
        engine.set_center(center(), Some(true));
        engine.recompute(&mut dataset, &mut ());
        assert_eq!(dataset.visible_count(), 1);

        let counts = engine.set_enabled(false, &mut dataset, &mut ());
        assert_eq!(counts, Some(VisibilityCounts { visible: 3, total: 3 }));
        assert!(engine.state().center.is_none());
        assert!(engine.overlay().is_empty());
    }

    #[test]
    fn test_reenable_does_not_recompute() {
        let mut dataset = ring_dataset(&[10.0, 5000.0]);
        let mut engine = FilterEngine::default();
        engine.set_center(center(), None);
        engine.recompute(&mut dataset, &mut ());

        engine.set_enabled(false, &mut dataset, &mut ());
        let mut backend = RecordingBackend::default();
        assert!(engine.set_enabled(true, &mut dataset, &mut backend).is_none());
        assert!(backend.shown.is_empty() && backend.hidden.is_empty());
        assert!(visibility(&dataset).iter().all(|v| *v));

        // Even an explicit recompute keeps everything visible: there is no center.
        let counts = engine.recompute(&mut dataset, &mut ());
        assert_eq!(counts.visible, 2);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut dataset = ring_dataset(&[100.0, 2000.0, 800.0]);
        let mut engine = FilterEngine::default();
        engine.set_center(center(), None);

        let first = engine.recompute(&mut dataset, &mut ());
        let first_visibility = visibility(&dataset);
        let second = engine.recompute(&mut dataset, &mut ());
        assert_eq!(first, second);
        assert_eq!(first_visibility, visibility(&dataset));
    }

    #[test]
    fn test_set_radius_does_not_recompute() {
        let mut dataset = ring_dataset(&[100.0, 2000.0]);
        let mut engine = FilterEngine::default();
        engine.set_center(center(), None);
        engine.recompute(&mut dataset, &mut ());
        assert_eq!(dataset.visible_count(), 1);

        engine.set_radius(5000.0).unwrap();
        assert_eq!(dataset.visible_count(), 1);
        assert_eq!(engine.last_counts(), Some(VisibilityCounts { visible: 1, total: 2 }));

        engine.recompute(&mut dataset, &mut ());
        assert_eq!(dataset.visible_count(), 2);
    }

    #[test]
    fn test_set_radius_rejects_non_positive() {
        let mut engine = FilterEngine::default();
        assert!(matches!(engine.set_radius(0.0), Err(FilterError::InvalidRadius(_))));
        assert!(engine.set_radius(f64::NAN).is_err());
        assert!((engine.state().radius_meters - DEFAULT_RADIUS_METERS).abs() < f64::EPSILON);
    }

    #[test]
    fn test_center_marker_defaults_follow_mode() {
        let mut engine = FilterEngine::default();
        engine.set_center(center(), None);
        assert!(engine.overlay().center_marker.is_none());
        assert_eq!(engine.overlay().circle, Some((center(), DEFAULT_RADIUS_METERS)));

        engine.set_mode(FilterMode::ClickPoint);
        let clicked = GeoPoint::new(51.51, -0.11);
        engine.set_center(clicked, None);
        assert_eq!(engine.overlay().center_marker, Some(clicked));
        assert_eq!(engine.overlay().circle.map(|(c, _)| c), Some(clicked));

        // A new center replaces the previous overlays entirely.
        engine.set_center(center(), Some(false));
        assert!(engine.overlay().center_marker.is_none());
    }
}
