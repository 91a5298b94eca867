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

//! Event dispatch for a map session.
//!
//! A [`Session`] owns the point dataset, geometry layer, geolocation tracker and
//! filter engine. The host delivers [`SessionEvent`]s one at a time from its
//! event loop; each call to [`Session::handle`] runs to completion and returns
//! an [`Outcome`] with user-facing notices, effects the host must perform
//! (location requests, map recentring) and the latest visibility counts.

use std::fmt;

use log::{info, warn};
use thiserror::Error;

use crate::dataset::PointDataset;
use crate::feed::{GeometryRow, PointRow};
use crate::filter::{FilterEngine, FilterMode, FilterState, VisibilityBackend, VisibilityCounts};
use crate::geo::GeoPoint;
use crate::geolocation::{
    FixOptions, FixRequest, GeolocationFix, GeolocationTracker, LocationError, RequestId,
    RequestOutcome,
};
use crate::geometry::GeometryLayer;
use crate::panel::ControlIntent;

/// Apply pressed without a usable center. No state is changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserInputError {
    #[error("Your location has not been determined yet.")]
    NoLocationFix,

    #[error("Click the map to set the filter center.")]
    NoClickCenter,
}

/// Which feed an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Points,
    Geometry,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Points => write!(f, "points"),
            FeedKind::Geometry => write!(f, "geometry"),
        }
    }
}

/// Events delivered by the host.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// `fix-acquired`
    FixAcquired { request: RequestId, fix: GeolocationFix },
    /// `fix-failed`
    FixFailed { request: RequestId, error: LocationError },
    /// `map-clicked`: a click on empty map space.
    MapClicked(GeoPoint),
    /// `dataset-loaded`
    DatasetLoaded(Vec<PointRow>),
    /// The geometry feed finished loading.
    GeometryLoaded(Vec<GeometryRow>),
    /// A feed could not be fetched or parsed; the previous data is kept.
    FeedFailed { feed: FeedKind, error: String },
    /// `control-changed`
    ControlChanged(ControlIntent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }
}

impl From<UserInputError> for Notice {
    fn from(error: UserInputError) -> Self {
        Notice::warning(error.to_string())
    }
}

/// Work the host must carry out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Query the platform for a location and report back with the request id.
    RequestFix(FixRequest),
    /// Move the map view so the fix accuracy is in frame, zooming in no
    /// further than `max_zoom`.
    CenterMap {
        position: GeoPoint,
        accuracy_meters: f64,
        max_zoom: u8,
    },
}

/// Result of handling one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub notices: Vec<Notice>,
    pub effects: Vec<Effect>,
    /// Set when the event triggered a recompute.
    pub counts: Option<VisibilityCounts>,
}

/// The single event-processing context of the map.
#[derive(Debug, Default)]
pub struct Session {
    filter: FilterEngine,
    dataset: PointDataset,
    geometry: GeometryLayer,
    tracker: GeolocationTracker,
    fix_options: FixOptions,
    /// Last map click taken as a center; cleared when the filter is disabled.
    click_center: Option<GeoPoint>,
}

impl Session {
    #[must_use]
    pub fn new(filter: FilterState, fix_options: FixOptions) -> Self {
        Self {
            filter: FilterEngine::new(filter),
            fix_options,
            ..Default::default()
        }
    }

    /// Issue the initial location request.
    pub fn start(&mut self, backend: &mut dyn VisibilityBackend) -> Outcome {
        let mut out = Outcome::default();
        self.request_location(backend, &mut out);
        out
    }

    #[must_use]
    pub fn filter(&self) -> &FilterEngine {
        &self.filter
    }

    #[must_use]
    pub fn dataset(&self) -> &PointDataset {
        &self.dataset
    }

    #[must_use]
    pub fn geometry(&self) -> &GeometryLayer {
        &self.geometry
    }

    pub fn geometry_mut(&mut self) -> &mut GeometryLayer {
        &mut self.geometry
    }

    #[must_use]
    pub fn tracker(&self) -> &GeolocationTracker {
        &self.tracker
    }

    /// Process one event to completion.
    pub fn handle(&mut self, event: SessionEvent, backend: &mut dyn VisibilityBackend) -> Outcome {
        let mut out = Outcome::default();

        match event {
            SessionEvent::FixAcquired { request, fix } => {
                if let Some(options) = self.tracker.accept_fix(request, fix) {
                    self.on_fix(fix, options, backend, &mut out);
                }
            }
            SessionEvent::FixFailed { request, error } => {
                if self.tracker.accept_failure(request, &error) {
                    out.notices.push(Notice::warning(format!(
                        "Could not determine your location ({error}). Check the location permissions."
                    )));
                }
            }
            SessionEvent::MapClicked(point) => {
                let state = self.filter.state();
                if state.mode == FilterMode::ClickPoint && state.enabled {
                    self.click_center = Some(point);
                    self.filter.set_center(point, Some(true));
                    out.counts = Some(self.recompute(backend));
                }
            }
            SessionEvent::DatasetLoaded(rows) => {
                self.dataset.load(&rows);
                out.counts = Some(self.recompute(backend));
            }
            SessionEvent::GeometryLoaded(rows) => {
                self.geometry.load(&rows);
            }
            SessionEvent::FeedFailed { feed, error } => {
                warn!("Failed to load {} feed: {}", feed, error);
                out.notices.push(Notice::warning(format!(
                    "Could not load the {feed} feed; showing the previous data."
                )));
            }
            SessionEvent::ControlChanged(intent) => self.on_control(intent, backend, &mut out),
        }

        out
    }

    /// Re-apply the current center, as the Apply button does.
    pub fn apply(
        &mut self,
        backend: &mut dyn VisibilityBackend,
    ) -> Result<Option<VisibilityCounts>, UserInputError> {
        let state = self.filter.state();
        if !state.enabled {
            return Ok(None);
        }

        let center = match state.mode {
            FilterMode::UserLocation => self
                .tracker
                .last_position()
                .ok_or(UserInputError::NoLocationFix)?,
            FilterMode::ClickPoint => self.click_center.ok_or(UserInputError::NoClickCenter)?,
        };

        // Redraws the circle at the current radius.
        self.filter.set_center(center, None);
        Ok(Some(self.recompute(backend)))
    }

    fn on_control(
        &mut self,
        intent: ControlIntent,
        backend: &mut dyn VisibilityBackend,
        out: &mut Outcome,
    ) {
        match intent {
            ControlIntent::SetEnabled(enabled) => {
                if !enabled {
                    self.click_center = None;
                }
                out.counts = self.filter.set_enabled(enabled, &mut self.dataset, backend);
            }
            ControlIntent::SetMode(mode) => {
                self.filter.set_mode(mode);
                if !self.filter.state().enabled {
                    return;
                }
                match mode {
                    FilterMode::UserLocation => match self.tracker.last_position() {
                        Some(position) => {
                            self.filter.set_center(position, None);
                            out.counts = Some(self.recompute(backend));
                        }
                        None => self.request_location(backend, out),
                    },
                    FilterMode::ClickPoint => {
                        out.notices.push(Notice::info(UserInputError::NoClickCenter.to_string()));
                    }
                }
            }
            ControlIntent::SetRadius(meters) => {
                if let Err(e) = self.filter.set_radius(meters) {
                    warn!("{}", e);
                    out.notices.push(Notice::warning(e.to_string()));
                }
            }
            ControlIntent::Apply => match self.apply(backend) {
                Ok(counts) => out.counts = counts,
                Err(e) => {
                    info!("Apply rejected: {}", e);
                    out.notices.push(e.into());
                }
            },
            ControlIntent::Relocate => self.request_location(backend, out),
        }
    }

    fn request_location(&mut self, backend: &mut dyn VisibilityBackend, out: &mut Outcome) {
        match self.tracker.request_fix(self.fix_options) {
            RequestOutcome::Pending(request) => out.effects.push(Effect::RequestFix(request)),
            RequestOutcome::Cached(fix, options) => self.on_fix(fix, options, backend, out),
        }
    }

    fn on_fix(
        &mut self,
        fix: GeolocationFix,
        options: FixOptions,
        backend: &mut dyn VisibilityBackend,
        out: &mut Outcome,
    ) {
        if options.set_view {
            out.effects.push(Effect::CenterMap {
                position: fix.position,
                accuracy_meters: fix.accuracy_meters,
                max_zoom: options.max_zoom,
            });
        }

        let state = self.filter.state();
        if state.mode == FilterMode::UserLocation && state.enabled {
            self.filter.set_center(fix.position, None);
            out.counts = Some(self.recompute(backend));
        }
    }

    fn recompute(&mut self, backend: &mut dyn VisibilityBackend) -> VisibilityCounts {
        self.filter.recompute(&mut self.dataset, backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{center, point_at, RecordingBackend};

    fn point_rows(points: &[GeoPoint]) -> Vec<PointRow> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| PointRow {
                lat: Some(p.latitude.to_string()),
                lon: Some(p.longitude.to_string()),
                name: format!("point-{i}"),
                description: String::new(),
                color: None,
            })
            .collect()
    }

    fn loaded_session(distances: &[f64]) -> Session {
        let points: Vec<_> = distances.iter().map(|d| point_at(*d)).collect();
        let mut session = Session::default();
        session.handle(SessionEvent::DatasetLoaded(point_rows(&points)), &mut ());
        session
    }

    fn pending_request(out: &Outcome) -> RequestId {
        out.effects
            .iter()
            .find_map(|e| match e {
                Effect::RequestFix(request) => Some(request.id),
                Effect::CenterMap { .. } => None,
            })
            .expect("a location request")
    }

    fn control(session: &mut Session, intent: ControlIntent) -> Outcome {
        session.handle(SessionEvent::ControlChanged(intent), &mut ())
    }

    fn acquire_fix(session: &mut Session, position: GeoPoint) -> Outcome {
        let out = session.start(&mut ());
        let request = pending_request(&out);
        session.handle(
            SessionEvent::FixAcquired {
                request,
                fix: GeolocationFix::now(position, 15.0),
            },
            &mut (),
        )
    }

    #[test]
    fn test_start_requests_location() {
        let mut session = Session::default();
        let out = session.start(&mut ());
        assert!(matches!(out.effects.as_slice(), [Effect::RequestFix(_)]));
        assert!(session.tracker().in_flight().is_some());
    }

    #[test]
    fn test_fix_in_user_mode_centers_and_recomputes() {
        let mut session = loaded_session(&[50.0, 200.0, 999.0, 1000.0, 1001.0]);
        let out = acquire_fix(&mut session, center());

        assert_eq!(out.counts, Some(VisibilityCounts { visible: 4, total: 5 }));
        assert_eq!(session.filter().state().center, Some(center()));
        assert!(session.filter().overlay().center_marker.is_none());
        assert!(out.effects.contains(&Effect::CenterMap {
            position: center(),
            accuracy_meters: 15.0,
            max_zoom: 16,
        }));
        assert!(session.tracker().user_visual().is_some());
    }

    #[test]
    fn test_fix_does_not_move_click_center() {
        let mut session = loaded_session(&[50.0, 5000.0]);
        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        let clicked = point_at(4990.0);
        session.handle(SessionEvent::MapClicked(clicked), &mut ());

        let out = acquire_fix(&mut session, center());
        assert!(out.counts.is_none());
        assert_eq!(session.filter().state().center, Some(clicked));
    }

    #[test]
    fn test_fix_failure_is_reported_without_state_change() {
        let mut session = loaded_session(&[50.0, 5000.0]);
        acquire_fix(&mut session, center());
        let before = session.filter().state().clone();
        let visible_before = session.dataset().visible_count();

        let out = control(&mut session, ControlIntent::Relocate);
        let request = pending_request(&out);
        let out = session.handle(
            SessionEvent::FixFailed {
                request,
                error: LocationError::PermissionDenied,
            },
            &mut (),
        );

        assert_eq!(out.notices.len(), 1);
        assert_eq!(out.notices[0].level, NoticeLevel::Warning);
        assert_eq!(session.filter().state(), &before);
        assert_eq!(session.dataset().visible_count(), visible_before);
    }

    #[test]
    fn test_mode_switch_matches_explicit_apply() {
        let london = GeoPoint::new(51.5, -0.1);
        let distances = [100.0, 900.0, 1500.0, 3000.0];

        // Explicit apply with the fix as center.
        let mut applied = loaded_session(&distances);
        acquire_fix(&mut applied, london);
        let via_apply = control(&mut applied, ControlIntent::Apply).counts;

        // Cached fix, then switching back into user-location mode.
        let mut switched = loaded_session(&distances);
        control(&mut switched, ControlIntent::SetMode(FilterMode::ClickPoint));
        acquire_fix(&mut switched, london);
        assert!(switched.filter().state().center.is_none());
        let via_mode = control(&mut switched, ControlIntent::SetMode(FilterMode::UserLocation));

        assert_eq!(via_mode.counts, via_apply);
        assert_eq!(via_mode.counts, Some(VisibilityCounts { visible: 2, total: 4 }));
        assert!(via_mode.effects.is_empty());
    }

    #[test]
    fn test_mode_switch_without_fix_requests_location() {
        let mut session = loaded_session(&[10.0]);
        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        let out = control(&mut session, ControlIntent::SetMode(FilterMode::UserLocation));
        assert!(matches!(out.effects.as_slice(), [Effect::RequestFix(_)]));
        assert!(out.counts.is_none());
    }

    #[test]
    fn test_switch_to_click_mode_prompts_for_click() {
        let mut session = loaded_session(&[10.0]);
        let out = control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        assert_eq!(out.notices, [Notice::info("Click the map to set the filter center.")]);
        assert!(session.filter().state().center.is_none());
    }

    #[test]
    fn test_apply_in_click_mode_without_click_is_rejected() {
        let mut session = loaded_session(&[10.0, 20.0]);
        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        let before = session.filter().state().clone();

        let out = control(&mut session, ControlIntent::Apply);
        assert_eq!(out.notices, [Notice::from(UserInputError::NoClickCenter)]);
        assert!(out.counts.is_none());
        assert_eq!(session.filter().state(), &before);
        assert!(session.filter().overlay().is_empty());
    }

    #[test]
    fn test_apply_in_click_mode_ignores_location_center() {
        let mut session = loaded_session(&[10.0, 5000.0]);
        acquire_fix(&mut session, center());
        assert_eq!(session.filter().state().center, Some(center()));

        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        let before = session.filter().state().clone();
        let overlay_before = session.filter().overlay().clone();

        let out = control(&mut session, ControlIntent::Apply);
        assert_eq!(out.notices, [Notice::from(UserInputError::NoClickCenter)]);
        assert!(out.counts.is_none());
        assert_eq!(session.filter().state(), &before);
        assert_eq!(session.filter().overlay(), &overlay_before);
        assert!(session.filter().overlay().center_marker.is_none());
    }

    #[test]
    fn test_apply_in_click_mode_reuses_last_click() {
        let mut session = loaded_session(&[10.0, 5000.0]);
        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        session.handle(SessionEvent::MapClicked(center()), &mut ());
        control(&mut session, ControlIntent::SetRadius(10_000.0));

        let out = control(&mut session, ControlIntent::Apply);
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 2, total: 2 }));
        assert_eq!(session.filter().overlay().circle, Some((center(), 10_000.0)));
    }

    #[test]
    fn test_apply_in_user_mode_without_fix_is_rejected() {
        let mut session = loaded_session(&[10.0]);
        let out = control(&mut session, ControlIntent::Apply);
        assert_eq!(out.notices, [Notice::from(UserInputError::NoLocationFix)]);
        assert!(session.filter().state().center.is_none());
    }

    #[test]
    fn test_map_click_sets_center_with_marker() {
        let mut session = loaded_session(&[50.0, 200.0, 999.0, 1000.0, 1001.0]);
        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));

        let mut backend = RecordingBackend::default();
        let out = session.handle(SessionEvent::MapClicked(center()), &mut backend);

        assert_eq!(out.counts, Some(VisibilityCounts { visible: 4, total: 5 }));
        assert_eq!(session.filter().overlay().center_marker, Some(center()));
        assert_eq!(backend.hidden, [4]);
    }

    #[test]
    fn test_map_click_ignored_in_user_mode_or_when_disabled() {
        let mut session = loaded_session(&[50.0, 5000.0]);
        let out = session.handle(SessionEvent::MapClicked(center()), &mut ());
        assert!(out.counts.is_none());
        assert!(session.filter().state().center.is_none());

        control(&mut session, ControlIntent::SetMode(FilterMode::ClickPoint));
        control(&mut session, ControlIntent::SetEnabled(false));
        session.handle(SessionEvent::MapClicked(center()), &mut ());
        assert!(session.filter().state().center.is_none());
    }

    #[test]
    fn test_disable_then_enable_leaves_everything_visible() {
        let mut session = loaded_session(&[50.0, 5000.0, 9000.0]);
        acquire_fix(&mut session, center());
        assert_eq!(session.dataset().visible_count(), 1);

        let out = control(&mut session, ControlIntent::SetEnabled(false));
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 3, total: 3 }));

        let out = control(&mut session, ControlIntent::SetEnabled(true));
        assert!(out.counts.is_none());
        assert_eq!(session.dataset().visible_count(), 3);
        assert!(session.filter().state().center.is_none());

        // A reload recomputes against the (absent) center.
        let out = session.handle(
            SessionEvent::DatasetLoaded(point_rows(&[point_at(50.0), point_at(9000.0)])),
            &mut (),
        );
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 2, total: 2 }));
    }

    #[test]
    fn test_reload_recomputes_against_existing_center() {
        let mut session = loaded_session(&[50.0]);
        acquire_fix(&mut session, center());

        let rows = point_rows(&[point_at(10.0), point_at(2000.0), point_at(20.0)]);
        let out = session.handle(SessionEvent::DatasetLoaded(rows), &mut ());
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 2, total: 3 }));
    }

    #[test]
    fn test_radius_change_waits_for_apply() {
        let mut session = loaded_session(&[500.0, 1500.0]);
        acquire_fix(&mut session, center());
        assert_eq!(session.dataset().visible_count(), 1);

        let out = control(&mut session, ControlIntent::SetRadius(2000.0));
        assert!(out.counts.is_none());
        assert_eq!(session.dataset().visible_count(), 1);

        let out = control(&mut session, ControlIntent::Apply);
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 2, total: 2 }));
        assert_eq!(session.filter().overlay().circle, Some((center(), 2000.0)));
    }

    #[test]
    fn test_invalid_radius_is_reported() {
        let mut session = Session::default();
        let out = control(&mut session, ControlIntent::SetRadius(-5.0));
        assert_eq!(out.notices.len(), 1);
        assert!((session.filter().state().radius_meters - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feed_failure_keeps_previous_dataset() {
        let mut session = loaded_session(&[10.0, 20.0]);
        let out = session.handle(
            SessionEvent::FeedFailed {
                feed: FeedKind::Points,
                error: "HTTP 500".to_string(),
            },
            &mut (),
        );
        assert_eq!(out.notices.len(), 1);
        assert_eq!(session.dataset().len(), 2);
    }

    #[test]
    fn test_geometry_is_never_filtered() {
        let mut session = loaded_session(&[10.0]);
        acquire_fix(&mut session, center());
        session.handle(
            SessionEvent::GeometryLoaded(vec![GeometryRow {
                include: "y".to_string(),
                name: "Far away".to_string(),
                description: String::new(),
                geometry: "[10.0, 10.0]".to_string(),
            }]),
            &mut (),
        );
        assert_eq!(session.geometry().len(), 1);
    }

    #[test]
    fn test_cached_fix_is_applied_immediately() {
        let options = FixOptions {
            max_cache_age_ms: 60_000,
            ..Default::default()
        };
        let mut session = Session::new(FilterState::default(), options);
        let points: Vec<_> = [10.0, 3000.0].iter().map(|d| point_at(*d)).collect();
        session.handle(SessionEvent::DatasetLoaded(point_rows(&points)), &mut ());

        let request = pending_request(&session.start(&mut ()));
        session.handle(
            SessionEvent::FixAcquired {
                request,
                fix: GeolocationFix::now(center(), 10.0),
            },
            &mut (),
        );

        let out = control(&mut session, ControlIntent::Relocate);
        assert!(!out.effects.iter().any(|e| matches!(e, Effect::RequestFix(_))));
        assert_eq!(out.counts, Some(VisibilityCounts { visible: 1, total: 2 }));
    }
}
