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

//! User geolocation tracking.
//!
//! The tracker does not talk to any platform API itself. It hands out
//! [`FixRequest`]s that the host resolves asynchronously and feeds back through
//! [`GeolocationTracker::accept_fix`] or [`GeolocationTracker::accept_failure`].
//! Only the most recent request is honoured; results for superseded requests
//! are dropped.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::geo::GeoPoint;

/// Why a location could not be determined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location request timed out after {0} ms")]
    Timeout(u64),

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("geolocation is not supported on this platform")]
    Unsupported,
}

/// Options for a single location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixOptions {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    /// Accept a cached fix no older than this; 0 always queries the platform.
    pub max_cache_age_ms: u64,
    /// Center the map on the resulting fix.
    pub set_view: bool,
    /// Zoom cap used with `set_view`.
    pub max_zoom: u8,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            max_cache_age_ms: 0,
            set_view: true,
            max_zoom: 16,
        }
    }
}

/// Identifier of a location request.
pub type RequestId = u64;

/// A location query for the host platform to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixRequest {
    pub id: RequestId,
    pub options: FixOptions,
}

/// A single geolocation measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeolocationFix {
    pub position: GeoPoint,
    pub accuracy_meters: f64,
    pub timestamp: DateTime<Utc>,
}

impl GeolocationFix {
    /// A fix taken now.
    #[must_use]
    pub fn now(position: GeoPoint, accuracy_meters: f64) -> Self {
        Self {
            position,
            accuracy_meters,
            timestamp: Utc::now(),
        }
    }
}

/// The user position marker and its accuracy circle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserPositionVisual {
    pub position: GeoPoint,
    pub accuracy_meters: f64,
}

/// Result of issuing a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RequestOutcome {
    /// The host must query the platform.
    Pending(FixRequest),
    /// A cached fix satisfied the request's `max_cache_age_ms`.
    Cached(GeolocationFix, FixOptions),
}

/// Tracks location requests and the last known position.
#[derive(Debug, Default)]
pub struct GeolocationTracker {
    next_id: RequestId,
    in_flight: Option<FixRequest>,
    last_fix: Option<GeolocationFix>,
    visual: Option<UserPositionVisual>,
}

impl GeolocationTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a new location request, superseding any in-flight one.
    pub fn request_fix(&mut self, options: FixOptions) -> RequestOutcome {
        if options.max_cache_age_ms > 0 {
            if let Some(fix) = self.cached_fix(options.max_cache_age_ms) {
                debug!("Location request satisfied from cache");
                self.in_flight = None;
                return RequestOutcome::Cached(fix, options);
            }
        }

        self.next_id += 1;
        let request = FixRequest {
            id: self.next_id,
            options,
        };
        if let Some(previous) = self.in_flight.replace(request) {
            debug!("Location request {} superseded by {}", previous.id, request.id);
        }
        info!("Requesting location (request {})", request.id);
        RequestOutcome::Pending(request)
    }

    fn cached_fix(&self, max_age_ms: u64) -> Option<GeolocationFix> {
        let fix = self.last_fix?;
        let max_age = i64::try_from(max_age_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .unwrap_or(Duration::MAX);
        (Utc::now() - fix.timestamp <= max_age).then_some(fix)
    }

    /// Record a successful fix for request `id`.
    ///
    /// Returns the request's options when the fix is current, `None` when the
    /// request was superseded.
    pub fn accept_fix(&mut self, id: RequestId, fix: GeolocationFix) -> Option<FixOptions> {
        let request = self.take_current(id)?;
        self.record_fix(fix);
        Some(request.options)
    }

    /// Record a fix obtained outside the request cycle (cache hits, overrides).
    pub fn record_fix(&mut self, fix: GeolocationFix) {
        info!(
            "Location found: {:.5}, {:.5} (accuracy ~{:.0} m)",
            fix.position.latitude, fix.position.longitude, fix.accuracy_meters
        );
        self.last_fix = Some(fix);
        self.visual = Some(UserPositionVisual {
            position: fix.position,
            accuracy_meters: fix.accuracy_meters,
        });
    }

    /// Record a failure for request `id`. Returns false when the request was
    /// superseded and the failure should be ignored.
    pub fn accept_failure(&mut self, id: RequestId, error: &LocationError) -> bool {
        if self.take_current(id).is_none() {
            return false;
        }
        warn!("Location error: {}", error);
        true
    }

    fn take_current(&mut self, id: RequestId) -> Option<FixRequest> {
        match self.in_flight {
            Some(request) if request.id == id => self.in_flight.take(),
            _ => {
                debug!("Ignoring result of stale location request {}", id);
                None
            }
        }
    }

    #[must_use]
    pub fn last_fix(&self) -> Option<&GeolocationFix> {
        self.last_fix.as_ref()
    }

    #[must_use]
    pub fn last_position(&self) -> Option<GeoPoint> {
        self.last_fix.map(|f| f.position)
    }

    #[must_use]
    pub fn user_visual(&self) -> Option<&UserPositionVisual> {
        self.visual.as_ref()
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<&FixRequest> {
        self.in_flight.as_ref()
    }
}
