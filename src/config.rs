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

//! Application configuration management.
//!
//! Configuration is stored as TOML through `confy`. It names the two feeds,
//! the initial map view, filter and geolocation defaults, and an optional
//! manual location for machines without a usable location source. The file is
//! only read; runtime filter state is never written back.

use log::warn;
use serde::{Deserialize, Serialize};
use sheetmap_core::{FilterState, FixOptions, GeoPoint};

const APP_NAME: &str = "sheetmap-desktop";
const CONFIG_NAME: &str = "config";

/// Default geometry feed: a spreadsheet published as CSV.
pub const DEFAULT_GEOMETRY_FEED: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vTsAyA0Hpk_-WpKyN1dfqi5IPEIC3rqEiL-uwElxJpw_U7BYntc8sDw-8sWsL87JCDU4lVg2aNi65ES/pub?output=csv";

/// Default point feed, relative to the working directory.
pub const DEFAULT_POINTS_FEED: &str = "./data/points_2.csv";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Geometry feed source (http(s) URL or local path)
    #[serde(default = "default_geometry_feed")]
    pub geometry_feed: String,

    /// Point feed source (http(s) URL or local path)
    #[serde(default = "default_points_feed")]
    pub points_feed: String,

    /// Initial map center latitude
    #[serde(default = "default_center_latitude")]
    pub initial_latitude: f64,

    /// Initial map center longitude
    #[serde(default = "default_center_longitude")]
    pub initial_longitude: f64,

    /// Initial map zoom level
    #[serde(default = "default_zoom")]
    pub initial_zoom: f64,

    /// Filter radius at startup in meters (100 - 5000)
    #[serde(default = "default_radius")]
    pub default_radius_meters: f64,

    /// Location request timeout in milliseconds
    #[serde(default = "default_location_timeout")]
    pub location_timeout_ms: u64,

    /// Prefer precise location sources
    #[serde(default = "default_true")]
    pub high_accuracy_location: bool,

    /// Accuracy reported for IP-based locations, in meters
    #[serde(default = "default_ip_accuracy")]
    pub ip_location_accuracy_meters: f64,

    /// Override latitude (for devices without a location source)
    #[serde(default)]
    pub override_latitude: Option<f64>,

    /// Override longitude (for devices without a location source)
    #[serde(default)]
    pub override_longitude: Option<f64>,

    /// Sidebar panel width in pixels
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: f32,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_geometry_feed() -> String {
    DEFAULT_GEOMETRY_FEED.to_string()
}

fn default_points_feed() -> String {
    DEFAULT_POINTS_FEED.to_string()
}

fn default_center_latitude() -> f64 {
    51.5
}

fn default_center_longitude() -> f64 {
    -0.1
}

fn default_zoom() -> f64 {
    14.0
}

fn default_radius() -> f64 {
    1000.0
}

fn default_location_timeout() -> u64 {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_ip_accuracy() -> f64 {
    5000.0
}

fn default_sidebar_width() -> f32 {
    320.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            geometry_feed: default_geometry_feed(),
            points_feed: default_points_feed(),
            initial_latitude: default_center_latitude(),
            initial_longitude: default_center_longitude(),
            initial_zoom: default_zoom(),
            default_radius_meters: default_radius(),
            location_timeout_ms: default_location_timeout(),
            high_accuracy_location: true,
            ip_location_accuracy_meters: default_ip_accuracy(),
            override_latitude: None,
            override_longitude: None,
            sidebar_width: default_sidebar_width(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self, confy::ConfyError> {
        Self::load_from(Self::get_config_path()?)
    }

    /// Load configuration from `path`; confy writes the defaults there first
    /// when the file does not exist yet
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    /// Load configuration, falling back to defaults when the file is unreadable
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Initial map center
    pub fn initial_center(&self) -> GeoPoint {
        GeoPoint::checked(self.initial_latitude, self.initial_longitude)
            .unwrap_or_else(|| GeoPoint::new(default_center_latitude(), default_center_longitude()))
    }

    /// Manually configured location, if both coordinates are set and valid
    pub fn override_location(&self) -> Option<GeoPoint> {
        match (self.override_latitude, self.override_longitude) {
            (Some(lat), Some(lon)) => GeoPoint::checked(lat, lon),
            _ => None,
        }
    }

    /// Filter state at startup
    pub fn filter_state(&self) -> FilterState {
        let radius = sheetmap_core::panel::snap_radius(self.default_radius_meters);
        FilterState {
            radius_meters: radius,
            ..FilterState::default()
        }
    }

    /// Options used for every location request
    pub fn fix_options(&self) -> FixOptions {
        FixOptions {
            high_accuracy: self.high_accuracy_location,
            timeout_ms: self.location_timeout_ms,
            ..FixOptions::default()
        }
    }
}
