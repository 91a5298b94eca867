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

//! Spatial filter control panel model.
//!
//! The panel keeps the values its widgets are bound to (checkbox, mode
//! selector, radius slider). After the widgets have run for a frame,
//! [`ControlPanel::take_intents`] compares them with the engine's
//! [`FilterState`] and turns every difference, plus any button presses, into
//! [`ControlIntent`]s for the session.

use crate::filter::{FilterMode, FilterState, VisibilityCounts};

/// Smallest selectable radius in meters.
pub const RADIUS_MIN_METERS: f64 = 100.0;
/// Largest selectable radius in meters.
pub const RADIUS_MAX_METERS: f64 = 5000.0;
/// Slider step in meters.
pub const RADIUS_STEP_METERS: f64 = 100.0;

/// A user action on the control panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlIntent {
    SetEnabled(bool),
    SetMode(FilterMode),
    SetRadius(f64),
    Apply,
    Relocate,
}

/// Snap a slider value to the radius step and clamp it to the slider range.
#[must_use]
pub fn snap_radius(meters: f64) -> f64 {
    if !meters.is_finite() {
        return RADIUS_MIN_METERS;
    }
    let snapped = (meters / RADIUS_STEP_METERS).round() * RADIUS_STEP_METERS;
    snapped.clamp(RADIUS_MIN_METERS, RADIUS_MAX_METERS)
}

/// "visible / total" readout; a dash pair until the first recompute.
#[must_use]
pub fn count_readout(counts: Option<VisibilityCounts>) -> String {
    counts.map_or_else(|| "– / –".to_string(), |c| c.to_string())
}

/// Widget-bound values of the filter panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPanel {
    pub enabled: bool,
    pub mode: FilterMode,
    pub radius_meters: f64,
    apply_pressed: bool,
    relocate_pressed: bool,
}

impl ControlPanel {
    /// Panel mirroring `state`.
    #[must_use]
    pub fn new(state: &FilterState) -> Self {
        Self {
            enabled: state.enabled,
            mode: state.mode,
            radius_meters: snap_radius(state.radius_meters),
            apply_pressed: false,
            relocate_pressed: false,
        }
    }

    pub fn press_apply(&mut self) {
        self.apply_pressed = true;
    }

    pub fn press_relocate(&mut self) {
        self.relocate_pressed = true;
    }

    /// Radius readout shown next to the slider.
    #[must_use]
    pub fn radius_readout(&self) -> String {
        format!("{:.0} m", self.radius_meters)
    }

    /// Collect the intents produced since the last call.
    ///
    /// Order: enable toggle, mode, radius, then Apply and Relocate, so that a
    /// radius dragged in the same frame as Apply is stored before applying.
    pub fn take_intents(&mut self, state: &FilterState) -> Vec<ControlIntent> {
        let mut intents = Vec::new();

        if self.enabled != state.enabled {
            intents.push(ControlIntent::SetEnabled(self.enabled));
        }
        if self.mode != state.mode {
            intents.push(ControlIntent::SetMode(self.mode));
        }
        self.radius_meters = snap_radius(self.radius_meters);
        if (self.radius_meters - state.radius_meters).abs() > f64::EPSILON {
            intents.push(ControlIntent::SetRadius(self.radius_meters));
        }
        if std::mem::take(&mut self.apply_pressed) {
            intents.push(ControlIntent::Apply);
        }
        if std::mem::take(&mut self.relocate_pressed) {
            intents.push(ControlIntent::Relocate);
        }

        intents
    }
}
