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

//! Map rendering.
//!
//! This module wraps the `walkers` map widget: the Carto basemap, the overlay
//! plugin for session layers, and the renderer-side marker visibility.

pub mod carto;
pub mod layers;

use std::sync::{Arc, Mutex};

use eframe::egui;
use log::{debug, warn};
use sheetmap_core::{GeoPoint, GeometryFeature, Session};
use walkers::{HttpOptions, HttpTiles, Map, MapMemory, Position};

pub use carto::CartoPositron;
pub use layers::{MapClick, MapInteraction, MarkerLayer};

use layers::{marker_color, MarkerSprite, OverlayPlugin};

/// Ground resolution of zoom level 0 at the equator, in meters per pixel.
const METERS_PER_PIXEL_ZOOM0: f64 = 156_543.033_92;

/// Viewport side assumed before the first frame is drawn.
const DEFAULT_VIEWPORT_PX: f64 = 512.0;

/// Largest whole zoom at which a circle of `accuracy_meters` around a point at
/// `latitude` fits in `viewport_px`, capped at `max_zoom`.
pub fn fit_zoom(accuracy_meters: f64, latitude: f64, viewport_px: f64, max_zoom: u8) -> f64 {
    let max_zoom = f64::from(max_zoom);
    if !accuracy_meters.is_finite() || accuracy_meters <= 0.0 || viewport_px <= 0.0 {
        return max_zoom;
    }

    let ground = METERS_PER_PIXEL_ZOOM0 * latitude.to_radians().cos().abs();
    let zoom = (ground * viewport_px / (2.0 * accuracy_meters)).log2().floor();
    zoom.clamp(0.0, max_zoom)
}

/// The map widget and everything it keeps between frames
pub struct MapView {
    tiles: HttpTiles,
    memory: MapMemory,
    home: Position,
    markers: MarkerLayer,
    geometries: Arc<Vec<GeometryFeature>>,
    geometry_generation: u64,
    interaction: Arc<Mutex<MapInteraction>>,
    viewport_px: f64,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("zoom", &self.memory.zoom())
            .field("markers", &self.markers)
            .field("geometries", &self.geometries.len())
            .finish_non_exhaustive()
    }
}

impl MapView {
    pub fn new(ctx: &egui::Context, center: GeoPoint, zoom: f64) -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| std::path::PathBuf::from(".cache"))
            .join("sheetmap-desktop")
            .join("tiles");

        let http_options = HttpOptions {
            cache: Some(cache_dir),
            ..Default::default()
        };

        let home = walkers::lat_lon(center.latitude, center.longitude);
        let mut memory = MapMemory::default();
        if memory.set_zoom(zoom).is_err() {
            warn!("Initial zoom {} is out of range, using the default", zoom);
        }

        Self {
            tiles: HttpTiles::with_options(CartoPositron, http_options, ctx.clone()),
            memory,
            home,
            markers: MarkerLayer::default(),
            geometries: Arc::new(Vec::new()),
            geometry_generation: 0,
            interaction: Arc::new(Mutex::new(MapInteraction::default())),
            viewport_px: DEFAULT_VIEWPORT_PX,
        }
    }

    /// Visibility backend handed to the session
    pub fn markers_mut(&mut self) -> &mut MarkerLayer {
        &mut self.markers
    }

    /// Move the view to `position` with the accuracy circle in frame, zooming
    /// in no further than `max_zoom`
    pub fn center_on(&mut self, position: GeoPoint, accuracy_meters: f64, max_zoom: u8) {
        self.memory
            .center_at(walkers::lat_lon(position.latitude, position.longitude));
        let zoom = fit_zoom(accuracy_meters, position.latitude, self.viewport_px, max_zoom);
        if self.memory.set_zoom(zoom).is_err() {
            debug!("Zoom {} rejected by the map", zoom);
        }
    }

    /// Draw the map for this frame and report clicks and hover
    pub fn show(&mut self, ui: &mut egui::Ui, session: &Session) -> MapInteraction {
        let geometry = session.geometry();
        if geometry.generation() != self.geometry_generation {
            self.geometries = Arc::new(geometry.features().to_vec());
            self.geometry_generation = geometry.generation();
        }

        let markers = session
            .dataset()
            .records()
            .iter()
            .filter(|record| self.markers.is_shown(record.id))
            .map(|record| MarkerSprite {
                id: record.id,
                position: record.position,
                color: marker_color(record.color_tag.as_deref()),
            })
            .collect();

        let overlay = session.filter().overlay();
        let plugin = OverlayPlugin {
            geometries: Arc::clone(&self.geometries),
            hovered: geometry.hovered(),
            selected: geometry.selected(),
            markers,
            filter_circle: overlay.circle,
            center_marker: overlay.center_marker,
            user: session.tracker().user_visual().copied(),
            interaction: Arc::clone(&self.interaction),
        };

        if let Ok(mut interaction) = self.interaction.lock() {
            *interaction = MapInteraction::default();
        }

        let map = Map::new(Some(&mut self.tiles), &mut self.memory, self.home).with_plugin(plugin);
        let response = ui.add(map);
        self.viewport_px = f64::from(response.rect.width().min(response.rect.height()));

        self.interaction
            .lock()
            .map(|interaction| *interaction)
            .unwrap_or_default()
    }
}
