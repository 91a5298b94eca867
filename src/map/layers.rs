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

//! Overlay drawing and hit testing on top of the basemap.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use eframe::egui;
use sheetmap_core::{
    Geometry, GeometryFeature, GeoPoint, PointRecord, UserPositionVisual, VisibilityBackend,
};
use walkers::{MapMemory, Plugin, Projector};

// Geometry styles
const GEOMETRY_STROKE: egui::Color32 = egui::Color32::from_rgb(0x2c, 0xa2, 0x5f);
const GEOMETRY_FILL: egui::Color32 = egui::Color32::from_rgb(0x99, 0xd8, 0xc9);
const GEOMETRY_HOVER_STROKE: egui::Color32 = egui::Color32::from_rgb(0x00, 0x80, 0x00);
const GEOMETRY_HOVER_FILL: egui::Color32 = egui::Color32::from_rgb(0x2c, 0xa2, 0x5f);
const GEOMETRY_FILL_OPACITY: f32 = 0.2;

// Filter overlay styles
const FILTER_STROKE: egui::Color32 = egui::Color32::from_rgb(0x1e, 0x88, 0xe5);
const FILTER_FILL: egui::Color32 = egui::Color32::from_rgb(0x90, 0xca, 0xf9);
const OVERLAY_FILL_OPACITY: f32 = 0.15;

const MARKER_RADIUS: f32 = 8.0;
const MARKER_HIT_RADIUS: f32 = 12.0;
const LINE_HIT_DISTANCE: f32 = 6.0;

/// Marker colour for a row's `color` tag; unknown or missing tags are blue
pub fn marker_color(tag: Option<&str>) -> egui::Color32 {
    let tag = tag.map(|t| t.trim().to_ascii_lowercase());
    match tag.as_deref() {
        Some("red") => egui::Color32::from_rgb(0xd6, 0x3e, 0x2a),
        Some("darkred") => egui::Color32::from_rgb(0xa2, 0x33, 0x36),
        Some("orange") => egui::Color32::from_rgb(0xf6, 0x97, 0x30),
        Some("beige") => egui::Color32::from_rgb(0xff, 0xcb, 0x92),
        Some("green") => egui::Color32::from_rgb(0x72, 0xb0, 0x26),
        Some("darkgreen") => egui::Color32::from_rgb(0x72, 0x82, 0x24),
        Some("lightgreen") => egui::Color32::from_rgb(0xbb, 0xf9, 0x70),
        Some("darkblue") => egui::Color32::from_rgb(0x00, 0x67, 0xa3),
        Some("lightblue") => egui::Color32::from_rgb(0x8a, 0xda, 0xff),
        Some("purple") => egui::Color32::from_rgb(0xd2, 0x52, 0xb9),
        Some("darkpurple") => egui::Color32::from_rgb(0x5b, 0x39, 0x6b),
        Some("pink") => egui::Color32::from_rgb(0xff, 0x91, 0xea),
        Some("cadetblue") => egui::Color32::from_rgb(0x43, 0x69, 0x78),
        Some("white") => egui::Color32::from_rgb(0xfb, 0xfb, 0xfb),
        Some("gray") => egui::Color32::from_rgb(0x57, 0x57, 0x57),
        Some("lightgray") => egui::Color32::from_rgb(0xa3, 0xa3, 0xa3),
        Some("black") => egui::Color32::from_rgb(0x30, 0x30, 0x30),
        _ => egui::Color32::from_rgb(0x38, 0xaa, 0xdd),
    }
}

/// Renderer-side marker visibility, driven by the filter engine
#[derive(Debug, Default)]
pub struct MarkerLayer {
    hidden: HashSet<usize>,
}

impl MarkerLayer {
    /// Whether the marker for `id` is drawn and clickable
    pub fn is_shown(&self, id: usize) -> bool {
        !self.hidden.contains(&id)
    }
}

impl VisibilityBackend for MarkerLayer {
    fn show(&mut self, record: &PointRecord) {
        self.hidden.remove(&record.id);
    }

    fn hide(&mut self, record: &PointRecord) {
        self.hidden.insert(record.id);
    }
}

/// A marker as drawn this frame
#[derive(Debug, Clone, Copy)]
pub struct MarkerSprite {
    pub id: usize,
    pub position: GeoPoint,
    pub color: egui::Color32,
}

/// What the user did on the map this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapClick {
    Marker(usize),
    Geometry(usize),
    Empty(GeoPoint),
}

/// Interaction report written by the overlay plugin
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MapInteraction {
    pub click: Option<MapClick>,
    pub hovered_geometry: Option<usize>,
}

/// Everything the overlay plugin draws for one frame
#[derive(Debug)]
pub struct OverlayPlugin {
    pub geometries: Arc<Vec<GeometryFeature>>,
    pub hovered: Option<usize>,
    pub selected: Option<usize>,
    pub markers: Vec<MarkerSprite>,
    pub filter_circle: Option<(GeoPoint, f64)>,
    pub center_marker: Option<GeoPoint>,
    pub user: Option<UserPositionVisual>,
    pub interaction: Arc<Mutex<MapInteraction>>,
}

impl Plugin for OverlayPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut egui::Ui,
        response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter().with_clip_rect(response.rect);
        let screen = |p: GeoPoint| {
            let v = projector.project(walkers::lat_lon(p.latitude, p.longitude));
            egui::pos2(v.x, v.y)
        };

        // Project every geometry once for both drawing and hit testing
        let projected: Vec<ScreenGeometry> = self
            .geometries
            .iter()
            .map(|feature| ScreenGeometry::project(&feature.geometry, &screen))
            .collect();

        for (index, shape) in projected.iter().enumerate() {
            let highlighted = self.hovered == Some(index) || self.selected == Some(index);
            shape.paint(&painter, highlighted);
        }

        if let Some((center, radius)) = self.filter_circle {
            let (pos, pixels) = screen_circle(center, radius, &screen);
            painter.circle(
                pos,
                pixels,
                FILTER_FILL.gamma_multiply(OVERLAY_FILL_OPACITY),
                egui::Stroke::new(2.0, FILTER_STROKE),
            );
        }

        if let Some(center) = self.center_marker {
            let pos = screen(center);
            painter.circle_filled(pos, 5.0, FILTER_STROKE);
            painter.circle_stroke(pos, 5.0, egui::Stroke::new(1.5, egui::Color32::WHITE));
        }

        if let Some(user) = self.user {
            let (pos, pixels) = screen_circle(user.position, user.accuracy_meters, &screen);
            painter.circle(
                pos,
                pixels,
                FILTER_STROKE.gamma_multiply(OVERLAY_FILL_OPACITY),
                egui::Stroke::new(1.0, FILTER_STROKE),
            );
            painter.circle_filled(pos, 6.0, FILTER_STROKE);
            painter.circle_stroke(pos, 6.0, egui::Stroke::new(2.0, egui::Color32::WHITE));
        }

        let marker_positions: Vec<(usize, egui::Pos2)> = self
            .markers
            .iter()
            .map(|marker| {
                let pos = screen(marker.position);
                draw_marker(&painter, pos, marker.color);
                (marker.id, pos)
            })
            .collect();

        let hovered_geometry = response
            .hover_pos()
            .and_then(|pointer| hit_geometry(&projected, pointer));

        let click = if response.clicked() {
            response.interact_pointer_pos().map(|pointer| {
                if let Some(id) = hit_marker(&marker_positions, pointer) {
                    MapClick::Marker(id)
                } else if let Some(index) = hit_geometry(&projected, pointer) {
                    MapClick::Geometry(index)
                } else {
                    let position = projector.unproject(pointer.to_vec2());
                    MapClick::Empty(GeoPoint::new(position.y(), position.x()))
                }
            })
        } else {
            None
        };

        if let Ok(mut interaction) = self.interaction.lock() {
            *interaction = MapInteraction {
                click,
                hovered_geometry,
            };
        }
    }
}

/// Center and on-screen radius of a circle given in meters
fn screen_circle(
    center: GeoPoint,
    radius_meters: f64,
    screen: &impl Fn(GeoPoint) -> egui::Pos2,
) -> (egui::Pos2, f32) {
    let pos = screen(center);
    let edge = screen(center.offset_north(radius_meters));
    (pos, pos.distance(edge).max(1.0))
}

fn draw_marker(painter: &egui::Painter, pos: egui::Pos2, color: egui::Color32) {
    let tip = pos;
    let head = tip - egui::vec2(0.0, MARKER_RADIUS * 1.6);
    painter.add(egui::Shape::convex_polygon(
        vec![
            tip,
            head + egui::vec2(-MARKER_RADIUS * 0.8, MARKER_RADIUS * 0.5),
            head + egui::vec2(MARKER_RADIUS * 0.8, MARKER_RADIUS * 0.5),
        ],
        color,
        egui::Stroke::NONE,
    ));
    painter.circle_filled(head, MARKER_RADIUS, color);
    painter.circle_stroke(head, MARKER_RADIUS, egui::Stroke::new(1.5, egui::Color32::WHITE));
    painter.circle_filled(head, MARKER_RADIUS * 0.35, egui::Color32::WHITE);
}

/// A geometry projected to screen space
#[derive(Debug, Clone, PartialEq)]
enum ScreenGeometry {
    Points(Vec<egui::Pos2>),
    Lines(Vec<Vec<egui::Pos2>>),
    /// Polygons as lists of rings; the first ring is the exterior
    Polygons(Vec<Vec<Vec<egui::Pos2>>>),
}

impl ScreenGeometry {
    fn project(geometry: &Geometry, screen: &impl Fn(GeoPoint) -> egui::Pos2) -> Self {
        match geometry {
            Geometry::Point(p) => ScreenGeometry::Points(vec![screen(*p)]),
            Geometry::MultiPoint(points) => ScreenGeometry::Points(project_line(points, screen)),
            Geometry::LineString(points) => {
                ScreenGeometry::Lines(vec![project_line(points, screen)])
            }
            Geometry::MultiLineString(lines) => {
                ScreenGeometry::Lines(project_rings(lines, screen))
            }
            Geometry::Polygon(polygon) => {
                ScreenGeometry::Polygons(vec![project_rings(polygon, screen)])
            }
            Geometry::MultiPolygon(polygons) => ScreenGeometry::Polygons(
                polygons.iter().map(|p| project_rings(p, screen)).collect(),
            ),
        }
    }

    fn paint(&self, painter: &egui::Painter, highlighted: bool) {
        let (stroke_color, fill_color, weight) = if highlighted {
            (GEOMETRY_HOVER_STROKE, GEOMETRY_HOVER_FILL, 3.0)
        } else {
            (GEOMETRY_STROKE, GEOMETRY_FILL, 2.0)
        };
        let stroke = egui::Stroke::new(weight, stroke_color);
        let fill = fill_color.gamma_multiply(GEOMETRY_FILL_OPACITY);

        match self {
            ScreenGeometry::Points(points) => {
                for p in points {
                    painter.circle(*p, 5.0, fill_color, stroke);
                }
            }
            ScreenGeometry::Lines(lines) => {
                for line in lines {
                    painter.add(egui::Shape::line(line.clone(), stroke));
                }
            }
            ScreenGeometry::Polygons(polygons) => {
                for rings in polygons {
                    if let Some(exterior) = rings.first() {
                        painter.add(egui::Shape::convex_polygon(
                            exterior.clone(),
                            fill,
                            egui::Stroke::NONE,
                        ));
                    }
                    for ring in rings {
                        painter.add(egui::Shape::closed_line(ring.clone(), stroke));
                    }
                }
            }
        }
    }

    fn contains(&self, pointer: egui::Pos2) -> bool {
        match self {
            ScreenGeometry::Points(points) => points
                .iter()
                .any(|p| p.distance(pointer) <= MARKER_HIT_RADIUS),
            ScreenGeometry::Lines(lines) => lines.iter().any(|line| {
                line.windows(2)
                    .any(|s| distance_to_segment(pointer, s[0], s[1]) <= LINE_HIT_DISTANCE)
            }),
            ScreenGeometry::Polygons(polygons) => polygons.iter().any(|rings| {
                let mut rings = rings.iter();
                match rings.next() {
                    Some(exterior) if point_in_ring(pointer, exterior) => {
                        !rings.any(|hole| point_in_ring(pointer, hole))
                    }
                    _ => false,
                }
            }),
        }
    }
}

fn project_line(points: &[GeoPoint], screen: &impl Fn(GeoPoint) -> egui::Pos2) -> Vec<egui::Pos2> {
    points.iter().map(|p| screen(*p)).collect()
}

fn project_rings(
    rings: &[Vec<GeoPoint>],
    screen: &impl Fn(GeoPoint) -> egui::Pos2,
) -> Vec<Vec<egui::Pos2>> {
    rings.iter().map(|ring| project_line(ring, screen)).collect()
}

/// Topmost marker under the pointer; closest wins
fn hit_marker(markers: &[(usize, egui::Pos2)], pointer: egui::Pos2) -> Option<usize> {
    markers
        .iter()
        .map(|(id, pos)| {
            let head = *pos - egui::vec2(0.0, MARKER_RADIUS * 1.6);
            (*id, head.distance(pointer))
        })
        .filter(|(_, distance)| *distance <= MARKER_HIT_RADIUS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

/// Last-drawn geometry under the pointer
fn hit_geometry(shapes: &[ScreenGeometry], pointer: egui::Pos2) -> Option<usize> {
    shapes.iter().rposition(|shape| shape.contains(pointer))
}

/// Even-odd point in polygon test
fn point_in_ring(p: egui::Pos2, ring: &[egui::Pos2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn distance_to_segment(p: egui::Pos2, a: egui::Pos2, b: egui::Pos2) -> f32 {
    let ab = b - a;
    let length_sq = ab.length_sq();
    if length_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}
