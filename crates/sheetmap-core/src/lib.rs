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

//! Map session library for spreadsheet-backed point and geometry layers.
//!
//! This library holds everything about the map that does not depend on a
//! renderer or a platform:
//!
//! - **Feed layer**: lenient CSV row parsing for the point and geometry feeds
//! - **Dataset layer**: validated point records, replaced wholesale on reload
//! - **Geometry layer**: GeoJSON-ish payload normalisation and hover/selection state
//! - **Filter layer**: radius-based visibility around a user or click center
//! - **Geolocation layer**: request superseding, cached fixes and the user position
//! - **Session**: the event dispatcher that wires all layers together
//!
//! # Quick Start
//!
//! ```
//! use sheetmap_core::{
//!     parse_point_rows, ControlIntent, FilterMode, GeoPoint, Session, SessionEvent,
//! };
//!
//! let csv = "lat,lon,name,description\n51.5,-0.1,Cafe,Coffee\n51.6,-0.1,Far,Away\n";
//! let rows = parse_point_rows(csv.as_bytes()).unwrap();
//!
//! let mut session = Session::default();
//! session.handle(SessionEvent::DatasetLoaded(rows), &mut ());
//! session.handle(
//!     SessionEvent::ControlChanged(ControlIntent::SetMode(FilterMode::ClickPoint)),
//!     &mut (),
//! );
//!
//! let outcome = session.handle(SessionEvent::MapClicked(GeoPoint::new(51.5, -0.1)), &mut ());
//! assert_eq!(outcome.counts.unwrap().to_string(), "1 / 2");
//! ```

pub mod dataset;
pub mod feed;
pub mod filter;
pub mod geo;
pub mod geolocation;
pub mod geometry;
pub mod panel;
pub mod session;

pub use dataset::{LoadReport, PointDataset, PointRecord, RowError};
pub use feed::{parse_geometry_rows, parse_point_rows, FeedError, GeometryRow, PointRow};
pub use filter::{
    compute_visibility, FilterEngine, FilterError, FilterMode, FilterOverlay, FilterState,
    VisibilityBackend, VisibilityCounts,
};
pub use geo::GeoPoint;
pub use geolocation::{
    FixOptions, FixRequest, GeolocationFix, GeolocationTracker, LocationError, RequestId,
    UserPositionVisual,
};
pub use geometry::{parse_geometry_payload, Geometry, GeometryError, GeometryFeature, GeometryLayer};
pub use panel::{ControlIntent, ControlPanel};
pub use session::{
    Effect, FeedKind, Notice, NoticeLevel, Outcome, Session, SessionEvent, UserInputError,
};
