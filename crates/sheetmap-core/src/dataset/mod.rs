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

//! Point dataset loaded from the point feed.
//!
//! The dataset is replaced wholesale on every load; there is no incremental
//! diffing between loads. Rows whose coordinates are missing, unparseable or
//! out of range are dropped here so the filter never sees them.

use log::{debug, info};
use thiserror::Error;

use crate::feed::PointRow;
use crate::geo::GeoPoint;

/// Reasons a feed row is rejected. These are never surfaced to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("coordinate out of range: {latitude}, {longitude}")]
    OutOfRange { latitude: f64, longitude: f64 },
}

/// A single point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct PointRecord {
    /// Index of the record within the current load.
    pub id: usize,
    pub position: GeoPoint,
    pub display_name: String,
    pub description: String,
    /// Marker colour name from the feed's `color` column.
    pub color_tag: Option<String>,
    /// Derived by the filter engine; true until the first recompute.
    pub visible: bool,
}

impl PointRecord {
    /// Build a record from a feed row.
    pub fn from_row(id: usize, row: &PointRow) -> Result<Self, RowError> {
        let latitude = parse_coordinate("lat", row.lat.as_deref())?;
        let longitude = parse_coordinate("lon", row.lon.as_deref())?;
        let position = GeoPoint::checked(latitude, longitude)
            .ok_or(RowError::OutOfRange { latitude, longitude })?;

        let color_tag = row
            .color
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        Ok(Self {
            id,
            position,
            display_name: row.name.clone(),
            description: row.description.clone(),
            color_tag,
            visible: true,
        })
    }
}

fn parse_coordinate(field: &'static str, raw: Option<&str>) -> Result<f64, RowError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(RowError::MissingField(field))?;
    raw.parse::<f64>().map_err(|_| RowError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

/// Outcome of a dataset load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub accepted: usize,
    pub dropped: usize,
}

/// The current set of point records.
#[derive(Debug, Default)]
pub struct PointDataset {
    records: Vec<PointRecord>,
    generation: u64,
}

impl PointDataset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every record with the valid rows of `rows`.
    pub fn load(&mut self, rows: &[PointRow]) -> LoadReport {
        let mut records = Vec::with_capacity(rows.len());
        let mut dropped = 0;

        for row in rows {
            match PointRecord::from_row(records.len(), row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!("Dropping point row '{}': {}", row.name, e);
                    dropped += 1;
                }
            }
        }

        self.records = records;
        self.generation += 1;

        let report = LoadReport {
            accepted: self.records.len(),
            dropped,
        };
        info!(
            "Loaded {} points ({} malformed rows dropped)",
            report.accepted, report.dropped
        );
        report
    }

    #[must_use]
    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [PointRecord] {
        &mut self.records
    }

    #[must_use]
    pub fn get(&self, id: usize) -> Option<&PointRecord> {
        self.records.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of loads performed so far. Renderers use this to notice a reload.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.records.iter().filter(|r| r.visible).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lat: Option<&str>, lon: Option<&str>, name: &str) -> PointRow {
        PointRow {
            lat: lat.map(str::to_string),
            lon: lon.map(str::to_string),
            name: name.to_string(),
            description: format!("{name} description"),
            color: None,
        }
    }

    #[test]
    fn test_load_drops_malformed_rows() {
        let rows = vec![
            row(Some("51.5"), Some("-0.1"), "valid-1"),
            row(None, Some("-0.1"), "no-lat"),
            row(Some("51.6"), Some("-0.12"), "valid-2"),
            row(Some("abc"), Some("-0.1"), "bad-lat"),
            row(Some("51.4"), Some(""), "empty-lon"),
            row(Some("95.0"), Some("0.0"), "out-of-range"),
            row(Some(" 51.7 "), Some("-0.2"), "valid-3"),
        ];

        let mut dataset = PointDataset::new();
        let report = dataset.load(&rows);

        assert_eq!(report, LoadReport { accepted: 3, dropped: 4 });
        assert_eq!(dataset.len(), 3);
        let names: Vec<_> = dataset.records().iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, ["valid-1", "valid-2", "valid-3"]);
        assert_eq!(dataset.records()[2].id, 2);
    }

    #[test]
    fn test_reload_replaces_records() {
        let mut dataset = PointDataset::new();
        dataset.load(&[row(Some("1"), Some("1"), "a"), row(Some("2"), Some("2"), "b")]);
        assert_eq!(dataset.len(), 2);

        dataset.load(&[row(Some("3"), Some("3"), "c")]);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].display_name, "c");
        assert_eq!(dataset.generation(), 2);
    }

    #[test]
    fn test_load_is_idempotent() {
        let rows = vec![row(Some("1"), Some("1"), "a"), row(None, None, "b")];
        let mut dataset = PointDataset::new();
        let first = dataset.load(&rows);
        let first_records = dataset.records().to_vec();
        let second = dataset.load(&rows);
        assert_eq!(first, second);
        assert_eq!(first_records, dataset.records());
    }

    #[test]
    fn test_color_tag_blank_is_none() {
        let mut r = row(Some("1"), Some("1"), "a");
        r.color = Some("  ".to_string());
        assert!(PointRecord::from_row(0, &r).unwrap().color_tag.is_none());
        r.color = Some("darkgreen".to_string());
        assert_eq!(
            PointRecord::from_row(0, &r).unwrap().color_tag.as_deref(),
            Some("darkgreen")
        );
    }

    #[test]
    fn test_row_error_kinds() {
        assert_eq!(
            PointRecord::from_row(0, &row(None, Some("1"), "x")).unwrap_err(),
            RowError::MissingField("lat")
        );
        assert!(matches!(
            PointRecord::from_row(0, &row(Some("1"), Some("east"), "x")).unwrap_err(),
            RowError::InvalidValue { field: "lon", .. }
        ));
    }
}
