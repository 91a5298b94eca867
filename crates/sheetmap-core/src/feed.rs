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

//! CSV feed rows.
//!
//! Both feeds are header-keyed CSV tables (typically a published spreadsheet).
//! Rows are deserialized leniently: every column is an optional string and
//! value validation happens in the layer that consumes the row, so a single
//! bad cell never fails the whole feed.

use std::io::Read;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

/// Errors that fail an entire feed load.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("feed is missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// A raw row of the point feed (`lat, lon, name, description`, optional `color`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PointRow {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub name: String,
    pub description: String,
    pub color: Option<String>,
}

impl PointRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] = &["lat", "lon", "name", "description"];
}

/// A raw row of the geometry feed (`include, name, description, geometry`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeometryRow {
    pub include: String,
    pub name: String,
    pub description: String,
    pub geometry: String,
}

impl GeometryRow {
    pub const REQUIRED_COLUMNS: &'static [&'static str] =
        &["include", "name", "description", "geometry"];
}

/// Parse point feed rows from CSV text.
pub fn parse_point_rows<R: Read>(reader: R) -> Result<Vec<PointRow>, FeedError> {
    parse_rows(reader, PointRow::REQUIRED_COLUMNS)
}

/// Parse geometry feed rows from CSV text.
pub fn parse_geometry_rows<R: Read>(reader: R) -> Result<Vec<GeometryRow>, FeedError> {
    parse_rows(reader, GeometryRow::REQUIRED_COLUMNS)
}

fn parse_rows<R, T>(reader: R, required: &'static [&'static str]) -> Result<Vec<T>, FeedError>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(FeedError::MissingColumn(column));
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in csv_reader.records() {
        let mut record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!("Skipping unreadable feed row: {}", e);
                skipped += 1;
                continue;
            }
        };

        // Rows that end early read as empty cells
        while record.len() < headers.len() {
            record.push_field("");
        }

        match record.deserialize(Some(&headers)) {
            Ok(row) => rows.push(row),
            Err(e) => {
                debug!("Skipping unreadable feed row: {}", e);
                skipped += 1;
            }
        }
    }

    info!("Parsed {} feed rows ({} unreadable)", rows.len(), skipped);
    Ok(rows)
}
