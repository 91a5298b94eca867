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

//! Feed fetching.
//!
//! A feed is either an `http(s)://` URL or a path on the local filesystem.
//! The raw CSV bytes are handed to the row parsers in `sheetmap_core::feed`.

use std::fmt;
use std::path::PathBuf;

use log::info;
use sheetmap_core::{parse_geometry_rows, parse_point_rows, GeometryRow, PointRow};
use thiserror::Error;

/// Errors while fetching or parsing a feed
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] sheetmap_core::FeedError),
}

/// Where a feed is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    File(PathBuf),
}

impl FeedSource {
    /// Classify a configured source string
    pub fn parse(source: &str) -> Self {
        let trimmed = source.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            FeedSource::Url(trimmed.to_string())
        } else {
            FeedSource::File(PathBuf::from(trimmed))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Url(url) => write!(f, "{url}"),
            FeedSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Download or read the raw feed bytes
///
/// Bytes are not decoded here so that a row with bad UTF-8 only drops that
/// row in the parser.
pub async fn fetch_bytes(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<Vec<u8>, FetchError> {
    match source {
        FeedSource::Url(url) => {
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status));
            }
            Ok(response.bytes().await?.to_vec())
        }
        FeedSource::File(path) => tokio::fs::read(path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            }),
    }
}

/// Fetch and parse the point feed
pub async fn fetch_points(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<Vec<PointRow>, FetchError> {
    let bytes = fetch_bytes(client, source).await?;
    let rows = parse_point_rows(bytes.as_slice())?;
    info!("Fetched {} point rows from {}", rows.len(), source);
    Ok(rows)
}

/// Fetch and parse the geometry feed
pub async fn fetch_geometry(
    client: &reqwest::Client,
    source: &FeedSource,
) -> Result<Vec<GeometryRow>, FetchError> {
    let bytes = fetch_bytes(client, source).await?;
    let rows = parse_geometry_rows(bytes.as_slice())?;
    info!("Fetched {} geometry rows from {}", rows.len(), source);
    Ok(rows)
}
