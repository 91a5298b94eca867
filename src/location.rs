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

//! Platform location lookup.
//!
//! Sources are tried in order: the manual override from the configuration,
//! then IP geolocation. A high accuracy request asks ipapi.co first, which
//! answers at city level over HTTPS; otherwise the quicker ip-api.com goes
//! first. Either service falls back to the other. The whole lookup is bounded
//! by the request's timeout.

use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;
use sheetmap_core::{FixOptions, GeoPoint, GeolocationFix, LocationError};

use crate::config::AppConfig;

const IPAPI_CO_URL: &str = "https://ipapi.co/json/";
const IP_API_COM_URL: &str = "http://ip-api.com/json/";

/// Accuracy reported for a manually configured location
const OVERRIDE_ACCURACY_METERS: f64 = 10.0;

/// IP geolocation services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IpService {
    IpapiCo,
    IpApiCom,
}

impl IpService {
    fn name(self) -> &'static str {
        match self {
            IpService::IpapiCo => "ipapi.co",
            IpService::IpApiCom => "ip-api.com",
        }
    }

    fn url(self) -> &'static str {
        match self {
            IpService::IpapiCo => IPAPI_CO_URL,
            IpService::IpApiCom => IP_API_COM_URL,
        }
    }

    fn parse(self, value: &Value) -> Option<GeoPoint> {
        match self {
            IpService::IpapiCo => parse_ipapi_co(value),
            IpService::IpApiCom => parse_ip_api_com(value),
        }
    }
}

/// Order in which the IP services are asked
fn ip_services(high_accuracy: bool) -> [IpService; 2] {
    if high_accuracy {
        [IpService::IpapiCo, IpService::IpApiCom]
    } else {
        [IpService::IpApiCom, IpService::IpapiCo]
    }
}

/// Resolves the user's position from the configured sources
#[derive(Debug, Clone)]
pub struct LocationProvider {
    client: reqwest::Client,
    override_position: Option<GeoPoint>,
    ip_accuracy_meters: f64,
}

impl LocationProvider {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            override_position: config.override_location(),
            ip_accuracy_meters: config.ip_location_accuracy_meters.max(0.0),
        }
    }

    /// Look up the current position, giving up after `options.timeout_ms`
    pub async fn locate(&self, options: &FixOptions) -> Result<GeolocationFix, LocationError> {
        if let Some(position) = self.override_position {
            info!(
                "Using configured location: {}, {}",
                position.latitude, position.longitude
            );
            return Ok(GeolocationFix::now(position, OVERRIDE_ACCURACY_METERS));
        }

        let timeout = Duration::from_millis(options.timeout_ms);
        match tokio::time::timeout(timeout, self.locate_by_ip(options.high_accuracy)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(LocationError::Timeout(options.timeout_ms)),
        }
    }

    async fn locate_by_ip(&self, high_accuracy: bool) -> Result<GeolocationFix, LocationError> {
        info!("Falling back to IP-based geolocation...");

        for service in ip_services(high_accuracy) {
            if let Some(position) = self.query(service).await {
                info!(
                    "Location found via {}: {}, {}",
                    service.name(),
                    position.latitude,
                    position.longitude
                );
                return Ok(GeolocationFix::now(position, self.ip_accuracy_meters));
            }
        }

        warn!("Failed to fetch location from all sources");
        Err(LocationError::PositionUnavailable(
            "no location source answered".to_string(),
        ))
    }

    async fn query(&self, service: IpService) -> Option<GeoPoint> {
        let url = service.url();
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Location source {} unreachable: {}", url, e);
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(value) => service.parse(&value),
            Err(e) => {
                debug!("Location source {} returned unreadable data: {}", url, e);
                None
            }
        }
    }
}

/// ipapi.co answers with `latitude`/`longitude`, or `error: true` when rate limited
fn parse_ipapi_co(value: &Value) -> Option<GeoPoint> {
    if value.get("error").and_then(Value::as_bool) == Some(true) {
        debug!("ipapi.co refused the request: {}", value);
        return None;
    }
    let lat = value.get("latitude").and_then(Value::as_f64)?;
    let lon = value.get("longitude").and_then(Value::as_f64)?;
    GeoPoint::checked(lat, lon)
}

/// ip-api.com answers with `lat`/`lon` and a `status` of "success" or "fail"
fn parse_ip_api_com(value: &Value) -> Option<GeoPoint> {
    if value.get("status").and_then(Value::as_str) == Some("fail") {
        debug!("ip-api.com refused the request: {}", value);
        return None;
    }
    let lat = value.get("lat").and_then(Value::as_f64)?;
    let lon = value.get("lon").and_then(Value::as_f64)?;
    GeoPoint::checked(lat, lon)
}
