// src/geocode/client.rs - Geocoding vendor client
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::env;

use super::{GeocodeConfidence, GeocodedPoint, Geocoder};

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Thin client over the vendor's forward-geocoding endpoint. Rate limits are
/// the vendor's; every call site is expected to sit behind
/// `VenueGeocodeCache`.
pub struct HttpGeocoder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpGeocoder {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn from_env() -> Result<Self> {
        let api_key = env::var("GEOCODING_API_KEY")
            .context("GEOCODING_API_KEY must be set to use the geocoding client")?;
        let base_url =
            env::var("GEOCODING_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Ok(Self::new(base_url, api_key))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
    location_type: String,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

/// Rooftop and interpolated results are precise enough to trust; geometric
/// centers and approximate matches are region-level at best.
fn confidence_for_location_type(location_type: &str) -> GeocodeConfidence {
    match location_type {
        "ROOFTOP" | "RANGE_INTERPOLATED" => GeocodeConfidence::High,
        _ => GeocodeConfidence::Low,
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(
        &self,
        venue: &str,
        city: &str,
        country: Option<&str>,
    ) -> Result<Option<GeocodedPoint>> {
        let address = match country {
            Some(country) => format!("{}, {}, {}", venue, city, country),
            None => format!("{}, {}", venue, city),
        };
        debug!("Geocoding '{}'", address);

        let response: GeocodeResponse = self
            .http
            .get(&self.base_url)
            .query(&[("address", address.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await
            .context("Geocoding request failed")?
            .json()
            .await
            .context("Failed to decode geocoding response")?;

        if response.status == "ZERO_RESULTS" || response.results.is_empty() {
            debug!("No geocode result for '{}'", address);
            return Ok(None);
        }
        if response.status != "OK" {
            warn!(
                "Geocoder returned status {} for '{}'",
                response.status, address
            );
            anyhow::bail!("Geocoder error status: {}", response.status);
        }

        let best = &response.results[0];
        Ok(Some(GeocodedPoint {
            lat: best.geometry.location.lat,
            lng: best.geometry.location.lng,
            confidence: confidence_for_location_type(&best.geometry.location_type),
            formatted_address: best.formatted_address.clone(),
        }))
    }
}
