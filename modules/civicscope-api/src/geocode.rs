use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use civicscope_common::{CivicError, Location};

/// ZIP-to-place client for the zippopotam.us API.
pub struct ZipGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    places: Vec<GeoPlace>,
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    #[serde(rename = "place name")]
    place_name: String,
    #[serde(default)]
    state: String,
}

impl ZipGeocoder {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a US ZIP code to its city/state pair.
    pub async fn lookup(&self, zip: &str) -> Result<Location, CivicError> {
        if zip.len() != 5 || !zip.chars().all(|c| c.is_ascii_digit()) {
            return Err(CivicError::InvalidInput(
                "ZIP code must be 5 digits".to_string(),
            ));
        }

        let url = format!("{}/us/{}", self.base_url, zip);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CivicError::Geocoding(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CivicError::ZipNotFound(zip.to_string()));
        }
        if !resp.status().is_success() {
            return Err(CivicError::Geocoding(format!(
                "Geocoder returned status {}",
                resp.status()
            )));
        }

        let data: GeoResponse = resp
            .json()
            .await
            .map_err(|e| CivicError::Geocoding(e.to_string()))?;

        let place = data
            .places
            .into_iter()
            .next()
            .ok_or_else(|| CivicError::ZipNotFound(zip.to_string()))?;

        let location = Location {
            city: place.place_name,
            state: place.state,
        };
        info!(zip, %location, "ZIP resolved");
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geocoder_response_parses_zippopotam_shape() {
        let json = r#"{
            "post code": "62701",
            "country": "United States",
            "places": [
                {"place name": "Springfield", "state": "Illinois", "state abbreviation": "IL"}
            ]
        }"#;
        let parsed: GeoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.places[0].place_name, "Springfield");
        assert_eq!(parsed.places[0].state, "Illinois");
    }

    #[tokio::test]
    async fn malformed_zip_is_rejected_before_any_request() {
        let geocoder = ZipGeocoder::new("http://127.0.0.1:0");
        let err = geocoder.lookup("abc").await.unwrap_err();
        assert!(matches!(err, CivicError::InvalidInput(_)));

        let err = geocoder.lookup("1234").await.unwrap_err();
        assert!(matches!(err, CivicError::InvalidInput(_)));
    }
}
