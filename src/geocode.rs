//! Nominatim HTTP geocoder and address cleanup.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::traits::{GeocodedAddress, Geocoder};

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "depot-planner".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    config: GeocoderConfig,
    client: reqwest::blocking::Client,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, address: &str) -> Result<GeocodedAddress, ProviderError> {
        let url = format!("{}/search", self.config.base_url);
        let results: Vec<NominatimResult> = self
            .client
            .get(url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())?;

        let hit = results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::new(format!("no geocoding match for '{address}'")))?;
        let latitude: f64 = hit
            .lat
            .parse()
            .map_err(|_| ProviderError::new(format!("unparseable latitude '{}'", hit.lat)))?;
        let longitude: f64 = hit
            .lon
            .parse()
            .map_err(|_| ProviderError::new(format!("unparseable longitude '{}'", hit.lon)))?;
        Ok(GeocodedAddress {
            normalized_address: hit.display_name,
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

/// Strips the decorations that commonly break geocoding: unit and
/// suite suffixes, doubled whitespace, trailing punctuation.
pub fn groom_address(address: &str) -> String {
    let trimmed = address
        .split('#')
        .next()
        .unwrap_or(address)
        .trim()
        .trim_end_matches([',', '.']);
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Geocodes an address, permitting one cleanup retry with the groomed
/// form before failing.
pub fn geocode_with_cleanup<G: Geocoder>(
    geocoder: &G,
    address: &str,
) -> Result<GeocodedAddress, ProviderError> {
    match geocoder.geocode(address) {
        Ok(located) => Ok(located),
        Err(err) => {
            let groomed = groom_address(address);
            if groomed == address {
                return Err(err);
            }
            warn!(%address, error = %err, "geocoding failed, retrying with groomed address");
            debug!(%groomed, "groomed form");
            geocoder.geocode(&groomed)
        }
    }
}
