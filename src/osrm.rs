//! OSRM HTTP adapter for travel-duration sub-matrices.

use serde::Deserialize;

use crate::error::ProviderError;
use crate::traits::MatrixProvider;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "car".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

impl MatrixProvider for OsrmClient {
    fn durations(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Vec<f64>>, ProviderError> {
        if sources.is_empty() || destinations.is_empty() {
            return Ok(Vec::new());
        }

        // One coordinate list; the sources/destinations parameters pick
        // out which indices play which role.
        let coords = sources
            .iter()
            .chain(destinations)
            .map(|(lat, lng)| format!("{lng:.6},{lat:.6}"))
            .collect::<Vec<_>>()
            .join(";");
        let source_indices = (0..sources.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");
        let destination_indices = (sources.len()..sources.len() + destinations.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        let url = format!(
            "{}/table/v1/{}/{}?annotations=duration&sources={}&destinations={}",
            self.config.base_url, self.config.profile, coords, source_indices, destination_indices
        );

        let body: OsrmTableResponse = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json())?;

        if let Some(code) = body.code.as_deref() {
            if code != "Ok" {
                return Err(ProviderError::new(format!("osrm table returned {code}")));
            }
        }
        let durations = body
            .durations
            .ok_or_else(|| ProviderError::new("osrm table response has no durations"))?;
        if durations.len() != sources.len()
            || durations.iter().any(|row| row.len() != destinations.len())
        {
            return Err(ProviderError::new(format!(
                "osrm table shape mismatch: wanted {}x{}",
                sources.len(),
                destinations.len()
            )));
        }
        Ok(durations)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmTableResponse {
    code: Option<String>,
    durations: Option<Vec<Vec<f64>>>,
}
