//! Collaborator seams for external services.
//!
//! The planner core treats geocoding and distance lookup as opaque
//! services behind these traits. Concrete HTTP adapters live in
//! `osrm` and `geocode`; tests substitute in-process mocks.

use crate::error::ProviderError;

/// Provides a rectangular travel-duration sub-matrix.
///
/// A caller fixes either side of the query: a single-source request
/// passes one coordinate in `sources`, a single-destination request
/// passes one in `destinations`. Row `i`, column `j` of the result is
/// the duration in seconds from `sources[i]` to `destinations[j]`.
pub trait MatrixProvider {
    fn durations(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Vec<f64>>, ProviderError>;
}

/// A successfully resolved address.
#[derive(Debug, Clone)]
pub struct GeocodedAddress {
    /// The address as the geocoder canonicalizes it.
    pub normalized_address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Resolves a free-form address to coordinates.
pub trait Geocoder {
    fn geocode(&self, address: &str) -> Result<GeocodedAddress, ProviderError>;
}
