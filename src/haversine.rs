//! Haversine duration provider (fallback when no routing server is
//! available).
//!
//! Uses great-circle distance and an assumed speed to estimate travel
//! time. Less accurate than a road network but always available, and
//! handy in tests.

use crate::error::ProviderError;
use crate::traits::MatrixProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine-based duration provider.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Calculate haversine distance between two points in kilometers.
    fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
        let (lat1, lng1) = from;
        let (lat2, lng2) = to;

        let lat1_rad = lat1.to_radians();
        let lat2_rad = lat2.to_radians();
        let delta_lat = (lat2 - lat1).to_radians();
        let delta_lng = (lng2 - lng1).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    /// Convert distance in km to travel time in seconds.
    fn km_to_seconds(&self, km: f64) -> f64 {
        km / self.speed_kmh * 3600.0
    }
}

impl MatrixProvider for HaversineMatrix {
    fn durations(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Vec<f64>>, ProviderError> {
        Ok(sources
            .iter()
            .map(|&from| {
                destinations
                    .iter()
                    .map(|&to| {
                        if from == to {
                            0.0
                        } else {
                            self.km_to_seconds(Self::haversine_km(from, to))
                        }
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let dist = HaversineMatrix::haversine_km((36.1, -115.1), (36.1, -115.1));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Las Vegas (36.17, -115.14) to Los Angeles (34.05, -118.24)
        // Actual distance ~370 km
        let dist = HaversineMatrix::haversine_km((36.17, -115.14), (34.05, -118.24));
        assert!(dist > 350.0 && dist < 400.0, "LV to LA should be ~370km, got {}", dist);
    }

    #[test]
    fn test_diagonal_is_zero() {
        let provider = HaversineMatrix::default();
        let locations = vec![(36.1, -115.1), (36.2, -115.2), (36.3, -115.3)];
        let rows = provider
            .durations(&locations, &locations)
            .expect("haversine never fails");

        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row[i], 0.0, "Diagonal should be zero");
        }
    }

    #[test]
    fn test_rectangular_shape() {
        let provider = HaversineMatrix::default();
        let sources = vec![(36.1, -115.1)];
        let destinations = vec![(36.2, -115.2), (36.3, -115.3)];
        let rows = provider
            .durations(&sources, &destinations)
            .expect("haversine never fails");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert!(rows[0].iter().all(|&secs| secs > 0.0));
    }

    #[test]
    fn test_reasonable_travel_time() {
        let provider = HaversineMatrix::new(40.0); // 40 km/h
        // 10 km at 40 km/h = 0.25 hours = 900 seconds
        let seconds = provider.km_to_seconds(10.0);
        assert_eq!(seconds, 900.0);
    }
}
