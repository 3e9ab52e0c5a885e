//! Shared test fixtures: stop builders and in-process collaborators.

// Not every test file uses every fixture.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use depot_planner::error::ProviderError;
use depot_planner::stop::{Stop, StopId};
use depot_planner::store::DistanceStore;
use depot_planner::traits::{GeocodedAddress, Geocoder, MatrixProvider};

pub fn depot(lat: f64, lng: f64) -> Stop {
    Stop::new(StopId::depot(), "Depot", "1 Depot Way", lat, lng)
}

pub fn stop(n: u32, name: &str, lat: f64, lng: f64) -> Stop {
    Stop::new(
        StopId::from_number(n),
        name,
        format!("{n} {name} St"),
        lat,
        lng,
    )
}

/// Grid provider: one coordinate unit of Manhattan distance is one
/// minute of driving. Simple and predictable.
pub struct GridMatrix;

impl MatrixProvider for GridMatrix {
    fn durations(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Vec<f64>>, ProviderError> {
        Ok(sources
            .iter()
            .map(|&(slat, slng)| {
                destinations
                    .iter()
                    .map(|&(dlat, dlng)| ((slat - dlat).abs() + (slng - dlng).abs()) * 60.0)
                    .collect()
            })
            .collect())
    }
}

/// Fails a fixed number of requests before behaving like [`GridMatrix`].
pub struct FlakyMatrix {
    failures_left: RefCell<u32>,
}

impl FlakyMatrix {
    pub fn failing(times: u32) -> Self {
        Self {
            failures_left: RefCell::new(times),
        }
    }
}

impl MatrixProvider for FlakyMatrix {
    fn durations(
        &self,
        sources: &[(f64, f64)],
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Vec<f64>>, ProviderError> {
        let mut left = self.failures_left.borrow_mut();
        if *left > 0 {
            *left -= 1;
            return Err(ProviderError::new("transient outage"));
        }
        drop(left);
        GridMatrix.durations(sources, destinations)
    }
}

/// Geocoder backed by a fixed address book.
pub struct StaticGeocoder {
    entries: HashMap<String, (f64, f64)>,
}

impl StaticGeocoder {
    pub fn with(entries: &[(&str, f64, f64)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|&(address, lat, lng)| (address.to_string(), (lat, lng)))
                .collect(),
        }
    }
}

impl Geocoder for StaticGeocoder {
    fn geocode(&self, address: &str) -> Result<GeocodedAddress, ProviderError> {
        let &(latitude, longitude) = self
            .entries
            .get(address)
            .ok_or_else(|| ProviderError::new(format!("no match for '{address}'")))?;
        Ok(GeocodedAddress {
            normalized_address: address.to_string(),
            latitude,
            longitude,
        })
    }
}

/// Geocoder that always fails; for runs that must not geocode at all.
pub struct NoGeocoder;

impl Geocoder for NoGeocoder {
    fn geocode(&self, _address: &str) -> Result<GeocodedAddress, ProviderError> {
        Err(ProviderError::new("geocoding disabled in this test"))
    }
}

/// Builds a store covering every ordered pair among `stops` via the
/// grid provider.
pub fn complete_store(stops: &[Stop]) -> DistanceStore {
    let mut store = DistanceStore::default();
    store
        .fetch_missing(stops, &GridMatrix)
        .expect("grid provider cannot fail");
    store
}
