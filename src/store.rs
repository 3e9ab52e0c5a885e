//! Persisted asymmetric travel-duration cache.
//!
//! The store holds one duration per ordered pair of stop ids and grows
//! incrementally as new stops are discovered, without recomputing
//! known pairs. On disk it is a single JSON document carrying the stop
//! attribute records and the pair-keyed durations.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{PlanError, ProviderError};
use crate::stop::{Stop, StopId};
use crate::traits::MatrixProvider;

/// Attempts per provider request before surfacing the failure.
const PROVIDER_ATTEMPTS: u32 = 3;
/// Initial backoff delay, doubled after each failed attempt.
const BACKOFF_BASE_MS: u64 = 250;

/// Ordered (origin, destination) key for one stored duration.
///
/// Both directions of a pair are independent entries; road networks
/// are not symmetric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub origin: StopId,
    pub dest: StopId,
}

impl PairKey {
    pub fn new(origin: StopId, dest: StopId) -> Self {
        Self { origin, dest }
    }

    /// Parses the persisted key encoding `('000000', '000123')`.
    ///
    /// The encoding is unambiguous only because ids are fixed-width
    /// digits; anything else is rejected outright.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        let malformed = || PlanError::DataConsistency(format!("malformed distance key '{raw}'"));
        let inner = raw
            .strip_prefix("('")
            .and_then(|rest| rest.strip_suffix("')"))
            .ok_or_else(malformed)?;
        let (origin, dest) = inner.split_once("', '").ok_or_else(malformed)?;
        Ok(Self {
            origin: StopId::parse(origin).map_err(|_| malformed())?,
            dest: StopId::parse(dest).map_err(|_| malformed())?,
        })
    }

    fn encode(&self) -> String {
        format!("('{}', '{}')", self.origin, self.dest)
    }
}

impl std::fmt::Display for PairKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// On-disk shape of the store.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    customers: Vec<Stop>,
    #[serde(default)]
    distances: BTreeMap<String, f64>,
}

/// In-memory duration cache over all known stops.
#[derive(Debug, Default, Clone)]
pub struct DistanceStore {
    durations: BTreeMap<PairKey, f64>,
}

impl DistanceStore {
    /// Loads the persisted document, returning the embedded stop
    /// records alongside the duration cache. Malformed pair keys and
    /// negative durations are rejected; no partial load is returned.
    pub fn load(path: &Path) -> Result<(Vec<Stop>, Self), PlanError> {
        let raw = fs::read_to_string(path)?;
        let document: StoreDocument = serde_json::from_str(&raw)?;

        let mut store = Self::default();
        for (raw_key, secs) in document.distances {
            let key = PairKey::parse(&raw_key)?;
            store.insert(key, secs)?;
        }
        info!(
            stops = document.customers.len(),
            pairs = store.len(),
            "distance store loaded"
        );
        Ok((document.customers, store))
    }

    pub fn get(&self, origin: &StopId, dest: &StopId) -> Option<f64> {
        self.durations
            .get(&PairKey::new(origin.clone(), dest.clone()))
            .copied()
    }

    /// Records one duration. Negative values indicate a defect in the
    /// provider adapter and are fatal.
    pub fn insert(&mut self, key: PairKey, secs: f64) -> Result<(), PlanError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(PlanError::InternalInvariant(format!(
                "duration for {key} must be finite and non-negative, got {secs}"
            )));
        }
        self.durations.insert(key, secs);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Returns every ordered pair among `ids` that the store lacks, in
    /// (origin, dest) id order. Self-pairs are exempt; the model
    /// builder fixes the diagonal at zero.
    pub fn ensure_complete(&self, ids: &[StopId]) -> Vec<PairKey> {
        let mut sorted: Vec<&StopId> = ids.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut missing = Vec::new();
        for &origin in &sorted {
            for &dest in &sorted {
                if origin == dest {
                    continue;
                }
                let key = PairKey::new(origin.clone(), dest.clone());
                if !self.durations.contains_key(&key) {
                    missing.push(key);
                }
            }
        }
        missing
    }

    /// Merges durations between `new_stop` and every stop in `known`
    /// using exactly two batched provider queries: one with the new
    /// stop as the sole source, one with it as the sole destination.
    /// With no known stops, seeds the zero self-loop instead.
    ///
    /// Pairs not involving `new_stop` are never touched.
    pub fn merge_new<P: MatrixProvider>(
        &mut self,
        new_stop: &Stop,
        known: &[Stop],
        provider: &P,
    ) -> Result<(), PlanError> {
        if known.is_empty() {
            debug!(id = %new_stop.id, "seeding self-loop for sole stop");
            return self.insert(PairKey::new(new_stop.id.clone(), new_stop.id.clone()), 0.0);
        }

        let new_coord = new_stop.location();
        let known_coords: Vec<(f64, f64)> = known.iter().map(Stop::location).collect();

        let outbound = with_backoff("matrix outbound", || {
            provider.durations(&[new_coord], &known_coords)
        })?;
        let inbound = with_backoff("matrix inbound", || {
            provider.durations(&known_coords, &[new_coord])
        })?;

        let forward = expect_row(&outbound, known.len(), new_stop)?;
        for (stop, &secs) in known.iter().zip(forward) {
            self.insert(PairKey::new(new_stop.id.clone(), stop.id.clone()), secs)?;
        }
        if inbound.len() != known.len() {
            return Err(PlanError::InternalInvariant(format!(
                "provider returned {} rows for {} sources",
                inbound.len(),
                known.len()
            )));
        }
        for (stop, row) in known.iter().zip(&inbound) {
            let &secs = row.first().ok_or_else(|| {
                PlanError::InternalInvariant(format!(
                    "provider returned an empty row for destination {}",
                    new_stop.id
                ))
            })?;
            self.insert(PairKey::new(stop.id.clone(), new_stop.id.clone()), secs)?;
        }
        info!(id = %new_stop.id, known = known.len(), "merged durations for new stop");
        Ok(())
    }

    /// Fetches durations for every stop still missing pairs, merging
    /// one stop at a time in id order. Returns how many stops were
    /// merged.
    pub fn fetch_missing<P: MatrixProvider>(
        &mut self,
        stops: &[Stop],
        provider: &P,
    ) -> Result<usize, PlanError> {
        let mut sorted: Vec<&Stop> = stops.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut merged = 0;
        for &stop in &sorted {
            let incomplete = sorted.iter().any(|other| {
                other.id != stop.id
                    && (self.get(&stop.id, &other.id).is_none()
                        || self.get(&other.id, &stop.id).is_none())
            });
            if !incomplete {
                continue;
            }
            let others: Vec<Stop> = sorted
                .iter()
                .filter(|other| other.id != stop.id)
                .map(|&other| other.clone())
                .collect();
            self.merge_new(stop, &others, provider)?;
            merged += 1;
        }
        Ok(merged)
    }

    /// Writes the store durably, together with the stop records it
    /// covers. The document is written to a temporary file in the same
    /// directory and renamed into place, so a crash mid-write leaves
    /// the previous file intact.
    pub fn persist(&self, path: &Path, customers: &[Stop]) -> Result<(), PlanError> {
        let mut sorted: Vec<Stop> = customers.to_vec();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let document = StoreDocument {
            customers: sorted,
            distances: self
                .durations
                .iter()
                .map(|(key, &secs)| (key.encode(), secs))
                .collect(),
        };

        let tmp_path = path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer_pretty(&mut writer, &document)?;
        writer.flush()?;
        fs::rename(&tmp_path, path)?;
        info!(path = %path.display(), pairs = self.len(), "distance store persisted");
        Ok(())
    }
}

fn expect_row<'a>(
    rows: &'a [Vec<f64>],
    width: usize,
    new_stop: &Stop,
) -> Result<&'a [f64], PlanError> {
    match rows {
        [row] if row.len() == width => Ok(row),
        _ => Err(PlanError::InternalInvariant(format!(
            "provider returned a malformed sub-matrix for {}: expected 1x{width}",
            new_stop.id
        ))),
    }
}

/// Runs a provider request with bounded exponential backoff.
pub(crate) fn with_backoff<T>(
    label: &str,
    mut request: impl FnMut() -> Result<T, ProviderError>,
) -> Result<T, PlanError> {
    let mut delay = Duration::from_millis(BACKOFF_BASE_MS);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match request() {
            Ok(value) => return Ok(value),
            Err(err) if attempt < PROVIDER_ATTEMPTS => {
                warn!(label, attempt, error = %err, "provider request failed, retrying");
                thread::sleep(delay);
                delay *= 2;
            }
            Err(err) => {
                return Err(PlanError::Provider {
                    attempts: attempt,
                    source: err,
                });
            }
        }
    }
}
