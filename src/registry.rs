//! Stop registry: the resolved set of known stops for a run.
//!
//! Known stops come from the persisted store document; new stops are
//! discovered from run input rows, geocoded, and assigned fresh ids.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::PlanError;
use crate::geocode::geocode_with_cleanup;
use crate::stop::{Stop, StopId};
use crate::traits::Geocoder;

/// Run input naming the stops to visit.
#[derive(Debug, Clone)]
pub enum VisitInput {
    /// Identifiers of already-known stops.
    Ids(Vec<StopId>),
    /// Tabular rows; unmatched rows become newly discovered stops.
    Rows(Vec<VisitRow>),
}

/// One row of tabular visit input.
#[derive(Debug, Clone)]
pub struct VisitRow {
    pub name: String,
    pub address: String,
}

/// Collapses whitespace and case so that trivially different spellings
/// of the same address compare equal.
pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// All stops known to the planner, keyed by id. The depot is always
/// present and holds the reserved lowest id.
#[derive(Debug, Clone)]
pub struct CustomerRegistry {
    stops: BTreeMap<StopId, Stop>,
}

impl CustomerRegistry {
    /// Builds a registry from loaded stop records. Duplicate ids and a
    /// missing depot are input defects.
    pub fn from_stops(records: Vec<Stop>) -> Result<Self, PlanError> {
        let mut stops = BTreeMap::new();
        for stop in records {
            let id = stop.id.clone();
            if stops.insert(id.clone(), stop).is_some() {
                return Err(PlanError::Validation(format!("duplicate stop id {id}")));
            }
        }
        if !stops.contains_key(&StopId::depot()) {
            return Err(PlanError::Validation(format!(
                "depot record {} is missing",
                StopId::depot()
            )));
        }
        Ok(Self { stops })
    }

    pub fn depot(&self) -> &Stop {
        // Presence is guaranteed by the constructor.
        &self.stops[&StopId::depot()]
    }

    pub fn get(&self, id: &StopId) -> Option<&Stop> {
        self.stops.get(id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// The next fresh id: strictly greater than every existing id.
    fn next_id(&self) -> StopId {
        let max = self.stops.keys().map(StopId::number).max().unwrap_or(0);
        StopId::from_number(max + 1)
    }

    /// Resolves run input into the ordered visit list: depot first,
    /// remaining stops sorted by id. Marks the visit flag on every
    /// resolved stop and registers newly discovered ones.
    pub fn resolve_visits<G: Geocoder>(
        &mut self,
        input: &VisitInput,
        geocoder: &G,
    ) -> Result<Vec<StopId>, PlanError> {
        for stop in self.stops.values_mut() {
            stop.visit = false;
        }

        let mut ids = match input {
            VisitInput::Ids(ids) => {
                for id in ids {
                    if !self.stops.contains_key(id) {
                        return Err(PlanError::Validation(format!(
                            "visit list references unknown stop {id}"
                        )));
                    }
                }
                ids.clone()
            }
            VisitInput::Rows(rows) => {
                let mut resolved = Vec::with_capacity(rows.len());
                for row in rows {
                    resolved.push(self.resolve_row(row, geocoder)?);
                }
                resolved
            }
        };

        ids.sort();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(PlanError::Validation(format!(
                "stop {} appears more than once in the visit list",
                pair[0]
            )));
        }

        let depot = StopId::depot();
        if ids.first() != Some(&depot) {
            ids.insert(0, depot);
        }
        for id in &ids {
            if let Some(stop) = self.stops.get_mut(id) {
                stop.visit = true;
            }
        }
        info!(count = ids.len() - 1, "visit list resolved");
        Ok(ids)
    }

    /// Matches a row against known stops by exact name and normalized
    /// address; an unmatched row becomes a new stop.
    fn resolve_row<G: Geocoder>(
        &mut self,
        row: &VisitRow,
        geocoder: &G,
    ) -> Result<StopId, PlanError> {
        let wanted = normalize_address(&row.address);
        let matched = self
            .stops
            .values()
            .find(|stop| stop.name == row.name && normalize_address(&stop.address) == wanted)
            .map(|stop| stop.id.clone());
        if let Some(id) = matched {
            debug!(%id, name = %row.name, "visit row matched known stop");
            return Ok(id);
        }

        let located = geocode_with_cleanup(geocoder, &row.address)?;
        let id = self.next_id();
        info!(%id, name = %row.name, "registering newly discovered stop");
        let mut stop = Stop::new(
            id.clone(),
            row.name.clone(),
            located.normalized_address,
            located.latitude,
            located.longitude,
        );
        stop.visit = true;
        self.stops.insert(id.clone(), stop);
        Ok(id)
    }

    /// Re-geocodes one stop's address, refreshing its coordinates and
    /// canonical address in place.
    pub fn refresh_coordinates<G: Geocoder>(
        &mut self,
        id: &StopId,
        geocoder: &G,
    ) -> Result<(), PlanError> {
        let stop = self
            .stops
            .get_mut(id)
            .ok_or_else(|| PlanError::Validation(format!("unknown stop {id}")))?;
        let located = geocode_with_cleanup(geocoder, &stop.address)?;
        stop.address = located.normalized_address;
        stop.latitude = located.latitude;
        stop.longitude = located.longitude;
        info!(%id, "coordinates refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address("  12   Roast House\tLane "),
            "12 roast house lane"
        );
    }

    #[test]
    fn test_from_stops_requires_depot() {
        let stops = vec![Stop::new(StopId::from_number(1), "A", "a st", 0.0, 0.0)];
        assert!(matches!(
            CustomerRegistry::from_stops(stops),
            Err(PlanError::Validation(_))
        ));
    }

    #[test]
    fn test_from_stops_rejects_duplicate_ids() {
        let stops = vec![
            Stop::new(StopId::depot(), "Depot", "d st", 0.0, 0.0),
            Stop::new(StopId::from_number(1), "A", "a st", 0.0, 0.0),
            Stop::new(StopId::from_number(1), "B", "b st", 0.0, 0.0),
        ];
        assert!(matches!(
            CustomerRegistry::from_stops(stops),
            Err(PlanError::Validation(_))
        ));
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let registry = CustomerRegistry::from_stops(vec![
            Stop::new(StopId::depot(), "Depot", "d st", 0.0, 0.0),
            Stop::new(StopId::from_number(7), "A", "a st", 0.0, 0.0),
        ])
        .expect("valid registry");
        assert_eq!(registry.next_id().as_str(), "000008");
    }
}
