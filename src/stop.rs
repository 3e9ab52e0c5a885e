//! Stop and run-parameter value types.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// Number of digits in a stop id.
pub const ID_WIDTH: usize = 6;

/// The reserved id of the depot. Always the lowest id in a registry,
/// so an id-sorted node list puts the depot first.
pub const DEPOT_ID: &str = "000000";

/// Fixed-width, zero-padded stop identifier.
///
/// Ids are assigned monotonically and never reused. The zero padding
/// makes lexicographic order agree with numeric order, which the node
/// ordering of [`crate::model::RouteModel`] relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StopId(String);

impl StopId {
    /// Parses an id, requiring exactly [`ID_WIDTH`] ASCII digits.
    pub fn parse(raw: &str) -> Result<Self, PlanError> {
        if raw.len() != ID_WIDTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PlanError::Validation(format!(
                "stop id must be {ID_WIDTH} digits, got '{raw}'"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn from_number(n: u32) -> Self {
        Self(format!("{n:0width$}", width = ID_WIDTH))
    }

    pub fn depot() -> Self {
        Self(DEPOT_ID.to_string())
    }

    pub fn is_depot(&self) -> bool {
        self.0 == DEPOT_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, used when assigning the next fresh id.
    pub fn number(&self) -> u32 {
        // The constructor guarantees ID_WIDTH ASCII digits.
        self.0.parse().unwrap_or(0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for StopId {
    type Error = PlanError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<StopId> for String {
    fn from(id: StopId) -> Self {
        id.0
    }
}

/// A depot or customer location.
///
/// Created once on first discovery or load and never deleted; only the
/// per-run `visit` flag and, rarely, the coordinates are refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether this stop is part of the current run. Not persisted.
    #[serde(default, skip_serializing)]
    pub visit: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_order: Option<u32>,
}

impl Stop {
    pub fn new(
        id: StopId,
        name: impl Into<String>,
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            address: address.into(),
            latitude,
            longitude,
            visit: false,
            delivery_day: None,
            delivery_order: None,
        }
    }

    /// Location as (lat, lng).
    pub fn location(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Parameters for one planning run. Ephemeral, scoped to an invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Number of vehicles departing from the depot.
    pub n_routes: usize,
    /// Maximum cumulative travel time per route, in seconds.
    pub max_route_duration: i64,
    /// Weight on the spread between the longest and shortest route.
    pub span_cost_coefficient: i64,
    /// Opaque constraint payload, accepted and passed through so that
    /// older parameter files keep loading. The engine does not read it.
    pub constraints: serde_json::Value,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            n_routes: 1,
            max_route_duration: 28_800, // 8 hours
            span_cost_coefficient: 100,
            constraints: serde_json::Value::Null,
        }
    }
}

impl RunParams {
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let raw = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&raw)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.n_routes == 0 {
            return Err(PlanError::Validation(
                "n_routes must be at least 1".to_string(),
            ));
        }
        if self.max_route_duration <= 0 {
            return Err(PlanError::Validation(format!(
                "max_route_duration must be positive, got {}",
                self.max_route_duration
            )));
        }
        Ok(())
    }
}
