//! Conversion of raw engine output into reportable routes.

use serde::Serialize;
use tracing::info;

use crate::error::PlanError;
use crate::model::RouteModel;
use crate::registry::CustomerRegistry;
use crate::solver::RawSolution;
use crate::stop::Stop;

/// One vehicle's route: stops in visiting order, depot first and last,
/// with the cumulative travel duration in seconds. A vehicle with no
/// assignment is a depot-only route of zero duration.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub stops: Vec<Stop>,
    pub duration: i64,
}

/// The reportable result: one route per vehicle, plus the longest
/// route duration across the fleet.
#[derive(Debug, Clone, Serialize)]
pub struct Solution {
    pub routes: Vec<Route>,
    pub max_route_duration: i64,
}

/// Maps raw node-index cycles back onto stop records, recomputing each
/// route's duration from the model matrix.
pub fn extract(
    model: &RouteModel,
    registry: &CustomerRegistry,
    raw: &RawSolution,
) -> Result<Solution, PlanError> {
    let mut routes = Vec::with_capacity(raw.routes.len());
    let mut max_route_duration = 0;

    for cycle in &raw.routes {
        let mut stops = Vec::with_capacity(cycle.len());
        let mut duration = 0;
        for (leg, &index) in cycle.iter().enumerate() {
            let id = model.nodes().get(index).ok_or_else(|| {
                PlanError::InternalInvariant(format!("route references node index {index}"))
            })?;
            let stop = registry.get(id).ok_or_else(|| {
                PlanError::InternalInvariant(format!("route references unknown stop {id}"))
            })?;
            if leg > 0 {
                duration += model.matrix().get(cycle[leg - 1], index);
            }
            stops.push(stop.clone());
        }

        let names: Vec<&str> = stops.iter().map(|s| s.name.as_str()).collect();
        info!(route = routes.len(), duration, path = %names.join(" -> "), "route");
        max_route_duration = max_route_duration.max(duration);
        routes.push(Route { stops, duration });
    }

    info!(max_route_duration, "longest route");
    Ok(Solution {
        routes,
        max_route_duration,
    })
}
