//! The synchronous planning pipeline.
//!
//! One run is: resolve visits → ensure the duration matrix is complete
//! → build the model → solve → extract. Validation and consistency
//! failures abort before the solver starts; an infeasible assignment
//! is an ordinary outcome.

use std::path::Path;

use tracing::info;

use crate::error::PlanError;
use crate::extract::{extract, Solution};
use crate::model::RouteModel;
use crate::registry::{CustomerRegistry, VisitInput};
use crate::solver::{solve, SolveOptions, SolveOutcome};
use crate::stop::{RunParams, Stop};
use crate::store::DistanceStore;
use crate::traits::{Geocoder, MatrixProvider};

/// Result of one planning run.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Solved(Solution),
    /// No assignment satisfies the ceiling with the given fleet. The
    /// caller can add vehicles or relax the ceiling and rerun.
    Infeasible { reason: String },
}

/// Everything a run needs beyond registry and store.
pub struct PlanConfig<'a> {
    pub params: &'a RunParams,
    /// Fetch missing durations through the matrix provider instead of
    /// failing on an incomplete store.
    pub auto_fetch: bool,
    /// Where to persist the store after a successful fetch. Ignored
    /// when nothing was fetched.
    pub store_path: Option<&'a Path>,
}

pub fn plan<P: MatrixProvider, G: Geocoder>(
    registry: &mut CustomerRegistry,
    store: &mut DistanceStore,
    visits: &VisitInput,
    provider: &P,
    geocoder: &G,
    config: &PlanConfig<'_>,
) -> Result<PlanOutcome, PlanError> {
    config.params.validate()?;

    let visit_ids = registry.resolve_visits(visits, geocoder)?;
    info!(stops = visit_ids.len() - 1, "visit set resolved");

    let missing = store.ensure_complete(&visit_ids);
    if !missing.is_empty() {
        if !config.auto_fetch {
            // RouteModel::build reports the missing pairs.
            info!(missing = missing.len(), "distance store incomplete, auto-fetch disabled");
        } else {
            let visit_stops: Vec<Stop> = visit_ids
                .iter()
                .filter_map(|id| registry.get(id))
                .cloned()
                .collect();
            let merged = store.fetch_missing(&visit_stops, provider)?;
            info!(merged, "fetched durations for incomplete stops");
            if merged > 0 {
                if let Some(path) = config.store_path {
                    let customers: Vec<Stop> = registry.stops().cloned().collect();
                    store.persist(path, &customers)?;
                }
            }
        }
    }

    let model = RouteModel::build(registry, store, &visit_ids)?;
    let options = SolveOptions::from_params(config.params);
    match solve(model.matrix(), &options) {
        SolveOutcome::Feasible(raw) => {
            let solution = extract(&model, registry, &raw)?;
            Ok(PlanOutcome::Solved(solution))
        }
        SolveOutcome::Infeasible { reason } => {
            info!(%reason, "no feasible assignment");
            Ok(PlanOutcome::Infeasible { reason })
        }
    }
}
