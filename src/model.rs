//! Projection of registry and store into solver input.

use tracing::debug;

use crate::error::PlanError;
use crate::matrix::Matrix;
use crate::registry::CustomerRegistry;
use crate::stop::StopId;
use crate::store::DistanceStore;

/// How many missing pairs to spell out before truncating the error.
const MISSING_PAIR_PREVIEW: usize = 8;

/// The minimal solver input: an ordered node list with the depot at
/// index 0 and the remaining stops sorted by id, plus the dense
/// duration matrix restricted to exactly those nodes.
#[derive(Debug, Clone)]
pub struct RouteModel {
    nodes: Vec<StopId>,
    matrix: Matrix,
}

impl RouteModel {
    /// Builds the model for the given visit list. Fails without
    /// attempting a partial solve when any ordered pair is absent from
    /// the store; resolving gaps is the caller's job.
    pub fn build(
        registry: &CustomerRegistry,
        store: &DistanceStore,
        visit_ids: &[StopId],
    ) -> Result<Self, PlanError> {
        let mut nodes: Vec<StopId> = visit_ids.to_vec();
        nodes.sort();
        nodes.dedup();
        if nodes.first().map(StopId::is_depot) != Some(true) {
            nodes.insert(0, StopId::depot());
        }
        for id in &nodes {
            if registry.get(id).is_none() {
                return Err(PlanError::Validation(format!(
                    "visit list references unknown stop {id}"
                )));
            }
        }

        let missing = store.ensure_complete(&nodes);
        if !missing.is_empty() {
            let preview: Vec<String> = missing
                .iter()
                .take(MISSING_PAIR_PREVIEW)
                .map(ToString::to_string)
                .collect();
            let suffix = if missing.len() > MISSING_PAIR_PREVIEW {
                format!(" and {} more", missing.len() - MISSING_PAIR_PREVIEW)
            } else {
                String::new()
            };
            return Err(PlanError::DataConsistency(format!(
                "{} pair(s) missing from the distance store: {}{}",
                missing.len(),
                preview.join(", "),
                suffix
            )));
        }

        let n = nodes.len();
        let mut matrix = Matrix::new(n);
        for (i, origin) in nodes.iter().enumerate() {
            for (j, dest) in nodes.iter().enumerate() {
                if i == j {
                    continue;
                }
                // ensure_complete has already proven presence.
                let secs = store.get(origin, dest).ok_or_else(|| {
                    PlanError::InternalInvariant(format!(
                        "pair ({origin}, {dest}) vanished between completeness check and build"
                    ))
                })?;
                matrix.set(i, j, secs.round() as i64);
            }
        }
        debug!(nodes = n, "route model built");
        Ok(Self { nodes, matrix })
    }

    pub fn nodes(&self) -> &[StopId] {
        &self.nodes
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Node count, depot included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
