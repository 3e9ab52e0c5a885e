//! Route optimization engine.
//!
//! Two phases over a dense duration matrix: cheapest-insertion
//! construction, then best-improvement local search over a fixed move
//! neighborhood (relocate, swap, 2-opt). The search minimizes total
//! travel time plus a weighted penalty on the spread between the
//! longest and shortest route, with every route capped by a duration
//! ceiling.
//!
//! Determinism: identical inputs always produce identical assignments.
//! Candidate moves are enumerated in a fixed order, evaluated over a
//! read-only snapshot (in parallel), and selected by (cost delta,
//! enumeration index); ties in construction fall to the lowest node,
//! then route, then position.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::matrix::Matrix;
use crate::stop::RunParams;

#[derive(Debug, Clone)]
pub struct SolveOptions {
    /// Number of vehicles (routes) available.
    pub n_routes: usize,
    /// Maximum cumulative duration per route, in seconds.
    pub max_route_duration: i64,
    /// Weight on (longest route − shortest route) in the objective.
    pub span_cost_coefficient: i64,
    /// Cap on applied local-search moves.
    pub max_iterations: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            n_routes: 1,
            max_route_duration: 28_800,
            span_cost_coefficient: 100,
            max_iterations: 1000,
        }
    }
}

impl SolveOptions {
    pub fn from_params(params: &RunParams) -> Self {
        Self {
            n_routes: params.n_routes,
            max_route_duration: params.max_route_duration,
            span_cost_coefficient: params.span_cost_coefficient,
            ..Self::default()
        }
    }
}

/// Engine output in node indices: one cycle per vehicle, each starting
/// and ending at the depot index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSolution {
    pub routes: Vec<Vec<usize>>,
    pub total_duration: i64,
    pub max_route_duration: i64,
}

/// Outcome of a solve. Infeasibility is an expected result, not an
/// error: the caller may relax the ceiling or add vehicles and retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Feasible(RawSolution),
    Infeasible { reason: String },
}

/// Mutable search state: interior node sequences (no depot endpoints)
/// and the cached duration of each route.
#[derive(Debug, Clone)]
struct Working {
    routes: Vec<Vec<usize>>,
    durations: Vec<i64>,
}

pub fn solve(matrix: &Matrix, options: &SolveOptions) -> SolveOutcome {
    if options.n_routes == 0 {
        return SolveOutcome::Infeasible {
            reason: "no vehicles available".to_string(),
        };
    }
    if matrix.size() == 0 {
        return SolveOutcome::Infeasible {
            reason: "model has no depot node".to_string(),
        };
    }

    let mut working = match construct(matrix, options) {
        Ok(working) => working,
        Err(reason) => return SolveOutcome::Infeasible { reason },
    };
    let iterations = improve(&mut working, matrix, options);

    let total: i64 = working.durations.iter().sum();
    let max = working.durations.iter().copied().max().unwrap_or(0);
    info!(
        routes = working.routes.len(),
        iterations,
        total_duration = total,
        max_route_duration = max,
        "solve finished"
    );

    SolveOutcome::Feasible(RawSolution {
        routes: working
            .routes
            .into_iter()
            .map(|interior| {
                let mut route = Vec::with_capacity(interior.len() + 2);
                route.push(0);
                route.extend(interior);
                route.push(0);
                route
            })
            .collect(),
        total_duration: total,
        max_route_duration: max,
    })
}

/// Duration of one route given its interior nodes: depot out, between
/// consecutive stops, depot back. Empty interior is a zero-duration
/// stay at the depot.
fn route_duration(matrix: &Matrix, interior: &[usize]) -> i64 {
    let Some((&first, rest)) = interior.split_first() else {
        return 0;
    };
    let mut duration = matrix.get(0, first);
    let mut prev = first;
    for &node in rest {
        duration += matrix.get(prev, node);
        prev = node;
    }
    duration + matrix.get(prev, 0)
}

/// Marginal duration of inserting `node` at `pos`.
fn insertion_delta(matrix: &Matrix, interior: &[usize], pos: usize, node: usize) -> i64 {
    let prev = if pos == 0 { 0 } else { interior[pos - 1] };
    let next = if pos == interior.len() {
        0
    } else {
        interior[pos]
    };
    matrix.get(prev, node) + matrix.get(node, next) - matrix.get(prev, next)
}

fn weighted_cost(durations: &[i64], span_coefficient: i64) -> i64 {
    let total: i64 = durations.iter().sum();
    let max = durations.iter().copied().max().unwrap_or(0);
    let min = durations.iter().copied().min().unwrap_or(0);
    total + span_coefficient * (max - min)
}

// ============================================================================
// Phase 1: cheapest insertion
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Insertion {
    delta: i64,
    node: usize,
    route: usize,
    pos: usize,
}

fn construct(matrix: &Matrix, options: &SolveOptions) -> Result<Working, String> {
    let mut working = Working {
        routes: vec![Vec::new(); options.n_routes],
        durations: vec![0; options.n_routes],
    };
    // Ascending order doubles as the tie-break: the first minimum found
    // is the one with the lowest node, then route, then position.
    let mut unrouted: Vec<usize> = (1..matrix.size()).collect();

    while !unrouted.is_empty() {
        let mut best: Option<Insertion> = None;
        for &node in &unrouted {
            for (route, interior) in working.routes.iter().enumerate() {
                for pos in 0..=interior.len() {
                    let delta = insertion_delta(matrix, interior, pos, node);
                    if working.durations[route] + delta > options.max_route_duration {
                        continue;
                    }
                    if best.is_none_or(|b| delta < b.delta) {
                        best = Some(Insertion {
                            delta,
                            node,
                            route,
                            pos,
                        });
                    }
                }
            }
        }

        let Some(insertion) = best else {
            return Err(format!(
                "{} stop(s) cannot be placed on {} route(s) within a {}s ceiling",
                unrouted.len(),
                options.n_routes,
                options.max_route_duration
            ));
        };
        working.routes[insertion.route].insert(insertion.pos, insertion.node);
        working.durations[insertion.route] += insertion.delta;
        unrouted.retain(|&node| node != insertion.node);
        debug!(
            node = insertion.node,
            route = insertion.route,
            pos = insertion.pos,
            delta = insertion.delta,
            "inserted"
        );
    }
    Ok(working)
}

// ============================================================================
// Phase 2: local search
// ============================================================================

/// One candidate move over the current solution snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Move {
    /// Take the node at `from` and reinsert it at `to_pos` (a position
    /// in the target route after removal for same-route moves).
    Relocate {
        from_route: usize,
        from_pos: usize,
        to_route: usize,
        to_pos: usize,
    },
    /// Exchange the nodes at two positions.
    Swap {
        route_a: usize,
        pos_a: usize,
        route_b: usize,
        pos_b: usize,
    },
    /// Reverse the interior segment `[start..=end]` of one route.
    TwoOpt {
        route: usize,
        start: usize,
        end: usize,
    },
}

/// A route rewritten by a move, with its recomputed duration.
#[derive(Debug, Clone)]
struct RouteChange {
    route: usize,
    interior: Vec<usize>,
    duration: i64,
}

/// Fixed enumeration order: every relocate, then every swap, then
/// every 2-opt, each block in lexicographic index order. The position
/// in this list breaks cost ties.
fn enumerate_moves(working: &Working) -> Vec<Move> {
    let mut moves = Vec::new();
    let lens: Vec<usize> = working.routes.iter().map(Vec::len).collect();

    for (from_route, &from_len) in lens.iter().enumerate() {
        for from_pos in 0..from_len {
            for (to_route, &to_len) in lens.iter().enumerate() {
                if to_route == from_route {
                    for to_pos in 0..to_len {
                        if to_pos == from_pos {
                            continue;
                        }
                        moves.push(Move::Relocate {
                            from_route,
                            from_pos,
                            to_route,
                            to_pos,
                        });
                    }
                } else {
                    for to_pos in 0..=to_len {
                        moves.push(Move::Relocate {
                            from_route,
                            from_pos,
                            to_route,
                            to_pos,
                        });
                    }
                }
            }
        }
    }

    for (route_a, &len_a) in lens.iter().enumerate() {
        for pos_a in 0..len_a {
            for (route_b, &len_b) in lens.iter().enumerate().skip(route_a) {
                let start_b = if route_a == route_b { pos_a + 1 } else { 0 };
                for pos_b in start_b..len_b {
                    moves.push(Move::Swap {
                        route_a,
                        pos_a,
                        route_b,
                        pos_b,
                    });
                }
            }
        }
    }

    for (route, &len) in lens.iter().enumerate() {
        if len < 2 {
            continue;
        }
        for start in 0..len - 1 {
            for end in start + 1..len {
                moves.push(Move::TwoOpt { route, start, end });
            }
        }
    }

    moves
}

/// Rewrites the routes a move touches. Returns `None` when a rewritten
/// route would exceed the ceiling.
fn rewrite(working: &Working, matrix: &Matrix, options: &SolveOptions, mv: Move) -> Option<Vec<RouteChange>> {
    let changes = match mv {
        Move::Relocate {
            from_route,
            from_pos,
            to_route,
            to_pos,
        } => {
            if from_route == to_route {
                let mut interior = working.routes[from_route].clone();
                let node = interior.remove(from_pos);
                let adjusted = if to_pos > from_pos { to_pos - 1 } else { to_pos };
                interior.insert(adjusted, node);
                vec![change(matrix, from_route, interior)]
            } else {
                let mut from_interior = working.routes[from_route].clone();
                let node = from_interior.remove(from_pos);
                let mut to_interior = working.routes[to_route].clone();
                to_interior.insert(to_pos, node);
                vec![
                    change(matrix, from_route, from_interior),
                    change(matrix, to_route, to_interior),
                ]
            }
        }
        Move::Swap {
            route_a,
            pos_a,
            route_b,
            pos_b,
        } => {
            if route_a == route_b {
                let mut interior = working.routes[route_a].clone();
                interior.swap(pos_a, pos_b);
                vec![change(matrix, route_a, interior)]
            } else {
                let mut interior_a = working.routes[route_a].clone();
                let mut interior_b = working.routes[route_b].clone();
                std::mem::swap(&mut interior_a[pos_a], &mut interior_b[pos_b]);
                vec![
                    change(matrix, route_a, interior_a),
                    change(matrix, route_b, interior_b),
                ]
            }
        }
        Move::TwoOpt { route, start, end } => {
            let mut interior = working.routes[route].clone();
            interior[start..=end].reverse();
            vec![change(matrix, route, interior)]
        }
    };

    changes
        .iter()
        .all(|c| c.duration <= options.max_route_duration)
        .then_some(changes)
}

fn change(matrix: &Matrix, route: usize, interior: Vec<usize>) -> RouteChange {
    let duration = route_duration(matrix, &interior);
    RouteChange {
        route,
        interior,
        duration,
    }
}

/// Weighted-cost delta of a move, or `None` when it is infeasible or
/// not strictly improving.
fn evaluate(
    working: &Working,
    matrix: &Matrix,
    options: &SolveOptions,
    current_cost: i64,
    mv: Move,
) -> Option<i64> {
    let changes = rewrite(working, matrix, options, mv)?;
    let mut durations = working.durations.clone();
    for c in &changes {
        durations[c.route] = c.duration;
    }
    let delta = weighted_cost(&durations, options.span_cost_coefficient) - current_cost;
    (delta < 0).then_some(delta)
}

/// Runs best-improvement local search until no improving move remains
/// or the iteration budget is exhausted. Candidate evaluation runs in
/// parallel over the snapshot; each chosen move is applied serially.
/// Returns the number of applied moves.
fn improve(working: &mut Working, matrix: &Matrix, options: &SolveOptions) -> usize {
    let mut iterations = 0;
    while iterations < options.max_iterations {
        let moves = enumerate_moves(working);
        let current_cost = weighted_cost(&working.durations, options.span_cost_coefficient);
        let snapshot: &Working = working;

        let best = moves
            .par_iter()
            .enumerate()
            .filter_map(|(index, &mv)| {
                evaluate(snapshot, matrix, options, current_cost, mv).map(|delta| (delta, index))
            })
            .min();

        let Some((delta, index)) = best else {
            break;
        };
        let Some(changes) = rewrite(working, matrix, options, moves[index]) else {
            // evaluate only returns moves rewrite accepted.
            break;
        };
        for c in changes {
            working.routes[c.route] = c.interior;
            working.durations[c.route] = c.duration;
        }
        iterations += 1;
        debug!(iteration = iterations, delta, "applied improving move");
    }
    iterations
}
