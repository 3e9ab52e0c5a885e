//! depot-planner core
//!
//! Plans depot-out-and-back routes for a small fleet over a persisted,
//! incrementally grown travel-duration matrix.

pub mod error;
pub mod stop;
pub mod matrix;
pub mod traits;
pub mod store;
pub mod registry;
pub mod model;
pub mod solver;
pub mod extract;
pub mod plan;
pub mod osrm;
pub mod geocode;
pub mod haversine;
