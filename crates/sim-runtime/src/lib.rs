#![deny(warnings)]

//! Simulation runtime: graph store, disruption propagation, time stepping and
//! the session orchestrator.
//!
//! Every component works on one explicitly owned [`Simulation`]; there is no
//! process-wide state. Wrap it in [`SharedSimulation`] to serve it behind a
//! concurrent boundary.

pub mod disruption;
pub mod error;
pub mod shared;
pub mod simulation;
pub mod step;
pub mod store;

pub use disruption::Propagation;
pub use error::SimError;
pub use shared::SharedSimulation;
pub use simulation::{Simulation, Snapshot};
pub use sim_risk::HealthSummary;
pub use step::MetricsHistory;
pub use store::{Adjacency, GraphStore};
