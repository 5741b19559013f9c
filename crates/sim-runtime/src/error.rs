use sim_core::{EdgeId, NodeId, ValidationError};
use sim_risk::RiskError;
use thiserror::Error;

/// Errors surfaced by the graph store and the simulation orchestrator.
///
/// All of these are local and recoverable; nothing is retried internally.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// A node or edge with this id is already present.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    /// An edge references an endpoint that is not in the store.
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: EdgeId, node: NodeId },
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    /// Mutating or aggregating call on a store with zero nodes.
    #[error("simulation not initialized")]
    NotInitialized,
    #[error("step duration must be >= 1 day, got {0}")]
    InvalidDuration(u32),
    #[error("simulated timestamp overflowed")]
    TimestampOverflow,
    /// A restored metrics history contradicts the graph or the clock.
    #[error("history of node {node} {reason}")]
    InconsistentHistory { node: NodeId, reason: &'static str },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Risk(#[from] RiskError),
    /// A writer panicked while holding the shared simulation lock.
    #[error("simulation lock poisoned")]
    LockPoisoned,
}

impl SimError {
    pub(crate) fn node_not_found(id: &NodeId) -> Self {
        SimError::NotFound {
            kind: "node",
            id: id.0.clone(),
        }
    }

    pub(crate) fn edge_not_found(id: &EdgeId) -> Self {
        SimError::NotFound {
            kind: "edge",
            id: id.0.clone(),
        }
    }
}
