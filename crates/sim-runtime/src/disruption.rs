//! Disruption propagation: degrade matching nodes, then every edge touching
//! an affected node.

use crate::error::SimError;
use crate::store::GraphStore;
use chrono::NaiveDateTime;
use sim_core::{
    clamp_non_negative, clamp_unit, validate_scenario, DisruptionScenario, NodeId,
    SupplyChainNode,
};
use std::collections::BTreeSet;

/// How many nodes and edges a single application touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Propagation {
    pub nodes: usize,
    pub edges: usize,
}

/// A node is hit by a region match or a process-node match.
pub fn is_affected(node: &SupplyChainNode, scenario: &DisruptionScenario) -> bool {
    scenario.affected_regions.contains(&node.location.country)
        || scenario
            .affected_process_nodes
            .intersects(node.process_nodes.iter())
}

/// Fractional degradation for a component with the given vulnerability score.
pub fn impact_factor(severity: f64, score: f64) -> f64 {
    severity * (1.0 + score) / 2.0
}

/// Apply `scenario` to the store in place.
///
/// The scenario's `affected_nodes`/`affected_edges` accumulate ids with set
/// semantics, so applying the same scenario twice compounds the degradation
/// without duplicating ids. The scenario is validated before anything is
/// mutated.
pub fn apply(
    scenario: &mut DisruptionScenario,
    store: &mut GraphStore,
    at: NaiveDateTime,
) -> Result<Propagation, SimError> {
    validate_scenario(scenario)?;
    let severity = scenario.impact_severity;
    let mut touched = Propagation::default();

    for node in store.nodes_mut() {
        if !is_affected(node, scenario) {
            continue;
        }
        let factor = impact_factor(severity, node.risk_score);
        node.utilization = clamp_unit(node.utilization * (1.0 - factor));
        node.risk_score = clamp_unit(node.risk_score + factor);
        node.updated_at = at;
        touched.nodes += 1;
        if !scenario.affected_nodes.contains(&node.id) {
            scenario.affected_nodes.push(node.id.clone());
        }
    }

    let hit: BTreeSet<&NodeId> = scenario.affected_nodes.iter().collect();
    for edge in store.edges_mut() {
        if !(hit.contains(&edge.source_id) || hit.contains(&edge.target_id)) {
            continue;
        }
        let factor = impact_factor(severity, edge.reliability_score);
        edge.reliability_score = clamp_unit(edge.reliability_score * (1.0 - factor));
        edge.capacity = clamp_non_negative(edge.capacity * (1.0 - factor));
        edge.updated_at = at;
        touched.edges += 1;
        if !scenario.affected_edges.contains(&edge.id) {
            scenario.affected_edges.push(edge.id.clone());
        }
    }

    Ok(touched)
}
