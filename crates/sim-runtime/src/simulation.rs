//! Session state and the operations exposed to the orchestration layer.

use crate::disruption;
use crate::error::SimError;
use crate::step::{self, MetricsHistory};
use crate::store::GraphStore;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sim_core::{
    DisruptionScenario, NodeId, RiskAssessment, ScenarioSource, SupplyChainEdge,
    SupplyChainMetrics, SupplyChainNode,
};
use sim_risk::HealthSummary;
use tracing::{debug, info, warn};

/// Full durable unit of a simulation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub nodes: Vec<SupplyChainNode>,
    pub edges: Vec<SupplyChainEdge>,
    pub metrics: MetricsHistory,
    pub active_scenarios: Vec<DisruptionScenario>,
}

/// One simulation session: the graph, its metrics history, every scenario
/// applied so far, and the simulated clock.
#[derive(Clone, Debug)]
pub struct Simulation {
    store: GraphStore,
    history: MetricsHistory,
    active_scenarios: Vec<DisruptionScenario>,
    timestamp: NaiveDateTime,
}

fn build_store(
    nodes: impl IntoIterator<Item = SupplyChainNode>,
    edges: impl IntoIterator<Item = SupplyChainEdge>,
) -> Result<GraphStore, SimError> {
    let mut store = GraphStore::new();
    for node in nodes {
        store.add_node(node)?;
    }
    for edge in edges {
        store.add_edge(edge)?;
    }
    Ok(store)
}

fn check_history(
    store: &GraphStore,
    history: &MetricsHistory,
    clock: NaiveDateTime,
) -> Result<(), SimError> {
    for id in history.node_ids() {
        let inconsistent = |reason: &'static str| SimError::InconsistentHistory {
            node: id.clone(),
            reason,
        };
        if store.get_node(id).is_err() {
            return Err(inconsistent("references an unknown node"));
        }
        let records = history.for_node(id).unwrap_or_default();
        if records.windows(2).any(|w| w[1].timestamp < w[0].timestamp) {
            return Err(inconsistent("is out of order"));
        }
        if records.last().is_some_and(|m| m.timestamp > clock) {
            return Err(inconsistent("runs past the snapshot clock"));
        }
    }
    Ok(())
}

impl Simulation {
    /// Empty, uninitialized session starting at `start`.
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            store: GraphStore::new(),
            history: MetricsHistory::new(),
            active_scenarios: Vec::new(),
            timestamp: start,
        }
    }

    /// Replace the graph with a freshly built one. History and applied
    /// scenarios are cleared; the clock keeps running. On error the current
    /// state is left untouched.
    pub fn initialize(
        &mut self,
        nodes: impl IntoIterator<Item = SupplyChainNode>,
        edges: impl IntoIterator<Item = SupplyChainEdge>,
    ) -> Result<(), SimError> {
        let store = build_store(nodes, edges)?;
        info!(
            nodes = store.node_count(),
            edges = store.edge_count(),
            "simulation initialized"
        );
        self.store = store;
        self.history = MetricsHistory::new();
        self.active_scenarios.clear();
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.store.is_empty()
    }

    fn ensure_initialized(&self) -> Result<(), SimError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SimError::NotInitialized)
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    pub fn active_scenarios(&self) -> &[DisruptionScenario] {
        &self.active_scenarios
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Advance the clock by `duration_days`, emitting one record per node.
    pub fn step(&mut self, duration_days: u32) -> Result<Vec<SupplyChainMetrics>, SimError> {
        self.ensure_initialized()?;
        let (metrics, next) =
            step::step(&self.store, &mut self.history, duration_days, self.timestamp)?;
        debug!(nodes = metrics.len(), at = %self.timestamp, next = %next, "step complete");
        self.timestamp = next;
        Ok(metrics)
    }

    /// Apply `scenario`, record it as active, then run a one-day step.
    ///
    /// Nothing is mutated unless the step can also complete. The caller's scenario is updated with the affected ids so the same
    /// value can be applied again without duplicating them.
    pub fn apply_disruption(
        &mut self,
        scenario: &mut DisruptionScenario,
    ) -> Result<Vec<SupplyChainMetrics>, SimError> {
        self.ensure_initialized()?;
        step::advance(self.timestamp, 1)?;
        let touched = disruption::apply(scenario, &mut self.store, self.timestamp)?;
        if touched.nodes == 0 {
            warn!(scenario = %scenario.name, "disruption matched no nodes");
        }
        info!(
            scenario = %scenario.name,
            severity = scenario.impact_severity,
            nodes = touched.nodes,
            edges = touched.edges,
            "disruption applied"
        );
        self.active_scenarios.push(scenario.clone());
        self.step(1)
    }

    /// Network-wide averages plus the cumulative disruption count.
    pub fn health(&self) -> Result<HealthSummary, SimError> {
        sim_risk::network_health(
            self.store.nodes(),
            self.store.edges(),
            self.active_scenarios.len(),
        )
        .ok_or(SimError::NotInitialized)
    }

    /// Risk of one node under `scenario`, from the current graph.
    pub fn risk_assessment(
        &self,
        node_id: &NodeId,
        scenario: &DisruptionScenario,
    ) -> Result<RiskAssessment, SimError> {
        let node = self.store.get_node(node_id)?;
        let incident = self.store.incident_edge_count(node_id)?;
        Ok(sim_risk::risk_assessment(
            node,
            scenario,
            self.store.node_count(),
            incident,
        )?)
    }

    /// Recorded metrics of a node inside the inclusive `[start, end]` window.
    pub fn node_metrics(
        &self,
        node_id: &NodeId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<SupplyChainMetrics>, SimError> {
        self.history.window(node_id, start, end)
    }

    /// Scenario templates from an external source; not part of session state.
    pub fn list_scenarios(
        &self,
        source: &mut dyn ScenarioSource,
        count: usize,
    ) -> Vec<DisruptionScenario> {
        source.scenarios(count)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            timestamp: self.timestamp,
            nodes: self.store.nodes().cloned().collect(),
            edges: self.store.edges().cloned().collect(),
            metrics: self.history.clone(),
            active_scenarios: self.active_scenarios.clone(),
        }
    }

    /// Rebuild a session; nodes and edges go back through the store checks.
    ///
    /// History must only cover stored nodes, be ordered per node, and end no
    /// later than the snapshot clock.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, SimError> {
        let store = build_store(snapshot.nodes, snapshot.edges)?;
        check_history(&store, &snapshot.metrics, snapshot.timestamp)?;
        Ok(Self {
            store,
            history: snapshot.metrics,
            active_scenarios: snapshot.active_scenarios,
            timestamp: snapshot.timestamp,
        })
    }
}
