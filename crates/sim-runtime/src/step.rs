//! One discrete advance of simulated time.

use crate::error::SimError;
use crate::store::GraphStore;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sim_core::{EdgeId, NodeId, SupplyChainEdge, SupplyChainMetrics, SupplyChainNode};
use sim_risk::mean;
use std::collections::BTreeMap;

/// Per-node ordered metrics. Records are append-only and their timestamps
/// never decrease within a node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsHistory(BTreeMap<NodeId, Vec<SupplyChainMetrics>>);

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, metrics: SupplyChainMetrics) {
        self.0
            .entry(metrics.node_id.clone())
            .or_default()
            .push(metrics);
    }

    /// Full history of a node, if it has any.
    pub fn for_node(&self, id: &NodeId) -> Option<&[SupplyChainMetrics]> {
        self.0.get(id).map(Vec::as_slice)
    }

    /// History of a node restricted to the inclusive window `[start, end]`;
    /// a missing bound leaves that side open.
    pub fn window(
        &self,
        id: &NodeId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<SupplyChainMetrics>, SimError> {
        let all = self.for_node(id).ok_or_else(|| SimError::node_not_found(id))?;
        Ok(all
            .iter()
            .filter(|m| start.map_or(true, |s| m.timestamp >= s))
            .filter(|m| end.map_or(true, |e| m.timestamp <= e))
            .cloned()
            .collect())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn edges_of<'a>(
    store: &'a GraphStore,
    ids: impl IntoIterator<Item = &'a EdgeId>,
) -> Result<Vec<&'a SupplyChainEdge>, SimError> {
    ids.into_iter().map(|id| store.get_edge(id)).collect()
}

/// Metrics of a single node given the current graph.
///
/// With no incoming edges `lead_time` and `cost_per_unit` fall back to 0
/// while `quality_score` falls back to the node's own risk score.
pub fn node_metrics(
    store: &GraphStore,
    node: &SupplyChainNode,
    at: NaiveDateTime,
) -> Result<SupplyChainMetrics, SimError> {
    let incoming = edges_of(store, store.in_edges(&node.id)?)?;
    let outgoing = edges_of(store, store.out_edges(&node.id)?)?;

    let incoming_flow: f64 = incoming.iter().map(|e| e.capacity).sum();
    let outgoing_flow: f64 = outgoing.iter().map(|e| e.capacity).sum();
    let lead_time = mean(incoming.iter().map(|e| f64::from(e.lead_time_days))).unwrap_or(0.0);
    let cost_per_unit = mean(incoming.iter().map(|e| e.cost_per_unit)).unwrap_or(0.0);
    let quality_score = match mean(incoming.iter().map(|e| e.reliability_score)) {
        Some(reliability) => node.risk_score * reliability,
        None => node.risk_score,
    };

    Ok(SupplyChainMetrics {
        node_id: node.id.clone(),
        timestamp: at,
        throughput: node.capacity * node.utilization,
        inventory_level: incoming_flow - outgoing_flow,
        lead_time,
        cost_per_unit,
        quality_score,
    })
}

/// Clock value after `duration_days`, without touching any state.
pub(crate) fn advance(
    now: NaiveDateTime,
    duration_days: u32,
) -> Result<NaiveDateTime, SimError> {
    if duration_days == 0 {
        return Err(SimError::InvalidDuration(duration_days));
    }
    now.checked_add_signed(Duration::days(i64::from(duration_days)))
        .ok_or(SimError::TimestampOverflow)
}

/// Compute one record per node, append them to `history`, and return them
/// with the advanced timestamp. Records carry the pre-advance timestamp.
pub fn step(
    store: &GraphStore,
    history: &mut MetricsHistory,
    duration_days: u32,
    now: NaiveDateTime,
) -> Result<(Vec<SupplyChainMetrics>, NaiveDateTime), SimError> {
    let next = advance(now, duration_days)?;
    let metrics = store
        .nodes()
        .map(|n| node_metrics(store, n, now))
        .collect::<Result<Vec<_>, _>>()?;
    for m in &metrics {
        history.record(m.clone());
    }
    Ok((metrics, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{edge, node, ts};

    #[test]
    fn isolated_node_falls_back() {
        let mut s = GraphStore::new();
        let mut a = node("a", "USA");
        a.risk_score = 0.35;
        s.add_node(a).unwrap();
        let mut h = MetricsHistory::new();
        let (m, _) = step(&s, &mut h, 1, ts()).unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m[0].lead_time, 0.0);
        assert_eq!(m[0].cost_per_unit, 0.0);
        assert_eq!(m[0].quality_score, 0.35);
        assert_eq!(m[0].inventory_level, 0.0);
    }

    #[test]
    fn incoming_edges_are_averaged() {
        let mut s = GraphStore::new();
        for id in ["a", "b", "c"] {
            s.add_node(node(id, "USA")).unwrap();
        }
        let mut ac = edge("ac", "a", "c");
        ac.lead_time_days = 20;
        ac.cost_per_unit = 150.0;
        ac.reliability_score = 0.75;
        ac.capacity = 100.0;
        s.add_edge(ac).unwrap();
        s.add_edge(edge("bc", "b", "c")).unwrap();
        let c = s.get_node(&NodeId("c".into())).unwrap();
        let m = node_metrics(&s, c, ts()).unwrap();
        assert_eq!(m.lead_time, 15.0);
        assert_eq!(m.cost_per_unit, 100.0);
        assert!((m.quality_score - 0.2 * 0.85).abs() < 1e-12);
        assert_eq!(m.inventory_level, 500.0);
    }

    #[test]
    fn step_stamps_pre_advance_time_and_records_history() {
        let mut s = GraphStore::new();
        s.add_node(node("a", "USA")).unwrap();
        let mut h = MetricsHistory::new();
        let (first, t1) = step(&s, &mut h, 7, ts()).unwrap();
        assert_eq!(first[0].timestamp, ts());
        assert_eq!(t1, ts() + Duration::days(7));
        let (second, t2) = step(&s, &mut h, 7, t1).unwrap();
        assert_eq!(second[0].timestamp, t1);
        assert_eq!(t2, t1 + Duration::days(7));
        let recorded = h.for_node(&NodeId("a".into())).unwrap();
        assert_eq!(recorded, &[first[0].clone(), second[0].clone()][..]);
    }

    #[test]
    fn zero_duration_rejected_without_recording() {
        let mut s = GraphStore::new();
        s.add_node(node("a", "USA")).unwrap();
        let mut h = MetricsHistory::new();
        assert_eq!(step(&s, &mut h, 0, ts()), Err(SimError::InvalidDuration(0)));
        assert!(h.is_empty());
    }

    #[test]
    fn overflowing_clock_rejected_without_recording() {
        let mut s = GraphStore::new();
        s.add_node(node("a", "USA")).unwrap();
        let mut h = MetricsHistory::new();
        let late = NaiveDateTime::MAX - Duration::hours(12);
        assert_eq!(step(&s, &mut h, 1, late), Err(SimError::TimestampOverflow));
        assert!(h.is_empty());
    }

    #[test]
    fn window_is_inclusive() {
        let mut s = GraphStore::new();
        s.add_node(node("a", "USA")).unwrap();
        let mut h = MetricsHistory::new();
        let mut now = ts();
        for _ in 0..5 {
            now = step(&s, &mut h, 1, now).unwrap().1;
        }
        let id = NodeId("a".into());
        let from = ts() + Duration::days(1);
        let to = ts() + Duration::days(3);
        assert_eq!(h.window(&id, Some(from), Some(to)).unwrap().len(), 3);
        assert_eq!(h.window(&id, Some(from), None).unwrap().len(), 4);
        assert_eq!(h.window(&id, None, None).unwrap().len(), 5);
        assert!(matches!(
            h.window(&NodeId("zz".into()), None, None),
            Err(SimError::NotFound { .. })
        ));
    }
}
