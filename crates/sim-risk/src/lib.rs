#![deny(warnings)]

//! Health and risk aggregation for the supply-chain network.
//!
//! This module provides pure helpers for:
//! - Arithmetic means with an explicit empty case
//! - Whole-network health summaries
//! - Per-(node, scenario) risk assessments

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{DisruptionScenario, RiskAssessment, SupplyChainEdge, SupplyChainNode};
use thiserror::Error;

/// USD of mitigation spend per unit of monthly capacity at full severity.
pub const MITIGATION_COST_PER_UNIT_USD: i64 = 1_000_000;

/// Errors produced by risk helpers.
#[derive(Debug, Error, PartialEq)]
pub enum RiskError {
    /// Monetary value could not be represented as a decimal.
    #[error("non-finite monetary value: {0}")]
    NonFinite(f64),
}

/// Network-wide averaged indicators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub average_utilization: f64,
    pub average_risk_score: f64,
    /// `None` when the network has no edges.
    pub average_reliability: Option<f64>,
    /// Count of every scenario ever applied; scenarios never expire.
    pub active_disruptions: usize,
}

/// Arithmetic mean. Returns None for an empty input.
///
/// ```
/// use sim_risk::mean;
///
/// assert_eq!(mean([1.0, 3.0]), Some(2.0));
/// assert_eq!(mean(std::iter::empty()), None);
/// ```
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut n: usize = 0;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        return None;
    }
    Some(sum / n as f64)
}

/// Summarize network health. Returns None when there are no nodes.
pub fn network_health<'a, N, E>(
    nodes: N,
    edges: E,
    active_disruptions: usize,
) -> Option<HealthSummary>
where
    N: IntoIterator<Item = &'a SupplyChainNode>,
    E: IntoIterator<Item = &'a SupplyChainEdge>,
{
    let nodes: Vec<&SupplyChainNode> = nodes.into_iter().collect();
    let average_utilization = mean(nodes.iter().map(|n| n.utilization))?;
    let average_risk_score = mean(nodes.iter().map(|n| n.risk_score))?;
    let average_reliability = mean(edges.into_iter().map(|e| e.reliability_score));
    Some(HealthSummary {
        average_utilization,
        average_risk_score,
        average_reliability,
        active_disruptions,
    })
}

/// Recovery estimate: duration stretched by 10% per incident edge, rounded.
///
/// ```
/// assert_eq!(sim_risk::recovery_time_days(90, 3), 117);
/// ```
pub fn recovery_time_days(duration_days: u32, incident_edges: usize) -> u32 {
    let days = f64::from(duration_days) * (1.0 + incident_edges as f64 / 10.0);
    days.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Mitigation spend: capacity * severity * the fixed per-unit scale.
///
/// Finite amounts beyond the decimal range saturate at `Decimal::MAX`; only
/// NaN or infinite inputs are errors.
///
/// ```
/// use rust_decimal::Decimal;
/// use sim_risk::mitigation_cost_usd;
///
/// assert_eq!(mitigation_cost_usd(10.0, 0.5).unwrap(), Decimal::new(5_000_000, 0));
/// assert_eq!(mitigation_cost_usd(1e30, 1.0).unwrap(), Decimal::MAX);
/// ```
pub fn mitigation_cost_usd(capacity: f64, severity: f64) -> Result<Decimal, RiskError> {
    let base = capacity * severity;
    if !base.is_finite() {
        return Err(RiskError::NonFinite(base));
    }
    let cost = Decimal::from_f64(base)
        .and_then(|d| d.checked_mul(Decimal::from(MITIGATION_COST_PER_UNIT_USD)))
        .unwrap_or(Decimal::MAX);
    Ok(cost)
}

/// Assess a node under a scenario.
///
/// `node_count` is the number of nodes in the network and `incident_edges`
/// the number of distinct edges touching the node in either direction.
pub fn risk_assessment(
    node: &SupplyChainNode,
    scenario: &DisruptionScenario,
    node_count: usize,
    incident_edges: usize,
) -> Result<RiskAssessment, RiskError> {
    let severity = scenario.impact_severity;
    let impact_score = (node.utilization * node.capacity * severity) / node_count.max(1) as f64;
    Ok(RiskAssessment {
        node_id: node.id.clone(),
        scenario_id: scenario.id.clone(),
        risk_score: node.risk_score * severity,
        impact_score,
        mitigation_cost_usd: mitigation_cost_usd(node.capacity, severity)?,
        recovery_time_days: recovery_time_days(scenario.duration_days, incident_edges),
    })
}
