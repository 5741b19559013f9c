#![deny(warnings)]

//! Core domain models and invariants for the supply-chain resilience simulator.
//!
//! This crate defines the serializable entity types shared by the graph store,
//! disruption engine and step simulator, together with validation helpers that
//! guarantee the bounded-range invariants at construction time and clamping
//! helpers used on mutation paths.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Region name that makes a scenario match every location.
pub const GLOBAL_REGION: &str = "Global";
/// Process-node tag that makes a scenario match every node.
pub const ALL_PROCESS_NODES: &str = "All";

/// Unique identifier of a supply-chain node, e.g. "fab-001".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// Unique identifier of a directed edge.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

/// Unique identifier of a disruption scenario.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioId(pub String);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Role of a participant in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Wafer fabrication plant.
    Fab,
    /// Equipment or material supplier.
    Supplier,
    Distributor,
    /// End consumer of chips.
    Customer,
    Logistics,
}

/// Product categories a node handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChipType {
    Logic,
    Memory,
    Analog,
    Power,
    Sensor,
    Discrete,
}

impl ChipType {
    pub const ALL: [ChipType; 6] = [
        ChipType::Logic,
        ChipType::Memory,
        ChipType::Analog,
        ChipType::Power,
        ChipType::Sensor,
        ChipType::Discrete,
    ];
}

/// Process-technology generation, tagged on the wire as e.g. "7nm".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProcessNode {
    #[serde(rename = "3nm")]
    N3,
    #[serde(rename = "5nm")]
    N5,
    #[serde(rename = "7nm")]
    N7,
    #[serde(rename = "10nm")]
    N10,
    #[serde(rename = "14nm")]
    N14,
    #[serde(rename = "28nm")]
    N28,
    #[serde(rename = "40nm")]
    N40,
    #[serde(rename = "65nm")]
    N65,
    #[serde(rename = "90nm")]
    N90,
    #[serde(rename = "130nm")]
    N130,
    #[serde(rename = "180nm")]
    N180,
    #[serde(rename = "250nm")]
    N250,
}

impl ProcessNode {
    /// Every generation, leading edge first.
    pub const ALL: [ProcessNode; 12] = [
        ProcessNode::N3,
        ProcessNode::N5,
        ProcessNode::N7,
        ProcessNode::N10,
        ProcessNode::N14,
        ProcessNode::N28,
        ProcessNode::N40,
        ProcessNode::N65,
        ProcessNode::N90,
        ProcessNode::N130,
        ProcessNode::N180,
        ProcessNode::N250,
    ];

    /// Wire tag, e.g. "28nm".
    pub fn tag(self) -> &'static str {
        match self {
            ProcessNode::N3 => "3nm",
            ProcessNode::N5 => "5nm",
            ProcessNode::N7 => "7nm",
            ProcessNode::N10 => "10nm",
            ProcessNode::N14 => "14nm",
            ProcessNode::N28 => "28nm",
            ProcessNode::N40 => "40nm",
            ProcessNode::N65 => "65nm",
            ProcessNode::N90 => "90nm",
            ProcessNode::N130 => "130nm",
            ProcessNode::N180 => "180nm",
            ProcessNode::N250 => "250nm",
        }
    }
}

impl fmt::Display for ProcessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.tag())
    }
}

impl FromStr for ProcessNode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProcessNode::ALL
            .into_iter()
            .find(|p| p.tag() == s)
            .ok_or_else(|| ValidationError::UnknownProcessNode(s.to_string()))
    }
}

/// Set matcher used by scenarios: either every value or an explicit set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Ord"))]
pub enum Scope<T: Ord> {
    /// Matches everything, including an empty candidate set.
    Any,
    /// Matches when a candidate is a member of the set.
    Specific(BTreeSet<T>),
}

impl<T: Ord> Scope<T> {
    /// True when `value` is covered by this scope.
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Scope::Any => true,
            Scope::Specific(set) => set.contains(value),
        }
    }

    /// True when any of `values` is covered. `Any` matches an empty iterator too.
    pub fn intersects<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        match self {
            Scope::Any => true,
            Scope::Specific(set) => values.into_iter().any(|v| set.contains(v)),
        }
    }
}

impl Scope<String> {
    /// Build a region scope from country names; a "Global" entry widens it to `Any`.
    pub fn regions<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for name in names {
            let name = name.into();
            if name == GLOBAL_REGION {
                return Scope::Any;
            }
            set.insert(name);
        }
        Scope::Specific(set)
    }
}

impl Scope<ProcessNode> {
    /// Build a process-node scope from wire tags; an "All" entry widens it to `Any`.
    pub fn process_nodes<I, S>(tags: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            if tag == ALL_PROCESS_NODES {
                return Ok(Scope::Any);
            }
            set.insert(tag.parse()?);
        }
        Ok(Scope::Specific(set))
    }
}

/// Physical site of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Country name; this is what scenario regions match against.
    pub country: String,
    pub region: String,
    pub city: String,
    /// Latitude in [-90, 90].
    pub latitude: f64,
    /// Longitude in [-180, 180].
    pub longitude: f64,
    /// Site risk in [0,1].
    pub risk_score: f64,
}

/// A participant in the supply-chain graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainNode {
    /// Unique, immutable after creation.
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeType,
    pub location: Location,
    /// Units per month (>= 0).
    pub capacity: f64,
    /// Fraction of capacity in use, in [0,1].
    pub utilization: f64,
    pub process_nodes: BTreeSet<ProcessNode>,
    pub chip_types: BTreeSet<ChipType>,
    /// Vulnerability in [0,1].
    pub risk_score: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A directed material-flow relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainEdge {
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub lead_time_days: u32,
    /// Delivery reliability in [0,1].
    pub reliability_score: f64,
    /// Units per month (>= 0).
    pub capacity: f64,
    /// USD per unit (>= 0).
    pub cost_per_unit: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// An event template describing a region/technology-scoped degradation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisruptionScenario {
    pub id: ScenarioId,
    pub name: String,
    pub description: String,
    /// Likelihood in [0,1]; informational only.
    pub probability: f64,
    pub duration_days: u32,
    /// Severity in [0,1].
    pub impact_severity: f64,
    /// Countries hit by the event.
    pub affected_regions: Scope<String>,
    /// Technologies hit by the event.
    pub affected_process_nodes: Scope<ProcessNode>,
    pub mitigation_strategies: Vec<String>,
    /// Nodes touched by propagation, filled in by the disruption engine.
    #[serde(default)]
    pub affected_nodes: Vec<NodeId>,
    /// Edges touched by propagation, filled in by the disruption engine.
    #[serde(default)]
    pub affected_edges: Vec<EdgeId>,
}

/// Operational metrics of one node at one simulated timestamp. Never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainMetrics {
    pub node_id: NodeId,
    pub timestamp: NaiveDateTime,
    pub throughput: f64,
    /// Net incoming minus outgoing edge capacity; negative means drain.
    pub inventory_level: f64,
    pub lead_time: f64,
    pub cost_per_unit: f64,
    pub quality_score: f64,
}

/// Risk of a node under a given scenario. Computed on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub node_id: NodeId,
    pub scenario_id: ScenarioId,
    pub risk_score: f64,
    pub impact_score: f64,
    pub mitigation_cost_usd: Decimal,
    pub recovery_time_days: u32,
}

/// Node counts per role for a generated network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkShape {
    pub fabs: usize,
    pub suppliers: usize,
    pub customers: usize,
}

impl Default for NetworkShape {
    fn default() -> Self {
        Self {
            fabs: 5,
            suppliers: 10,
            customers: 8,
        }
    }
}

/// Simulation configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of days per step (>= 1).
    pub tick_days: u32,
    /// Seed for the network generator.
    pub rng_seed: u64,
    /// Simulated date of the first step.
    pub start_date: NaiveDate,
    /// Steps to run after initialization.
    pub steps: u32,
    pub network: NetworkShape,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_days: 1,
            rng_seed: 42,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN),
            steps: 30,
            network: NetworkShape::default(),
        }
    }
}

/// Source of scenario templates, e.g. a synthetic generator.
pub trait ScenarioSource {
    /// Produce `count` scenarios with empty affected lists.
    fn scenarios(&mut self, count: usize) -> Vec<DisruptionScenario>;
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A bounded field fell outside its interval.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Numeric field must be finite.
    #[error("non-finite value for {0}")]
    NonFinite(&'static str),
    /// Capacities and costs must be non-negative.
    #[error("{0} must be >= 0")]
    Negative(&'static str),
    #[error("{0} must not be empty")]
    Empty(&'static str),
    /// Step duration must be at least one day.
    #[error("tick_days must be >= 1")]
    ZeroTick,
    #[error("unknown process node tag: {0}")]
    UnknownProcessNode(String),
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::Negative(field));
    }
    Ok(())
}

fn check_id(field: &'static str, id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(())
}

/// Validate a location.
pub fn validate_location(l: &Location) -> Result<(), ValidationError> {
    check_range("latitude", l.latitude, -90.0, 90.0)?;
    check_range("longitude", l.longitude, -180.0, 180.0)?;
    check_range("location.risk_score", l.risk_score, 0.0, 1.0)
}

/// Validate a node, including its location.
pub fn validate_node(n: &SupplyChainNode) -> Result<(), ValidationError> {
    check_id("node.id", &n.id.0)?;
    validate_location(&n.location)?;
    check_non_negative("node.capacity", n.capacity)?;
    check_range("node.utilization", n.utilization, 0.0, 1.0)?;
    check_range("node.risk_score", n.risk_score, 0.0, 1.0)
}

/// Validate an edge's own fields. Endpoint existence is checked by the store.
pub fn validate_edge(e: &SupplyChainEdge) -> Result<(), ValidationError> {
    check_id("edge.id", &e.id.0)?;
    check_range("edge.reliability_score", e.reliability_score, 0.0, 1.0)?;
    check_non_negative("edge.capacity", e.capacity)?;
    check_non_negative("edge.cost_per_unit", e.cost_per_unit)
}

/// Validate a scenario before it is applied.
pub fn validate_scenario(s: &DisruptionScenario) -> Result<(), ValidationError> {
    check_id("scenario.id", &s.id.0)?;
    check_range("scenario.probability", s.probability, 0.0, 1.0)?;
    check_range("scenario.impact_severity", s.impact_severity, 0.0, 1.0)
}

/// Validate simulation configuration.
pub fn validate_config(c: &SimConfig) -> Result<(), ValidationError> {
    if c.tick_days == 0 {
        return Err(ValidationError::ZeroTick);
    }
    Ok(())
}

/// Clamp into [0,1]; NaN collapses to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// Clamp to >= 0; NaN collapses to 0.
pub fn clamp_non_negative(x: f64) -> f64 {
    x.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn node(id: &str) -> SupplyChainNode {
        SupplyChainNode {
            id: NodeId(id.to_string()),
            name: "TSMC_Fab_1".to_string(),
            kind: NodeType::Fab,
            location: Location {
                country: "Taiwan".to_string(),
                region: "Hsinchu".to_string(),
                city: "Hsinchu Science Park".to_string(),
                latitude: 24.8138,
                longitude: 121.0,
                risk_score: 0.4,
            },
            capacity: 1000.0,
            utilization: 0.9,
            process_nodes: [ProcessNode::N3, ProcessNode::N5].into_iter().collect(),
            chip_types: [ChipType::Logic].into_iter().collect(),
            risk_score: 0.2,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn node_serializes_with_wire_tags() {
        let n = node("fab-001");
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["type"], "fab");
        assert_eq!(v["process_nodes"][0], "3nm");
        assert_eq!(v["chip_types"][0], "logic");
        let back: SupplyChainNode = serde_json::from_value(v).unwrap();
        assert_eq!(back, n);
    }

    #[test]
    fn region_scope_global_sentinel_is_any() {
        assert_eq!(Scope::regions(["Taiwan", "Global"]), Scope::Any);
        let s = Scope::regions(["Taiwan", "China"]);
        assert!(s.contains(&"Taiwan".to_string()));
        assert!(!s.contains(&"USA".to_string()));
    }

    #[test]
    fn process_scope_parses_tags_and_all() {
        assert_eq!(Scope::process_nodes(["5nm", "All"]).unwrap(), Scope::Any);
        let s = Scope::process_nodes(["3nm", "7nm"]).unwrap();
        assert!(s.intersects(&[ProcessNode::N7]));
        assert!(!s.intersects(&[ProcessNode::N28]));
        assert_eq!(
            Scope::process_nodes(["2nm"]).unwrap_err(),
            ValidationError::UnknownProcessNode("2nm".to_string())
        );
    }

    #[test]
    fn any_scope_matches_empty_candidates() {
        let empty: Vec<ProcessNode> = vec![];
        assert!(Scope::<ProcessNode>::Any.intersects(&empty));
        assert!(!Scope::Specific(BTreeSet::new()).intersects(&[ProcessNode::N3]));
    }

    #[test]
    fn node_range_checks() {
        validate_node(&node("fab-001")).unwrap();
        let mut n = node("fab-001");
        n.utilization = 1.2;
        assert!(matches!(
            validate_node(&n),
            Err(ValidationError::OutOfRange { field: "node.utilization", .. })
        ));
        let mut n = node("fab-001");
        n.capacity = -1.0;
        assert_eq!(validate_node(&n), Err(ValidationError::Negative("node.capacity")));
        let mut n = node("fab-001");
        n.location.latitude = f64::NAN;
        assert_eq!(validate_node(&n), Err(ValidationError::NonFinite("latitude")));
        assert_eq!(validate_node(&node(" ")), Err(ValidationError::Empty("node.id")));
    }

    #[test]
    fn config_rejects_zero_tick() {
        validate_config(&SimConfig::default()).unwrap();
        let cfg = SimConfig {
            tick_days: 0,
            ..SimConfig::default()
        };
        assert_eq!(validate_config(&cfg), Err(ValidationError::ZeroTick));
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let cfg: SimConfig = serde_json::from_str(r#"{"steps": 3}"#).unwrap();
        assert_eq!(cfg.steps, 3);
        assert_eq!(cfg.tick_days, 1);
        assert_eq!(cfg.network, NetworkShape::default());
    }

    proptest! {
        #[test]
        fn clamp_unit_stays_in_range(x in proptest::num::f64::ANY) {
            let c = clamp_unit(x);
            prop_assert!((0.0..=1.0).contains(&c));
        }

        #[test]
        fn process_tags_parse_back(i in 0usize..12) {
            let p = ProcessNode::ALL[i];
            prop_assert_eq!(p.tag().parse::<ProcessNode>().unwrap(), p);
        }
    }
}
