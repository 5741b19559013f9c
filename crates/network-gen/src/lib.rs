#![deny(warnings)]

//! Seeded synthetic semiconductor supply-chain networks and disruption
//! scenario templates.
//!
//! Output is fully determined by the seed and the creation timestamp.

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sim_core::{
    ChipType, DisruptionScenario, EdgeId, Location, NetworkShape, NodeId, NodeType, ProcessNode,
    ScenarioId, ScenarioSource, Scope, SupplyChainEdge, SupplyChainNode,
};
use std::collections::BTreeSet;
use tracing::debug;

/// Nodes and edges ready to seed a simulation.
#[derive(Clone, Debug, Default)]
pub struct Network {
    pub nodes: Vec<SupplyChainNode>,
    pub edges: Vec<SupplyChainEdge>,
}

struct Site {
    country: &'static str,
    region: &'static str,
    city: &'static str,
    latitude: f64,
    longitude: f64,
}

const fn site(
    country: &'static str,
    region: &'static str,
    city: &'static str,
    latitude: f64,
    longitude: f64,
) -> Site {
    Site {
        country,
        region,
        city,
        latitude,
        longitude,
    }
}

const FOUNDRIES: [&str; 5] = ["TSMC", "Samsung", "Intel", "GlobalFoundries", "UMC"];

const EQUIPMENT_VENDORS: [&str; 7] = [
    "ASML",
    "Applied Materials",
    "Lam Research",
    "Tokyo Electron",
    "KLA Corporation",
    "Teradyne",
    "Advantest",
];

const FALLBACK_COUNTRIES: [&str; 5] = ["USA", "Japan", "Germany", "France", "UK"];

fn foundry_sites(company: &str) -> &'static [Site] {
    static TSMC: [Site; 2] = [
        site("Taiwan", "Hsinchu", "Hsinchu Science Park", 24.8138, 121.0),
        site("Taiwan", "Tainan", "Southern Taiwan Science Park", 23.0, 120.2),
    ];
    static SAMSUNG: [Site; 2] = [
        site("South Korea", "Gyeonggi", "Hwaseong", 37.2, 126.8),
        site("South Korea", "Gyeonggi", "Pyeongtaek", 37.0, 126.9),
    ];
    static INTEL: [Site; 2] = [
        site("USA", "Arizona", "Chandler", 33.3, -111.8),
        site("USA", "Oregon", "Hillsboro", 45.5, -122.9),
    ];
    static GLOBALFOUNDRIES: [Site; 2] = [
        site("USA", "New York", "Malta", 42.9, -73.8),
        site("Singapore", "Singapore", "Woodlands", 1.4, 103.8),
    ];
    static UMC: [Site; 2] = [
        site("Taiwan", "Hsinchu", "Hsinchu Science Park", 24.8138, 121.0),
        site("Singapore", "Singapore", "Pasir Ris", 1.37, 103.95),
    ];
    match company {
        "TSMC" => &TSMC,
        "Samsung" => &SAMSUNG,
        "Intel" => &INTEL,
        "GlobalFoundries" => &GLOBALFOUNDRIES,
        "UMC" => &UMC,
        _ => &[],
    }
}

/// Monthly wafer capacity range contributed by one process node.
fn fab_capacity_range(p: ProcessNode) -> (f64, f64) {
    match p {
        ProcessNode::N3 => (50_000.0, 100_000.0),
        ProcessNode::N5 => (40_000.0, 80_000.0),
        ProcessNode::N7 => (30_000.0, 60_000.0),
        ProcessNode::N10 => (20_000.0, 40_000.0),
        ProcessNode::N14 => (15_000.0, 30_000.0),
        ProcessNode::N28 => (10_000.0, 20_000.0),
        ProcessNode::N40 => (8_000.0, 15_000.0),
        ProcessNode::N65 => (5_000.0, 10_000.0),
        ProcessNode::N90 => (3_000.0, 6_000.0),
        ProcessNode::N130 => (2_000.0, 4_000.0),
        ProcessNode::N180 => (1_000.0, 2_000.0),
        ProcessNode::N250 => (500.0, 1_000.0),
    }
}

fn specific(nodes: &[ProcessNode]) -> Scope<ProcessNode> {
    Scope::Specific(nodes.iter().copied().collect())
}

#[allow(clippy::too_many_arguments)]
fn template(
    slug: &str,
    name: &str,
    description: &str,
    probability: f64,
    duration_days: u32,
    impact_severity: f64,
    regions: &[&str],
    process_nodes: Scope<ProcessNode>,
    mitigations: &[&str],
) -> DisruptionScenario {
    DisruptionScenario {
        id: ScenarioId(slug.to_string()),
        name: name.to_string(),
        description: description.to_string(),
        probability,
        duration_days,
        impact_severity,
        affected_regions: Scope::regions(regions.iter().copied()),
        affected_process_nodes: process_nodes,
        mitigation_strategies: mitigations.iter().map(|m| m.to_string()).collect(),
        affected_nodes: Vec::new(),
        affected_edges: Vec::new(),
    }
}

/// The built-in catalogue of disruption templates, keyed by slug ids.
pub fn scenario_templates() -> Vec<DisruptionScenario> {
    use ProcessNode::*;
    vec![
        template(
            "taiwan-strait-crisis",
            "Taiwan Strait Crisis",
            "Military tensions in Taiwan Strait affecting shipping and production",
            0.45,
            90,
            0.8,
            &["Taiwan", "China"],
            specific(&[N3, N5, N7]),
            &[
                "Diversify manufacturing locations",
                "Increase inventory buffers",
                "Develop alternative suppliers",
            ],
        ),
        template(
            "asml-export-controls",
            "ASML Export Controls",
            "Strict export controls on EUV lithography equipment",
            0.3,
            180,
            0.6,
            &["Global"],
            specific(&[N3, N5]),
            &[
                "Accelerate domestic EUV development",
                "Optimize existing equipment utilization",
                "Develop alternative lithography technologies",
            ],
        ),
        template(
            "taiwan-earthquake",
            "Natural Disaster - Taiwan Earthquake",
            "Major earthquake affecting Taiwan semiconductor production",
            0.2,
            30,
            0.7,
            &["Taiwan"],
            specific(&[N3, N5, N7, N10]),
            &[
                "Implement earthquake-resistant facility designs",
                "Establish backup power systems",
                "Develop rapid recovery protocols",
            ],
        ),
        template(
            "rare-earth-embargo",
            "Rare Earth Embargo",
            "Chinese restrictions on rare earth element exports",
            0.35,
            120,
            0.5,
            &["Global"],
            Scope::Any,
            &[
                "Develop alternative rare earth sources",
                "Implement recycling programs",
                "Optimize material usage efficiency",
            ],
        ),
        template(
            "global-chip-shortage",
            "Global Chip Shortage",
            "Prolonged semiconductor shortage affecting multiple industries",
            0.4,
            365,
            0.6,
            &["Global"],
            Scope::Any,
            &[
                "Increase manufacturing capacity",
                "Implement allocation strategies",
                "Develop alternative technologies",
            ],
        ),
        template(
            "cybersecurity-breach",
            "Cybersecurity Breach",
            "Major cyber attack on semiconductor manufacturing facilities",
            0.25,
            45,
            0.7,
            &["Global"],
            Scope::Any,
            &[
                "Enhance cybersecurity measures",
                "Implement air-gapped systems",
                "Develop rapid recovery protocols",
            ],
        ),
        template(
            "trade-war-escalation",
            "Trade War Escalation",
            "Intensified trade restrictions between major economies",
            0.3,
            180,
            0.6,
            &["Global"],
            Scope::Any,
            &[
                "Diversify supply chain",
                "Localize critical manufacturing",
                "Develop alternative trade routes",
            ],
        ),
    ]
}

/// Deterministic network and scenario generator.
pub struct NetworkGenerator {
    rng: ChaCha8Rng,
    created_at: NaiveDateTime,
    scenarios_issued: u64,
}

impl NetworkGenerator {
    pub fn new(seed: u64, created_at: NaiveDateTime) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            created_at,
            scenarios_issued: 0,
        }
    }

    fn pick<T: Copy>(&mut self, items: &[T], min: usize, max: usize) -> BTreeSet<T>
    where
        T: Ord,
    {
        let k = self.rng.gen_range(min..=max).min(items.len());
        items.choose_multiple(&mut self.rng, k).copied().collect()
    }

    fn location(&mut self, company: &str) -> Location {
        let sites = foundry_sites(company);
        let location = match sites.choose(&mut self.rng) {
            Some(s) => Location {
                country: s.country.to_string(),
                region: s.region.to_string(),
                city: s.city.to_string(),
                latitude: s.latitude,
                longitude: s.longitude,
                risk_score: 0.0,
            },
            None => Location {
                country: FALLBACK_COUNTRIES[self.rng.gen_range(0..FALLBACK_COUNTRIES.len())]
                    .to_string(),
                region: format!("Region_{}", self.rng.gen_range(1..=5)),
                city: format!("City_{}", self.rng.gen_range(1..=10)),
                latitude: self.rng.gen_range(-90.0..=90.0),
                longitude: self.rng.gen_range(-180.0..=180.0),
                risk_score: 0.0,
            },
        };
        Location {
            risk_score: self.rng.gen_range(0.1..0.9),
            ..location
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn node(
        &mut self,
        id: String,
        name: String,
        kind: NodeType,
        location: Location,
        capacity: f64,
        utilization: f64,
        process_nodes: BTreeSet<ProcessNode>,
        chip_types: BTreeSet<ChipType>,
    ) -> SupplyChainNode {
        SupplyChainNode {
            id: NodeId(id),
            name,
            kind,
            location,
            capacity,
            utilization,
            process_nodes,
            chip_types,
            risk_score: self.rng.gen_range(0.1..0.9),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    fn fab(&mut self, index: usize) -> SupplyChainNode {
        let company = FOUNDRIES[self.rng.gen_range(0..FOUNDRIES.len())];
        let process_nodes: BTreeSet<ProcessNode> = match company {
            "TSMC" => [ProcessNode::N3, ProcessNode::N5, ProcessNode::N7, ProcessNode::N10]
                .into_iter()
                .collect(),
            "Samsung" => [ProcessNode::N5, ProcessNode::N7, ProcessNode::N10, ProcessNode::N14]
                .into_iter()
                .collect(),
            _ => self.pick(&ProcessNode::ALL, 1, 4),
        };
        let mut capacity = 0.0;
        for p in &process_nodes {
            let (lo, hi) = fab_capacity_range(*p);
            capacity += self.rng.gen_range(lo..hi);
        }
        let name = format!("{company}_Fab_{}", self.rng.gen_range(1..=5));
        let location = self.location(company);
        let utilization = self.rng.gen_range(0.7..0.95);
        let chip_types = self.pick(&ChipType::ALL, 1, 3);
        self.node(
            format!("fab-{index:03}"),
            name,
            NodeType::Fab,
            location,
            capacity,
            utilization,
            process_nodes,
            chip_types,
        )
    }

    fn supplier(&mut self, index: usize) -> SupplyChainNode {
        let company = EQUIPMENT_VENDORS[self.rng.gen_range(0..EQUIPMENT_VENDORS.len())];
        let name = format!("{company}_Supplier_{}", self.rng.gen_range(1..=3));
        let location = self.location(company);
        let capacity = self.rng.gen_range(1_000.0..5_000.0);
        let utilization = self.rng.gen_range(0.6..0.9);
        let process_nodes = self.pick(&ProcessNode::ALL, 1, 3);
        let chip_types = self.pick(&ChipType::ALL, 1, 2);
        self.node(
            format!("supplier-{index:03}"),
            name,
            NodeType::Supplier,
            location,
            capacity,
            utilization,
            process_nodes,
            chip_types,
        )
    }

    fn customer(&mut self, index: usize) -> SupplyChainNode {
        let location = self.location("Customer");
        let capacity = self.rng.gen_range(500.0..2_000.0);
        let utilization = self.rng.gen_range(0.5..0.8);
        let process_nodes = self.pick(&ProcessNode::ALL, 1, 2);
        let chip_types = self.pick(&ChipType::ALL, 1, 2);
        self.node(
            format!("customer-{index:03}"),
            format!("Customer_{}", index + 1),
            NodeType::Customer,
            location,
            capacity,
            utilization,
            process_nodes,
            chip_types,
        )
    }

    fn edge(
        &mut self,
        index: usize,
        source: &SupplyChainNode,
        target: &SupplyChainNode,
    ) -> SupplyChainEdge {
        let (lead_time, reliability) = match (source.kind, target.kind) {
            (NodeType::Fab, NodeType::Customer) => {
                (self.rng.gen_range(30..=90), self.rng.gen_range(0.8..0.95))
            }
            (NodeType::Supplier, NodeType::Fab) => {
                (self.rng.gen_range(15..=45), self.rng.gen_range(0.85..0.98))
            }
            _ => (self.rng.gen_range(5..=20), self.rng.gen_range(0.9..0.99)),
        };
        SupplyChainEdge {
            id: EdgeId(format!("edge-{index:04}")),
            source_id: source.id.clone(),
            target_id: target.id.clone(),
            lead_time_days: lead_time,
            reliability_score: reliability,
            capacity: self.rng.gen_range(1_000.0..10_000.0),
            cost_per_unit: self.rng.gen_range(100.0..1_000.0),
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }

    /// Generate fabs, equipment suppliers and customers, then connect
    /// suppliers to fabs (p = 0.3) and fabs to customers (p = 0.4).
    pub fn generate(&mut self, shape: &NetworkShape) -> Network {
        let mut nodes = Vec::with_capacity(shape.fabs + shape.suppliers + shape.customers);
        for i in 0..shape.fabs {
            let n = self.fab(i + 1);
            nodes.push(n);
        }
        for i in 0..shape.suppliers {
            let n = self.supplier(i + 1);
            nodes.push(n);
        }
        for i in 0..shape.customers {
            let n = self.customer(i + 1);
            nodes.push(n);
        }

        let mut edges = Vec::new();
        for source in &nodes {
            let (target_kind, p) = match source.kind {
                NodeType::Supplier => (NodeType::Fab, 0.3),
                NodeType::Fab => (NodeType::Customer, 0.4),
                _ => continue,
            };
            for target in nodes.iter().filter(|t| t.kind == target_kind) {
                if self.rng.gen_bool(p) {
                    let e = self.edge(edges.len() + 1, source, target);
                    edges.push(e);
                }
            }
        }
        debug!(nodes = nodes.len(), edges = edges.len(), "network generated");
        Network { nodes, edges }
    }

    /// Draw one template with a fresh id and empty affected lists.
    pub fn sample_scenario(&mut self) -> DisruptionScenario {
        let mut templates = scenario_templates();
        let i = self.rng.gen_range(0..templates.len());
        let mut scenario = templates.swap_remove(i);
        self.scenarios_issued += 1;
        scenario.id = ScenarioId(format!("{}-{:04}", scenario.id, self.scenarios_issued));
        scenario
    }
}

impl ScenarioSource for NetworkGenerator {
    fn scenarios(&mut self, count: usize) -> Vec<DisruptionScenario> {
        (0..count).map(|_| self.sample_scenario()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use sim_core::{validate_edge, validate_node, validate_scenario};

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn same_seed_same_network() {
        let shape = NetworkShape::default();
        let a = NetworkGenerator::new(7, ts()).generate(&shape);
        let b = NetworkGenerator::new(7, ts()).generate(&shape);
        assert_eq!(a.nodes, b.nodes);
        assert_eq!(a.edges, b.edges);
    }

    #[test]
    fn shape_is_respected() {
        let shape = NetworkShape {
            fabs: 3,
            suppliers: 4,
            customers: 2,
        };
        let net = NetworkGenerator::new(1, ts()).generate(&shape);
        let count = |k: NodeType| net.nodes.iter().filter(|n| n.kind == k).count();
        assert_eq!(count(NodeType::Fab), 3);
        assert_eq!(count(NodeType::Supplier), 4);
        assert_eq!(count(NodeType::Customer), 2);
        let ids: BTreeSet<_> = net.nodes.iter().map(|n| &n.id).collect();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn edges_follow_material_flow() {
        let net = NetworkGenerator::new(3, ts()).generate(&NetworkShape::default());
        let kind = |id: &NodeId| net.nodes.iter().find(|n| &n.id == id).unwrap().kind;
        for e in &net.edges {
            let pair = (kind(&e.source_id), kind(&e.target_id));
            assert!(matches!(
                pair,
                (NodeType::Supplier, NodeType::Fab) | (NodeType::Fab, NodeType::Customer)
            ));
        }
    }

    #[test]
    fn foundry_fabs_sit_at_known_sites() {
        let net = NetworkGenerator::new(11, ts()).generate(&NetworkShape {
            fabs: 20,
            suppliers: 0,
            customers: 0,
        });
        for n in &net.nodes {
            assert!(["Taiwan", "South Korea", "USA", "Singapore"]
                .contains(&n.location.country.as_str()));
            if n.name.starts_with("TSMC") {
                assert!(n.process_nodes.contains(&ProcessNode::N3));
                assert!(n.capacity >= 140_000.0);
            }
        }
    }

    #[test]
    fn catalogue_has_seven_valid_templates() {
        let templates = scenario_templates();
        assert_eq!(templates.len(), 7);
        for t in &templates {
            validate_scenario(t).unwrap();
            assert!(t.affected_nodes.is_empty());
        }
        let strait = &templates[0];
        assert!(strait.affected_regions.contains(&"China".to_string()));
        assert!(!strait.affected_regions.contains(&"USA".to_string()));
        assert_eq!(templates[3].affected_regions, Scope::Any);
        assert_eq!(templates[3].affected_process_nodes, Scope::Any);
    }

    #[test]
    fn sampled_scenarios_get_fresh_ids() {
        let mut g = NetworkGenerator::new(5, ts());
        let batch = g.scenarios(5);
        let ids: BTreeSet<_> = batch.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids.len(), 5);
        assert!(batch[4].id.0.ends_with("-0005"));
    }

    proptest! {
        #[test]
        fn generated_entities_validate(seed in any::<u64>()) {
            let net = NetworkGenerator::new(seed, ts()).generate(&NetworkShape::default());
            for n in &net.nodes {
                prop_assert!(validate_node(n).is_ok());
            }
            for e in &net.edges {
                prop_assert!(validate_edge(e).is_ok());
            }
        }
    }
}
