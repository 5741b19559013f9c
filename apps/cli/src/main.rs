#![deny(warnings)]

//! Headless CLI: generate a network, run the simulation, optionally apply a
//! disruption, and report health and per-node risk.

use anyhow::{bail, Context, Result};
use network_gen::{scenario_templates, NetworkGenerator};
use sim_core::{validate_config, DisruptionScenario, SimConfig};
use sim_runtime::Simulation;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    steps: Option<u32>,
    seed: Option<u64>,
    scenario: Option<String>,
    snapshot: Option<PathBuf>,
    list_scenarios: bool,
}

fn parse_args(mut it: impl Iterator<Item = String>) -> Args {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--steps" => args.steps = it.next().and_then(|s| s.parse().ok()),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--scenario" => args.scenario = it.next(),
            "--snapshot" => args.snapshot = it.next().map(PathBuf::from),
            "--list-scenarios" => args.list_scenarios = true,
            _ => {}
        }
    }
    args
}

fn load_config(args: &Args) -> Result<SimConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => SimConfig::default(),
    };
    if let Some(steps) = args.steps {
        cfg.steps = steps;
    }
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    validate_config(&cfg)?;
    Ok(cfg)
}

/// Look up a built-in template by slug or case-insensitive name.
fn find_template(key: &str) -> Result<DisruptionScenario> {
    let key_lower = key.to_lowercase();
    match scenario_templates()
        .into_iter()
        .find(|t| t.id.0 == key || t.name.to_lowercase() == key_lower)
    {
        Some(t) => Ok(t),
        None => bail!("unknown scenario: {key} (try --list-scenarios)"),
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args(std::env::args().skip(1));
    if args.list_scenarios {
        for t in scenario_templates() {
            println!(
                "{:<24} severity {:.2} | {:>3} days | {}",
                t.id, t.impact_severity, t.duration_days, t.name
            );
        }
        return Ok(());
    }

    let cfg = load_config(&args)?;
    info!(seed = cfg.rng_seed, steps = cfg.steps, tick_days = cfg.tick_days, "starting CLI");
    let start = cfg
        .start_date
        .and_hms_opt(0, 0, 0)
        .context("invalid start date")?;

    let net = NetworkGenerator::new(cfg.rng_seed, start).generate(&cfg.network);
    let mut sim = Simulation::new(start);
    sim.initialize(net.nodes, net.edges)?;
    sim.step(cfg.tick_days)?;

    let mut scenario = args.scenario.as_deref().map(find_template).transpose()?;
    if let Some(sc) = scenario.as_mut() {
        sim.apply_disruption(sc)?;
        println!(
            "Disruption | {} | nodes hit: {} | edges hit: {}",
            sc.name,
            sc.affected_nodes.len(),
            sc.affected_edges.len()
        );
    }
    for _ in 0..cfg.steps {
        sim.step(cfg.tick_days)?;
    }

    let health = sim.health()?;
    println!(
        "Network | nodes: {} | edges: {} | at: {}",
        sim.store().node_count(),
        sim.store().edge_count(),
        sim.timestamp()
    );
    println!(
        "Health | utilization: {:.1}% | risk: {:.3} | reliability: {} | disruptions: {}",
        health.average_utilization * 100.0,
        health.average_risk_score,
        health
            .average_reliability
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:.3}")),
        health.active_disruptions
    );

    if let Some(sc) = &scenario {
        let mut ranked = Vec::with_capacity(sim.store().node_count());
        for node in sim.store().nodes() {
            ranked.push(sim.risk_assessment(&node.id, sc)?);
        }
        ranked.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        for r in ranked.iter().take(5) {
            println!(
                "Risk | {:<14} | score: {:.3} | impact: {:.1} | recovery: {} d | mitigation: ${}",
                r.node_id,
                r.risk_score,
                r.impact_score,
                r.recovery_time_days,
                r.mitigation_cost_usd.round_dp(0)
            );
        }
    }

    if let Some(path) = &args.snapshot {
        let json = serde_json::to_string_pretty(&sim.snapshot())?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "snapshot written");
    }

    Ok(())
}
