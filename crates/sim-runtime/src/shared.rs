//! Mutual-exclusion boundary for serving one simulation to many callers.

use crate::error::SimError;
use crate::simulation::Simulation;
use std::sync::{Arc, RwLock};

/// A [`Simulation`] guarded as a single unit.
///
/// Mutations (`step`, `apply_disruption`, `initialize`) take the write lock so
/// a step never observes a half-applied disruption. Read-only queries may run
/// concurrently with each other.
#[derive(Clone, Debug)]
pub struct SharedSimulation {
    inner: Arc<RwLock<Simulation>>,
}

impl SharedSimulation {
    pub fn new(sim: Simulation) -> Self {
        Self {
            inner: Arc::new(RwLock::new(sim)),
        }
    }

    /// Run a read-only query.
    pub fn read<R>(&self, f: impl FnOnce(&Simulation) -> R) -> Result<R, SimError> {
        let guard = self.inner.read().map_err(|_| SimError::LockPoisoned)?;
        Ok(f(&guard))
    }

    /// Run a mutation with exclusive access.
    pub fn write<R>(&self, f: impl FnOnce(&mut Simulation) -> R) -> Result<R, SimError> {
        let mut guard = self.inner.write().map_err(|_| SimError::LockPoisoned)?;
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{edge, node, ts};
    use sim_core::{DisruptionScenario, NodeId, Scope, ScenarioId, SupplyChainEdge};
    use std::thread;

    #[test]
    fn concurrent_steps_are_serialized() {
        let mut sim = Simulation::new(ts());
        sim.initialize([node("a", "USA"), node("b", "Japan")], [edge("ab", "a", "b")])
            .unwrap();
        let shared = SharedSimulation::new(sim);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let s = shared.clone();
                thread::spawn(move || {
                    for _ in 0..5 {
                        s.write(|sim| sim.step(1)).unwrap().unwrap();
                        s.read(|sim| sim.health()).unwrap().unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let len = shared
            .read(|sim| sim.node_metrics(&NodeId("a".into()), None, None))
            .unwrap()
            .unwrap()
            .len();
        assert_eq!(len, 20);
        let days = shared
            .read(|sim| (sim.timestamp() - ts()).num_days())
            .unwrap();
        assert_eq!(days, 20);
    }

    #[test]
    fn disruption_is_applied_atomically() {
        let mut sim = Simulation::new(ts());
        sim.initialize([node("a", "USA")], Vec::<SupplyChainEdge>::new())
            .unwrap();
        let shared = SharedSimulation::new(sim);
        let mut sc = DisruptionScenario {
            id: ScenarioId("s".into()),
            name: "Shortage".into(),
            description: String::new(),
            probability: 0.4,
            duration_days: 365,
            impact_severity: 0.6,
            affected_regions: Scope::Any,
            affected_process_nodes: Scope::Any,
            mitigation_strategies: vec![],
            affected_nodes: vec![],
            affected_edges: vec![],
        };
        shared
            .write(|sim| sim.apply_disruption(&mut sc))
            .unwrap()
            .unwrap();
        assert_eq!(sc.affected_nodes.len(), 1);
        let active = shared.read(|sim| sim.active_scenarios().len()).unwrap();
        assert_eq!(active, 1);
    }

    #[test]
    fn poisoned_lock_is_reported() {
        let shared = SharedSimulation::new(Simulation::new(ts()));
        let s = shared.clone();
        let _ = thread::spawn(move || {
            let _ = s.write(|_| panic!("writer crashed"));
        })
        .join();
        assert_eq!(shared.read(|sim| sim.is_initialized()), Err(SimError::LockPoisoned));
    }
}
