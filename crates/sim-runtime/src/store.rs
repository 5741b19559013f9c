//! Authoritative node/edge collections with an incrementally maintained
//! adjacency index.

use crate::error::SimError;
use sim_core::{validate_edge, validate_node, EdgeId, NodeId, SupplyChainEdge, SupplyChainNode};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// In- and out-edge ids of one node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Adjacency {
    pub incoming: BTreeSet<EdgeId>,
    pub outgoing: BTreeSet<EdgeId>,
}

/// Owns every node and edge of the network.
///
/// Nodes and edges iterate in ascending id order. Every edge present in the
/// store is registered in the adjacency entries of both of its endpoints.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    nodes: BTreeMap<NodeId, SupplyChainNode>,
    edges: BTreeMap<EdgeId, SupplyChainEdge>,
    adjacency: HashMap<NodeId, Adjacency>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Insert a node with empty adjacency.
    pub fn add_node(&mut self, node: SupplyChainNode) -> Result<(), SimError> {
        validate_node(&node)?;
        if self.nodes.contains_key(&node.id) {
            return Err(SimError::DuplicateId(node.id.0));
        }
        debug!(node = %node.id, kind = ?node.kind, "node added");
        self.adjacency.insert(node.id.clone(), Adjacency::default());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Insert an edge and register it with both endpoints.
    pub fn add_edge(&mut self, edge: SupplyChainEdge) -> Result<(), SimError> {
        validate_edge(&edge)?;
        if self.edges.contains_key(&edge.id) {
            return Err(SimError::DuplicateId(edge.id.0));
        }
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !self.nodes.contains_key(endpoint) {
                return Err(SimError::UnknownNode {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        if let Some(adj) = self.adjacency.get_mut(&edge.source_id) {
            adj.outgoing.insert(edge.id.clone());
        }
        if let Some(adj) = self.adjacency.get_mut(&edge.target_id) {
            adj.incoming.insert(edge.id.clone());
        }
        debug!(edge = %edge.id, source = %edge.source_id, target = %edge.target_id, "edge added");
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    pub fn get_node(&self, id: &NodeId) -> Result<&SupplyChainNode, SimError> {
        self.nodes.get(id).ok_or_else(|| SimError::node_not_found(id))
    }

    pub fn get_edge(&self, id: &EdgeId) -> Result<&SupplyChainEdge, SimError> {
        self.edges.get(id).ok_or_else(|| SimError::edge_not_found(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SupplyChainNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &SupplyChainEdge> {
        self.edges.values()
    }

    // Ids are map keys; callers must not rewrite them.
    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut SupplyChainNode> {
        self.nodes.values_mut()
    }

    pub(crate) fn edges_mut(&mut self) -> impl Iterator<Item = &mut SupplyChainEdge> {
        self.edges.values_mut()
    }

    fn adjacency(&self, id: &NodeId) -> Result<&Adjacency, SimError> {
        self.adjacency
            .get(id)
            .ok_or_else(|| SimError::node_not_found(id))
    }

    /// Ids of edges whose target is `id`.
    pub fn in_edges(&self, id: &NodeId) -> Result<&BTreeSet<EdgeId>, SimError> {
        Ok(&self.adjacency(id)?.incoming)
    }

    /// Ids of edges whose source is `id`.
    pub fn out_edges(&self, id: &NodeId) -> Result<&BTreeSet<EdgeId>, SimError> {
        Ok(&self.adjacency(id)?.outgoing)
    }

    /// Number of distinct edges touching `id` in either direction.
    pub fn incident_edge_count(&self, id: &NodeId) -> Result<usize, SimError> {
        let adj = self.adjacency(id)?;
        Ok(adj.incoming.union(&adj.outgoing).count())
    }

    /// Remove an edge and prune it from both endpoints.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<SupplyChainEdge, SimError> {
        let edge = self
            .edges
            .remove(id)
            .ok_or_else(|| SimError::edge_not_found(id))?;
        if let Some(adj) = self.adjacency.get_mut(&edge.source_id) {
            adj.outgoing.remove(id);
        }
        if let Some(adj) = self.adjacency.get_mut(&edge.target_id) {
            adj.incoming.remove(id);
        }
        Ok(edge)
    }

    /// Remove a node together with every incident edge.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<SupplyChainNode, SimError> {
        let adj = self.adjacency(id)?;
        let incident: Vec<EdgeId> = adj.incoming.union(&adj.outgoing).cloned().collect();
        for edge_id in &incident {
            self.remove_edge(edge_id)?;
        }
        self.adjacency.remove(id);
        self.nodes
            .remove(id)
            .ok_or_else(|| SimError::node_not_found(id))
    }
}
