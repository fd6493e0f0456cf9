//! In-memory semantic network with dual adjacency indexing.
//!
//! Uses `petgraph` for the topology: each node's outgoing edge list is the
//! by-source index and its incoming edge list the by-target index. Node and
//! relation payloads live in ID-ordered maps next to it inside one
//! [`NetworkState`], guarded by a single `RwLock`. All mutations update the
//! maps and the topology under the same exclusive lock.
//!
//! Locking: structural mutations, activation updates and [`SemanticNetwork::get_node`]
//! take the write lock. `get_node` writes because it refreshes recency metadata
//! that LRU eviction depends on; callers that only need to look use
//! [`SemanticNetwork::peek_node`], which takes the read lock. All accessors hand
//! out owned copies, never references into the live state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{EdgeIndex, EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeFiltered;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineConfig;
use crate::error::GraphError;
use crate::node::{NodeId, NodeType, SemanticNode};

use super::{RelationId, RelationType, SemanticRelation};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Canonical sets plus topology. Only ever touched under the lock.
#[derive(Debug, Default)]
pub(crate) struct NetworkState {
    pub(crate) nodes: BTreeMap<NodeId, SemanticNode>,
    pub(crate) relations: BTreeMap<RelationId, SemanticRelation>,
    /// Node weights are node IDs, edge weights relation IDs.
    pub(crate) topology: StableDiGraph<NodeId, RelationId>,
    pub(crate) node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<RelationId, EdgeIndex>,
    /// Node → access sequence number of its last recorded read or write.
    recency: HashMap<NodeId, u64>,
    access_seq: u64,
}

impl NetworkState {
    pub(crate) fn node(&self, id: &NodeId) -> GraphResult<&SemanticNode> {
        self.nodes.get(id).ok_or_else(|| node_not_found(id))
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> GraphResult<&mut SemanticNode> {
        self.nodes.get_mut(id).ok_or_else(|| node_not_found(id))
    }

    pub(crate) fn index_of(&self, id: &NodeId) -> GraphResult<NodeIndex> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| node_not_found(id))
    }

    /// Relations on one side of `id`, oldest first.
    fn adjacent<'a>(
        &'a self,
        id: &NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = &'a SemanticRelation> + use<'a> {
        let mut ids: Vec<&'a RelationId> = match self.node_index.get(id) {
            Some(&ix) => self
                .topology
                .edges_directed(ix, direction)
                .map(|e| e.weight())
                .collect(),
            None => Vec::new(),
        };
        // petgraph links each new edge at the head of the node's list.
        ids.reverse();
        ids.into_iter().filter_map(|rid| self.relations.get(rid))
    }

    /// Outgoing relations of `id` in insertion order.
    pub(crate) fn outgoing<'a>(
        &'a self,
        id: &NodeId,
    ) -> impl Iterator<Item = &'a SemanticRelation> + use<'a> {
        self.adjacent(id, Direction::Outgoing)
    }

    /// Incoming relations of `id` in insertion order.
    pub(crate) fn incoming<'a>(
        &'a self,
        id: &NodeId,
    ) -> impl Iterator<Item = &'a SemanticRelation> + use<'a> {
        self.adjacent(id, Direction::Incoming)
    }

    fn out_degree(&self, ix: NodeIndex) -> usize {
        self.topology.edges_directed(ix, Direction::Outgoing).count()
    }

    /// True if any relation joins `a` and `b` in either direction.
    pub(crate) fn connected(&self, a: &NodeId, b: &NodeId) -> bool {
        match (self.node_index.get(a), self.node_index.get(b)) {
            (Some(&a), Some(&b)) => {
                self.topology.find_edge(a, b).is_some() || self.topology.find_edge(b, a).is_some()
            }
            _ => false,
        }
    }

    /// True if a directed path of `relation_type` edges leads from `from` to `to`.
    pub(crate) fn has_typed_path(
        &self,
        from: &NodeId,
        to: &NodeId,
        relation_type: RelationType,
    ) -> bool {
        let (Some(&from), Some(&to)) = (self.node_index.get(from), self.node_index.get(to)) else {
            return false;
        };
        let typed = EdgeFiltered::from_fn(&self.topology, |e: EdgeReference<'_, RelationId>| {
            e.weight().relation_type == relation_type
        });
        has_path_connecting(&typed, from, to, None)
    }

    fn record_access(&mut self, id: &NodeId) {
        self.access_seq += 1;
        self.recency.insert(id.clone(), self.access_seq);
    }

    /// The least recently accessed node: oldest `last_accessed`, then oldest
    /// access sequence, then smallest ID.
    fn lru_candidate(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .min_by_key(|n| {
                (
                    n.last_accessed,
                    self.recency.get(&n.id).copied().unwrap_or(0),
                    n.id.clone(),
                )
            })
            .map(|n| n.id.clone())
    }

    pub(crate) fn insert_node(
        &mut self,
        node: SemanticNode,
        max_nodes: usize,
    ) -> GraphResult<Option<SemanticNode>> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::NodeAlreadyExists {
                node_id: node.id.to_string(),
            });
        }

        let mut evicted = None;
        if self.nodes.len() >= max_nodes {
            if let Some(victim) = self.lru_candidate() {
                let (node, relations) = self.detach_node(&victim)?;
                tracing::debug!(
                    node = %victim,
                    relations = relations.len(),
                    "evicted least recently accessed node"
                );
                evicted = Some(node);
            }
        }

        let id = node.id.clone();
        self.place_node(node);
        self.record_access(&id);
        Ok(evicted)
    }

    /// Add a node to the maps and the topology without any checks.
    pub(crate) fn place_node(&mut self, node: SemanticNode) {
        let ix = self.topology.add_node(node.id.clone());
        self.node_index.insert(node.id.clone(), ix);
        self.nodes.insert(node.id.clone(), node);
    }

    /// Remove a node and every relation touching it, keeping both indexes in sync.
    pub(crate) fn detach_node(
        &mut self,
        id: &NodeId,
    ) -> GraphResult<(SemanticNode, Vec<SemanticRelation>)> {
        let node = self.nodes.remove(id).ok_or_else(|| node_not_found(id))?;
        self.recency.remove(id);

        let mut removed = Vec::new();
        if let Some(ix) = self.node_index.remove(id) {
            let touching: Vec<RelationId> = self
                .topology
                .edges_directed(ix, Direction::Outgoing)
                .chain(self.topology.edges_directed(ix, Direction::Incoming))
                .map(|e| e.weight().clone())
                .collect();
            // Drops every edge on the node as well.
            self.topology.remove_node(ix);
            for rid in touching {
                self.edge_index.remove(&rid);
                if let Some(rel) = self.relations.remove(&rid) {
                    removed.push(rel);
                }
            }
        }
        Ok((node, removed))
    }

    /// Validate and insert a relation. The graph is untouched on failure.
    pub(crate) fn insert_relation(
        &mut self,
        mut rel: SemanticRelation,
        max_relations_per_node: usize,
    ) -> GraphResult<RelationId> {
        let source = self.index_of(&rel.source_id)?;
        let target = self.index_of(&rel.target_id)?;
        if rel.source_id == rel.target_id {
            return Err(GraphError::SelfRelation {
                node_id: rel.source_id.to_string(),
            });
        }

        rel.id = RelationId::derive(&rel.source_id, rel.relation_type, &rel.target_id);
        if self.relations.contains_key(&rel.id) {
            return Err(GraphError::RelationAlreadyExists {
                relation_id: rel.id.to_string(),
            });
        }

        if rel.relation_type.is_hierarchical()
            && self.has_typed_path(&rel.target_id, &rel.source_id, rel.relation_type)
        {
            return Err(GraphError::CyclicHierarchy {
                source_id: rel.source_id.to_string(),
                target_id: rel.target_id.to_string(),
                relation_type: rel.relation_type.to_string(),
            });
        }

        if self.out_degree(source) >= max_relations_per_node {
            return Err(GraphError::RelationLimitReached {
                node_id: rel.source_id.to_string(),
                limit: max_relations_per_node,
            });
        }

        let id = rel.id.clone();
        let edge = self.topology.add_edge(source, target, id.clone());
        self.edge_index.insert(id.clone(), edge);
        self.relations.insert(id.clone(), rel);
        Ok(id)
    }

    pub(crate) fn remove_relation(&mut self, id: &RelationId) -> GraphResult<SemanticRelation> {
        let rel = self
            .relations
            .remove(id)
            .ok_or_else(|| GraphError::RelationNotFound {
                relation_id: id.to_string(),
            })?;
        if let Some(edge) = self.edge_index.remove(id) {
            self.topology.remove_edge(edge);
        }
        Ok(rel)
    }

    /// Rebuild recency order from node timestamps (after a restore).
    pub(crate) fn reseed_recency(&mut self) {
        let mut order: Vec<(u64, NodeId)> = self
            .nodes
            .values()
            .map(|n| (n.last_accessed, n.id.clone()))
            .collect();
        order.sort();
        self.recency.clear();
        self.access_seq = 0;
        for (_, id) in order {
            self.record_access(&id);
        }
    }

    pub(crate) fn stats(&self) -> NetworkStats {
        let mut nodes_by_type = BTreeMap::new();
        let mut activation_sum = 0.0f64;
        for node in self.nodes.values() {
            *nodes_by_type.entry(node.node_type).or_insert(0) += 1;
            activation_sum += f64::from(node.activation);
        }
        let mut relations_by_type = BTreeMap::new();
        for rel in self.relations.values() {
            *relations_by_type.entry(rel.relation_type).or_insert(0) += 1;
        }
        let mean_activation = if self.nodes.is_empty() {
            0.0
        } else {
            (activation_sum / self.nodes.len() as f64) as f32
        };
        NetworkStats {
            node_count: self.nodes.len(),
            relation_count: self.relations.len(),
            nodes_by_type,
            relations_by_type,
            mean_activation,
        }
    }
}

pub(crate) fn node_not_found(id: &NodeId) -> GraphError {
    GraphError::NodeNotFound {
        node_id: id.to_string(),
    }
}

/// Aggregate counts over the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub node_count: usize,
    pub relation_count: usize,
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    pub relations_by_type: BTreeMap<RelationType, usize>,
    pub mean_activation: f32,
}

/// The semantic network store.
///
/// Thread-safe: share it behind an `Arc`. See the module docs for the locking
/// model.
pub struct SemanticNetwork {
    config: EngineConfig,
    state: RwLock<NetworkState>,
}

impl SemanticNetwork {
    /// Create an empty network with the given limits and tuning parameters.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            state: RwLock::new(NetworkState::default()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, NetworkState> {
        self.state.read().expect("network lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, NetworkState> {
        self.state.write().expect("network lock poisoned")
    }

    /// Insert a node, evicting the least recently accessed node first when the
    /// network is at `max_nodes`.
    pub fn add_node(&self, node: SemanticNode) -> GraphResult<()> {
        let mut state = self.write();
        state.insert_node(node, self.config.max_nodes)?;
        Ok(())
    }

    /// Fetch a node and record the access (refreshes `last_accessed`, bumps
    /// `access_count`). Takes the write lock.
    pub fn get_node(&self, id: impl Into<NodeId>) -> GraphResult<SemanticNode> {
        let id = id.into();
        let mut state = self.write();
        let node = state.node_mut(&id)?;
        node.touch();
        let copy = node.clone();
        state.record_access(&id);
        Ok(copy)
    }

    /// Fetch a node without touching its recency metadata.
    pub fn peek_node(&self, id: impl Into<NodeId>) -> GraphResult<SemanticNode> {
        let id = id.into();
        self.read().node(&id).cloned()
    }

    pub fn contains_node(&self, id: impl Into<NodeId>) -> bool {
        let id: NodeId = id.into();
        self.read().nodes.contains_key(&id)
    }

    /// Remove a node and cascade-remove every relation it participates in.
    pub fn remove_node(&self, id: impl Into<NodeId>) -> GraphResult<SemanticNode> {
        let id = id.into();
        let (node, relations) = self.write().detach_node(&id)?;
        tracing::debug!(node = %id, relations = relations.len(), "removed node");
        Ok(node)
    }

    /// Validate and insert a relation, returning its derived ID.
    pub fn add_relation(&self, relation: SemanticRelation) -> GraphResult<RelationId> {
        self.write()
            .insert_relation(relation, self.config.max_relations_per_node)
    }

    pub fn get_relation(&self, id: &RelationId) -> GraphResult<SemanticRelation> {
        self.read()
            .relations
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::RelationNotFound {
                relation_id: id.to_string(),
            })
    }

    pub fn remove_relation(&self, id: &RelationId) -> GraphResult<SemanticRelation> {
        self.write().remove_relation(id)
    }

    /// Outgoing relations of a node in insertion order (empty for unknown nodes).
    pub fn outgoing_relations(&self, id: impl Into<NodeId>) -> Vec<SemanticRelation> {
        let id = id.into();
        self.read().outgoing(&id).cloned().collect()
    }

    /// Incoming relations of a node in insertion order (empty for unknown nodes).
    pub fn incoming_relations(&self, id: impl Into<NodeId>) -> Vec<SemanticRelation> {
        let id = id.into();
        self.read().incoming(&id).cloned().collect()
    }

    /// Targets of a node's outgoing relations, optionally restricted to one type.
    pub fn related_nodes(
        &self,
        id: impl Into<NodeId>,
        relation_type: Option<RelationType>,
    ) -> Vec<SemanticNode> {
        let id = id.into();
        let state = self.read();
        let mut seen = HashSet::new();
        state
            .outgoing(&id)
            .filter(|r| relation_type.is_none_or(|t| r.relation_type == t))
            .filter(|r| seen.insert(r.target_id.clone()))
            .filter_map(|r| state.nodes.get(&r.target_id).cloned())
            .collect()
    }

    /// All nodes of one type, ordered by ID.
    pub fn nodes_by_type(&self, node_type: NodeType) -> Vec<SemanticNode> {
        self.read()
            .nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect()
    }

    /// Nodes whose label contains `needle` (case-insensitive), ordered by ID.
    pub fn nodes_by_label(&self, needle: &str) -> Vec<SemanticNode> {
        let needle = needle.to_lowercase();
        self.read()
            .nodes
            .values()
            .filter(|n| n.label.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// All nodes, ordered by ID.
    pub fn all_nodes(&self) -> Vec<SemanticNode> {
        self.read().nodes.values().cloned().collect()
    }

    /// All relations, ordered by ID.
    pub fn all_relations(&self) -> Vec<SemanticRelation> {
        self.read().relations.values().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }

    pub fn relation_count(&self) -> usize {
        self.read().relations.len()
    }

    pub fn set_property(
        &self,
        id: impl Into<NodeId>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> GraphResult<()> {
        let id = id.into();
        let mut state = self.write();
        state.node_mut(&id)?.properties.insert(key.into(), value.into());
        Ok(())
    }

    pub fn set_embedding(&self, id: impl Into<NodeId>, embedding: Vec<f32>) -> GraphResult<()> {
        let id = id.into();
        let mut state = self.write();
        state.node_mut(&id)?.embedding = Some(embedding);
        Ok(())
    }

    /// Change a node's rest level. Current activation is left to decay toward it.
    pub fn set_base_activation(&self, id: impl Into<NodeId>, level: f32) -> GraphResult<()> {
        let id = id.into();
        self.write().node_mut(&id)?.base_activation = level.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn stats(&self) -> NetworkStats {
        self.read().stats()
    }
}

impl Default for SemanticNetwork {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for SemanticNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("SemanticNetwork")
            .field("nodes", &state.nodes.len())
            .field("relations", &state.relations.len())
            .finish()
    }
}
