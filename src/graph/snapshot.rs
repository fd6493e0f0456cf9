//! Point-in-time snapshots of the network.
//!
//! A [`NetworkSnapshot`] is a deep copy: nothing in it aliases live state, so
//! it can be handed to other threads or serialized by an external persistence
//! layer in whatever format that layer chooses.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::{SemanticNode, now_millis};

use super::SemanticRelation;
use super::index::{GraphResult, NetworkState, NetworkStats, SemanticNetwork};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    /// Nodes ordered by ID.
    pub nodes: Vec<SemanticNode>,
    /// Relations ordered by ID.
    pub relations: Vec<SemanticRelation>,
    pub stats: NetworkStats,
    /// Milliseconds since UNIX epoch.
    pub timestamp: u64,
}

impl NetworkState {
    /// Build a fresh state from snapshot contents, enforcing every insertion
    /// invariant along the way.
    fn from_snapshot(
        snapshot: &NetworkSnapshot,
        max_nodes: usize,
        max_relations_per_node: usize,
    ) -> GraphResult<NetworkState> {
        let mut state = NetworkState::default();
        for node in &snapshot.nodes {
            if state.nodes.contains_key(&node.id) {
                return Err(GraphError::NodeAlreadyExists {
                    node_id: node.id.to_string(),
                });
            }
            state.place_node(node.clone());
        }
        if state.nodes.len() > max_nodes {
            tracing::warn!(
                nodes = state.nodes.len(),
                max_nodes,
                "restored snapshot exceeds max_nodes; eviction resumes on next insert"
            );
        }
        for rel in &snapshot.relations {
            state.insert_relation(rel.clone(), max_relations_per_node)?;
        }
        state.reseed_recency();
        Ok(state)
    }
}

impl SemanticNetwork {
    /// Deep-copy the current contents.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let state = self.read();
        NetworkSnapshot {
            nodes: state.nodes.values().cloned().collect(),
            relations: state.relations.values().cloned().collect(),
            stats: state.stats(),
            timestamp: now_millis(),
        }
    }

    /// Replace the current contents with a snapshot.
    ///
    /// The snapshot is fully validated first; on failure the network keeps
    /// its current contents.
    pub fn restore(&self, snapshot: &NetworkSnapshot) -> GraphResult<()> {
        let config = self.config();
        let rebuilt = NetworkState::from_snapshot(
            snapshot,
            config.max_nodes,
            config.max_relations_per_node,
        )?;
        let mut state = self.write();
        *state = rebuilt;
        tracing::info!(
            nodes = state.nodes.len(),
            relations = state.relations.len(),
            "restored network snapshot"
        );
        Ok(())
    }
}
