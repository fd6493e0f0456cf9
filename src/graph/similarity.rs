//! Pairwise node similarity.
//!
//! When both nodes carry embeddings the score is their cosine similarity.
//! Otherwise a Wu-Palmer style structural score is computed from the depth of
//! the lowest common ancestor:
//!
//! `2·depth(lca) / (depth(a) + depth(b) + 2·depth(lca))`
//!
//! where depth is the longest IS_A / INSTANCE_OF chain above a node.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::node::NodeId;

use super::index::{GraphResult, NetworkState, SemanticNetwork};

/// How a similarity score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    Embedding,
    Structural,
}

impl std::fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMethod::Embedding => f.write_str("embedding"),
            SimilarityMethod::Structural => f.write_str("structural"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Similarity {
    pub score: f32,
    pub method: SimilarityMethod,
}

/// Cosine similarity of two vectors.
///
/// Mismatched lengths, empty vectors and zero norms yield 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

impl NetworkState {
    /// Longest IS_A / INSTANCE_OF chain above `id`.
    pub(crate) fn depth(&self, id: &NodeId) -> usize {
        let mut memo = HashMap::new();
        let mut on_path = HashSet::new();
        self.depth_inner(id, &mut memo, &mut on_path)
    }

    fn depth_inner<'a>(
        &'a self,
        id: &'a NodeId,
        memo: &mut HashMap<&'a NodeId, usize>,
        on_path: &mut HashSet<&'a NodeId>,
    ) -> usize {
        if let Some(&d) = memo.get(id) {
            return d;
        }
        // Per-type acyclicity still allows an IS_A edge one way and an
        // INSTANCE_OF edge back; stop there instead of recursing forever.
        if !on_path.insert(id) {
            return 0;
        }
        let mut deepest = 0;
        for rel in self.outgoing(id) {
            if rel.relation_type.is_inheritable() {
                deepest = deepest.max(1 + self.depth_inner(&rel.target_id, memo, on_path));
            }
        }
        on_path.remove(id);
        memo.insert(id, deepest);
        deepest
    }

    pub(crate) fn similarity(&self, a: &NodeId, b: &NodeId) -> GraphResult<Similarity> {
        let node_a = self.node(a)?;
        let node_b = self.node(b)?;

        if let (Some(ea), Some(eb)) = (&node_a.embedding, &node_b.embedding) {
            return Ok(Similarity {
                score: cosine_similarity(ea, eb),
                method: SimilarityMethod::Embedding,
            });
        }

        Ok(Similarity {
            score: self.structural_similarity(a, b)?,
            method: SimilarityMethod::Structural,
        })
    }

    fn structural_similarity(&self, a: &NodeId, b: &NodeId) -> GraphResult<f32> {
        let shared = self.common_ancestors(a, b)?;
        // The lowest common ancestor is the deepest shared one.
        let Some(lca_depth) = shared.iter().map(|c| self.depth(&c.id)).max() else {
            return Ok(0.0);
        };
        let lca = 2.0 * lca_depth as f32;
        let denominator = self.depth(a) as f32 + self.depth(b) as f32 + lca;
        if denominator == 0.0 {
            return Ok(0.0);
        }
        Ok(lca / denominator)
    }
}

impl SemanticNetwork {
    /// Similarity of two nodes: embedding cosine if both have embeddings,
    /// structural otherwise.
    pub fn similarity(
        &self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
    ) -> GraphResult<Similarity> {
        self.read().similarity(&a.into(), &b.into())
    }

    /// Longest IS_A / INSTANCE_OF chain above a node.
    pub fn depth(&self, id: impl Into<NodeId>) -> GraphResult<usize> {
        let id = id.into();
        let state = self.read();
        state.node(&id)?;
        Ok(state.depth(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::{RelationType, SemanticRelation};
    use crate::node::{NodeType, SemanticNode};

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn self_similarity_with_embedding_is_one() {
        let net = SemanticNetwork::default();
        net.add_node(
            SemanticNode::new("a", "A", NodeType::Concept)
                .with_embedding(vec![0.3, -0.7, 2.5]),
        )
        .unwrap();
        let sim = net.similarity("a", "a").unwrap();
        assert_eq!(sim.method, SimilarityMethod::Embedding);
        assert!((sim.score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_embeddings_fail_soft() {
        let net = SemanticNetwork::default();
        net.add_node(
            SemanticNode::new("a", "A", NodeType::Concept)
                .with_embedding(vec![1.0, 0.0]),
        )
        .unwrap();
        net.add_node(
            SemanticNode::new("b", "B", NodeType::Concept)
                .with_embedding(vec![1.0]),
        )
        .unwrap();
        let sim = net.similarity("a", "b").unwrap();
        assert_eq!(sim.method, SimilarityMethod::Embedding);
        assert_eq!(sim.score, 0.0);
    }

    fn taxonomy() -> SemanticNetwork {
        // animal <- mammal <- {dog, cat}; animal <- bird
        let net = SemanticNetwork::default();
        for id in ["animal", "mammal", "dog", "cat", "bird", "rock"] {
            net.add_node(SemanticNode::new(id, id, NodeType::Concept))
                .unwrap();
        }
        let edges = [
            ("mammal", "animal"),
            ("dog", "mammal"),
            ("cat", "mammal"),
            ("bird", "animal"),
        ];
        for (s, t) in edges {
            net.add_relation(SemanticRelation::new(s, RelationType::IsA, t))
                .unwrap();
        }
        net
    }

    #[test]
    fn depth_is_longest_chain() {
        let net = taxonomy();
        assert_eq!(net.depth("animal").unwrap(), 0);
        assert_eq!(net.depth("dog").unwrap(), 2);
        net.add_relation(SemanticRelation::new("dog", RelationType::InstanceOf, "animal"))
            .unwrap();
        assert_eq!(net.depth("dog").unwrap(), 2);
    }

    #[test]
    fn structural_similarity_uses_lca_depth() {
        let net = taxonomy();
        // lca(dog, cat) = mammal, depth 1: 2 / (2 + 2 + 2)
        let sim = net.similarity("dog", "cat").unwrap();
        assert_eq!(sim.method, SimilarityMethod::Structural);
        assert!((sim.score - 1.0 / 3.0).abs() < 1e-6);

        // lca(dog, bird) = animal, depth 0
        assert_eq!(net.similarity("dog", "bird").unwrap().score, 0.0);
        // no shared ancestor
        assert_eq!(net.similarity("dog", "rock").unwrap().score, 0.0);
    }

    #[test]
    fn cross_type_cycle_does_not_hang() {
        let net = SemanticNetwork::default();
        for id in ["a", "b"] {
            net.add_node(SemanticNode::new(id, id, NodeType::Concept))
                .unwrap();
        }
        net.add_relation(SemanticRelation::new("a", RelationType::IsA, "b"))
            .unwrap();
        net.add_relation(SemanticRelation::new("b", RelationType::InstanceOf, "a"))
            .unwrap();
        assert!(net.depth("a").unwrap() >= 1);
        assert!(net.similarity("a", "b").is_ok());
    }

    #[test]
    fn unknown_nodes_fail_loud() {
        let net = taxonomy();
        assert!(matches!(
            net.similarity("dog", "unicorn"),
            Err(GraphError::NodeNotFound { .. })
        ));
    }
}
