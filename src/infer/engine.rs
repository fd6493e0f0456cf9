//! Inference engine: inheritance, taxonomy and neighborhood reasoning.
//!
//! Each query runs under a single read lock on the network so that the answer
//! and its reasoning trace describe one consistent state.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::error::InferError;
use crate::graph::RelationType;
use crate::graph::index::{NetworkState, SemanticNetwork};
use crate::node::NodeId;

use super::{
    AnalogyInference, CompletionInference, Inference, InferenceQuery, MembershipInference,
    PropertyInference, ProposedRelation,
};

/// Result type for inference operations.
pub type InferResult<T> = std::result::Result<T, InferError>;

/// Stateless inference engine over a shared network.
pub struct InferenceEngine {
    network: Arc<SemanticNetwork>,
}

impl InferenceEngine {
    pub fn new(network: Arc<SemanticNetwork>) -> Self {
        Self { network }
    }

    /// Dispatch any query kind.
    pub fn answer(&self, query: &InferenceQuery) -> InferResult<Inference> {
        Ok(match query {
            InferenceQuery::Property { node, key } => {
                Inference::Property(self.infer_property(node.clone(), key)?)
            }
            InferenceQuery::Membership { instance, category } => Inference::Membership(
                self.infer_membership(instance.clone(), category.clone())?,
            ),
            InferenceQuery::Analogy { a, b, c } => {
                Inference::Analogy(self.infer_analogy(a.clone(), b.clone(), c.clone())?)
            }
            InferenceQuery::Completion { node } => {
                Inference::Completion(self.infer_completion(node.clone())?)
            }
        })
    }

    /// Resolve `key` through the node's inheritance closure.
    pub fn infer_property(
        &self,
        node: impl Into<NodeId>,
        key: &str,
    ) -> InferResult<PropertyInference> {
        let node = node.into();
        let closure = self
            .network
            .read()
            .inherited_properties(&node, self.network.config().inheritance_depth)?;

        let property = closure
            .get(key)
            .cloned()
            .ok_or_else(|| InferError::PropertyNotFound {
                node_id: node.to_string(),
                key: key.to_string(),
            })?;

        let line = if property.distance == 0 {
            format!("{node} defines {key}={} locally", property.value)
        } else {
            format!(
                "{node} inherits {key}={} from {} at distance {}",
                property.value, property.source_node_id, property.distance
            )
        };

        Ok(PropertyInference {
            node_id: node,
            property,
            reasoning: vec![line],
        })
    }

    /// Decide whether `instance` IS_A `category`, explaining each hop.
    pub fn infer_membership(
        &self,
        instance: impl Into<NodeId>,
        category: impl Into<NodeId>,
    ) -> InferResult<MembershipInference> {
        let instance = instance.into();
        let category = category.into();
        let state = self.network.read();

        if !state.is_a(&instance, &category)? {
            return Ok(MembershipInference {
                reasoning: vec![format!("no IS_A chain leads from {instance} to {category}")],
                instance,
                category,
                is_member: false,
                confidence: 1.0,
                path: Vec::new(),
            });
        }

        let path = state.is_a_path(&instance, &category)?.unwrap_or_default();
        let mut reasoning: Vec<String> = path
            .windows(2)
            .map(|hop| format!("{} IS_A {}", hop[0], hop[1]))
            .collect();
        if reasoning.is_empty() {
            reasoning.push(format!("{instance} is {category} itself"));
        }

        Ok(MembershipInference {
            instance,
            category,
            is_member: true,
            confidence: 1.0,
            path,
            reasoning,
        })
    }

    /// A is to B as C is to ?
    ///
    /// Takes the first edge A → B, then answers with the first target of C
    /// over the same relation type. Confidence is uniform over C's candidates.
    pub fn infer_analogy(
        &self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
        c: impl Into<NodeId>,
    ) -> InferResult<AnalogyInference> {
        let (a, b, c) = (a.into(), b.into(), c.into());
        let state = self.network.read();
        state.node(&a)?;
        state.node(&b)?;
        state.node(&c)?;

        let relation_type = state
            .outgoing(&a)
            .find(|r| r.target_id == b)
            .map(|r| r.relation_type)
            .ok_or_else(|| InferError::NoAnalogousRelation {
                from: a.to_string(),
                to: b.to_string(),
            })?;

        let candidates: Vec<NodeId> = state
            .outgoing(&c)
            .filter(|r| r.relation_type == relation_type)
            .map(|r| r.target_id.clone())
            .collect();
        let Some(answer) = candidates.first().cloned() else {
            return Err(InferError::NoAnalogyCandidates {
                node_id: c.to_string(),
                relation_type: relation_type.to_string(),
            });
        };

        let confidence = 1.0 / candidates.len() as f32;
        let reasoning = vec![
            format!("{a} {relation_type} {b}"),
            format!("{c} {relation_type} {answer}"),
            format!(
                "{a}:{b} :: {c}:{answer} ({} candidate(s))",
                candidates.len()
            ),
        ];

        Ok(AnalogyInference {
            answer,
            relation_type,
            candidates,
            confidence,
            reasoning,
        })
    }

    /// Propose relations the node lacks but its closest same-type peers have.
    ///
    /// Read-only: proposals are returned, never inserted.
    pub fn infer_completion(&self, node: impl Into<NodeId>) -> InferResult<CompletionInference> {
        let node = node.into();
        let state = self.network.read();
        let limit = self.network.config().completion_neighbors;
        let neighbors = similar_peers(&state, &node, limit)?;

        let existing: HashSet<(RelationType, &NodeId)> = state
            .outgoing(&node)
            .map(|r| (r.relation_type, &r.target_id))
            .collect();

        let mut best: BTreeMap<(RelationType, NodeId), ProposedRelation> = BTreeMap::new();
        for (peer_id, _) in &neighbors {
            let peer = state.node(peer_id)?;
            for rel in state.outgoing(peer_id) {
                if rel.target_id == node
                    || existing.contains(&(rel.relation_type, &rel.target_id))
                {
                    continue;
                }
                let score = peer.activation * rel.weight;
                let key = (rel.relation_type, rel.target_id.clone());
                let better = best.get(&key).is_none_or(|p| score > p.score);
                if better {
                    best.insert(
                        key,
                        ProposedRelation {
                            source_id: node.clone(),
                            relation_type: rel.relation_type,
                            target_id: rel.target_id.clone(),
                            score,
                            suggested_by: peer_id.clone(),
                        },
                    );
                }
            }
        }

        let mut proposals: Vec<ProposedRelation> = best.into_values().collect();
        proposals.sort_by(|x, y| y.score.total_cmp(&x.score));

        let mut reasoning: Vec<String> = neighbors
            .iter()
            .map(|(peer, shared)| format!("{peer} shares {shared} target(s) with {node}"))
            .collect();
        reasoning.extend(proposals.iter().map(|p| {
            format!(
                "{} has {} {}, so {node} may too (score {:.3})",
                p.suggested_by, p.relation_type, p.target_id, p.score
            )
        }));

        Ok(CompletionInference {
            node_id: node,
            neighbors,
            proposals,
            reasoning,
        })
    }
}

/// Up to `limit` nodes of the same type ranked by shared outgoing targets
/// (ties by ID). Nodes sharing nothing are not peers.
fn similar_peers(
    state: &NetworkState,
    node: &NodeId,
    limit: usize,
) -> InferResult<Vec<(NodeId, usize)>> {
    let node_type = state.node(node)?.node_type;
    let targets: HashSet<&NodeId> = state.outgoing(node).map(|r| &r.target_id).collect();

    let mut peers: Vec<(NodeId, usize)> = state
        .nodes
        .values()
        .filter(|other| &other.id != node && other.node_type == node_type)
        .filter_map(|other| {
            let theirs: HashSet<&NodeId> =
                state.outgoing(&other.id).map(|r| &r.target_id).collect();
            let shared = theirs.intersection(&targets).count();
            (shared > 0).then(|| (other.id.clone(), shared))
        })
        .collect();
    peers.sort_by(|x, y| y.1.cmp(&x.1));
    peers.truncate(limit);
    Ok(peers)
}
