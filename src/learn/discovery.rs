//! Relationship discovery between similar, unconnected nodes.
//!
//! Every unordered pair is scored with
//! [`similarity`](crate::graph::index::SemanticNetwork::similarity). Pairs are
//! scored in parallel under a single read lock; the result order is the ID
//! order of the pair, so output is deterministic regardless of thread
//! scheduling.

use rayon::prelude::*;
use serde_json::Value;

use crate::graph::{RelationType, SemanticRelation};
use crate::node::{NodeId, NodeType};

use super::{ConceptLearner, LEARNER_SOURCE, LearnResult};

/// Relation type implied by the node types of a similar pair.
///
/// Returns the type and whether the pair must be flipped so the edge points
/// the conventional way (instance → concept, agent → domain, action → concept).
pub(crate) fn implied_relation(a: NodeType, b: NodeType) -> Option<(RelationType, bool)> {
    use NodeType::*;
    match (a, b) {
        (Agent, Domain) => Some((RelationType::BelongsTo, false)),
        (Domain, Agent) => Some((RelationType::BelongsTo, true)),
        (Instance, Concept) => Some((RelationType::InstanceOf, false)),
        (Concept, Instance) => Some((RelationType::InstanceOf, true)),
        (Concept, Concept) => Some((RelationType::SimilarTo, false)),
        (Action, Concept) => Some((RelationType::UsedFor, false)),
        (Concept, Action) => Some((RelationType::UsedFor, true)),
        _ => None,
    }
}

impl ConceptLearner {
    /// Propose relations between unconnected node pairs whose similarity is
    /// strictly above both `similarity_threshold` and `min_confidence`.
    ///
    /// The relation type follows from the node types; pairs with no implied
    /// type only get RELATED_TO, and only at or above `related_to_threshold`.
    /// Nothing is inserted: the proposals carry weight and confidence equal to
    /// the similarity score and are left for the caller to commit.
    pub fn discover_relationships(
        &self,
        min_confidence: f32,
    ) -> LearnResult<Vec<SemanticRelation>> {
        let config = self.network.config();
        let threshold = config.similarity_threshold.max(min_confidence);
        let related_to_threshold = config.related_to_threshold;

        let state = self.network.read();
        let ids: Vec<&NodeId> = state.nodes.keys().collect();
        let pairs: Vec<(usize, usize)> = (0..ids.len())
            .flat_map(|i| ((i + 1)..ids.len()).map(move |j| (i, j)))
            .collect();

        let discovered: Vec<SemanticRelation> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                let (a, b) = (ids[i], ids[j]);
                if state.connected(a, b) {
                    return None;
                }
                let similarity = state.similarity(a, b).ok()?;
                if similarity.score <= threshold {
                    return None;
                }

                let type_a = state.node(a).ok()?.node_type;
                let type_b = state.node(b).ok()?.node_type;
                let (relation_type, flip) = match implied_relation(type_a, type_b) {
                    Some(implied) => implied,
                    None if similarity.score >= related_to_threshold => {
                        (RelationType::RelatedTo, false)
                    }
                    None => return None,
                };
                let (source, target) = if flip { (b, a) } else { (a, b) };

                Some(
                    SemanticRelation::new(source.clone(), relation_type, target.clone())
                        .with_weight(similarity.score)
                        .with_confidence(similarity.score)
                        .with_source(LEARNER_SOURCE)
                        .with_property("similarity", Value::from(f64::from(similarity.score)))
                        .with_property("method", similarity.method.to_string()),
                )
            })
            .collect();

        tracing::debug!(
            pairs = pairs.len(),
            discovered = discovered.len(),
            threshold,
            "relationship discovery finished"
        );
        Ok(discovered)
    }
}
