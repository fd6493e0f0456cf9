//! Prototype extraction and commit.

use crate::error::LearnError;
use crate::graph::{RelationType, SemanticRelation};
use crate::node::{NodeId, NodeType, Properties, SemanticNode};

use super::{CommitReport, ConceptLearner, LEARNER_SOURCE, LearnResult, LearnedConcept};

/// Element-wise mean over the embeddings whose length matches the first one seen.
pub(crate) fn centroid<'a>(embeddings: impl IntoIterator<Item = &'a [f32]>) -> Option<Vec<f32>> {
    let mut iter = embeddings.into_iter().filter(|e| !e.is_empty());
    let first = iter.next()?;
    let mut sum: Vec<f64> = first.iter().map(|&x| f64::from(x)).collect();
    let mut count = 1usize;
    for embedding in iter {
        if embedding.len() != sum.len() {
            continue;
        }
        for (acc, &x) in sum.iter_mut().zip(embedding) {
            *acc += f64::from(x);
        }
        count += 1;
    }
    Some(sum.into_iter().map(|x| (x / count as f64) as f32).collect())
}

impl ConceptLearner {
    /// Extract a prototype from the given instances.
    ///
    /// Unknown IDs are skipped; fails with `InsufficientExamples` when fewer
    /// than `min_examples_for_concept` resolve. Property values are compared
    /// structurally.
    pub fn extract_prototype(&self, instance_ids: &[NodeId]) -> LearnResult<LearnedConcept> {
        let state = self.network.read();
        let mut instances: Vec<&SemanticNode> = Vec::new();
        for id in instance_ids {
            if let Ok(node) = state.node(id) {
                if !instances.iter().any(|n| n.id == node.id) {
                    instances.push(node);
                }
            }
        }

        let required = self.min_examples();
        if instances.len() < required || instances.is_empty() {
            return Err(LearnError::InsufficientExamples {
                required,
                found: instances.len(),
            });
        }

        let first = instances[0];
        let common_properties: Properties = first
            .properties
            .iter()
            .filter(|(key, value)| {
                instances[1..]
                    .iter()
                    .all(|other| other.properties.get(*key) == Some(*value))
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let confidence = if first.properties.is_empty() {
            0.0
        } else {
            common_properties.len() as f32 / first.properties.len() as f32
        };

        let centroid = centroid(instances.iter().filter_map(|n| n.embedding.as_deref()));

        let label = if common_properties.is_empty() {
            format!("prototype of {} instances", instances.len())
        } else {
            common_properties
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => format!("{k}={s}"),
                    other => format!("{k}={other}"),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        // Another learner, or a restored snapshot, may already own the next number.
        let id = loop {
            let candidate = self.ids.next_id("concept");
            if !state.nodes.contains_key(&candidate) {
                break candidate;
            }
        };

        Ok(LearnedConcept {
            id,
            label,
            common_properties,
            centroid,
            confidence,
            instances: instances.iter().map(|n| n.id.clone()).collect(),
        })
    }

    /// Insert the prototype as a concept node and link every source instance
    /// to it with INSTANCE_OF.
    ///
    /// A failing node insert aborts the commit. Failing relation inserts do not:
    /// they are logged, reported, and the remaining instances are still linked.
    /// Nothing is rolled back.
    pub fn commit_learned_concept(&self, concept: &LearnedConcept) -> LearnResult<CommitReport> {
        let mut node =
            SemanticNode::new(concept.id.clone(), concept.label.clone(), NodeType::Concept)
                .with_confidence(concept.confidence)
                .with_source(LEARNER_SOURCE);
        node.properties = concept.common_properties.clone();
        node.embedding = concept.centroid.clone();
        self.network.add_node(node)?;

        let mut report = CommitReport {
            concept_id: concept.id.clone(),
            linked: Vec::new(),
            failed: Vec::new(),
        };
        for instance in &concept.instances {
            let relation = SemanticRelation::new(
                instance.clone(),
                RelationType::InstanceOf,
                concept.id.clone(),
            )
            .with_confidence(concept.confidence)
            .with_source(LEARNER_SOURCE);
            match self.network.add_relation(relation) {
                Ok(id) => report.linked.push(id),
                Err(e) => {
                    tracing::warn!(
                        instance = %instance,
                        concept = %concept.id,
                        error = %e,
                        "could not link instance to learned concept, continuing"
                    );
                    report.failed.push((instance.clone(), e));
                }
            }
        }

        tracing::info!(
            concept = %concept.id,
            linked = report.linked.len(),
            failed = report.failed.len(),
            "committed learned concept"
        );
        Ok(report)
    }
}
