//! Folding raw task experiences into instance nodes and prototypes.

use std::collections::{BTreeMap, HashSet};

use crate::error::LearnError;
use crate::node::{NodeId, NodeType, SemanticNode};

use super::{ConceptLearner, Experience, LearnResult, LearnedConcept};

/// Provenance tag on instance nodes materialized from experiences.
pub const EXPERIENCE_SOURCE: &str = "experience";

/// Node ID of the instance standing for one agent's task signature.
///
/// Shaped `exp:{agent}:{signature}`. `%` and `:` in the agent ID are
/// percent-escaped, so the first `:` after the prefix always ends the agent
/// and distinct pairs never share an ID.
pub fn experience_node_id(agent_id: &str, task_signature: &str) -> NodeId {
    let agent = agent_id.replace('%', "%25").replace(':', "%3A");
    NodeId::new(format!("exp:{agent}:{task_signature}"))
}

impl Experience {
    fn to_instance(&self) -> SemanticNode {
        let id = experience_node_id(&self.agent_id, &self.task_signature);
        let mut node = SemanticNode::new(id, self.task_signature.clone(), NodeType::Instance)
            .with_property("agent", self.agent_id.clone())
            .with_property("task_signature", self.task_signature.clone())
            .with_property("strategy", self.strategy.clone())
            .with_property("success", self.success)
            .with_property("fitness", self.fitness)
            .with_source(EXPERIENCE_SOURCE);
        node.embedding = self.embedding.clone();
        node
    }
}

impl ConceptLearner {
    /// Group experiences by agent, make sure every distinct task signature has
    /// an instance node, and extract one prototype per agent with enough
    /// instances.
    ///
    /// Signatures already present in the network are reused as-is. The
    /// returned concepts are not committed.
    pub fn learn_from_experience(
        &self,
        experiences: &[Experience],
    ) -> LearnResult<Vec<LearnedConcept>> {
        let mut by_agent: BTreeMap<&str, Vec<&Experience>> = BTreeMap::new();
        for exp in experiences {
            by_agent.entry(exp.agent_id.as_str()).or_default().push(exp);
        }

        let mut concepts = Vec::new();
        for (agent, group) in by_agent {
            let mut seen: HashSet<&str> = HashSet::new();
            let mut instance_ids: Vec<NodeId> = Vec::new();
            let mut created = 0usize;

            for exp in group {
                if !seen.insert(exp.task_signature.as_str()) {
                    continue;
                }
                let id = experience_node_id(agent, &exp.task_signature);
                if !self.network.contains_node(&id) {
                    self.network.add_node(exp.to_instance())?;
                    created += 1;
                }
                instance_ids.push(id);
            }

            tracing::debug!(agent, instances = instance_ids.len(), created, "grouped experiences");

            if instance_ids.len() < self.min_examples() {
                continue;
            }
            match self.extract_prototype(&instance_ids) {
                Ok(concept) => concepts.push(concept),
                // Instances may have been evicted by later inserts.
                Err(LearnError::InsufficientExamples { required, found }) => {
                    tracing::warn!(
                        agent,
                        required,
                        found,
                        "too few instances survived for a prototype"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            experiences = experiences.len(),
            concepts = concepts.len(),
            "learned from experience"
        );
        Ok(concepts)
    }
}
