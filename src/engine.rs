//! Engine facade: top-level API for noema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, NoemaResult};
use crate::graph::index::SemanticNetwork;
use crate::graph::snapshot::NetworkSnapshot;
use crate::infer::engine::InferenceEngine;
use crate::infer::{Inference, InferenceQuery};
use crate::learn::{ConceptLearner, Experience, LearnedConcept};
use crate::node::{IdAllocator, NodeId};

/// Configuration for the noema engine.
///
/// Every field has a default, so a TOML document only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Node capacity; inserting beyond it evicts the least recently used node.
    pub max_nodes: usize,
    /// Maximum outgoing relations per node.
    pub max_relations_per_node: usize,
    /// Fraction of a node's activation passed along each edge (scaled by weight).
    pub spreading_factor: f32,
    /// Propagated activation below this is dropped.
    pub activation_threshold: f32,
    /// Maximum spreading rounds.
    pub max_spreading_depth: usize,
    /// Exponential decay rate, per second.
    pub decay_rate: f64,
    /// Maximum hops followed when collecting inherited properties.
    pub inheritance_depth: usize,
    /// Minimum similarity for relationship discovery.
    pub similarity_threshold: f32,
    /// Minimum resolved instances needed to extract a prototype.
    pub min_examples_for_concept: usize,
    /// Maximum similar nodes consulted by completion inference.
    pub completion_neighbors: usize,
    /// Minimum similarity for a RELATED_TO proposal between untyped pairs.
    pub related_to_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            max_relations_per_node: 1_000,
            spreading_factor: 0.5,
            activation_threshold: 0.1,
            max_spreading_depth: 3,
            decay_rate: 0.1,
            inheritance_depth: 10,
            similarity_threshold: 0.7,
            min_examples_for_concept: 3,
            completion_neighbors: 5,
            related_to_threshold: 0.8,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(s).map_err(|e| EngineError::ConfigParse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject zero capacities and out-of-range factors.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |message: String| Err(EngineError::InvalidConfig { message });

        if self.max_nodes == 0 {
            return invalid("max_nodes must be > 0".into());
        }
        if self.max_relations_per_node == 0 {
            return invalid("max_relations_per_node must be > 0".into());
        }
        if self.min_examples_for_concept == 0 {
            return invalid("min_examples_for_concept must be > 0".into());
        }
        for (name, value) in [
            ("spreading_factor", self.spreading_factor),
            ("activation_threshold", self.activation_threshold),
            ("similarity_threshold", self.similarity_threshold),
            ("related_to_threshold", self.related_to_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if !self.decay_rate.is_finite() || self.decay_rate < 0.0 {
            return invalid(format!(
                "decay_rate must be a non-negative number, got {}",
                self.decay_rate
            ));
        }
        Ok(())
    }
}

/// The noema semantic network engine.
///
/// Owns the network and the ID allocator; inference and learning are views
/// over the same shared network.
pub struct Engine {
    network: Arc<SemanticNetwork>,
    ids: Arc<IdAllocator>,
    inference: InferenceEngine,
    learner: ConceptLearner,
}

impl Engine {
    /// Create a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> NoemaResult<Self> {
        config.validate()?;

        tracing::info!(
            max_nodes = config.max_nodes,
            max_relations_per_node = config.max_relations_per_node,
            inheritance_depth = config.inheritance_depth,
            "initializing noema engine"
        );

        let network = Arc::new(SemanticNetwork::new(config));
        let ids = Arc::new(IdAllocator::new());
        let inference = InferenceEngine::new(Arc::clone(&network));
        let learner = ConceptLearner::with_allocator(Arc::clone(&network), Arc::clone(&ids));

        Ok(Self {
            network,
            ids,
            inference,
            learner,
        })
    }

    /// Create an engine from a TOML configuration document.
    pub fn from_toml_str(s: &str) -> NoemaResult<Self> {
        Self::new(EngineConfig::from_toml_str(s)?)
    }

    pub fn config(&self) -> &EngineConfig {
        self.network.config()
    }

    /// The shared semantic network.
    pub fn network(&self) -> &Arc<SemanticNetwork> {
        &self.network
    }

    pub fn inference(&self) -> &InferenceEngine {
        &self.inference
    }

    pub fn learner(&self) -> &ConceptLearner {
        &self.learner
    }

    /// Allocate a fresh node ID such as `concept_7`.
    pub fn next_id(&self, prefix: &str) -> NodeId {
        self.ids.next_id(prefix)
    }

    /// Deep copy of the network contents.
    pub fn snapshot(&self) -> NetworkSnapshot {
        self.network.snapshot()
    }

    /// Replace the network contents with a snapshot and resume ID allocation
    /// past every numbered ID it holds. On failure nothing changes.
    pub fn restore(&self, snapshot: &NetworkSnapshot) -> NoemaResult<()> {
        self.network.restore(snapshot)?;
        for node in &snapshot.nodes {
            self.ids.skip_past(&node.id);
        }
        tracing::debug!(next_id = self.ids.peek(), "resumed id allocation");
        Ok(())
    }

    /// Answer an inference query.
    pub fn infer(&self, query: &InferenceQuery) -> NoemaResult<Inference> {
        Ok(self.inference.answer(query)?)
    }

    /// Learn prototypes from experiences and commit each one to the network.
    ///
    /// Returns the committed concepts.
    pub fn learn_and_commit(&self, experiences: &[Experience]) -> NoemaResult<Vec<LearnedConcept>> {
        let concepts = self.learner.learn_from_experience(experiences)?;
        for concept in &concepts {
            self.learner.commit_learned_concept(concept)?;
        }
        Ok(concepts)
    }

    /// Summary of the engine state.
    pub fn info(&self) -> EngineInfo {
        let stats = self.network.stats();
        let config = self.network.config();
        EngineInfo {
            node_count: stats.node_count,
            relation_count: stats.relation_count,
            max_nodes: config.max_nodes,
            concept_count: stats
                .nodes_by_type
                .get(&crate::node::NodeType::Concept)
                .copied()
                .unwrap_or(0),
            mean_activation: stats.mean_activation,
            next_id: self.ids.peek(),
        }
    }
}

/// Summary information about the engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    pub node_count: usize,
    pub relation_count: usize,
    pub max_nodes: usize,
    pub concept_count: usize,
    pub mean_activation: f32,
    pub next_id: u64,
}

impl std::fmt::Display for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "noema engine info")?;
        writeln!(f, "  nodes:        {} / {}", self.node_count, self.max_nodes)?;
        writeln!(f, "  relations:    {}", self.relation_count)?;
        writeln!(f, "  concepts:     {}", self.concept_count)?;
        writeln!(f, "  activation:   {:.3}", self.mean_activation)?;
        writeln!(f, "  next id:      {}", self.next_id)?;
        Ok(())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", self.config())
            .field("network", &self.network)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoemaError;

    #[test]
    fn default_engine() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let info = engine.info();
        assert_eq!(info.node_count, 0);
        assert_eq!(info.max_nodes, 100_000);
        assert!(info.to_string().contains("noema engine info"));
    }

    #[test]
    fn zero_capacity_rejected() {
        let result = Engine::new(EngineConfig {
            max_nodes: 0,
            ..Default::default()
        });
        assert!(matches!(
            result,
            Err(NoemaError::Engine(EngineError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn out_of_range_factor_rejected() {
        let config = EngineConfig {
            spreading_factor: 1.5,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("spreading_factor"));
    }

    #[test]
    fn toml_overrides_only_given_keys() {
        let config = EngineConfig::from_toml_str(
            "max_nodes = 50\nspreading_factor = 0.25\ninheritance_depth = 2\n",
        )
        .unwrap();
        assert_eq!(config.max_nodes, 50);
        assert_eq!(config.spreading_factor, 0.25);
        assert_eq!(config.inheritance_depth, 2);
        assert_eq!(config.max_relations_per_node, 1_000);
        assert_eq!(config.related_to_threshold, 0.8);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_nodes = \"many\""),
            Err(EngineError::ConfigParse { .. })
        ));
        assert!(matches!(
            Engine::from_toml_str("max_nodes = 0"),
            Err(NoemaError::Engine(EngineError::InvalidConfig { .. }))
        ));
    }

    #[test]
    fn subsystems_share_one_network() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine
            .network()
            .add_node(crate::node::SemanticNode::new(
                "dog",
                "Dog",
                crate::node::NodeType::Concept,
            ))
            .unwrap();
        assert!(engine.learner().network().contains_node("dog"));
        assert_eq!(engine.next_id("concept").as_str(), "concept_1");
        assert_eq!(engine.info().next_id, 2);
    }

    #[test]
    fn restore_resumes_id_allocation() {
        let source = Engine::new(EngineConfig::default()).unwrap();
        for _ in 0..4 {
            let id = source.next_id("concept");
            source
                .network()
                .add_node(crate::node::SemanticNode::new(
                    id,
                    "C",
                    crate::node::NodeType::Concept,
                ))
                .unwrap();
        }

        let engine = Engine::new(EngineConfig::default()).unwrap();
        engine.restore(&source.snapshot()).unwrap();
        assert_eq!(engine.info().node_count, 4);
        assert_eq!(engine.next_id("concept").as_str(), "concept_5");
    }
}
