//! Unsupervised concept formation.
//!
//! The [`ConceptLearner`] synthesizes prototype concepts from clusters of
//! instances, discovers relations between similar nodes, and folds raw
//! experience records into instance nodes. Learned concepts stay detached
//! from the graph until [`ConceptLearner::commit_learned_concept`] is called.

pub mod discovery;
pub mod experience;
pub mod prototype;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, LearnError};
use crate::graph::RelationId;
use crate::graph::index::SemanticNetwork;
use crate::node::{IdAllocator, NodeId, Properties};

/// Result type for concept-learning operations.
pub type LearnResult<T> = std::result::Result<T, LearnError>;

/// Provenance tag written on everything the learner creates.
pub const LEARNER_SOURCE: &str = "concept_learner";

/// A prototype synthesized from a set of instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedConcept {
    pub id: NodeId,
    pub label: String,
    /// Properties whose values are equal across every instance.
    pub common_properties: Properties,
    /// Element-wise mean of the instance embeddings sharing one dimension.
    pub centroid: Option<Vec<f32>>,
    /// `|common_properties| / |properties of the first instance|`.
    pub confidence: f32,
    /// Instances the prototype was extracted from, in input order.
    pub instances: Vec<NodeId>,
}

/// Outcome of committing a [`LearnedConcept`].
///
/// Relation failures do not abort the commit; they are reported here.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReport {
    pub concept_id: NodeId,
    pub linked: Vec<RelationId>,
    pub failed: Vec<(NodeId, GraphError)>,
}

impl CommitReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One outcome of an external task, as supplied by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub agent_id: String,
    pub task_signature: String,
    pub strategy: String,
    pub success: bool,
    pub fitness: f64,
    pub embedding: Option<Vec<f32>>,
}

/// Concept learner over a shared network.
pub struct ConceptLearner {
    network: Arc<SemanticNetwork>,
    ids: Arc<IdAllocator>,
}

impl ConceptLearner {
    /// A learner with its own ID allocator.
    pub fn new(network: Arc<SemanticNetwork>) -> Self {
        Self::with_allocator(network, Arc::new(IdAllocator::new()))
    }

    /// A learner drawing concept IDs from a shared allocator.
    pub fn with_allocator(network: Arc<SemanticNetwork>, ids: Arc<IdAllocator>) -> Self {
        Self { network, ids }
    }

    pub fn network(&self) -> &SemanticNetwork {
        &self.network
    }

    fn min_examples(&self) -> usize {
        self.network.config().min_examples_for_concept
    }
}
