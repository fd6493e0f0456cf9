//! Semantic network: typed nodes joined by typed, weighted relations.
//!
//! - **Store** ([`index::SemanticNetwork`]): canonical node/relation sets plus a
//!   petgraph topology serving as by-source and by-target index, behind one lock
//! - **Activation** ([`activation`]): spreading and exponential decay
//! - **Inheritance** ([`inherit`]): property closure over IS_A / INSTANCE_OF
//! - **Traversal** ([`traverse`]): membership, common ancestors, shortest paths
//! - **Similarity** ([`similarity`]): embedding cosine with a structural fallback
//! - **Snapshots** ([`snapshot`]): deep-copied point-in-time views

pub mod activation;
pub mod index;
pub mod inherit;
pub mod similarity;
pub mod snapshot;
pub mod traverse;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;
use crate::node::{NodeId, Properties, now_millis};

/// The twelve relation types of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    IsA,
    HasA,
    PartOf,
    CanDo,
    UsedFor,
    RelatedTo,
    Requires,
    Produces,
    SimilarTo,
    OppositeOf,
    InstanceOf,
    BelongsTo,
}

impl RelationType {
    pub const ALL: [RelationType; 12] = [
        RelationType::IsA,
        RelationType::HasA,
        RelationType::PartOf,
        RelationType::CanDo,
        RelationType::UsedFor,
        RelationType::RelatedTo,
        RelationType::Requires,
        RelationType::Produces,
        RelationType::SimilarTo,
        RelationType::OppositeOf,
        RelationType::InstanceOf,
        RelationType::BelongsTo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationType::IsA => "IS_A",
            RelationType::HasA => "HAS_A",
            RelationType::PartOf => "PART_OF",
            RelationType::CanDo => "CAN_DO",
            RelationType::UsedFor => "USED_FOR",
            RelationType::RelatedTo => "RELATED_TO",
            RelationType::Requires => "REQUIRES",
            RelationType::Produces => "PRODUCES",
            RelationType::SimilarTo => "SIMILAR_TO",
            RelationType::OppositeOf => "OPPOSITE_OF",
            RelationType::InstanceOf => "INSTANCE_OF",
            RelationType::BelongsTo => "BELONGS_TO",
        }
    }

    /// Edges of this type must stay acyclic within the type.
    pub fn is_hierarchical(self) -> bool {
        matches!(
            self,
            RelationType::IsA
                | RelationType::PartOf
                | RelationType::InstanceOf
                | RelationType::BelongsTo
        )
    }

    /// Property inheritance follows only these edges.
    pub fn is_inheritable(self) -> bool {
        matches!(self, RelationType::IsA | RelationType::InstanceOf)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = GraphError;

    /// Accepts `IS_A`, `is_a`, `is-a` and `IsA` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect();
        RelationType::ALL
            .into_iter()
            .find(|t| t.as_str().replace('_', "").eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| GraphError::InvalidRelationType { name: s.to_string() })
    }
}

/// Identifier of a relation: its (source, type, target) triple.
///
/// Two relations share an ID only when all three parts are equal. The
/// `source|TYPE|target` rendering is for display; identity never goes
/// through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationId {
    pub source: NodeId,
    pub relation_type: RelationType,
    pub target: NodeId,
}

impl RelationId {
    pub fn new(
        source: impl Into<NodeId>,
        relation_type: RelationType,
        target: impl Into<NodeId>,
    ) -> Self {
        Self {
            source: source.into(),
            relation_type,
            target: target.into(),
        }
    }

    pub fn derive(source: &NodeId, relation_type: RelationType, target: &NodeId) -> Self {
        Self::new(source.clone(), relation_type, target.clone())
    }
}

impl std::fmt::Display for RelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}|{}|{}", self.source, self.relation_type, self.target)
    }
}

/// A directed, typed, weighted edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticRelation {
    pub id: RelationId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub relation_type: RelationType,
    /// Multiplier applied when activation spreads along this edge, in [0.0, 1.0].
    pub weight: f32,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    pub properties: Properties,
    pub source: String,
    /// Milliseconds since UNIX epoch.
    pub created_at: u64,
}

impl SemanticRelation {
    /// Create a relation with full weight and confidence.
    pub fn new(
        source_id: impl Into<NodeId>,
        relation_type: RelationType,
        target_id: impl Into<NodeId>,
    ) -> Self {
        let source_id = source_id.into();
        let target_id = target_id.into();
        Self {
            id: RelationId::derive(&source_id, relation_type, &target_id),
            source_id,
            target_id,
            relation_type,
            weight: 1.0,
            confidence: 1.0,
            properties: Properties::new(),
            source: String::new(),
            created_at: now_millis(),
        }
    }

    /// Set the spreading weight (clamped to [0, 1]).
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    /// Set the confidence score (clamped to [0, 1]).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// A property resolved through the inheritance closure of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InheritedProperty {
    pub key: String,
    pub value: Value,
    /// The node that defines the property.
    pub source_node_id: NodeId,
    /// Inheritable hops from the queried node; 0 means locally defined.
    pub distance: usize,
    /// Product of confidences along the inheritance path.
    pub confidence: f32,
}
