//! Deductive and analogical inference over the semantic network.
//!
//! Four query kinds are answered by composing inheritance, taxonomy and
//! neighborhood lookups: property, membership, analogy and completion. Every
//! answer carries a human-readable reasoning trace.

pub mod engine;

use serde::{Deserialize, Serialize};

use crate::graph::{InheritedProperty, RelationType};
use crate::node::NodeId;

/// An inference question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InferenceQuery {
    /// What is the value of `key` on `node`, possibly inherited?
    Property { node: NodeId, key: String },
    /// Is `instance` a `category` (via IS_A)?
    Membership { instance: NodeId, category: NodeId },
    /// A is to B as C is to ?
    Analogy { a: NodeId, b: NodeId, c: NodeId },
    /// Which relations is `node` probably missing?
    Completion { node: NodeId },
}

/// Answer to an [`InferenceQuery`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inference {
    Property(PropertyInference),
    Membership(MembershipInference),
    Analogy(AnalogyInference),
    Completion(CompletionInference),
}

impl Inference {
    pub fn reasoning(&self) -> &[String] {
        match self {
            Inference::Property(p) => &p.reasoning,
            Inference::Membership(m) => &m.reasoning,
            Inference::Analogy(a) => &a.reasoning,
            Inference::Completion(c) => &c.reasoning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInference {
    pub node_id: NodeId,
    pub property: InheritedProperty,
    pub reasoning: Vec<String>,
}

/// Binary membership decision. Confidence is 1.0 either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipInference {
    pub instance: NodeId,
    pub category: NodeId,
    pub is_member: bool,
    pub confidence: f32,
    /// The IS_A chain from instance to category; empty when not a member.
    pub path: Vec<NodeId>,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalogyInference {
    pub answer: NodeId,
    pub relation_type: RelationType,
    /// Every target of C over `relation_type`, in edge order.
    pub candidates: Vec<NodeId>,
    /// Uniform over candidates: `1 / candidates.len()`.
    pub confidence: f32,
    pub reasoning: Vec<String>,
}

/// A relation the graph does not contain but probably should.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedRelation {
    pub source_id: NodeId,
    pub relation_type: RelationType,
    pub target_id: NodeId,
    /// `neighbor.activation * edge.weight`.
    pub score: f32,
    /// The similar node whose edge suggested this one.
    pub suggested_by: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionInference {
    pub node_id: NodeId,
    /// Same-type nodes used as evidence, with their count of shared targets.
    pub neighbors: Vec<(NodeId, usize)>,
    /// Highest score first.
    pub proposals: Vec<ProposedRelation>,
    pub reasoning: Vec<String>,
}
