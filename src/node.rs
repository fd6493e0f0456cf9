//! Core node types for the semantic network.
//!
//! Nodes are the addressable units of knowledge. Every concept, instance,
//! attribute, action, agent and domain is identified by a [`NodeId`] and
//! described by a [`SemanticNode`]. The [`IdAllocator`] provides thread-safe,
//! per-instance ID generation for nodes synthesized by the engine itself.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GraphError;

/// Key → value mapping attached to nodes and relations.
///
/// Values are dynamically typed; equality between them is structural.
pub type Properties = BTreeMap<String, Value>;

/// Unique identifier of a node within one network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Classification of a node in the semantic network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// An abstract category ("Mammal", "Sorting algorithm").
    Concept,
    /// A concrete member of a category.
    Instance,
    /// A property-like node ("red", "fast").
    Attribute,
    /// Something that can be done.
    Action,
    /// An acting participant of the wider cognitive system.
    Agent,
    /// A field of knowledge agents belong to.
    Domain,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::Concept,
        NodeType::Instance,
        NodeType::Attribute,
        NodeType::Action,
        NodeType::Agent,
        NodeType::Domain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Concept => "concept",
            NodeType::Instance => "instance",
            NodeType::Attribute => "attribute",
            NodeType::Action => "action",
            NodeType::Agent => "agent",
            NodeType::Domain => "domain",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GraphError::InvalidNodeType { name: s.to_string() })
    }
}

/// A node of the semantic network.
///
/// `activation` is volatile and pulled back toward `base_activation` by decay.
/// Reading a node through
/// [`SemanticNetwork::get_node`](crate::graph::index::SemanticNetwork::get_node) refreshes
/// `last_accessed` and bumps `access_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticNode {
    pub id: NodeId,
    pub label: String,
    pub node_type: NodeType,
    /// Current activation in [0.0, 1.0].
    pub activation: f32,
    /// Resting activation in [0.0, 1.0].
    pub base_activation: f32,
    pub properties: Properties,
    /// Opaque embedding supplied by an external provider.
    pub embedding: Option<Vec<f32>>,
    /// Confidence in [0.0, 1.0].
    pub confidence: f32,
    /// Provenance tag.
    pub source: String,
    /// Milliseconds since UNIX epoch.
    pub created_at: u64,
    /// Milliseconds since UNIX epoch.
    pub last_accessed: u64,
    pub access_count: u64,
}

impl SemanticNode {
    /// Create a node at rest with full confidence and the current timestamp.
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>, node_type: NodeType) -> Self {
        let now = now_millis();
        Self {
            id: id.into(),
            label: label.into(),
            node_type,
            activation: 0.0,
            base_activation: 0.0,
            properties: Properties::new(),
            embedding: None,
            confidence: 1.0,
            source: String::new(),
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Set the confidence score (clamped to [0, 1]).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set the rest level; the current activation starts there too.
    pub fn with_base_activation(mut self, level: f32) -> Self {
        self.base_activation = level.clamp(0.0, 1.0);
        self.activation = self.base_activation;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Record a read of this node.
    pub(crate) fn touch(&mut self) {
        self.last_accessed = now_millis().max(self.last_accessed);
        self.access_count += 1;
    }
}

/// Thread-safe ID generator owned by one engine instance.
///
/// Produces `"{prefix}_{n}"` with `n` increasing monotonically from 1.
/// Two allocators never share state, so independent engines stay
/// deterministic under test.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Resume numbering from `start` (e.g. after restoring a snapshot).
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    pub fn next_id(&self, prefix: &str) -> NodeId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        NodeId(format!("{prefix}_{n}"))
    }

    /// Move the counter past `id` when it has the `{prefix}_{n}` shape, so
    /// IDs restored from elsewhere are never handed out again.
    pub fn skip_past(&self, id: &NodeId) {
        let Some((_, suffix)) = id.as_str().rsplit_once('_') else {
            return;
        };
        if let Ok(n) = suffix.parse::<u64>() {
            self.next.fetch_max(n.saturating_add(1), Ordering::Relaxed);
        }
    }

    /// The number the next allocation will use.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Milliseconds since the UNIX epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_builder() {
        let node = SemanticNode::new("dog", "Dog", NodeType::Concept)
            .with_property("legs", 4)
            .with_confidence(1.7)
            .with_base_activation(0.2);
        assert_eq!(node.id.as_str(), "dog");
        assert_eq!(node.properties["legs"], Value::from(4));
        assert!((node.confidence - 1.0).abs() < f32::EPSILON);
        assert!((node.activation - 0.2).abs() < f32::EPSILON);
        assert_eq!(node.access_count, 0);
    }

    #[test]
    fn touch_bumps_access_count() {
        let mut node = SemanticNode::new("a", "A", NodeType::Instance);
        let before = node.last_accessed;
        node.touch();
        node.touch();
        assert_eq!(node.access_count, 2);
        assert!(node.last_accessed >= before);
    }

    #[test]
    fn node_type_parses_case_insensitively() {
        assert_eq!("Agent".parse::<NodeType>().unwrap(), NodeType::Agent);
        assert_eq!(" domain ".parse::<NodeType>().unwrap(), NodeType::Domain);
        assert!(matches!(
            "robot".parse::<NodeType>(),
            Err(GraphError::InvalidNodeType { .. })
        ));
    }

    #[test]
    fn allocators_are_independent() {
        let a = IdAllocator::new();
        let b = IdAllocator::new();
        assert_eq!(a.next_id("concept").as_str(), "concept_1");
        assert_eq!(a.next_id("concept").as_str(), "concept_2");
        assert_eq!(b.next_id("concept").as_str(), "concept_1");
        assert_eq!(a.peek(), 3);
    }

    #[test]
    fn resumed_allocator() {
        let alloc = IdAllocator::starting_from(42);
        assert_eq!(alloc.next_id("x").as_str(), "x_42");
    }

    #[test]
    fn skip_past_only_moves_forward() {
        let alloc = IdAllocator::new();
        alloc.skip_past(&NodeId::from("concept_7"));
        alloc.skip_past(&NodeId::from("concept_3"));
        alloc.skip_past(&NodeId::from("exp:apex:sort"));
        alloc.skip_past(&NodeId::from("concept_x"));
        assert_eq!(alloc.next_id("concept").as_str(), "concept_8");
    }
}
