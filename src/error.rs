//! Rich diagnostic error types for the noema semantic network.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Structural violations of the graph fail
//! loudly through these types; best-effort numeric computations (cosine of
//! mismatched vectors, empty centroids) fail soft and never reach them.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the noema engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum NoemaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Infer(#[from] InferError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Learn(#[from] LearnError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum GraphError {
    #[error("node not found: {node_id}")]
    #[diagnostic(
        code(noema::graph::node_not_found),
        help(
            "No node with this ID exists in the semantic network. \
             Add it with `add_node()` first, or check whether it was evicted \
             by the capacity limit."
        )
    )]
    NodeNotFound { node_id: String },

    #[error("node already exists: {node_id}")]
    #[diagnostic(
        code(noema::graph::node_exists),
        help("Node IDs are unique per network. Pick a different ID or update the existing node.")
    )]
    NodeAlreadyExists { node_id: String },

    #[error("relation not found: {relation_id}")]
    #[diagnostic(
        code(noema::graph::relation_not_found),
        help("Relation IDs have the form `source|TYPE|target`. Check all three parts.")
    )]
    RelationNotFound { relation_id: String },

    #[error("relation already exists: {relation_id}")]
    #[diagnostic(
        code(noema::graph::relation_exists),
        help(
            "A relation with the same (source, type, target) triple is already stored. \
             Remove it first if you want to replace its weight or confidence."
        )
    )]
    RelationAlreadyExists { relation_id: String },

    #[error("{relation_type} relation {source_id} -> {target_id} would create a cycle")]
    #[diagnostic(
        code(noema::graph::cyclic_hierarchy),
        help(
            "Hierarchical relations (IS_A, PART_OF, INSTANCE_OF, BELONGS_TO) must stay \
             acyclic within their own type. A path from the target back to the source \
             already exists."
        )
    )]
    CyclicHierarchy {
        source_id: String,
        target_id: String,
        relation_type: String,
    },

    #[error("self relation on node {node_id}")]
    #[diagnostic(
        code(noema::graph::self_relation),
        help("A relation must connect two distinct nodes.")
    )]
    SelfRelation { node_id: String },

    #[error("node {node_id} already has {limit} outgoing relations")]
    #[diagnostic(
        code(noema::graph::relation_limit),
        help(
            "The source node reached `max_relations_per_node`. Remove a relation \
             or raise the limit in EngineConfig."
        )
    )]
    RelationLimitReached { node_id: String, limit: usize },

    #[error("invalid relation type: {name}")]
    #[diagnostic(
        code(noema::graph::invalid_relation_type),
        help(
            "Valid relation types are: IS_A, HAS_A, PART_OF, CAN_DO, USED_FOR, RELATED_TO, \
             REQUIRES, PRODUCES, SIMILAR_TO, OPPOSITE_OF, INSTANCE_OF, BELONGS_TO."
        )
    )]
    InvalidRelationType { name: String },

    #[error("invalid node type: {name}")]
    #[diagnostic(
        code(noema::graph::invalid_node_type),
        help("Valid node types are: concept, instance, attribute, action, agent, domain.")
    )]
    InvalidNodeType { name: String },

    #[error("no path between {from} and {to}")]
    #[diagnostic(
        code(noema::graph::no_path),
        help("The two nodes are in disconnected components of the network.")
    )]
    NoPath { from: String, to: String },
}

// ---------------------------------------------------------------------------
// Inference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum InferError {
    #[error("property {key:?} not found for {node_id} or any of its ancestors")]
    #[diagnostic(
        code(noema::infer::property_not_found),
        help(
            "The key is neither defined locally nor reachable through IS_A / INSTANCE_OF \
             edges within the inheritance depth. Add the property to an ancestor or raise \
             `inheritance_depth`."
        )
    )]
    PropertyNotFound { node_id: String, key: String },

    #[error("no relation from {from} to {to} to base an analogy on")]
    #[diagnostic(
        code(noema::infer::no_analogous_relation),
        help("Analogy A:B :: C:? needs at least one outgoing edge A -> B.")
    )]
    NoAnalogousRelation { from: String, to: String },

    #[error("{node_id} has no outgoing {relation_type} relation to complete the analogy")]
    #[diagnostic(
        code(noema::infer::no_analogy_candidates),
        help("Add an edge of the same type from C, or pick a different C.")
    )]
    NoAnalogyCandidates {
        node_id: String,
        relation_type: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Concept learning errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum LearnError {
    #[error("need at least {required} instances to form a concept, found {found}")]
    #[diagnostic(
        code(noema::learn::insufficient_examples),
        help(
            "Prototype extraction only counts instance IDs that resolve to existing nodes. \
             Supply more instances or lower `min_examples_for_concept`."
        )
    )]
    InsufficientExamples { required: usize, found: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),
}

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(noema::engine::invalid_config),
        help("Check the EngineConfig fields. {message}")
    )]
    InvalidConfig { message: String },

    #[error("configuration parse error: {message}")]
    #[diagnostic(
        code(noema::engine::config_parse),
        help("The TOML document could not be parsed into an EngineConfig.")
    )]
    ConfigParse { message: String },
}

/// Convenience alias for functions returning noema results.
pub type NoemaResult<T> = std::result::Result<T, NoemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_converts_to_noema_error() {
        let err = GraphError::NodeNotFound {
            node_id: "dog".into(),
        };
        let top: NoemaError = err.into();
        assert!(matches!(top, NoemaError::Graph(GraphError::NodeNotFound { .. })));
    }

    #[test]
    fn infer_error_wraps_graph_error() {
        let err: InferError = GraphError::SelfRelation {
            node_id: "a".into(),
        }
        .into();
        assert!(matches!(err, InferError::Graph(GraphError::SelfRelation { .. })));
    }

    #[test]
    fn cycle_message_names_both_endpoints() {
        let err = GraphError::CyclicHierarchy {
            source_id: "animal".into(),
            target_id: "dog".into(),
            relation_type: "IS_A".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("animal"));
        assert!(msg.contains("dog"));
        assert!(msg.contains("IS_A"));
    }
}
