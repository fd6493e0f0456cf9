// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # noema
//!
//! A typed, in-memory semantic network: the long-term conceptual memory of a
//! larger cognitive system.
//!
//! ## Architecture
//!
//! - **Nodes** (`node`): typed concepts, instances, attributes, actions, agents and domains
//! - **Network** (`graph`): dual-indexed store with LRU eviction, per-type acyclic
//!   hierarchies, spreading activation, property inheritance, traversal and similarity
//! - **Inference** (`infer`): property, membership, analogy and completion queries
//!   with reasoning traces
//! - **Learning** (`learn`): prototype extraction, relationship discovery and
//!   experience ingestion
//! - **Engine** (`engine`): configuration and the facade owning all of the above
//!
//! ## Library usage
//!
//! ```no_run
//! use noema::engine::{Engine, EngineConfig};
//! use noema::graph::{RelationType, SemanticRelation};
//! use noema::node::{NodeType, SemanticNode};
//!
//! let engine = Engine::new(EngineConfig::default()).unwrap();
//! let net = engine.network();
//! net.add_node(SemanticNode::new("dog", "Dog", NodeType::Concept)).unwrap();
//! net.add_node(SemanticNode::new("mammal", "Mammal", NodeType::Concept).with_property("legs", 4))
//!     .unwrap();
//! net.add_relation(SemanticRelation::new("dog", RelationType::IsA, "mammal")).unwrap();
//!
//! let legs = engine.inference().infer_property("dog", "legs").unwrap();
//! assert_eq!(legs.property.distance, 1);
//! ```

pub mod engine;
pub mod error;
pub mod graph;
pub mod infer;
pub mod learn;
pub mod node;
