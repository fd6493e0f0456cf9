//! Taxonomic queries and path search.
//!
//! - [`SemanticNetwork::is_a`]: directed reachability over IS_A edges
//! - [`SemanticNetwork::ancestors`] / [`SemanticNetwork::common_ancestors`]:
//!   nearest-depth ancestor sets over IS_A and INSTANCE_OF
//! - [`SemanticNetwork::shortest_path`]: A* over relations in either direction
//!
//! Searches run through `petgraph` views of the store topology, filtered to
//! the relation types each query follows.

use std::collections::BTreeMap;

use petgraph::algo::{astar, dijkstra};
use petgraph::graphmap::UnGraphMap;
use petgraph::stable_graph::{EdgeReference, NodeIndex};
use petgraph::visit::{EdgeFiltered, EdgeRef, IntoEdgeReferences};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::node::NodeId;

use super::{RelationId, RelationType};
use super::index::{GraphResult, NetworkState, SemanticNetwork};

/// An ancestor shared by two nodes, with its distance from each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonAncestor {
    pub id: NodeId,
    pub depth_from_a: usize,
    pub depth_from_b: usize,
}

impl NetworkState {
    pub(crate) fn is_a(&self, a: &NodeId, b: &NodeId) -> GraphResult<bool> {
        self.node(a)?;
        self.node(b)?;
        Ok(self.has_typed_path(a, b, RelationType::IsA))
    }

    /// Shortest directed IS_A chain from `a` to `b`, both ends included.
    pub(crate) fn is_a_path(&self, a: &NodeId, b: &NodeId) -> GraphResult<Option<Vec<NodeId>>> {
        let from = self.index_of(a)?;
        let to = self.index_of(b)?;
        let is_a = EdgeFiltered::from_fn(&self.topology, |e: EdgeReference<'_, RelationId>| {
            e.weight().relation_type == RelationType::IsA
        });
        let found = astar(&is_a, from, |n| n == to, |_| 1usize, |_| 0usize);
        Ok(found.map(|(_, path)| self.ids_of(&path)))
    }

    /// Every ancestor over IS_A / INSTANCE_OF with its nearest hop distance.
    pub(crate) fn ancestors(&self, id: &NodeId) -> GraphResult<BTreeMap<NodeId, usize>> {
        let start = self.index_of(id)?;
        let inheritable =
            EdgeFiltered::from_fn(&self.topology, |e: EdgeReference<'_, RelationId>| {
                e.weight().relation_type.is_inheritable()
            });
        let distances = dijkstra(&inheritable, start, None, |_| 1usize);
        Ok(distances
            .into_iter()
            .filter(|&(ix, _)| ix != start)
            .filter_map(|(ix, depth)| self.topology.node_weight(ix).map(|id| (id.clone(), depth)))
            .collect())
    }

    /// Ancestors of both nodes, nearest first (by summed depth, then ID).
    pub(crate) fn common_ancestors(
        &self,
        a: &NodeId,
        b: &NodeId,
    ) -> GraphResult<Vec<CommonAncestor>> {
        let of_a = self.ancestors(a)?;
        let of_b = self.ancestors(b)?;
        let mut shared: Vec<CommonAncestor> = of_a
            .iter()
            .filter_map(|(id, &depth_from_a)| {
                of_b.get(id).map(|&depth_from_b| CommonAncestor {
                    id: id.clone(),
                    depth_from_a,
                    depth_from_b,
                })
            })
            .collect();
        shared.sort_by_key(|c| c.depth_from_a + c.depth_from_b);
        Ok(shared)
    }

    /// A shortest path by hop count, treating every relation as undirected.
    pub(crate) fn shortest_path(&self, a: &NodeId, b: &NodeId) -> GraphResult<Vec<NodeId>> {
        let from = self.index_of(a)?;
        let to = self.index_of(b)?;
        let mut undirected: UnGraphMap<NodeIndex, ()> = UnGraphMap::from_edges(
            self.topology
                .edge_references()
                .map(|e| (e.source(), e.target())),
        );
        undirected.add_node(from);
        undirected.add_node(to);

        match astar(&undirected, from, |n| n == to, |_| 1usize, |_| 0usize) {
            Some((_, path)) => Ok(self.ids_of(&path)),
            None => Err(GraphError::NoPath {
                from: a.to_string(),
                to: b.to_string(),
            }),
        }
    }

    fn ids_of(&self, path: &[NodeIndex]) -> Vec<NodeId> {
        path.iter()
            .filter_map(|&ix| self.topology.node_weight(ix).cloned())
            .collect()
    }
}

impl SemanticNetwork {
    /// True if a directed IS_A chain leads from `a` to `b` (reflexive).
    pub fn is_a(&self, a: impl Into<NodeId>, b: impl Into<NodeId>) -> GraphResult<bool> {
        self.read().is_a(&a.into(), &b.into())
    }

    /// Shortest directed IS_A chain from `a` to `b`, if one exists.
    pub fn is_a_path(
        &self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
    ) -> GraphResult<Option<Vec<NodeId>>> {
        self.read().is_a_path(&a.into(), &b.into())
    }

    pub fn ancestors(&self, id: impl Into<NodeId>) -> GraphResult<BTreeMap<NodeId, usize>> {
        self.read().ancestors(&id.into())
    }

    pub fn common_ancestors(
        &self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
    ) -> GraphResult<Vec<CommonAncestor>> {
        self.read().common_ancestors(&a.into(), &b.into())
    }

    /// Shortest path by hop count ignoring edge direction. Fails with `NoPath`.
    pub fn shortest_path(
        &self,
        a: impl Into<NodeId>,
        b: impl Into<NodeId>,
    ) -> GraphResult<Vec<NodeId>> {
        self.read().shortest_path(&a.into(), &b.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SemanticRelation;
    use crate::node::{NodeType, SemanticNode};

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn build(edges: &[(&str, RelationType, &str)]) -> SemanticNetwork {
        let net = SemanticNetwork::default();
        for (s, _, t) in edges {
            for n in [s, t] {
                if !net.contains_node(*n) {
                    net.add_node(SemanticNode::new(*n, *n, NodeType::Concept))
                        .unwrap();
                }
            }
        }
        for (s, rt, t) in edges {
            net.add_relation(SemanticRelation::new(*s, *rt, *t)).unwrap();
        }
        net
    }

    #[test]
    fn is_a_follows_only_is_a_edges() {
        use RelationType::*;
        let net = build(&[
            ("dog", IsA, "mammal"),
            ("mammal", IsA, "animal"),
            ("rex", InstanceOf, "dog"),
        ]);
        assert!(net.is_a("dog", "animal").unwrap());
        assert!(net.is_a("dog", "dog").unwrap());
        assert!(!net.is_a("animal", "dog").unwrap());
        assert!(!net.is_a("rex", "animal").unwrap());
        assert!(net.is_a("dog", "cat").is_err());
    }

    #[test]
    fn is_a_path_is_shortest_chain() {
        use RelationType::*;
        let net = build(&[
            ("dog", IsA, "pet"),
            ("pet", IsA, "companion"),
            ("companion", IsA, "animal"),
            ("dog", IsA, "mammal"),
            ("mammal", IsA, "animal"),
            ("dog", HasA, "tail"),
            ("tail", PartOf, "animal"),
        ]);
        let path = net.is_a_path("dog", "animal").unwrap().unwrap();
        assert_eq!(path, vec![id("dog"), id("mammal"), id("animal")]);
        assert_eq!(net.is_a_path("dog", "dog").unwrap(), Some(vec![id("dog")]));
        assert_eq!(net.is_a_path("animal", "dog").unwrap(), None);
        assert_eq!(net.is_a_path("dog", "tail").unwrap(), None);
    }

    #[test]
    fn common_ancestors_nearest_first() {
        use RelationType::*;
        let net = build(&[
            ("dog", IsA, "mammal"),
            ("cat", IsA, "mammal"),
            ("mammal", IsA, "animal"),
            ("rex", InstanceOf, "dog"),
        ]);
        let shared = net.common_ancestors("rex", "cat").unwrap();
        let ids: Vec<_> = shared.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![id("mammal"), id("animal")]);
        assert_eq!(shared[0].depth_from_a, 2);
        assert_eq!(shared[0].depth_from_b, 1);
    }

    #[test]
    fn shortest_path_ignores_direction() {
        use RelationType::*;
        let net = build(&[
            ("a", RelatedTo, "b"),
            ("c", RelatedTo, "b"),
            ("c", HasA, "d"),
            ("a", RelatedTo, "x"),
            ("x", RelatedTo, "y"),
            ("y", RelatedTo, "z"),
            ("z", RelatedTo, "d"),
        ]);
        let path = net.shortest_path("a", "d").unwrap();
        assert_eq!(path, vec![id("a"), id("b"), id("c"), id("d")]);
        assert_eq!(net.shortest_path("d", "d").unwrap(), vec![id("d")]);
    }

    #[test]
    fn typed_reachability_ignores_other_types() {
        use RelationType::*;
        let net = build(&[("a", IsA, "b"), ("b", PartOf, "c")]);
        let state = net.read();
        assert!(state.has_typed_path(&id("a"), &id("b"), IsA));
        assert!(!state.has_typed_path(&id("a"), &id("c"), IsA));
        assert!(!state.has_typed_path(&id("b"), &id("a"), IsA));
    }

    #[test]
    fn ancestors_take_nearest_depth() {
        use RelationType::*;
        let net = build(&[
            ("rex", InstanceOf, "dog"),
            ("dog", IsA, "mammal"),
            ("mammal", IsA, "animal"),
            ("rex", InstanceOf, "animal"),
            ("dog", HasA, "tail"),
        ]);
        let ancestors = net.ancestors("rex").unwrap();
        assert_eq!(ancestors.len(), 3);
        assert_eq!(ancestors[&id("dog")], 1);
        assert_eq!(ancestors[&id("mammal")], 2);
        assert_eq!(ancestors[&id("animal")], 1);
        assert!(!ancestors.contains_key(&id("rex")));
    }

    #[test]
    fn path_survives_relation_removal() {
        use RelationType::*;
        let net = build(&[("a", RelatedTo, "b"), ("b", RelatedTo, "c"), ("a", HasA, "c")]);
        assert_eq!(net.shortest_path("a", "c").unwrap(), vec![id("a"), id("c")]);
        net.remove_relation(&RelationId::new("a", HasA, "c")).unwrap();
        assert_eq!(
            net.shortest_path("c", "a").unwrap(),
            vec![id("c"), id("b"), id("a")]
        );
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        use RelationType::*;
        let net = build(&[("a", RelatedTo, "b"), ("c", RelatedTo, "d")]);
        assert!(matches!(
            net.shortest_path("a", "d"),
            Err(GraphError::NoPath { .. })
        ));
    }
}
