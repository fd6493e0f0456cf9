//! Property inheritance over IS_A / INSTANCE_OF edges.
//!
//! The closure is seeded with a node's own properties at distance 0, then
//! extended breadth-first along inheritable edges up to `inheritance_depth`
//! hops. The nearest definition of a key wins; on equal distance the first
//! one discovered stays.

use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::node::NodeId;

use super::index::{GraphResult, NetworkState, SemanticNetwork};
use super::InheritedProperty;

impl NetworkState {
    pub(crate) fn inherited_properties(
        &self,
        id: &NodeId,
        max_depth: usize,
    ) -> GraphResult<BTreeMap<String, InheritedProperty>> {
        let node = self.node(id)?;

        let mut closure: BTreeMap<String, InheritedProperty> = node
            .properties
            .iter()
            .map(|(key, value)| {
                (
                    key.clone(),
                    InheritedProperty {
                        key: key.clone(),
                        value: value.clone(),
                        source_node_id: id.clone(),
                        distance: 0,
                        confidence: node.confidence,
                    },
                )
            })
            .collect();

        let mut visited: HashSet<&NodeId> = HashSet::from([id]);
        // (node, distance, confidence of the edge path so far)
        let mut queue: VecDeque<(&NodeId, usize, f32)> = VecDeque::from([(id, 0, 1.0)]);

        while let Some((current, distance, path_confidence)) = queue.pop_front() {
            if distance >= max_depth {
                continue;
            }
            for rel in self.outgoing(current) {
                if !rel.relation_type.is_inheritable() || !visited.insert(&rel.target_id) {
                    continue;
                }
                let Ok(ancestor) = self.node(&rel.target_id) else {
                    continue;
                };
                let hop_confidence = path_confidence * rel.confidence;
                let ancestor_distance = distance + 1;

                for (key, value) in &ancestor.properties {
                    let adopt = closure
                        .get(key)
                        .is_none_or(|existing| existing.distance > ancestor_distance);
                    if adopt {
                        closure.insert(
                            key.clone(),
                            InheritedProperty {
                                key: key.clone(),
                                value: value.clone(),
                                source_node_id: ancestor.id.clone(),
                                distance: ancestor_distance,
                                confidence: ancestor.confidence * hop_confidence,
                            },
                        );
                    }
                }
                queue.push_back((&rel.target_id, ancestor_distance, hop_confidence));
            }
        }

        Ok(closure)
    }
}

impl SemanticNetwork {
    /// The inheritance closure of a node's properties, keyed by property name.
    pub fn inherited_properties(
        &self,
        id: impl Into<NodeId>,
    ) -> GraphResult<BTreeMap<String, InheritedProperty>> {
        let id = id.into();
        self.read().inherited_properties(&id, self.config().inheritance_depth)
    }

    /// True if `key` is defined on the node or any reachable ancestor.
    pub fn has_property(&self, id: impl Into<NodeId>, key: &str) -> GraphResult<bool> {
        Ok(self.inherited_properties(id)?.contains_key(key))
    }
}
