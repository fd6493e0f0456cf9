//! Spreading activation and decay.
//!
//! Activation is a bounded relevance signal in [0, 1]. Seeds are set to an
//! initial level, then each round every node activated so far pushes
//! `activation * spreading_factor * edge.weight` along its outgoing edges.
//! Contributions at or below `activation_threshold` are dropped and targets
//! saturate at 1.0. Decay pulls every node exponentially back to its base
//! level. Nothing here runs in the background; an external scheduler calls in.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, SemanticNode};

use super::index::{GraphResult, NetworkState, SemanticNetwork};

/// Tuning knobs for one spread, taken from the engine configuration.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SpreadParams {
    pub spreading_factor: f32,
    pub activation_threshold: f32,
    pub max_depth: usize,
}

/// Outcome of a spreading-activation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpreadResult {
    /// Final activation of every node touched, seeds included.
    pub activations: BTreeMap<NodeId, f32>,
    /// Nodes in the order they were first touched.
    pub order: Vec<NodeId>,
    /// Rounds that propagated at least one contribution.
    pub rounds: usize,
}

impl NetworkState {
    pub(crate) fn spread(
        &mut self,
        seeds: &[NodeId],
        initial: f32,
        params: SpreadParams,
    ) -> GraphResult<SpreadResult> {
        for seed in seeds {
            self.node(seed)?;
        }

        let initial = initial.clamp(0.0, 1.0);
        let mut levels: HashMap<NodeId, f32> = HashMap::new();
        let mut order: Vec<NodeId> = Vec::new();

        for seed in seeds {
            self.node_mut(seed)?.activation = initial;
            if levels.insert(seed.clone(), initial).is_none() {
                order.push(seed.clone());
            }
        }

        let mut rounds = 0;
        for _ in 0..params.max_depth {
            let mut contributions: Vec<(NodeId, f32)> = Vec::new();
            for id in &order {
                let level = levels[id];
                for rel in self.outgoing(id) {
                    let amount = level * params.spreading_factor * rel.weight;
                    if amount > params.activation_threshold {
                        contributions.push((rel.target_id.clone(), amount));
                    }
                }
            }
            if contributions.is_empty() {
                break;
            }
            rounds += 1;

            let mut fresh = 0;
            for (target, amount) in contributions {
                let node = self.node_mut(&target)?;
                node.activation = (node.activation + amount).min(1.0);
                let level = node.activation;
                if levels.insert(target.clone(), level).is_none() {
                    order.push(target);
                    fresh += 1;
                }
            }
            if fresh == 0 {
                break;
            }
        }

        Ok(SpreadResult {
            activations: levels.into_iter().collect(),
            order,
            rounds,
        })
    }

    pub(crate) fn decay(&mut self, decay_rate: f64, elapsed: Duration) {
        let factor = (-decay_rate * elapsed.as_secs_f64()).exp();
        for node in self.nodes.values_mut() {
            let base = f64::from(node.base_activation);
            let current = f64::from(node.activation);
            node.activation = (base + (current - base) * factor).clamp(0.0, 1.0) as f32;
        }
    }

    pub(crate) fn reset_activation(&mut self) {
        for node in self.nodes.values_mut() {
            node.activation = node.base_activation;
        }
    }

    /// Top `n` nodes by activation; ties go to the smaller ID.
    pub(crate) fn most_activated(&self, n: usize) -> Vec<SemanticNode> {
        let mut nodes: Vec<&SemanticNode> = self.nodes.values().collect();
        // `nodes` is already ID-ordered and the sort is stable.
        nodes.sort_by(|a, b| b.activation.total_cmp(&a.activation));
        nodes.into_iter().take(n).cloned().collect()
    }
}

impl SemanticNetwork {
    /// Spread activation outward from `seeds`, starting each at `initial`.
    ///
    /// Fails with `NodeNotFound` before touching any activation if a seed is
    /// unknown.
    pub fn spread_activation(&self, seeds: &[NodeId], initial: f32) -> GraphResult<SpreadResult> {
        let config = self.config();
        let params = SpreadParams {
            spreading_factor: config.spreading_factor,
            activation_threshold: config.activation_threshold,
            max_depth: config.max_spreading_depth,
        };
        let result = self.write().spread(seeds, initial, params)?;
        tracing::debug!(
            seeds = seeds.len(),
            activated = result.order.len(),
            rounds = result.rounds,
            "spread activation"
        );
        Ok(result)
    }

    /// Pull every node's activation toward its base level:
    /// `base + (activation - base) * exp(-decay_rate * elapsed_secs)`.
    pub fn decay_activation(&self, elapsed: Duration) {
        let rate = self.config().decay_rate;
        self.write().decay(rate, elapsed);
    }

    /// Set every node's activation straight back to its base level.
    pub fn reset_activation(&self) {
        self.write().reset_activation();
    }

    /// The `n` most activated nodes, highest first, ties broken by ID.
    pub fn most_activated(&self, n: usize) -> Vec<SemanticNode> {
        self.read().most_activated(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::graph::{RelationType, SemanticRelation};
    use crate::node::NodeType;

    fn id(s: &str) -> NodeId {
        NodeId::from(s)
    }

    fn net(config: EngineConfig, ids: &[&str]) -> SemanticNetwork {
        let net = SemanticNetwork::new(config);
        for i in ids {
            net.add_node(SemanticNode::new(*i, *i, NodeType::Concept))
                .unwrap();
        }
        net
    }

    fn one_round() -> EngineConfig {
        EngineConfig {
            spreading_factor: 0.5,
            activation_threshold: 0.1,
            max_spreading_depth: 1,
            ..Default::default()
        }
    }

    #[test]
    fn single_round_adds_half_to_target() {
        let net = net(one_round(), &["s", "t"]);
        net.add_relation(SemanticRelation::new("s", RelationType::RelatedTo, "t"))
            .unwrap();

        let result = net.spread_activation(&[id("s")], 1.0).unwrap();

        let t = net.peek_node("t").unwrap();
        assert!((t.activation - 0.5).abs() < 1e-6);
        assert_eq!(result.order, vec![id("s"), id("t")]);
        assert_eq!(result.rounds, 1);
    }

    #[test]
    fn target_activation_saturates_at_one() {
        let net = SemanticNetwork::new(one_round());
        net.add_node(SemanticNode::new("s", "S", NodeType::Concept))
            .unwrap();
        net.add_node(
            SemanticNode::new("t", "T", NodeType::Concept)
                .with_base_activation(0.8),
        )
        .unwrap();
        net.add_relation(SemanticRelation::new("s", RelationType::RelatedTo, "t"))
            .unwrap();

        net.spread_activation(&[id("s")], 1.0).unwrap();
        assert!((net.peek_node("t").unwrap().activation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weak_contributions_are_dropped() {
        let net = net(one_round(), &["s", "t"]);
        net.add_relation(
            SemanticRelation::new("s", RelationType::RelatedTo, "t")
                .with_weight(0.1),
        )
        .unwrap();

        let result = net.spread_activation(&[id("s")], 1.0).unwrap();
        assert_eq!(result.order, vec![id("s")]);
        assert_eq!(result.rounds, 0);
        assert_eq!(net.peek_node("t").unwrap().activation, 0.0);
    }

    #[test]
    fn spread_reaches_along_chain_until_threshold() {
        let config = EngineConfig {
            spreading_factor: 0.5,
            activation_threshold: 0.1,
            max_spreading_depth: 5,
            ..Default::default()
        };
        let net = net(config, &["a", "b", "c", "d", "e"]);
        for (s, t) in [("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")] {
            net.add_relation(SemanticRelation::new(s, RelationType::RelatedTo, t))
                .unwrap();
        }

        let result = net.spread_activation(&[id("a")], 1.0).unwrap();
        assert_eq!(result.order[..3], [id("a"), id("b"), id("c")]);
        for level in result.activations.values() {
            assert!((0.0..=1.0).contains(level));
        }
        assert!(result.rounds <= 5);
    }

    #[test]
    fn depth_bounds_the_number_of_hops() {
        let config = EngineConfig {
            spreading_factor: 1.0,
            activation_threshold: 0.1,
            max_spreading_depth: 2,
            ..Default::default()
        };
        let net = net(config, &["a", "b", "c", "d"]);
        for (s, t) in [("a", "b"), ("b", "c"), ("c", "d")] {
            net.add_relation(SemanticRelation::new(s, RelationType::RelatedTo, t))
                .unwrap();
        }

        let result = net.spread_activation(&[id("a")], 1.0).unwrap();
        assert_eq!(result.rounds, 2);
        assert_eq!(result.order, vec![id("a"), id("b"), id("c")]);
        assert!(!result.activations.contains_key(&id("d")));
        assert_eq!(net.peek_node("d").unwrap().activation, 0.0);
        assert!((net.peek_node("c").unwrap().activation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn round_without_new_nodes_ends_the_spread() {
        let config = EngineConfig {
            max_spreading_depth: 5,
            ..one_round()
        };
        let net = net(config, &["s", "t"]);
        net.add_relation(SemanticRelation::new("s", RelationType::RelatedTo, "t"))
            .unwrap();

        let result = net.spread_activation(&[id("s")], 1.0).unwrap();
        // Round 1 reaches t, round 2 only re-feeds it.
        assert_eq!(result.rounds, 2);
        assert_eq!(result.order, vec![id("s"), id("t")]);
        assert!((net.peek_node("t").unwrap().activation - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_seed_leaves_graph_untouched() {
        let net = net(one_round(), &["s"]);
        let err = net
            .spread_activation(&[id("s"), id("ghost")], 1.0)
            .unwrap_err();
        assert!(matches!(err, crate::error::GraphError::NodeNotFound { .. }));
        assert_eq!(net.peek_node("s").unwrap().activation, 0.0);
    }

    #[test]
    fn decay_moves_monotonically_toward_base() {
        let config = EngineConfig {
            decay_rate: 0.5,
            ..Default::default()
        };
        let net = SemanticNetwork::new(config);
        net.add_node(
            SemanticNode::new("n", "N", NodeType::Concept)
                .with_base_activation(0.2),
        )
        .unwrap();
        net.spread_activation(&[id("n")], 1.0).unwrap();

        let mut previous = (net.peek_node("n").unwrap().activation - 0.2).abs();
        for _ in 0..10 {
            net.decay_activation(Duration::from_millis(700));
            let n = net.peek_node("n").unwrap();
            let gap = (n.activation - n.base_activation).abs();
            assert!(gap <= previous);
            assert!(n.activation >= n.base_activation);
            previous = gap;
        }
        assert!(previous < 0.8);
    }

    #[test]
    fn decay_pulls_up_from_below_base() {
        let net = SemanticNetwork::default();
        net.add_node(
            SemanticNode::new("n", "N", NodeType::Concept)
                .with_base_activation(0.6),
        )
        .unwrap();
        net.spread_activation(&[id("n")], 0.0).unwrap();
        net.decay_activation(Duration::from_secs(3600));
        assert!((net.peek_node("n").unwrap().activation - 0.6).abs() < 1e-4);
    }

    #[test]
    fn reset_and_most_activated() {
        let net = net(EngineConfig::default(), &["a", "b", "c"]);
        net.spread_activation(&[id("b"), id("c")], 0.7).unwrap();

        let top: Vec<_> = net.most_activated(2).into_iter().map(|n| n.id).collect();
        // Equal activation: lexicographic ID wins.
        assert_eq!(top, vec![id("b"), id("c")]);

        net.reset_activation();
        assert!(net.all_nodes().iter().all(|n| n.activation == n.base_activation));
        let top: Vec<_> = net.most_activated(5).into_iter().map(|n| n.id).collect();
        assert_eq!(top, vec![id("a"), id("b"), id("c")]);
    }
}
