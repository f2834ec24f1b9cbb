//! Power-iteration PageRank over claim edges, weighted by edge magnitude.
//!
//! Feeds the serializer's ranking formula and the capacity-eviction policy's
//! "lowest pagerank leaf" tiebreak (spec §4.1, §4.5).

use kg_core::EntityId;
use std::collections::HashMap;

use crate::edge::EdgeStore;
use crate::entity::EntityStore;

const DAMPING: f64 = 0.85;
const MAX_ITERATIONS: usize = 100;
const CONVERGENCE_EPSILON: f64 = 1e-6;

/// Ranks every entity in `entities` by weighted, damped PageRank over
/// `edges`. Edge weight magnitude (not sign) is used as the transition
/// weight — a strongly disputed edge still carries attention toward its
/// target.
pub fn pagerank(entities: &EntityStore, edges: &EdgeStore) -> HashMap<EntityId, f64> {
    let n = entities.len();
    if n == 0 {
        return HashMap::new();
    }

    let ids: Vec<&EntityId> = entities.iter().map(|e| &e.id).collect();
    let index: HashMap<&EntityId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut out_weight: Vec<f64> = vec![0.0; n];
    let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

    for edge in edges.iter() {
        let (Some(&from), Some(&to)) = (index.get(&edge.subject), index.get(&edge.object)) else {
            continue;
        };
        let w = (edge.weight.abs() as f64).max(1e-3);
        out_weight[from] += w;
        incoming[to].push((from, w));
    }

    let base = (1.0 - DAMPING) / n as f64;
    let mut rank = vec![1.0 / n as f64; n];

    for _ in 0..MAX_ITERATIONS {
        let mut next = vec![base; n];
        let dangling_mass: f64 = (0..n).filter(|&i| out_weight[i] == 0.0).map(|i| rank[i]).sum();
        let dangling_share = DAMPING * dangling_mass / n as f64;

        for (to, sources) in incoming.iter().enumerate() {
            let mut acc = 0.0;
            for &(from, w) in sources {
                acc += rank[from] * (w / out_weight[from]);
            }
            next[to] += DAMPING * acc + dangling_share;
        }

        let delta: f64 = next.iter().zip(rank.iter()).map(|(a, b)| (a - b).abs()).sum();
        rank = next;
        if delta < CONVERGENCE_EPSILON {
            break;
        }
    }

    ids.into_iter().cloned().zip(rank).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{ClaimEdge, EvidenceRecord};
    use crate::entity::Entity;

    fn evidence() -> EvidenceRecord {
        EvidenceRecord {
            source_id: "s1".to_string(),
            snippet: "x".to_string(),
            timestamp: chrono::Utc::now(),
            authority_tier: 0.9,
        }
    }

    #[test]
    fn empty_graph_yields_empty_ranks() {
        let entities = EntityStore::new();
        let edges = EdgeStore::new();
        assert!(pagerank(&entities, &edges).is_empty());
    }

    #[test]
    fn rank_sums_stay_positive_and_finite() {
        let mut entities = EntityStore::new();
        entities.insert(Entity::new("a", "company", 0.8, "s1".to_string()));
        entities.insert(Entity::new("b", "company", 0.8, "s1".to_string()));
        entities.insert(Entity::new("c", "company", 0.8, "s1".to_string()));

        let mut edges = EdgeStore::new();
        edges.insert(ClaimEdge::new("a", "competes_with", "b", 0.9, evidence()));
        edges.insert(ClaimEdge::new("b", "competes_with", "c", 0.9, evidence()));
        edges.insert(ClaimEdge::new("c", "competes_with", "a", 0.9, evidence()));

        let ranks = pagerank(&entities, &edges);
        assert_eq!(ranks.len(), 3);
        for v in ranks.values() {
            assert!(v.is_finite());
            assert!(*v > 0.0);
        }
    }

    #[test]
    fn heavily_targeted_node_outranks_a_dead_end() {
        let mut entities = EntityStore::new();
        entities.insert(Entity::new("hub", "company", 0.8, "s1".to_string()));
        entities.insert(Entity::new("leaf", "company", 0.8, "s1".to_string()));
        entities.insert(Entity::new("a", "company", 0.8, "s1".to_string()));
        entities.insert(Entity::new("b", "company", 0.8, "s1".to_string()));

        let mut edges = EdgeStore::new();
        edges.insert(ClaimEdge::new("a", "cites", "hub", 0.9, evidence()));
        edges.insert(ClaimEdge::new("b", "cites", "hub", 0.9, evidence()));

        let ranks = pagerank(&entities, &edges);
        assert!(ranks["hub"] > ranks["leaf"]);
    }
}
