//! Read-side graph queries: neighborhoods and parallel-claim lookups.

use kg_core::EntityId;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::edge::{ClaimEdge, EdgeKey};
use crate::entity::{Entity, EntityStore};
use crate::EdgeStore;

/// A `seed`-rooted subgraph: entities reachable within `depth` hops,
/// capped at `limit` entities and ranked by PageRank (the shape the
/// serializer and MCTS coverage both consume).
#[derive(Debug, Clone)]
pub struct EgoSubgraph {
    pub seed: EntityId,
    pub entities: Vec<Entity>,
    pub edges: Vec<ClaimEdge>,
    pub truncated: bool,
}

/// BFS outward from `seed` up to `depth` hops (treating edges as
/// undirected for reachability), stopping once `limit` entities have been
/// collected. Ties at the limit boundary are broken by PageRank descending,
/// then entity id ascending, for determinism (spec §8 property 10).
pub fn ego_subgraph(
    seed: &str,
    entity_store: &EntityStore,
    edge_store: &EdgeStore,
    ranks: &HashMap<EntityId, f64>,
    depth: usize,
    limit: usize,
) -> Option<EgoSubgraph> {
    if !entity_store.contains(seed) {
        return None;
    }

    let mut visited: HashSet<EntityId> = HashSet::new();
    visited.insert(seed.to_string());
    let mut frontier: VecDeque<(EntityId, usize)> = VecDeque::new();
    frontier.push_back((seed.to_string(), 0));
    let mut discovered: Vec<EntityId> = vec![seed.to_string()];

    while let Some((id, d)) = frontier.pop_front() {
        if d >= depth {
            continue;
        }
        let mut neighbors: Vec<EntityId> = edge_store
            .touching(&id)
            .map(|e| if e.subject == id { e.object.clone() } else { e.subject.clone() })
            .filter(|n| !visited.contains(n))
            .collect();
        neighbors.sort();
        neighbors.dedup();
        for n in neighbors {
            visited.insert(n.clone());
            discovered.push(n.clone());
            frontier.push_back((n, d + 1));
        }
    }

    discovered.sort_by(|a, b| {
        let ra = ranks.get(a).copied().unwrap_or(0.0);
        let rb = ranks.get(b).copied().unwrap_or(0.0);
        rb.partial_cmp(&ra).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.cmp(b))
    });

    let truncated = discovered.len() > limit;
    discovered.truncate(limit);
    let kept: HashSet<&EntityId> = discovered.iter().collect();

    let entities: Vec<Entity> = discovered.iter().filter_map(|id| entity_store.get(id).cloned()).collect();
    let edges: Vec<ClaimEdge> = edge_store
        .iter()
        .filter(|e| kept.contains(&e.subject) && kept.contains(&e.object))
        .cloned()
        .collect();

    Some(EgoSubgraph {
        seed: seed.to_string(),
        entities,
        edges,
        truncated,
    })
}

pub fn get_neighbors<'a>(edge_store: &'a EdgeStore, entity_id: &str) -> Vec<&'a ClaimEdge> {
    edge_store.touching(entity_id).collect()
}

pub fn find_parallel_claims<'a>(edge_store: &'a EdgeStore, subject: &str, predicate: &str, object: &str) -> Vec<&'a ClaimEdge> {
    edge_store.parallel(&EdgeKey::new(subject, predicate, object))
}
