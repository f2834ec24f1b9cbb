//! The knowledge graph: a weighted, directed, conflict-aware multigraph of
//! entities and source-attributed claims.
//!
//! `KnowledgeGraph` is the single mutation point; everything else in this
//! crate (entity/edge/source storage, conflict records, PageRank, queries,
//! snapshotting) is a supporting structure it composes. Conflict
//! *resolution* is implemented one layer up — see `ConflictResolver` below —
//! so this crate never depends on `kg-conflict`.

pub mod conflict;
pub mod edge;
pub mod entity;
pub mod pagerank;
pub mod query;
pub mod snapshot;
pub mod source;

use std::collections::HashMap;

use kg_core::{CoreError, CoreResult, EdgeId, EntityId, SnapshotId, SourceId};
use tracing::{info, warn};

pub use conflict::{Conflict, ConflictKind, ConflictResolver, ConflictStatus, HumanDecision, NoopResolver};
pub use edge::{ClaimEdge, EdgeKey, EdgeStore, EvidenceRecord};
pub use entity::{Entity, EntityStore};
pub use query::{ego_subgraph, find_parallel_claims, get_neighbors, EgoSubgraph};
pub use snapshot::Snapshot;
pub use source::{Source, SourceRegistry};

/// Default node cap before `add_claim`/`upsert_entity` start archiving the
/// lowest-PageRank leaf to make room (spec §4.1 `CapacityExceeded`).
pub const DEFAULT_NODE_CAP: usize = 5_000;

pub struct KnowledgeGraph {
    entities: EntityStore,
    edges: EdgeStore,
    sources: SourceRegistry,
    conflicts: HashMap<kg_core::ConflictId, Conflict>,
    resolver: Box<dyn ConflictResolver>,
    snapshot_id: SnapshotId,
    node_cap: usize,
}

impl KnowledgeGraph {
    pub fn new(resolver: Box<dyn ConflictResolver>) -> Self {
        Self::with_capacity(resolver, DEFAULT_NODE_CAP)
    }

    pub fn with_capacity(resolver: Box<dyn ConflictResolver>, node_cap: usize) -> Self {
        Self {
            entities: EntityStore::new(),
            edges: EdgeStore::new(),
            sources: SourceRegistry::new(),
            conflicts: HashMap::new(),
            resolver,
            snapshot_id: 0,
            node_cap,
        }
    }

    pub fn snapshot_id(&self) -> SnapshotId {
        self.snapshot_id
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.values()
    }

    pub fn get_entity(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn register_source(&mut self, source: Source) {
        self.sources.register(source);
        self.bump_snapshot();
    }

    /// Insert a new entity, or fold in corroborating evidence if one with
    /// this id already exists (spec §4.1 "upsert_entity"). Evicts the
    /// lowest-PageRank leaf first if this would put the graph over its node
    /// cap and no existing entity is being updated.
    pub fn upsert_entity(&mut self, id: impl Into<EntityId>, entity_type: impl Into<String>, confidence: f32, source: SourceId) -> CoreResult<()> {
        let id = id.into();
        if let Some(existing) = self.entities.get_mut(&id) {
            existing.merge_evidence(confidence, source);
            self.bump_snapshot();
            return Ok(());
        }

        if self.entities.len() >= self.node_cap {
            self.evict_lowest_ranked_leaf()?;
        }

        self.entities.insert(Entity::new(id, entity_type, confidence, source));
        self.bump_snapshot();
        Ok(())
    }

    /// Add a claim edge, invoking the configured `ConflictResolver` against
    /// any parallel claims first (spec §4.1: "MUST invoke the
    /// ConflictResolver before inserting"). An identical `(subject,
    /// predicate, object)` claim is corroboration, not competition: it is
    /// merged into the existing edge (spec Testable Property 2: at most one
    /// non-disputed edge per key; Property 8: idempotent `add_claim`)
    /// instead of inserting a duplicate. Genuinely competing edges are
    /// dampened or flagged by the resolver, never deleted.
    pub fn add_claim(
        &mut self,
        subject: impl Into<EntityId>,
        predicate: impl Into<String>,
        object: impl Into<EntityId>,
        base_confidence: f32,
        evidence: EvidenceRecord,
    ) -> CoreResult<EdgeId> {
        let subject = subject.into();
        let predicate = predicate.into();
        let object = object.into();

        if !self.entities.contains(&subject) {
            return Err(CoreError::UnknownEntity(subject));
        }
        if !self.entities.contains(&object) {
            return Err(CoreError::UnknownEntity(object));
        }

        let key = EdgeKey::new(&subject, &predicate, &object);

        if let Some(existing_id) = self.edges.parallel(&key).first().map(|e| e.id) {
            if let Some(edge) = self.edges.get_mut(&existing_id) {
                edge.merge_evidence(base_confidence, evidence);
            }
            self.bump_snapshot();
            return Ok(existing_id);
        }

        let new_edge = ClaimEdge::new(subject.clone(), predicate, object.clone(), base_confidence, evidence);
        // Every other outgoing claim from the same subject is a candidate:
        // the resolver classifies which ones actually compete (same
        // predicate/different object, or an antonym predicate pair on the
        // same object) versus which merely corroborate (same key, handled
        // above before the resolver is ever consulted).
        let existing: Vec<ClaimEdge> = self.edges.out_edges(&subject).into_iter().filter(|e| e.key() != key).cloned().collect();
        let existing_refs: Vec<&ClaimEdge> = existing.iter().collect();

        let conflict = self.resolver.resolve(&new_edge, &existing_refs)?;
        let id = self.edges.insert(new_edge);

        if let Some(conflict) = conflict {
            self.apply_conflict_outcome(&conflict)?;
            self.conflicts.insert(conflict.id, conflict);
        }

        self.bump_snapshot();
        Ok(id)
    }

    /// Records an edge's per-axiom scores and recomputes its weight from
    /// them (spec §3 `weight = base_confidence * Σ(priority_i * score_i)`).
    pub fn score_edge(&mut self, edge_id: &EdgeId, per_axiom: HashMap<kg_core::AxiomId, f32>, priorities: &HashMap<kg_core::AxiomId, u8>) -> CoreResult<()> {
        let edge = self.edges.get_mut(edge_id).ok_or_else(|| CoreError::UnknownEntity(edge_id.to_string()))?;
        edge.axiom_scores = per_axiom;
        edge.recompute_weight(priorities);
        self.bump_snapshot();
        Ok(())
    }

    /// Sets an entity's derived `axiom_alignment` (spec §3: "set by whoever
    /// scores this entity against the axiom set").
    pub fn set_axiom_alignment(&mut self, entity_id: &str, alignment: f32) -> CoreResult<()> {
        let entity = self.entities.get_mut(entity_id).ok_or_else(|| CoreError::UnknownEntity(entity_id.to_string()))?;
        entity.axiom_alignment = kg_core::clamp_signed(alignment);
        self.bump_snapshot();
        Ok(())
    }

    /// Reflect a resolved/escalated conflict back onto the losing edge(s):
    /// the winner is untouched, the loser is dampened and flagged disputed,
    /// and both sides are marked disputed on escalation (spec §4.4).
    fn apply_conflict_outcome(&mut self, conflict: &Conflict) -> CoreResult<()> {
        match conflict.status {
            ConflictStatus::Resolved => {
                if let Some(winner) = conflict.winner {
                    let loser = if conflict.edge_a == winner { conflict.edge_b } else { conflict.edge_a };
                    if let Some(edge) = self.edges.get_mut(&loser) {
                        edge.dampen(0.25);
                        edge.resolution_history.push(edge::ResolutionNote {
                            tier: "resolution".to_string(),
                            timestamp: chrono::Utc::now(),
                            detail: format!("lost conflict {}", conflict.id),
                        });
                    }
                }
            }
            ConflictStatus::Escalated | ConflictStatus::BothDisputed => {
                for edge_id in [conflict.edge_a, conflict.edge_b] {
                    if let Some(edge) = self.edges.get_mut(&edge_id) {
                        edge.disputed = true;
                    }
                }
                warn!(conflict_id = %conflict.id, "conflict escalated for human review");
            }
            ConflictStatus::Open => {}
        }
        Ok(())
    }

    /// Applies a human's resolution of a previously escalated conflict:
    /// declares a winner (dampening the loser) or leaves both sides flagged
    /// disputed, same as the tiered resolver would for an automatic
    /// resolution, just with "human" recorded as the deciding tier.
    pub fn resolve_human(&mut self, conflict_id: kg_core::ConflictId, decision: conflict::HumanDecision) -> CoreResult<()> {
        let conflict = self.conflicts.get_mut(&conflict_id).ok_or_else(|| CoreError::InvalidInput(format!("unknown conflict {conflict_id}")))?;

        match decision {
            conflict::HumanDecision::KeepA => conflict.resolve(conflict.edge_a, "human", "human kept edge_a"),
            conflict::HumanDecision::KeepB => conflict.resolve(conflict.edge_b, "human", "human kept edge_b"),
            conflict::HumanDecision::BothDisputed => conflict.mark_both_disputed("human left both claims standing, disputed"),
        }

        let snapshot = conflict.clone();
        self.apply_conflict_outcome(&snapshot)?;
        self.conflicts.insert(conflict_id, snapshot);
        self.bump_snapshot();
        Ok(())
    }

    /// Archives (removes from the live graph) the leaf entity with the
    /// lowest PageRank — a leaf being one with no outgoing edges — to make
    /// room under the node cap. Errors if every entity has an outgoing edge,
    /// since there is then no safe eviction candidate.
    fn evict_lowest_ranked_leaf(&mut self) -> CoreResult<()> {
        let ranks = pagerank::pagerank(&self.entities, &self.edges);
        let candidate = self
            .entities
            .iter()
            .filter(|e| self.edges.out_edges(&e.id).is_empty())
            .map(|e| (ranks.get(&e.id).copied().unwrap_or(0.0), e.id.clone()))
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.cmp(&b.1)));

        match candidate {
            Some((_, id)) => {
                info!(entity_id = %id, "archiving lowest-ranked leaf to stay under node cap");
                self.entities.remove(&id);
                Ok(())
            }
            None => Err(CoreError::CapacityExceeded {
                cap: self.node_cap,
                size: self.entities.len(),
            }),
        }
    }

    fn bump_snapshot(&mut self) {
        self.snapshot_id += 1;
    }

    pub fn pagerank(&self) -> HashMap<EntityId, f64> {
        pagerank::pagerank(&self.entities, &self.edges)
    }

    pub fn ego_subgraph(&self, seed: &str, depth: usize, limit: usize) -> Option<EgoSubgraph> {
        let ranks = self.pagerank();
        query::ego_subgraph(seed, &self.entities, &self.edges, &ranks, depth, limit)
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::new(
            self.snapshot_id,
            self.entities.iter().cloned().collect(),
            self.edges.iter().cloned().collect(),
            self.sources.iter().cloned().collect(),
            self.conflicts.values().cloned().collect(),
        )
    }

    pub fn restore(snapshot: Snapshot, resolver: Box<dyn ConflictResolver>) -> Self {
        let mut entities = EntityStore::new();
        for e in snapshot.entities {
            entities.insert(e);
        }
        let mut edges = EdgeStore::new();
        for e in snapshot.edges {
            edges.insert(e);
        }
        edges.rebuild_adjacency();
        let mut sources = SourceRegistry::new();
        for s in snapshot.sources {
            sources.register(s);
        }
        let conflicts = snapshot.conflicts.into_iter().map(|c| (c.id, c)).collect();

        Self {
            entities,
            edges,
            sources,
            conflicts,
            resolver,
            snapshot_id: snapshot.snapshot_id,
            node_cap: DEFAULT_NODE_CAP,
        }
    }
}
