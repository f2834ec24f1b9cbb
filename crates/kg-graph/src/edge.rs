//! Claim edges: directed, labeled, source-attributed, conflict-aware.

use kg_core::{clamp_signed, clamp_unit, AxiomId, EdgeId, EntityId, SourceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One piece of evidence backing an edge: which source, what it said, when,
/// and the authority tier of that source at the time it was cited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub source_id: SourceId,
    pub snippet: String,
    pub timestamp: Timestamp,
    pub authority_tier: f32,
}

/// A note in an edge's resolution history: which tier acted, and why.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionNote {
    pub tier: String,
    pub timestamp: Timestamp,
    pub detail: String,
}

/// Directed, labeled multigraph edge `(subject, predicate, object)` with a
/// signed weight (spec §3 "Claim edge").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEdge {
    pub id: EdgeId,
    pub subject: EntityId,
    pub predicate: String,
    pub object: EntityId,
    pub weight: f32,
    pub base_confidence: f32,
    pub axiom_scores: HashMap<AxiomId, f32>,
    pub evidence: Vec<EvidenceRecord>,
    pub disputed: bool,
    pub resolution_history: Vec<ResolutionNote>,
}

impl ClaimEdge {
    pub fn new(subject: impl Into<EntityId>, predicate: impl Into<String>, object: impl Into<EntityId>, base_confidence: f32, evidence: EvidenceRecord) -> Self {
        Self {
            id: EdgeId::new_v4(),
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            weight: clamp_signed(base_confidence),
            base_confidence: clamp_unit(base_confidence),
            axiom_scores: HashMap::new(),
            evidence: vec![evidence],
            disputed: false,
            resolution_history: Vec::new(),
        }
    }

    /// The `(subject, predicate, object-normalized)` key used to find
    /// parallel claims (spec §3/§4.1).
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(&self.subject, &self.predicate, &self.object)
    }

    /// `weight = base_confidence * Σ(axiom_priority_i * axiom_score_i)`,
    /// clamped to `[-1, 1]` with sign preserved (spec §3).
    pub fn recompute_weight(&mut self, priorities: &HashMap<AxiomId, u8>) {
        let signed_sum: f32 = self
            .axiom_scores
            .iter()
            .map(|(id, score)| priorities.get(id).copied().unwrap_or(1) as f32 * score)
            .sum();
        self.weight = clamp_signed(self.base_confidence * signed_sum);
    }

    /// Sign-preserving magnitude drop applied to the losing side of a
    /// resolved conflict (spec §4.4: "loser edge ... `weight *= 0.25`").
    pub fn dampen(&mut self, factor: f32) {
        self.weight *= factor;
        self.disputed = true;
    }

    /// Fold a corroborating observation of the same `(subject, predicate,
    /// object)` claim into this edge instead of inserting a parallel
    /// duplicate: union the evidence and move `base_confidence` toward the
    /// new observation, weighted by how many sources already back this edge
    /// (spec §9 open question (a) — the same policy `Entity::merge_evidence`
    /// uses, so entity and edge confidence combine the same way).
    pub fn merge_evidence(&mut self, observed_confidence: f32, evidence: EvidenceRecord) {
        let n = self.evidence.len().max(1) as f32;
        self.base_confidence = clamp_unit((self.base_confidence * n + clamp_unit(observed_confidence)) / (n + 1.0));
        self.weight = clamp_signed(self.base_confidence);
        self.evidence.push(evidence);
    }

    pub fn strongest_authority(&self) -> f32 {
        self.evidence.iter().map(|e| e.authority_tier).fold(0.0_f32, f32::max)
    }

    pub fn latest_timestamp(&self) -> Option<Timestamp> {
        self.evidence.iter().map(|e| e.timestamp).max()
    }

    pub fn source_ids(&self) -> HashSet<SourceId> {
        self.evidence.iter().map(|e| e.source_id.clone()).collect()
    }
}

/// Normalizes an object string for parallel-claim matching: case-folded and
/// whitespace-trimmed, so "20%" and " 20% " key the same.
pub fn normalize_object(object: &str) -> String {
    object.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub subject: EntityId,
    pub predicate: String,
    pub object_normalized: String,
}

impl EdgeKey {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object_normalized: normalize_object(object),
        }
    }
}

/// Edge storage, indexed both by id and by `EdgeKey` for O(1) parallel-claim
/// lookup, plus a subject/object adjacency index for neighbor queries.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EdgeStore {
    edges: HashMap<EdgeId, ClaimEdge>,
    by_key: HashMap<EdgeKey, Vec<EdgeId>>,
    #[serde(skip)]
    out_adjacency: HashMap<EntityId, Vec<EdgeId>>,
    #[serde(skip)]
    in_adjacency: HashMap<EntityId, Vec<EdgeId>>,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn get(&self, id: &EdgeId) -> Option<&ClaimEdge> {
        self.edges.get(id)
    }

    pub fn get_mut(&mut self, id: &EdgeId) -> Option<&mut ClaimEdge> {
        self.edges.get_mut(id)
    }

    pub fn insert(&mut self, edge: ClaimEdge) -> EdgeId {
        let id = edge.id;
        self.by_key.entry(edge.key()).or_default().push(id);
        self.out_adjacency.entry(edge.subject.clone()).or_default().push(id);
        self.in_adjacency.entry(edge.object.clone()).or_default().push(id);
        self.edges.insert(id, edge);
        id
    }

    pub fn parallel(&self, key: &EdgeKey) -> Vec<&ClaimEdge> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    pub fn out_edges(&self, subject: &str) -> Vec<&ClaimEdge> {
        self.out_adjacency
            .get(subject)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    pub fn in_edges(&self, object: &str) -> Vec<&ClaimEdge> {
        self.in_adjacency
            .get(object)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClaimEdge> {
        self.edges.values()
    }

    pub fn touching(&self, entity_id: &str) -> impl Iterator<Item = &ClaimEdge> {
        self.edges.values().filter(move |e| e.subject == entity_id || e.object == entity_id)
    }

    /// Rebuild the transient adjacency indexes after a deserialize (the
    /// `#[serde(skip)]` fields above come back empty).
    pub fn rebuild_adjacency(&mut self) {
        self.out_adjacency.clear();
        self.in_adjacency.clear();
        for edge in self.edges.values() {
            self.out_adjacency.entry(edge.subject.clone()).or_default().push(edge.id);
            self.in_adjacency.entry(edge.object.clone()).or_default().push(edge.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(source: &str) -> EvidenceRecord {
        EvidenceRecord {
            source_id: source.to_string(),
            snippet: "states X".to_string(),
            timestamp: chrono::Utc::now(),
            authority_tier: 0.9,
        }
    }

    #[test]
    fn parallel_object_normalization_ignores_case_and_whitespace() {
        let a = EdgeKey::new("acme", "competes_with", "Globex");
        let b = EdgeKey::new("acme", "competes_with", " globex ");
        assert_eq!(a, b);
    }

    #[test]
    fn store_finds_parallel_claims_by_key() {
        let mut store = EdgeStore::new();
        let e1 = ClaimEdge::new("acme", "competes_with", "globex", 0.8, evidence("s1"));
        let e2 = ClaimEdge::new("acme", "competes_with", "GLOBEX", 0.6, evidence("s2"));
        let key = e1.key();
        store.insert(e1);
        store.insert(e2);
        assert_eq!(store.parallel(&key).len(), 2);
    }

    #[test]
    fn dampen_preserves_sign_while_shrinking_magnitude() {
        let mut edge = ClaimEdge::new("a", "p", "b", 0.8, evidence("s1"));
        edge.weight = -0.8;
        edge.dampen(0.25);
        assert!(edge.weight < 0.0);
        assert!((edge.weight - -0.2).abs() < 1e-6);
        assert!(edge.disputed);
    }

    #[test]
    fn merge_evidence_moves_confidence_toward_new_observation_and_unions_sources() {
        let mut edge = ClaimEdge::new("a", "p", "b", 0.4, evidence("s1"));
        edge.merge_evidence(0.8, evidence("s2"));
        assert!(edge.base_confidence > 0.4 && edge.base_confidence < 0.8);
        assert_eq!(edge.evidence.len(), 2);
        assert_eq!(edge.source_ids().len(), 2);
        assert!((edge.weight - edge.base_confidence).abs() < 1e-6);
    }

    #[test]
    fn recompute_weight_clamps_to_unit_interval() {
        let mut edge = ClaimEdge::new("a", "p", "b", 1.0, evidence("s1"));
        edge.axiom_scores.insert("ax1".to_string(), 1.0);
        edge.axiom_scores.insert("ax2".to_string(), 1.0);
        let mut priorities = HashMap::new();
        priorities.insert("ax1".to_string(), 10u8);
        priorities.insert("ax2".to_string(), 10u8);
        edge.recompute_weight(&priorities);
        assert_eq!(edge.weight, 1.0);
    }

    #[test]
    fn out_and_in_edges_index_by_endpoint() {
        let mut store = EdgeStore::new();
        store.insert(ClaimEdge::new("acme", "competes_with", "globex", 0.8, evidence("s1")));
        assert_eq!(store.out_edges("acme").len(), 1);
        assert_eq!(store.in_edges("globex").len(), 1);
        assert!(store.out_edges("globex").is_empty());
    }
}
