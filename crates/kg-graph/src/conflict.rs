//! Conflict records: what gets written when two claims can't both stand.
//!
//! Resolution logic itself lives one layer up (in the crate that implements
//! `ConflictResolver`); this module only owns the record shape and the
//! trait `add_claim` calls into, so `KnowledgeGraph` never needs to know how
//! a conflict gets resolved, only that something will.

use kg_core::{ConflictId, CoreResult, EdgeId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    Antonym,
    Numeric,
    Temporal,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictStatus {
    Open,
    Resolved,
    Escalated,
    BothDisputed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub tier: String,
    pub timestamp: Timestamp,
    pub detail: String,
}

/// A detected clash between two claim edges. Edges are never deleted over a
/// conflict; this record plus each edge's `disputed` flag and
/// `resolution_history` form the audit trail (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub kind: ConflictKind,
    pub edge_a: EdgeId,
    pub edge_b: EdgeId,
    pub status: ConflictStatus,
    pub winner: Option<EdgeId>,
    pub opened_at: Timestamp,
    pub history: Vec<ConflictEntry>,
}

impl Conflict {
    pub fn new(kind: ConflictKind, edge_a: EdgeId, edge_b: EdgeId) -> Self {
        Self {
            id: ConflictId::new_v4(),
            kind,
            edge_a,
            edge_b,
            status: ConflictStatus::Open,
            winner: None,
            opened_at: chrono::Utc::now(),
            history: Vec::new(),
        }
    }

    pub fn record(&mut self, tier: impl Into<String>, detail: impl Into<String>) {
        self.history.push(ConflictEntry {
            tier: tier.into(),
            timestamp: chrono::Utc::now(),
            detail: detail.into(),
        });
    }

    pub fn resolve(&mut self, winner: EdgeId, tier: impl Into<String>, detail: impl Into<String>) {
        self.winner = Some(winner);
        self.status = ConflictStatus::Resolved;
        self.record(tier, detail);
    }

    pub fn escalate(&mut self, detail: impl Into<String>) {
        self.status = ConflictStatus::Escalated;
        self.record("T3", detail);
    }

    pub fn mark_both_disputed(&mut self, detail: impl Into<String>) {
        self.status = ConflictStatus::BothDisputed;
        self.record("T3", detail);
    }
}

/// A human's call on a conflict the tiered resolver couldn't settle,
/// delivered through the session API's `resolve_intervention`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HumanDecision {
    KeepA,
    KeepB,
    BothDisputed,
}

/// Implemented one layer up (`kg-conflict`), invoked by `KnowledgeGraph::add_claim`
/// before a new edge is committed, so the graph never inserts a claim that
/// contradicts an existing one without going through resolution first.
pub trait ConflictResolver: Send + Sync {
    /// Inspect `new_edge` against `existing` — every other out-edge already
    /// on the same subject, excluding exact parallel claims, which are
    /// corroboration rather than conflict — classify and resolve any clash
    /// found, and return the resulting conflict record (if one was raised).
    fn resolve(&self, new_edge: &super::edge::ClaimEdge, existing: &[&super::edge::ClaimEdge]) -> CoreResult<Option<Conflict>>;
}

/// A resolver that never finds a conflict — used where the graph is driven
/// without a configured `ConflictResolver` (tests, single-source ingestion).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl ConflictResolver for NoopResolver {
    fn resolve(&self, _new_edge: &super::edge::ClaimEdge, _existing: &[&super::edge::ClaimEdge]) -> CoreResult<Option<Conflict>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn new_conflict_starts_open_with_no_winner() {
        let c = Conflict::new(ConflictKind::Antonym, Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(c.status, ConflictStatus::Open);
        assert!(c.winner.is_none());
    }

    #[test]
    fn resolve_sets_winner_and_appends_history() {
        let mut c = Conflict::new(ConflictKind::Numeric, Uuid::new_v4(), Uuid::new_v4());
        let winner = c.edge_a;
        c.resolve(winner, "T1", "official source outweighed established by > 0.2");
        assert_eq!(c.status, ConflictStatus::Resolved);
        assert_eq!(c.winner, Some(winner));
        assert_eq!(c.history.len(), 1);
    }

    #[test]
    fn escalate_moves_to_escalated_without_a_winner() {
        let mut c = Conflict::new(ConflictKind::Semantic, Uuid::new_v4(), Uuid::new_v4());
        c.escalate("margin below threshold, no recency signal");
        assert_eq!(c.status, ConflictStatus::Escalated);
        assert!(c.winner.is_none());
    }
}
