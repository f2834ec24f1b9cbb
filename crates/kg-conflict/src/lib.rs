//! Tiered conflict resolution: authority first, then recency, then escalate
//! to human/research review. Grounded in the weighted-evidence reconciliation
//! approach of a source-credibility engine, adapted to this crate's simpler
//! edge-vs-edge shape (no running per-source track record).
//!
//! Implements `kg_graph::ConflictResolver`, which lives in `kg-graph` so that
//! `KnowledgeGraph::add_claim` can call it without `kg-graph` depending on
//! this crate.

pub mod antonym;

use chrono::Duration;
use kg_core::CoreResult;
use kg_graph::{ClaimEdge, Conflict, ConflictKind, ConflictResolver};
use tracing::debug;

/// Margin by which one side's (authority × confidence) must exceed the
/// other's for tier 1 to settle the conflict outright (spec §4.4).
pub const AUTHORITY_MARGIN: f32 = 0.2;

/// How much more recent one claim must be, in days, for tier 2 to settle a
/// conflict that tier 1 left open (spec §4.4).
pub const RECENCY_THRESHOLD_DAYS: i64 = 180;

#[derive(Debug, Clone, Copy)]
pub struct TieredResolverConfig {
    pub authority_margin: f32,
    pub recency_threshold_days: i64,
}

impl Default for TieredResolverConfig {
    fn default() -> Self {
        Self {
            authority_margin: AUTHORITY_MARGIN,
            recency_threshold_days: RECENCY_THRESHOLD_DAYS,
        }
    }
}

/// T1 (authority) -> T2 (recency) -> T3 (escalate) conflict resolver.
#[derive(Debug, Clone, Default)]
pub struct TieredResolver {
    config: TieredResolverConfig,
}

impl TieredResolver {
    pub fn new(config: TieredResolverConfig) -> Self {
        Self { config }
    }

    fn classify(&self, new_edge: &ClaimEdge, candidate: &ClaimEdge) -> Option<ConflictKind> {
        let same_object = new_edge.key().object_normalized == candidate.key().object_normalized;
        let same_predicate = new_edge.predicate.eq_ignore_ascii_case(&candidate.predicate);

        if same_predicate && !same_object {
            return Some(if is_numeric_claim(&new_edge.object) && is_numeric_claim(&candidate.object) {
                ConflictKind::Numeric
            } else {
                ConflictKind::Semantic
            });
        }
        if same_object && !same_predicate && antonym::is_antonym_pair(&new_edge.predicate, &candidate.predicate) {
            return Some(ConflictKind::Antonym);
        }
        None
    }

    fn authority_score(edge: &ClaimEdge) -> f32 {
        edge.strongest_authority() * edge.base_confidence
    }

    /// T1: whichever side's strongest-authority source, weighted by its own
    /// claim confidence, clears the margin wins outright.
    fn try_authority(&self, new_edge: &ClaimEdge, candidate: &ClaimEdge) -> Option<bool> {
        let new_score = Self::authority_score(new_edge);
        let old_score = Self::authority_score(candidate);
        if (new_score - old_score).abs() >= self.config.authority_margin {
            Some(new_score > old_score)
        } else {
            None
        }
    }

    /// T2: whichever side has a materially newer citation wins, if T1 left
    /// it undecided (boundary property 11: margin below threshold always
    /// falls through here rather than auto-resolving on authority alone).
    fn try_recency(&self, new_edge: &ClaimEdge, candidate: &ClaimEdge) -> Option<bool> {
        let (new_ts, old_ts) = (new_edge.latest_timestamp()?, candidate.latest_timestamp()?);
        let gap = new_ts.signed_duration_since(old_ts);
        if gap >= Duration::days(self.config.recency_threshold_days) {
            Some(true)
        } else if -gap >= Duration::days(self.config.recency_threshold_days) {
            Some(false)
        } else {
            None
        }
    }
}

fn is_numeric_claim(object: &str) -> bool {
    object.trim().trim_end_matches('%').parse::<f64>().is_ok()
}

impl ConflictResolver for TieredResolver {
    fn resolve(&self, new_edge: &ClaimEdge, existing: &[&ClaimEdge]) -> CoreResult<Option<Conflict>> {
        let Some(candidate) = existing.iter().find_map(|c| self.classify(new_edge, c).map(|kind| (kind, **c))) else {
            return Ok(None);
        };
        let (kind, candidate) = candidate;

        let mut conflict = Conflict::new(kind, new_edge.id, candidate.id);

        if let Some(new_wins) = self.try_authority(new_edge, &candidate) {
            let winner = if new_wins { new_edge.id } else { candidate.id };
            conflict.resolve(winner, "T1", "authority-weighted confidence cleared the margin");
            debug!(conflict_id = %conflict.id, ?kind, "resolved at T1 (authority)");
            return Ok(Some(conflict));
        }
        conflict.record("T1", "authority margin not cleared, falling through to recency");

        if let Some(new_wins) = self.try_recency(new_edge, &candidate) {
            let winner = if new_wins { new_edge.id } else { candidate.id };
            conflict.resolve(winner, "T2", "newer citation outside recency threshold");
            debug!(conflict_id = %conflict.id, ?kind, "resolved at T2 (recency)");
            return Ok(Some(conflict));
        }
        conflict.record("T2", "no recency signal strong enough to settle, escalating");

        conflict.escalate(format!(
            "competing claims on {} {} could not be resolved by authority or recency; needs research",
            new_edge.subject, new_edge.predicate
        ));
        debug!(conflict_id = %conflict.id, ?kind, "escalated to T3");
        Ok(Some(conflict))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kg_graph::EvidenceRecord;

    fn edge(object: &str, authority: f32, confidence: f32, days_ago: i64) -> ClaimEdge {
        ClaimEdge::new(
            "acme",
            "headquartered_in",
            object,
            confidence,
            EvidenceRecord {
                source_id: "s".to_string(),
                snippet: "x".to_string(),
                timestamp: Utc::now() - Duration::days(days_ago),
                authority_tier: authority,
            },
        )
    }

    #[test]
    fn unrelated_edges_do_not_conflict() {
        let resolver = TieredResolver::default();
        let new_edge = edge("boston", 0.9, 0.9, 0);
        let unrelated = ClaimEdge::new(
            "acme",
            "founded_by",
            "jane",
            0.9,
            EvidenceRecord {
                source_id: "s".into(),
                snippet: "x".into(),
                timestamp: Utc::now(),
                authority_tier: 0.9,
            },
        );
        assert!(resolver.resolve(&new_edge, &[&unrelated]).unwrap().is_none());
    }

    #[test]
    fn large_authority_margin_resolves_at_tier_one() {
        let resolver = TieredResolver::default();
        let strong = edge("boston", 1.0, 1.0, 0);
        let weak = edge("chicago", 0.5, 0.5, 0);
        let conflict = resolver.resolve(&strong, &[&weak]).unwrap().unwrap();
        assert_eq!(conflict.status, kg_graph::ConflictStatus::Resolved);
        assert_eq!(conflict.winner, Some(strong.id));
        assert!(conflict.history.iter().any(|h| h.tier == "T1"));
    }

    #[test]
    fn narrow_authority_margin_falls_through_to_recency() {
        let resolver = TieredResolver::default();
        let newer = edge("boston", 0.9, 0.9, 1);
        let older = edge("chicago", 0.85, 0.85, 400);
        let conflict = resolver.resolve(&newer, &[&older]).unwrap().unwrap();
        assert_eq!(conflict.status, kg_graph::ConflictStatus::Resolved);
        assert_eq!(conflict.winner, Some(newer.id));
        assert!(conflict.history.iter().any(|h| h.tier == "T2"));
    }

    #[test]
    fn no_signal_at_all_escalates_to_tier_three() {
        let resolver = TieredResolver::default();
        let a = edge("boston", 0.9, 0.9, 5);
        let b = edge("chicago", 0.85, 0.85, 7);
        let conflict = resolver.resolve(&a, &[&b]).unwrap().unwrap();
        assert_eq!(conflict.status, kg_graph::ConflictStatus::Escalated);
        assert!(conflict.winner.is_none());
    }

    #[test]
    fn antonym_predicates_on_same_object_are_detected() {
        let resolver = TieredResolver::default();
        let supports = ClaimEdge::new(
            "acme",
            "supports",
            "policy_x",
            1.0,
            EvidenceRecord {
                source_id: "s".into(),
                snippet: "x".into(),
                timestamp: Utc::now(),
                authority_tier: 1.0,
            },
        );
        let opposes = ClaimEdge::new(
            "acme",
            "opposes",
            "policy_x",
            0.5,
            EvidenceRecord {
                source_id: "s".into(),
                snippet: "x".into(),
                timestamp: Utc::now(),
                authority_tier: 0.5,
            },
        );
        let conflict = resolver.resolve(&supports, &[&opposes]).unwrap().unwrap();
        assert_eq!(conflict.kind, ConflictKind::Antonym);
    }
}
