//! Axiom evaluation: user-authored value rules scored against entities,
//! edges, or paths.
//!
//! "Dynamic dispatch" over axiom rules becomes a tagged-variant matcher
//! (keyword / predicate / numeric), evaluated by a single pure function —
//! no trait objects, no per-rule-kind branching scattered across callers.

pub mod matcher;

use kg_core::{clamp_signed, AxiomId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use matcher::{AxiomMatcher, MatchTarget, NumericOp, NumericRule};

/// A user-defined value rule, immutable within a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axiom {
    pub axiom_id: AxiomId,
    pub name: String,
    pub description: String,
    /// `1..=10`, higher is more important.
    pub priority: u8,
    pub matcher: AxiomMatcher,
}

impl Axiom {
    pub fn priority_clamped(&self) -> u8 {
        self.priority.clamp(1, 10)
    }
}

/// `{axiom_id, name, description, priority, matcher}` — the axiom file
/// format from spec §6, deserialized directly via serde.
pub type AxiomFile = Axiom;

/// Per-axiom and aggregate score for one scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxiomScoreResult {
    pub per_axiom: HashMap<AxiomId, f32>,
    pub aggregate: f32,
}

/// Pure scoring function: `score(entity|edge|path, axioms)`.
///
/// Determinism: a pure function of `target` and `axioms` — no hidden state,
/// no RNG, so two calls with identical inputs always agree (spec §4.3).
#[derive(Debug, Default, Clone, Copy)]
pub struct AxiomJudge;

impl AxiomJudge {
    pub fn score(&self, target: &MatchTarget, axioms: &[Axiom]) -> AxiomScoreResult {
        let mut per_axiom = HashMap::with_capacity(axioms.len());
        for axiom in axioms {
            per_axiom.insert(axiom.axiom_id.clone(), Self::score_one(target, axiom));
        }

        let total_priority: f32 = axioms.iter().map(|a| a.priority_clamped() as f32).sum();
        let aggregate = if total_priority <= 0.0 {
            0.0
        } else {
            axioms
                .iter()
                .map(|a| {
                    let weight = a.priority_clamped() as f32 / total_priority;
                    weight * per_axiom.get(&a.axiom_id).copied().unwrap_or(0.0)
                })
                .sum()
        };

        AxiomScoreResult {
            per_axiom,
            aggregate: clamp_signed(aggregate),
        }
    }

    /// Per-axiom score = clipped sum of contributions, normalized by match count.
    fn score_one(target: &MatchTarget, axiom: &Axiom) -> f32 {
        let contributions = axiom.matcher.evaluate(target);
        if contributions.is_empty() {
            return 0.0;
        }
        let sum: f32 = contributions.iter().sum();
        clamp_signed(sum / contributions.len() as f32)
    }
}
