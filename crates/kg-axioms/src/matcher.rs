//! The structured matcher: a tagged-variant rule set (keyword / predicate /
//! numeric) evaluated by one pure function, standing in for what would be
//! "dynamic dispatch" over axiom rule kinds in a duck-typed system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// What an axiom's matcher is evaluated against: the target's text (for
/// keyword matching), its predicate (for relation axioms), and any numeric
/// fields pulled off it (weight, confidence, a claimed quantity, ...).
#[derive(Debug, Clone, Default)]
pub struct MatchTarget {
    pub text: String,
    pub predicate: Option<String>,
    pub numeric_fields: HashMap<String, f64>,
}

impl MatchTarget {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            predicate: None,
            numeric_fields: HashMap::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_numeric(mut self, field: impl Into<String>, value: f64) -> Self {
        self.numeric_fields.insert(field.into(), value);
        self
    }
}

/// `matcher:{positive_terms[], negative_terms[], predicates[], numeric_rules[]}`
/// from the axiom file format (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AxiomMatcher {
    pub positive_terms: Vec<String>,
    pub negative_terms: Vec<String>,
    pub predicates: Vec<String>,
    pub numeric_rules: Vec<NumericRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

impl NumericOp {
    fn holds(self, value: f64, threshold: f64) -> bool {
        match self {
            NumericOp::Gt => value > threshold,
            NumericOp::Gte => value >= threshold,
            NumericOp::Lt => value < threshold,
            NumericOp::Lte => value <= threshold,
            NumericOp::Eq => (value - threshold).abs() < f64::EPSILON,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericRule {
    pub field: String,
    pub op: NumericOp,
    pub threshold: f64,
}

impl AxiomMatcher {
    /// Each match yields one signed contribution in `[-1, 1]`; the caller
    /// (`AxiomJudge`) clips and normalizes the sum.
    pub fn evaluate(&self, target: &MatchTarget) -> Vec<f32> {
        let mut contributions = Vec::new();
        let text_lower = target.text.to_lowercase();

        for term in &self.positive_terms {
            if text_lower.contains(&term.to_lowercase()) {
                contributions.push(1.0);
            }
        }

        for term in &self.negative_terms {
            if text_lower.contains(&term.to_lowercase()) {
                contributions.push(-1.0);
            }
        }

        if let Some(predicate) = &target.predicate {
            for candidate in &self.predicates {
                if candidate.eq_ignore_ascii_case(predicate) {
                    contributions.push(1.0);
                }
            }
        }

        for rule in &self.numeric_rules {
            if let Some(value) = target.numeric_fields.get(&rule.field) {
                contributions.push(if rule.op.holds(*value, rule.threshold) {
                    1.0
                } else {
                    -1.0
                });
            }
        }

        contributions
    }
}
