//! Coverage-guided Monte Carlo Tree Search over a `ThoughtTree`: UCB1
//! selection with an added "gap bonus" that pulls search toward
//! under-covered parts of the graph instead of just under-visited nodes.

pub mod coverage;

use std::collections::HashMap;

use kg_core::{CoverageScore, NodeId};
use kg_tot::{NodeState, ThoughtTree};

pub use coverage::CoverageAnalyzer;

#[derive(Debug, Clone, Copy)]
pub struct MctsConfig {
    /// UCB1 exploration constant. `sqrt(2)` is the textbook default.
    pub exploration_c: f32,
    /// Weight on the coverage gap bonus in the selection score.
    pub gap_lambda: f32,
    /// Weight applied to `(1 - overall)` to form the gap bonus. At 0,
    /// selection reduces to plain UCB1 (spec §8 property 6).
    pub coverage_weight: f32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_c: std::f32::consts::SQRT_2,
            gap_lambda: 1.0,
            coverage_weight: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct NodeStats {
    visits: u32,
    total_value: f32,
}

impl NodeStats {
    fn mean_value(&self) -> f32 {
        if self.visits == 0 {
            0.0
        } else {
            self.total_value / self.visits as f32
        }
    }
}

/// Per-node inputs to the evaluation function — whatever an
/// extraction/reasoning pass has gathered about that node's branch.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationInput {
    pub confidence: f32,
    /// Already normalized to `[0, 1]`, e.g. `min(1, roi_per_hour / 100)`.
    pub roi_norm: f32,
    pub risk: f32,
    pub axiom_alignment: f32,
}

/// `U = 0.15*confidence + 0.35*roi_norm + 0.20*(1-risk) + 0.30*axiom_alignment`.
pub fn evaluate(input: EvaluationInput) -> f32 {
    let value = 0.15 * input.confidence + 0.35 * input.roi_norm + 0.20 * (1.0 - input.risk) + 0.30 * input.axiom_alignment;
    value.clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub node_id: NodeId,
    pub reason: String,
}

pub struct Mcts {
    stats: HashMap<NodeId, NodeStats>,
    coverage: CoverageAnalyzer,
    config: MctsConfig,
}

impl Default for Mcts {
    fn default() -> Self {
        Self::new(MctsConfig::default())
    }
}

impl Mcts {
    pub fn new(config: MctsConfig) -> Self {
        Self {
            stats: HashMap::new(),
            coverage: CoverageAnalyzer::new(),
            config,
        }
    }

    fn stats_of(&self, id: &NodeId) -> NodeStats {
        self.stats.get(id).copied().unwrap_or_default()
    }

    /// Selection score for `child` of `parent`: exploitation + UCB1
    /// exploration + coverage gap bonus. An unvisited child always wins (its
    /// exploration term is infinite), matching standard UCB1 behavior.
    fn selection_score(&mut self, child: NodeId, parent_visits: u32, tree: &ThoughtTree, graph: &kg_graph::KnowledgeGraph, max_depth: usize, total_axioms: usize) -> f32 {
        let stats = self.stats_of(&child);
        if stats.visits == 0 {
            return f32::INFINITY;
        }
        let coverage = self.coverage.compute(child, tree, graph, max_depth, total_axioms);
        selection_score_from(stats.mean_value(), stats.visits, parent_visits, &coverage, &self.config)
    }

    /// Descend from `root` via the highest selection score at each level,
    /// stopping at the first node that is `Open` (unexpanded) or has no
    /// children. Ties break on node-id lexical order for determinism.
    pub fn select(&mut self, tree: &ThoughtTree, graph: &kg_graph::KnowledgeGraph, max_depth: usize, total_axioms: usize) -> NodeId {
        let mut current = tree.root();
        loop {
            let node = match tree.get(&current) {
                Some(n) => n,
                None => return current,
            };
            if node.state == NodeState::Open || node.children.is_empty() {
                return current;
            }
            let parent_visits = self.stats_of(&current).visits.max(1);
            let children = node.children.clone();
            let mut best: Option<(f32, NodeId)> = None;
            for child in children {
                let score = self.selection_score(child, parent_visits, tree, graph, max_depth, total_axioms);
                best = Some(match best {
                    None => (score, child),
                    Some((best_score, best_id)) => {
                        if score > best_score || (score == best_score && child.to_string() < best_id.to_string()) {
                            (score, child)
                        } else {
                            (best_score, best_id)
                        }
                    }
                });
            }
            match best {
                Some((_, next)) => current = next,
                None => return current,
            }
        }
    }

    pub fn backprop(&mut self, path: &[NodeId], value: f32) {
        for &node in path {
            let stats = self.stats.entry(node).or_default();
            stats.visits += 1;
            stats.total_value += value;
        }
    }

    pub fn visits(&self, node: NodeId) -> u32 {
        self.stats_of(&node).visits
    }

    pub fn mean_value(&self, node: NodeId) -> f32 {
        self.stats_of(&node).mean_value()
    }

    /// The highest-mean-value child chain from root to a leaf.
    pub fn best_path(&self, tree: &ThoughtTree) -> Vec<NodeId> {
        let mut path = vec![tree.root()];
        let mut current = tree.root();
        loop {
            let children = tree.children(&current);
            if children.is_empty() {
                break;
            }
            let best = children
                .iter()
                .map(|c| (self.stats_of(&c.id).mean_value(), c.id))
                .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| b.1.to_string().cmp(&a.1.to_string())));
            match best {
                Some((_, id)) => {
                    path.push(id);
                    current = id;
                }
                None => break,
            }
        }
        path
    }

    /// Top `top_k` visited-but-underexplored nodes, each paired with the
    /// coverage dimension holding it back.
    pub fn suggestions(&mut self, tree: &ThoughtTree, graph: &kg_graph::KnowledgeGraph, max_depth: usize, total_axioms: usize, top_k: usize) -> Vec<Suggestion> {
        let mut candidates: Vec<(NodeId, CoverageScore)> = tree
            .iter()
            .filter(|n| n.state != NodeState::Pruned)
            .map(|n| (n.id, self.coverage.compute(n.id, tree, graph, max_depth, total_axioms)))
            .collect();
        candidates.sort_by(|a, b| a.1.overall.partial_cmp(&b.1.overall).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.to_string().cmp(&b.0.to_string())));

        candidates
            .into_iter()
            .take(top_k)
            .map(|(node_id, score)| Suggestion {
                node_id,
                reason: lowest_dimension(&score),
            })
            .collect()
    }
}

/// Exploitation + UCB1 exploration + coverage gap bonus, as a pure function
/// of already-visited stats and a coverage score — the composition
/// `selection_score` wraps with a live tree/graph lookup, exposed directly
/// so callers can exercise the coverage-guided tie-break without wiring up
/// a full tree and graph (spec §8 S4).
///
/// `exploration = sqrt(ln(parent_visits + 1) / visits)` and `gap_bonus =
/// (1 - overall) * coverage_weight`, so at `coverage_weight = 0` this is
/// exactly standard UCB1 (spec §8 property 6).
pub fn selection_score_from(mean_value: f32, visits: u32, parent_visits: u32, coverage: &CoverageScore, config: &MctsConfig) -> f32 {
    if visits == 0 {
        return f32::INFINITY;
    }
    let exploitation = mean_value;
    let exploration = config.exploration_c * (((parent_visits as f32 + 1.0).ln()) / visits as f32).sqrt();
    let gap_bonus = (1.0 - coverage.overall) * config.coverage_weight;
    exploitation + exploration + config.gap_lambda * gap_bonus
}

fn lowest_dimension(score: &CoverageScore) -> String {
    let dims = [
        ("entity_density", score.entity_density),
        ("exploration_depth", score.exploration_depth),
        ("axiom_coverage", score.axiom_coverage),
        ("neighbor_coverage", score.neighbor_coverage),
    ];
    dims.iter().min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)).map(|(name, _)| name.to_string()).unwrap_or_default()
}
