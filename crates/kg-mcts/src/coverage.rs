//! Four-dimensional coverage analysis, cached per `(node, snapshot_id)` so a
//! graph write anywhere invalidates every cached score at once: the next
//! lookup after a write always misses, since `snapshot_id` is bumped
//! globally rather than per-entity (the "global-on-write" policy).

use std::collections::{HashMap, HashSet};

use kg_core::{CoverageScore, NodeId, SnapshotId};
use kg_graph::KnowledgeGraph;
use kg_tot::{NodeState, ThoughtTree};

#[derive(Debug, Default)]
pub struct CoverageAnalyzer {
    cache: HashMap<(NodeId, SnapshotId), CoverageScore>,
}

impl CoverageAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Computes (or returns the cached) four-dimensional coverage score for
    /// `node_id` against the current state of `tree` and `graph`, reading
    /// `graph_entities`/`tested_axioms` straight off the node rather than
    /// from a separately-threaded parameter.
    ///
    /// `total_axioms` is passed in by the caller rather than sourced from a
    /// dependency on the axiom crate, so this crate only needs to know a
    /// count, not the axiom type itself.
    pub fn compute(&mut self, node_id: NodeId, tree: &ThoughtTree, graph: &KnowledgeGraph, max_tree_depth: usize, total_axioms: usize) -> CoverageScore {
        let key = (node_id, graph.snapshot_id());
        if let Some(score) = self.cache.get(&key) {
            return *score;
        }

        let node = tree.get(&node_id);
        let referenced_entities: HashSet<&str> = node.map(|n| n.graph_entities.iter().map(String::as_str).collect()).unwrap_or_default();

        let one_hop: HashSet<&str> = referenced_entities
            .iter()
            .flat_map(|id| graph.edges().touching(id))
            .flat_map(|e| [e.subject.as_str(), e.object.as_str()])
            .collect();
        let induced: HashSet<&str> = referenced_entities.iter().copied().chain(one_hop.iter().copied()).collect();

        let entity_density = if induced.len() < 2 {
            0.0
        } else {
            let edges_in_induced = graph.edges().iter().filter(|e| induced.contains(e.subject.as_str()) && induced.contains(e.object.as_str())).count();
            let max_edges = induced.len() * (induced.len() - 1);
            (edges_in_induced as f32 / max_edges as f32).min(1.0)
        };

        let depth_reached = node.map(|n| n.depth).unwrap_or(0);
        let depth_term = if max_tree_depth == 0 { 0.0 } else { depth_reached as f32 / max_tree_depth as f32 };
        let children_answered = tree.children(&node_id).iter().filter(|c| c.state == NodeState::Answered).count();
        let branching_factor = tree.branching_factor();
        let children_term = if branching_factor == 0 { 0.0 } else { children_answered as f32 / branching_factor as f32 };
        let exploration_depth = (0.6 * depth_term + 0.4 * children_term).clamp(0.0, 1.0);

        let axiom_coverage = node
            .map(|n| {
                if total_axioms == 0 || n.tested_axioms.is_empty() {
                    0.0
                } else {
                    let tested_fraction = (n.tested_axioms.len() as f32 / total_axioms as f32).min(1.0);
                    let mean_score: f32 = n.tested_axioms.values().sum::<f32>() / n.tested_axioms.len() as f32;
                    let mean_score_normalized = (mean_score + 1.0) / 2.0;
                    tested_fraction * (0.5 + 0.5 * mean_score_normalized)
                }
            })
            .unwrap_or(0.0);

        let neighbor_coverage = if one_hop.is_empty() {
            0.0
        } else {
            let answered_entities: HashSet<&str> = tree
                .iter()
                .filter(|n| n.state == NodeState::Answered)
                .flat_map(|n| n.graph_entities.iter().map(String::as_str))
                .collect();
            let covered = one_hop.iter().filter(|n| answered_entities.contains(*n)).count();
            (covered as f32 / one_hop.len() as f32).min(1.0)
        };

        let score = CoverageScore::new(entity_density, exploration_depth, axiom_coverage, neighbor_coverage);
        self.cache.insert(key, score);
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::NoopResolver;

    fn setup() -> (ThoughtTree, KnowledgeGraph, NodeId) {
        let tree = ThoughtTree::new("root", 4, 4);
        let root = tree.root();
        let mut graph = KnowledgeGraph::new(Box::new(NoopResolver));
        graph.upsert_entity("acme", "company", 0.8, "s1".to_string()).unwrap();
        (tree, graph, root)
    }

    #[test]
    fn empty_graph_yields_zero_coverage() {
        let tree = ThoughtTree::new("root", 4, 4);
        let root = tree.root();
        let graph = KnowledgeGraph::new(Box::new(NoopResolver));
        let mut analyzer = CoverageAnalyzer::new();
        let score = analyzer.compute(root, &tree, &graph, 4, 0);
        assert_eq!(score.overall, 0.0);
    }

    #[test]
    fn cache_hits_on_unchanged_snapshot() {
        let (tree, graph, root) = setup();
        let mut analyzer = CoverageAnalyzer::new();
        analyzer.compute(root, &tree, &graph, 4, 1);
        analyzer.compute(root, &tree, &graph, 4, 1);
        assert_eq!(analyzer.cached_len(), 1);
    }

    #[test]
    fn write_to_graph_invalidates_cache_entry() {
        let (tree, mut graph, root) = setup();
        let mut analyzer = CoverageAnalyzer::new();
        analyzer.compute(root, &tree, &graph, 4, 1);
        graph.upsert_entity("globex", "company", 0.8, "s1".to_string()).unwrap();
        analyzer.compute(root, &tree, &graph, 4, 1);
        assert_eq!(analyzer.cached_len(), 2);
    }

    #[test]
    fn scores_stay_within_unit_bounds() {
        let (tree, graph, root) = setup();
        let mut analyzer = CoverageAnalyzer::new();
        let score = analyzer.compute(root, &tree, &graph, 4, 3);
        assert!(score.overall >= 0.0 && score.overall <= 1.0);
    }

    #[test]
    fn axiom_coverage_is_boosted_by_mean_score() {
        let mut tree = ThoughtTree::new("root", 4, 4);
        let root = tree.root();
        let mut graph = KnowledgeGraph::new(Box::new(NoopResolver));
        graph.upsert_entity("acme", "company", 0.8, "s1".to_string()).unwrap();
        let mut high = HashMap::new();
        high.insert("ax1".to_string(), 1.0);
        tree.answer(root, "42", vec![], high).unwrap();

        let mut analyzer = CoverageAnalyzer::new();
        let high_score = analyzer.compute(root, &tree, &graph, 4, 2);

        let mut tree2 = ThoughtTree::new("root", 4, 4);
        let root2 = tree2.root();
        let mut low = HashMap::new();
        low.insert("ax1".to_string(), -1.0);
        tree2.answer(root2, "42", vec![], low).unwrap();
        let mut analyzer2 = CoverageAnalyzer::new();
        let low_score = analyzer2.compute(root2, &tree2, &graph, 4, 2);

        assert!(high_score.axiom_coverage > low_score.axiom_coverage);
    }

    #[test]
    fn entity_density_reflects_induced_subgraph() {
        let mut tree = ThoughtTree::new("root", 4, 4);
        let root = tree.root();
        let mut graph = KnowledgeGraph::new(Box::new(NoopResolver));
        graph.upsert_entity("acme", "company", 0.8, "s1".to_string()).unwrap();
        graph.upsert_entity("globex", "company", 0.8, "s1".to_string()).unwrap();
        graph
            .add_claim(
                "acme",
                "competes_with",
                "globex",
                0.8,
                kg_graph::EvidenceRecord {
                    source_id: "s1".to_string(),
                    snippet: "x".to_string(),
                    timestamp: chrono::Utc::now(),
                    authority_tier: 0.9,
                },
            )
            .unwrap();
        tree.answer(root, "42", vec!["acme".to_string()], HashMap::new()).unwrap();

        let mut analyzer = CoverageAnalyzer::new();
        let score = analyzer.compute(root, &tree, &graph, 4, 0);
        assert!(score.entity_density > 0.0);
    }
}
