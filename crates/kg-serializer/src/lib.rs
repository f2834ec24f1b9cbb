//! Graph -> prompt serialization: token-budgeted extraction of the most
//! relevant neighborhood around a seed entity, in markdown, narrative prose,
//! or JSON.

pub mod format;

use std::collections::HashSet;

use kg_core::{CoreError, CoreResult, EntityId, HeuristicTokenizer, Tokenizer};
use kg_graph::{ClaimEdge, Entity, KnowledgeGraph};

pub use format::{OutputFormat, RankingWeights};
use format::GraphDoc;

/// Ranking weights: PageRank dominates, keyword overlap nudges toward the
/// query, confidence is a tiebreak-ish signal (spec §4.6).
const ALPHA_PAGERANK: f32 = 0.5;
const BETA_KEYWORD: f32 = 0.3;
const GAMMA_CONFIDENCE: f32 = 0.2;

const EGO_DEPTH: usize = 2;
const EGO_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct SerializeRequest {
    pub seed: EntityId,
    pub format: OutputFormat,
    pub token_budget: usize,
    pub keyword_query: Option<String>,
}

impl SerializeRequest {
    pub fn new(seed: impl Into<EntityId>, format: OutputFormat, token_budget: usize) -> Self {
        Self {
            seed: seed.into(),
            format,
            token_budget,
            keyword_query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.keyword_query = Some(query.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SerializedOutput {
    pub text: String,
    pub nodes: usize,
    pub edges: usize,
    pub truncated: bool,
}

pub struct GraphSerializer {
    tokenizer: Box<dyn Tokenizer>,
}

impl Default for GraphSerializer {
    fn default() -> Self {
        Self {
            tokenizer: Box::new(HeuristicTokenizer),
        }
    }
}

impl GraphSerializer {
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self { tokenizer }
    }

    pub fn serialize(&self, graph: &KnowledgeGraph, request: &SerializeRequest) -> CoreResult<SerializedOutput> {
        let ego = graph
            .ego_subgraph(&request.seed, EGO_DEPTH, EGO_LIMIT)
            .ok_or_else(|| CoreError::UnknownEntity(request.seed.clone()))?;
        let ranks = graph.pagerank();
        let max_rank = ranks.values().cloned().fold(0.0_f64, f64::max).max(1e-9);

        let query_terms: Vec<String> = request
            .keyword_query
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        let mut scored: Vec<(f32, Entity)> = ego
            .entities
            .into_iter()
            .map(|e| {
                let pagerank_norm = (ranks.get(&e.id).copied().unwrap_or(0.0) / max_rank) as f32;
                let keyword_overlap = keyword_overlap(&e.axiom_text(), &query_terms);
                let score = ALPHA_PAGERANK * pagerank_norm + BETA_KEYWORD * keyword_overlap + GAMMA_CONFIDENCE * e.confidence;
                (score, e)
            })
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.1.id.cmp(&b.1.id)));

        let header = format!("# Knowledge graph excerpt (seed: {})\n\n", request.seed);
        let mut budget_left = request.token_budget.saturating_sub(self.tokenizer.count_tokens(&header));
        let mut truncated = ego.truncated;

        let mut kept_entities: Vec<Entity> = Vec::new();
        let mut kept_ids: HashSet<EntityId> = HashSet::new();
        for (_, entity) in scored {
            let line = format!("- **{}** ({}) confidence={:.2}\n", entity.id, entity.entity_type, entity.confidence);
            let cost = self.tokenizer.count_tokens(&line);
            if cost > budget_left {
                truncated = true;
                break;
            }
            budget_left -= cost;
            kept_ids.insert(entity.id.clone());
            kept_entities.push(entity);
        }

        let mut candidate_edges: Vec<ClaimEdge> = ego.edges.into_iter().filter(|e| kept_ids.contains(&e.subject) && kept_ids.contains(&e.object)).collect();
        candidate_edges.sort_by(|a, b| (&a.subject, &a.predicate, &a.object).cmp(&(&b.subject, &b.predicate, &b.object)));

        let mut kept_edges: Vec<ClaimEdge> = Vec::new();
        for edge in candidate_edges {
            let line = format!("- {} --[{}]--> {} (weight={:.2})\n", edge.subject, edge.predicate, edge.object, edge.weight);
            let cost = self.tokenizer.count_tokens(&line);
            if cost > budget_left {
                truncated = true;
                break;
            }
            budget_left -= cost;
            kept_edges.push(edge);
        }

        let doc = GraphDoc {
            seed: request.seed.clone(),
            snapshot_id: graph.snapshot_id(),
            ranking_weights: RankingWeights { alpha: ALPHA_PAGERANK, beta: BETA_KEYWORD, gamma: GAMMA_CONFIDENCE },
            entities: kept_entities,
            edges: kept_edges,
            truncated,
        };
        let nodes = doc.entities.len();
        let edges = doc.edges.len();
        let text = format::render(&doc, request.format);

        Ok(SerializedOutput { text, nodes, edges, truncated })
    }
}

fn keyword_overlap(text: &str, query_terms: &[String]) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_lower = text.to_lowercase();
    let hits = query_terms.iter().filter(|t| text_lower.contains(t.as_str())).count();
    hits as f32 / query_terms.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_graph::{EvidenceRecord, NoopResolver};

    fn graph_with_seed() -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new(Box::new(NoopResolver));
        g.upsert_entity("acme", "company", 0.8, "s1".to_string()).unwrap();
        g.upsert_entity("globex", "company", 0.8, "s1".to_string()).unwrap();
        g.add_claim(
            "acme",
            "competes_with",
            "globex",
            0.8,
            EvidenceRecord {
                source_id: "s1".to_string(),
                snippet: "x".to_string(),
                timestamp: chrono::Utc::now(),
                authority_tier: 0.9,
            },
        )
        .unwrap();
        g
    }

    #[test]
    fn unknown_seed_is_an_error() {
        let g = graph_with_seed();
        let serializer = GraphSerializer::default();
        let req = SerializeRequest::new("nope", OutputFormat::Markdown, 500);
        assert!(serializer.serialize(&g, &req).is_err());
    }

    #[test]
    fn tiny_budget_truncates() {
        let g = graph_with_seed();
        let serializer = GraphSerializer::default();
        let req = SerializeRequest::new("acme", OutputFormat::Markdown, 1);
        let out = serializer.serialize(&g, &req).unwrap();
        assert!(out.truncated);
    }

    #[test]
    fn generous_budget_includes_both_entities_and_the_edge() {
        let g = graph_with_seed();
        let serializer = GraphSerializer::default();
        let req = SerializeRequest::new("acme", OutputFormat::Markdown, 5000);
        let out = serializer.serialize(&g, &req).unwrap();
        assert_eq!(out.nodes, 2);
        assert_eq!(out.edges, 1);
        assert!(!out.truncated);
        assert!(out.text.contains("acme"));
    }

    #[test]
    fn json_format_round_trips_counts() {
        let g = graph_with_seed();
        let serializer = GraphSerializer::default();
        let req = SerializeRequest::new("acme", OutputFormat::Json, 5000);
        let out = serializer.serialize(&g, &req).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(value["nodes"], out.nodes as u64);
    }

    #[test]
    fn output_carries_its_own_snapshot_id_and_ranking_weights() {
        let g = graph_with_seed();
        let serializer = GraphSerializer::default();
        let req = SerializeRequest::new("acme", OutputFormat::Json, 5000);
        let out = serializer.serialize(&g, &req).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(value["snapshot_id"], g.snapshot_id());
        assert_eq!(value["ranking_weights"]["alpha"], ALPHA_PAGERANK as f64);
        assert_eq!(value["ranking_weights"]["beta"], BETA_KEYWORD as f64);
        assert_eq!(value["ranking_weights"]["gamma"], GAMMA_CONFIDENCE as f64);
    }
}
