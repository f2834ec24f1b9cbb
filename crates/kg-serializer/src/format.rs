//! Renderers: one shared intermediate document, three output shapes.

use kg_core::SnapshotId;
use kg_graph::{ClaimEdge, Entity};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Markdown,
    Narrative,
    Json,
}

/// The `alpha*pagerank + beta*keyword_overlap + gamma*confidence` weights
/// the ranking pass used, carried into the rendered output so it stays
/// self-describing about its own provenance (spec §4.2).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RankingWeights {
    pub alpha: f32,
    pub beta: f32,
    pub gamma: f32,
}

/// The ranked, budget-trimmed selection handed to a renderer. Renderers
/// never re-rank or re-trim; that already happened upstream.
#[derive(Debug, Clone)]
pub struct GraphDoc {
    pub seed: String,
    pub snapshot_id: SnapshotId,
    pub ranking_weights: RankingWeights,
    pub entities: Vec<Entity>,
    pub edges: Vec<ClaimEdge>,
    pub truncated: bool,
}

pub fn render(doc: &GraphDoc, format: OutputFormat) -> String {
    match format {
        OutputFormat::Markdown => render_markdown(doc),
        OutputFormat::Narrative => render_narrative(doc),
        OutputFormat::Json => render_json(doc),
    }
}

fn render_markdown(doc: &GraphDoc) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Knowledge graph excerpt (seed: {})\n\n", doc.seed));
    out.push_str(&provenance_line(doc));
    out.push_str("\n## Entities\n");
    for e in &doc.entities {
        out.push_str(&format!("- **{}** ({}) confidence={:.2}{}\n", e.id, e.entity_type, e.confidence, if e.disputed { " [disputed]" } else { "" }));
    }
    out.push_str("\n## Claims\n");
    for edge in &doc.edges {
        out.push_str(&format!(
            "- {} --[{}]--> {} (weight={:.2}){}\n",
            edge.subject,
            edge.predicate,
            edge.object,
            edge.weight,
            if edge.disputed { " [disputed]" } else { "" }
        ));
    }
    out.push_str(&summary_line(doc));
    out
}

fn render_narrative(doc: &GraphDoc) -> String {
    let mut out = String::new();
    out.push_str(&format!("Here is what is known about {}.\n", doc.seed));
    out.push_str(&provenance_line(doc));
    out.push('\n');
    for edge in &doc.edges {
        let hedge = if edge.disputed { " (disputed)" } else { "" };
        out.push_str(&format!("{} {} {}{}.\n", edge.subject, edge.predicate.replace('_', " "), edge.object, hedge));
    }
    out.push('\n');
    out.push_str(&summary_line(doc));
    out
}

#[derive(Serialize)]
struct JsonDoc<'a> {
    seed: &'a str,
    snapshot_id: SnapshotId,
    ranking_weights: RankingWeights,
    entities: &'a [Entity],
    edges: &'a [ClaimEdge],
    truncated: bool,
    nodes: usize,
    edges_count: usize,
}

fn render_json(doc: &GraphDoc) -> String {
    let payload = JsonDoc {
        seed: &doc.seed,
        snapshot_id: doc.snapshot_id,
        ranking_weights: doc.ranking_weights,
        entities: &doc.entities,
        edges: &doc.edges,
        truncated: doc.truncated,
        nodes: doc.entities.len(),
        edges_count: doc.edges.len(),
    };
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
}

/// Self-describing provenance line (spec §4.2: output "lists its own
/// provenance: snapshot id, seed ids, ranking weights").
fn provenance_line(doc: &GraphDoc) -> String {
    format!(
        "_snapshot_id={} alpha={:.2} beta={:.2} gamma={:.2}_\n",
        doc.snapshot_id, doc.ranking_weights.alpha, doc.ranking_weights.beta, doc.ranking_weights.gamma
    )
}

fn summary_line(doc: &GraphDoc) -> String {
    format!("\n_nodes={} edges={} truncated={}_\n", doc.entities.len(), doc.edges.len(), doc.truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kg_graph::EvidenceRecord;

    fn doc() -> GraphDoc {
        let mut entity = Entity::new("acme", "company", 0.8, "s1".to_string());
        entity.disputed = false;
        let edge = ClaimEdge::new(
            "acme",
            "competes_with",
            "globex",
            0.8,
            EvidenceRecord {
                source_id: "s1".to_string(),
                snippet: "x".to_string(),
                timestamp: Utc::now(),
                authority_tier: 0.9,
            },
        );
        GraphDoc {
            seed: "acme".to_string(),
            snapshot_id: 7,
            ranking_weights: RankingWeights { alpha: 0.5, beta: 0.3, gamma: 0.2 },
            entities: vec![entity],
            edges: vec![edge],
            truncated: false,
        }
    }

    #[test]
    fn markdown_includes_summary_line() {
        let rendered = render(&doc(), OutputFormat::Markdown);
        assert!(rendered.contains("nodes=1 edges=1 truncated=false"));
    }

    #[test]
    fn markdown_includes_provenance_line() {
        let rendered = render(&doc(), OutputFormat::Markdown);
        assert!(rendered.contains("snapshot_id=7"));
        assert!(rendered.contains("alpha=0.50 beta=0.30 gamma=0.20"));
    }

    #[test]
    fn narrative_humanizes_predicate() {
        let rendered = render(&doc(), OutputFormat::Narrative);
        assert!(rendered.contains("competes with"));
    }

    #[test]
    fn narrative_includes_provenance_line() {
        let rendered = render(&doc(), OutputFormat::Narrative);
        assert!(rendered.contains("snapshot_id=7"));
    }

    #[test]
    fn json_is_valid_and_parseable() {
        let rendered = render(&doc(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["nodes"], 1);
    }

    #[test]
    fn json_carries_snapshot_id_and_ranking_weights() {
        let rendered = render(&doc(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["snapshot_id"], 7);
        assert_eq!(value["ranking_weights"]["alpha"], 0.5);
        assert_eq!(value["ranking_weights"]["beta"], 0.3);
        assert_eq!(value["ranking_weights"]["gamma"], 0.2);
    }
}
