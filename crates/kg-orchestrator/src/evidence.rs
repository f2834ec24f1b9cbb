//! External evidence ingestion: the seam through which extracted facts (from
//! an LLM pass, a file import, or a direct API call) enter the graph.

use async_trait::async_trait;
use kg_core::{CoreResult, EdgeId, EntityId, SourceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredTriplet {
    pub subject: EntityId,
    pub subject_type: String,
    pub predicate: String,
    pub object: EntityId,
    pub object_type: String,
    pub confidence: f32,
    pub source: SourceId,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngestOutcome {
    Inserted,
    Merged,
    Conflicted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub outcome: IngestOutcome,
    pub edge_id: Option<EdgeId>,
}

/// Implemented by whatever turns raw text or structured records into
/// `StructuredTriplet`s before they reach `Session::ground`.
#[async_trait]
pub trait EvidenceIngest: Send + Sync {
    async fn ingest_structured(&self, triplets: Vec<StructuredTriplet>) -> CoreResult<Vec<IngestReport>>;
    async fn ingest_text(&self, text: &str, source: SourceId) -> CoreResult<Vec<StructuredTriplet>>;
}

/// No-op ingest used for tests and offline demos: text ingestion yields
/// nothing, structured ingestion is a pass-through the caller applies
/// directly via `Session::ground`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvidenceIngest;

#[async_trait]
impl EvidenceIngest for NullEvidenceIngest {
    async fn ingest_structured(&self, triplets: Vec<StructuredTriplet>) -> CoreResult<Vec<IngestReport>> {
        Ok(triplets.iter().map(|_| IngestReport { outcome: IngestOutcome::Inserted, edge_id: None }).collect())
    }

    async fn ingest_text(&self, _text: &str, _source: SourceId) -> CoreResult<Vec<StructuredTriplet>> {
        Ok(Vec::new())
    }
}
