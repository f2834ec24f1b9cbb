//! The external session API: the thin, serializable surface a CLI or future
//! server process drives a session through, as opposed to `Session`'s
//! richer in-process methods.

use std::sync::Arc;

use kg_axioms::Axiom;
use kg_core::{CoreResult, CoverageScore, SnapshotId};
use kg_graph::{HumanDecision, Snapshot};
use kg_resource::ResourceGovernor;
use kg_tot::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Phase, Session, SessionConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub node_id: NodeId,
    pub score: CoverageScore,
    pub snapshot_id: SnapshotId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRequest {
    pub intervention_id: Uuid,
    #[serde(rename = "decision")]
    pub resolution: ResolutionChoice,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum ResolutionChoice {
    KeepA,
    KeepB,
    BothDisputed,
    EscalateResearch,
}

/// Wraps `Session` with a request/response-shaped API: every call takes and
/// returns serializable types, so it maps directly onto whatever transport
/// eventually sits in front of it (the session server itself is out of
/// scope here — see `kg-cli` for the in-process demo).
pub struct SessionApi {
    session: Session,
}

impl SessionApi {
    pub fn create(root_question: impl Into<String>, axioms: Vec<Axiom>, governor: Arc<ResourceGovernor>, config: SessionConfig) -> Self {
        Self {
            session: Session::new(root_question, axioms, governor, config),
        }
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    /// Advances exploration and returns the node MCTS selected next.
    pub fn advance_mcts(&self) -> CoreResult<NodeId> {
        let (node_id, _) = self.session.explore()?;
        Ok(node_id)
    }

    pub fn expand_node(&self, parent: NodeId, question: impl Into<String>) -> CoreResult<NodeId> {
        self.session.expand(parent, question)
    }

    pub fn ground(&self, triplets: Vec<crate::evidence::StructuredTriplet>) -> CoreResult<Vec<crate::evidence::IngestReport>> {
        let (reports, _) = self.session.ground(triplets)?;
        Ok(reports)
    }

    pub fn reason(&self, node_id: NodeId, input: kg_mcts::EvaluationInput) -> CoreResult<f32> {
        let (value, _) = self.session.reason(node_id, input)?;
        Ok(value)
    }

    pub fn synthesize(&self, seed: &str, format: kg_serializer::OutputFormat) -> CoreResult<String> {
        let (output, _) = self.session.synthesize(seed, format)?;
        Ok(output.text)
    }

    pub fn graph_snapshot(&self) -> Snapshot {
        self.session.graph_snapshot()
    }

    pub fn tot_snapshot(&self) -> Vec<kg_tot::ToTNode> {
        self.session.tot_snapshot()
    }

    pub fn pending_interventions(&self) -> Vec<crate::PendingIntervention> {
        self.session.pending_interventions()
    }

    pub fn resolve_intervention(&self, request: InterventionRequest) -> CoreResult<()> {
        match request.resolution {
            ResolutionChoice::KeepA => self.session.resolve_intervention(request.intervention_id, HumanDecision::KeepA),
            ResolutionChoice::KeepB => self.session.resolve_intervention(request.intervention_id, HumanDecision::KeepB),
            ResolutionChoice::BothDisputed => self.session.resolve_intervention(request.intervention_id, HumanDecision::BothDisputed),
            ResolutionChoice::EscalateResearch => self.session.escalate_to_research(request.intervention_id),
        }
    }
}
