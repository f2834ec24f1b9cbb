//! Session lifecycle: owns the single writable `KnowledgeGraph` and drives
//! it through the four-phase Exploration -> Grounding -> Reasoning ->
//! Synthesis cycle, mediating conflicts the tiered resolver couldn't settle
//! out to a human.

pub mod evidence;
pub mod session_api;

use std::sync::Arc;

use std::collections::HashMap;

use chrono::Utc;
use kg_axioms::{Axiom, AxiomJudge, MatchTarget};
use kg_conflict::TieredResolver;
use kg_core::{AxiomId, CoreError, CoreResult, EntityId, Timestamp};
use kg_graph::{EvidenceRecord, HumanDecision, KnowledgeGraph, Source};
use kg_mcts::{Mcts, MctsConfig};
use kg_resource::ResourceGovernor;
use kg_serializer::{GraphSerializer, OutputFormat, SerializeRequest, SerializedOutput};
use kg_tot::{NodeId, ThoughtTree};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use evidence::{IngestOutcome, IngestReport, StructuredTriplet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Exploration,
    Grounding,
    Reasoning,
    Synthesis,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Exploration => Phase::Grounding,
            Phase::Grounding => Phase::Reasoning,
            Phase::Reasoning => Phase::Synthesis,
            Phase::Synthesis => Phase::Exploration,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingIntervention {
    pub id: Uuid,
    pub conflict_id: kg_core::ConflictId,
    pub question: String,
    pub raised_at: Timestamp,
}

#[derive(Debug, Clone)]
pub enum PhaseOutcome {
    /// The phase ran to completion and the session moved to the next phase.
    Advanced,
    /// A recoverable error surfaced a question that needs a human call; the
    /// session stays on the current phase until it's resolved.
    Intervention(PendingIntervention),
    /// A recoverable error (resource exhaustion, timeout) meant the phase
    /// did less than requested, but the session still advances.
    Degraded { reason: String },
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub branching_factor: usize,
    pub max_tree_depth: usize,
    pub node_cap: usize,
    pub serializer_token_budget: usize,
    pub mcts: MctsConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            branching_factor: 5,
            max_tree_depth: 6,
            node_cap: kg_graph::DEFAULT_NODE_CAP,
            serializer_token_budget: 4000,
            mcts: MctsConfig::default(),
        }
    }
}

/// Owns every mutable piece of one research session. `graph`/`tree`/`mcts`
/// are each behind their own lock rather than one big lock, since
/// exploration reads the tree while grounding only touches the graph —
/// this mirrors the teacher's per-store locking rather than one coarse
/// mutex over everything.
pub struct Session {
    graph: Mutex<KnowledgeGraph>,
    tree: Mutex<ThoughtTree>,
    mcts: Mutex<Mcts>,
    axioms: Vec<Axiom>,
    governor: Arc<ResourceGovernor>,
    serializer: GraphSerializer,
    config: SessionConfig,
    phase: Mutex<Phase>,
    pending: Mutex<Vec<PendingIntervention>>,
}

impl Session {
    pub fn new(root_question: impl Into<String>, axioms: Vec<Axiom>, governor: Arc<ResourceGovernor>, config: SessionConfig) -> Self {
        let graph = KnowledgeGraph::with_capacity(Box::new(TieredResolver::default()), config.node_cap);
        let tree = ThoughtTree::new(root_question, config.branching_factor, config.max_tree_depth);
        Self {
            graph: Mutex::new(graph),
            tree: Mutex::new(tree),
            mcts: Mutex::new(Mcts::new(config.mcts)),
            axioms,
            governor,
            serializer: GraphSerializer::default(),
            config,
            phase: Mutex::new(Phase::Exploration),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    pub fn pending_interventions(&self) -> Vec<PendingIntervention> {
        self.pending.lock().clone()
    }

    fn advance(&self) {
        let mut phase = self.phase.lock();
        *phase = phase.next();
    }

    pub fn entity_count(&self) -> usize {
        self.graph.lock().entity_count()
    }

    pub fn snapshot_id(&self) -> kg_core::SnapshotId {
        self.graph.lock().snapshot_id()
    }

    pub fn root_node(&self) -> NodeId {
        self.tree.lock().root()
    }

    /// Exploration phase: selects the next node to expand via coverage-guided
    /// MCTS. Returns the selected node without expanding it — question
    /// generation for the actual expansion is an external (LLM) concern.
    pub fn explore(&self) -> CoreResult<(NodeId, PhaseOutcome)> {
        if self.phase() != Phase::Exploration {
            return Err(CoreError::InvalidInput("explore called outside the exploration phase".into()));
        }
        let tree = self.tree.lock();
        let graph = self.graph.lock();
        let mut mcts = self.mcts.lock();
        let selected = mcts.select(&tree, &graph, self.config.max_tree_depth, self.axioms.len());
        drop(mcts);
        drop(graph);
        drop(tree);
        self.advance();
        Ok((selected, PhaseOutcome::Advanced))
    }

    /// Expands `parent` with `question`, enforcing the tree's branch limit.
    /// A `BranchLimit` error is recoverable but has no useful "downgrade",
    /// so it's surfaced to the caller rather than silently swallowed.
    pub fn expand(&self, parent: NodeId, question: impl Into<String>) -> CoreResult<NodeId> {
        self.tree.lock().expand(parent, question)
    }

    fn axiom_priorities(&self) -> HashMap<AxiomId, u8> {
        self.axioms.iter().map(|a| (a.axiom_id.clone(), a.priority_clamped())).collect()
    }

    /// Scores a triplet's edge and both touched entities against the axiom
    /// set (spec §4.1's grounding-phase axiom allocation) and folds the
    /// result back into the graph, so `ClaimEdge::recompute_weight` and
    /// `Entity.axiom_alignment` reflect live axiom evaluation rather than
    /// their construction-time defaults.
    fn score_against_axioms(&self, graph: &mut KnowledgeGraph, edge_id: kg_core::EdgeId, triplet: &StructuredTriplet) {
        if self.axioms.is_empty() {
            return;
        }
        let judge = AxiomJudge;
        let priorities = self.axiom_priorities();

        let edge_target = MatchTarget::new(triplet.snippet.clone()).with_predicate(triplet.predicate.clone());
        let edge_result = judge.score(&edge_target, &self.axioms);
        let _ = graph.score_edge(&edge_id, edge_result.per_axiom, &priorities);

        for entity_id in [&triplet.subject, &triplet.object] {
            if let Some(entity) = graph.get_entity(entity_id) {
                let entity_target = MatchTarget::new(entity.axiom_text());
                let entity_result = judge.score(&entity_target, &self.axioms);
                let _ = graph.set_axiom_alignment(entity_id, entity_result.aggregate);
            }
        }
    }

    /// Grounding phase: folds structured triplets into the graph, routing
    /// any conflict that escalates past the tiered resolver into a pending
    /// intervention instead of failing the phase outright.
    pub fn ground(&self, triplets: Vec<StructuredTriplet>) -> CoreResult<(Vec<IngestReport>, PhaseOutcome)> {
        if self.phase() != Phase::Grounding {
            return Err(CoreError::InvalidInput("ground called outside the grounding phase".into()));
        }
        let mut graph = self.graph.lock();
        let mut reports = Vec::with_capacity(triplets.len());
        let mut raised: Option<PendingIntervention> = None;

        for triplet in triplets {
            graph.upsert_entity(triplet.subject.clone(), triplet.subject_type.clone(), triplet.confidence, triplet.source.clone())?;
            graph.upsert_entity(triplet.object.clone(), triplet.object_type.clone(), triplet.confidence, triplet.source.clone())?;
            if !graph.sources().contains(&triplet.source) {
                graph.register_source(Source::new(triplet.source.clone(), triplet.source.clone(), kg_graph::source::AUTHORITY_COMMUNITY, Utc::now()));
            }

            let edges_before = graph.edge_count();
            let edge_id = graph.add_claim(
                triplet.subject.clone(),
                triplet.predicate.clone(),
                triplet.object.clone(),
                triplet.confidence,
                EvidenceRecord {
                    source_id: triplet.source.clone(),
                    snippet: triplet.snippet.clone(),
                    timestamp: Utc::now(),
                    authority_tier: kg_graph::source::AUTHORITY_COMMUNITY,
                },
            )?;
            let was_merge = graph.edge_count() == edges_before;

            self.score_against_axioms(&mut graph, edge_id, &triplet);

            let conflict = graph.conflicts().find(|c| c.edge_a == edge_id || c.edge_b == edge_id).cloned();
            let outcome = match &conflict {
                None if was_merge => IngestOutcome::Merged,
                None => IngestOutcome::Inserted,
                Some(_) => IngestOutcome::Conflicted,
            };
            if let Some(c) = conflict.filter(|c| matches!(c.status, kg_graph::ConflictStatus::Escalated | kg_graph::ConflictStatus::BothDisputed)) {
                let intervention = PendingIntervention {
                    id: Uuid::new_v4(),
                    conflict_id: c.id,
                    question: format!("Competing claims about {} {}: which should stand?", triplet.subject, triplet.predicate),
                    raised_at: Utc::now(),
                };
                self.pending.lock().push(intervention.clone());
                raised.get_or_insert(intervention);
            }
            reports.push(IngestReport { outcome, edge_id: Some(edge_id) });
        }
        drop(graph);

        let outcome = match raised {
            Some(intervention) => PhaseOutcome::Intervention(intervention),
            None => {
                self.advance();
                PhaseOutcome::Advanced
            }
        };
        Ok((reports, outcome))
    }

    /// Records `node_id`'s answer along with the graph entities and axioms
    /// touched while producing it, so the coverage analyzer has real data to
    /// read instead of an empty default (spec §4.5).
    pub fn answer(&self, node_id: NodeId, answer: impl Into<String>, graph_entities: Vec<EntityId>, tested_axioms: HashMap<AxiomId, f32>) -> CoreResult<()> {
        self.tree.lock().answer(node_id, answer, graph_entities, tested_axioms)
    }

    /// Reasoning phase: scores `node_id` with the supplied evaluation input
    /// and backpropagates the value up its path.
    pub fn reason(&self, node_id: NodeId, input: kg_mcts::EvaluationInput) -> CoreResult<(f32, PhaseOutcome)> {
        if self.phase() != Phase::Reasoning {
            return Err(CoreError::InvalidInput("reason called outside the reasoning phase".into()));
        }
        let value = kg_mcts::evaluate(input);
        let path = self.tree.lock().path(node_id);
        self.mcts.lock().backprop(&path, value);
        self.advance();
        Ok((value, PhaseOutcome::Advanced))
    }

    /// Synthesis phase: serializes the graph neighborhood around `seed` for
    /// handoff to whatever consumes the session's output.
    pub fn synthesize(&self, seed: &str, format: OutputFormat) -> CoreResult<(SerializedOutput, PhaseOutcome)> {
        if self.phase() != Phase::Synthesis {
            return Err(CoreError::InvalidInput("synthesize called outside the synthesis phase".into()));
        }
        let graph = self.graph.lock();
        let request = SerializeRequest::new(seed, format, self.config.serializer_token_budget);
        let result = match self.serializer.serialize(&graph, &request) {
            Ok(output) => output,
            Err(CoreError::ResourceExhausted(reason)) => {
                warn!(%reason, "synthesis degraded under resource pressure");
                drop(graph);
                self.advance();
                return Ok((
                    SerializedOutput {
                        text: String::new(),
                        nodes: 0,
                        edges: 0,
                        truncated: true,
                    },
                    PhaseOutcome::Degraded { reason },
                ));
            }
            Err(e) => return Err(e),
        };
        drop(graph);
        self.advance();
        Ok((result, PhaseOutcome::Advanced))
    }

    /// Resolves a pending intervention with a human's decision, folding the
    /// outcome back into the graph and clearing it from the pending queue.
    pub fn resolve_intervention(&self, intervention_id: Uuid, decision: HumanDecision) -> CoreResult<()> {
        let mut pending = self.pending.lock();
        let idx = pending
            .iter()
            .position(|p| p.id == intervention_id)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown intervention {intervention_id}")))?;
        let intervention = pending.remove(idx);
        drop(pending);

        self.graph.lock().resolve_human(intervention.conflict_id, decision)?;
        info!(intervention_id = %intervention_id, "intervention resolved");
        Ok(())
    }

    pub fn governor(&self) -> &ResourceGovernor {
        &self.governor
    }

    pub fn graph_snapshot(&self) -> kg_graph::Snapshot {
        self.graph.lock().to_snapshot()
    }

    pub fn tot_snapshot(&self) -> Vec<kg_tot::ToTNode> {
        self.tree.lock().iter().cloned().collect()
    }

    /// Turns a pending intervention into an active research branch instead
    /// of a direct keep-A/keep-B call: expands the root with a templated
    /// question derived from the intervention and tags the new node as
    /// research, so exploration's coverage gap bonus is drawn toward it.
    pub fn escalate_to_research(&self, intervention_id: Uuid) -> CoreResult<()> {
        let mut pending = self.pending.lock();
        let idx = pending
            .iter()
            .position(|p| p.id == intervention_id)
            .ok_or_else(|| CoreError::InvalidInput(format!("unknown intervention {intervention_id}")))?;
        let intervention = pending.remove(idx);
        drop(pending);

        let mut tree = self.tree.lock();
        let root = tree.root();
        let node_id = tree.expand(root, intervention.question.clone())?;
        tree.mark_research(node_id)?;
        info!(intervention_id = %intervention_id, node_id = %node_id, "escalated intervention to an active research branch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kg_resource::NullVramProbe;

    fn session() -> Session {
        let axioms = vec![];
        let governor = Arc::new(ResourceGovernor::new(Box::new(NullVramProbe)));
        Session::new("what should we research?", axioms, governor, SessionConfig::default())
    }

    #[test]
    fn phases_cycle_through_all_four_in_order() {
        let s = session();
        assert_eq!(s.phase(), Phase::Exploration);
        s.explore().unwrap();
        assert_eq!(s.phase(), Phase::Grounding);
        s.ground(vec![]).unwrap();
        assert_eq!(s.phase(), Phase::Reasoning);
    }

    #[test]
    fn methods_reject_being_called_out_of_phase() {
        let s = session();
        let err = s.ground(vec![]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn grounding_inserts_entities_and_an_edge() {
        let s = session();
        s.explore().unwrap();
        let triplet = StructuredTriplet {
            subject: "acme".to_string(),
            subject_type: "company".to_string(),
            predicate: "competes_with".to_string(),
            object: "globex".to_string(),
            object_type: "company".to_string(),
            confidence: 0.8,
            source: "s1".to_string(),
            snippet: "acme competes with globex".to_string(),
        };
        let (reports, outcome) = s.ground(vec![triplet]).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(matches!(outcome, PhaseOutcome::Advanced));
        assert_eq!(s.entity_count(), 2);
    }

    #[test]
    fn escalated_conflict_raises_a_pending_intervention_and_holds_the_phase() {
        let s = session();
        s.explore().unwrap();
        let base = StructuredTriplet {
            subject: "acme".to_string(),
            subject_type: "company".to_string(),
            predicate: "headquartered_in".to_string(),
            object: "boston".to_string(),
            object_type: "city".to_string(),
            confidence: 0.8,
            source: "s1".to_string(),
            snippet: "x".to_string(),
        };
        let mut conflicting = base.clone();
        conflicting.object = "chicago".to_string();
        conflicting.source = "s2".to_string();

        s.ground(vec![base]).unwrap();
        assert_eq!(s.phase(), Phase::Reasoning);

        // Manually rewind to grounding to exercise a second, conflicting ground call.
        *session_phase_for_test(&s) = Phase::Grounding;
        let (_, outcome) = s.ground(vec![conflicting]).unwrap();
        assert!(matches!(outcome, PhaseOutcome::Intervention(_)));
        assert_eq!(s.phase(), Phase::Grounding, "phase should hold while an intervention is pending");
        assert_eq!(s.pending_interventions().len(), 1);
    }

    fn session_phase_for_test(s: &Session) -> parking_lot::MutexGuard<'_, Phase> {
        s.phase.lock()
    }

    #[test]
    fn regrounding_the_same_triplet_merges_instead_of_duplicating() {
        let s = session();
        s.explore().unwrap();
        let triplet = StructuredTriplet {
            subject: "acme".to_string(),
            subject_type: "company".to_string(),
            predicate: "competes_with".to_string(),
            object: "globex".to_string(),
            object_type: "company".to_string(),
            confidence: 0.5,
            source: "s1".to_string(),
            snippet: "acme competes with globex".to_string(),
        };
        let mut again = triplet.clone();
        again.source = "s2".to_string();
        again.confidence = 0.9;

        let (reports, _) = s.ground(vec![triplet, again]).unwrap();
        assert!(matches!(reports[0].outcome, IngestOutcome::Inserted));
        assert!(matches!(reports[1].outcome, IngestOutcome::Merged));
        assert_eq!(reports[0].edge_id, reports[1].edge_id);
    }

    #[test]
    fn grounding_scores_the_edge_and_entities_against_axioms() {
        use kg_axioms::{Axiom, AxiomMatcher};

        let axiom = Axiom {
            axiom_id: "competition".to_string(),
            name: "competition".to_string(),
            description: String::new(),
            priority: 5,
            matcher: AxiomMatcher {
                positive_terms: vec![],
                negative_terms: vec![],
                predicates: vec!["competes_with".to_string()],
                numeric_rules: vec![],
            },
        };
        let governor = Arc::new(ResourceGovernor::new(Box::new(NullVramProbe)));
        let s = Session::new("root question", vec![axiom], governor, SessionConfig::default());
        s.explore().unwrap();
        let triplet = StructuredTriplet {
            subject: "acme".to_string(),
            subject_type: "company".to_string(),
            predicate: "competes_with".to_string(),
            object: "globex".to_string(),
            object_type: "company".to_string(),
            confidence: 0.5,
            source: "s1".to_string(),
            snippet: "acme competes with globex".to_string(),
        };
        let (reports, _) = s.ground(vec![triplet]).unwrap();
        let edge_id = reports[0].edge_id.unwrap();

        let snapshot = s.graph_snapshot();
        let edge = snapshot.edges.iter().find(|e| e.id == edge_id).unwrap();
        assert_eq!(edge.axiom_scores["competition"], 1.0);
        assert!(edge.weight > 0.5);
    }

    #[test]
    fn answer_stores_entities_and_axioms_on_the_node() {
        let s = session();
        let root = s.root_node();
        let mut tested = std::collections::HashMap::new();
        tested.insert("ax1".to_string(), 0.8);
        s.answer(root, "42", vec!["acme".to_string()], tested.clone()).unwrap();
        let nodes = s.tot_snapshot();
        let node = nodes.iter().find(|n| n.id == root).unwrap();
        assert_eq!(node.graph_entities, vec!["acme".to_string()]);
        assert_eq!(node.tested_axioms, tested);
    }
}
