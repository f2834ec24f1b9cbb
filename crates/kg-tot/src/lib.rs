//! Tree of Thoughts: a branch-limited tree of reasoning nodes with an
//! idempotent expansion operation, so retried/duplicate LLM calls never fork
//! the tree twice for the same question.

use std::collections::HashMap;

use kg_core::{digest::fnv1a64, AxiomId, CoreError, CoreResult, EntityId, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    Open,
    Expanded,
    Answered,
    Pruned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToTNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub question: String,
    pub state: NodeState,
    /// Orthogonal to `state`: set when this node represents a branch that
    /// spawned active research, independent of whether it's since been
    /// answered or pruned.
    pub research: bool,
    pub answer: Option<String>,
    pub depth: usize,
    pub children: Vec<NodeId>,
    /// Graph entities this node's answer drew on, set by `answer` (spec
    /// §3/§4.5). Feeds `entity_density`/`neighbor_coverage`.
    pub graph_entities: Vec<EntityId>,
    /// Axioms matched while answering this node, with the score each one
    /// scored (spec §3/§4.5). Feeds `axiom_coverage`.
    pub tested_axioms: HashMap<AxiomId, f32>,
}

/// Idempotent tree of reasoning nodes, capped in branching factor and depth
/// (spec §4.2 "BranchLimit").
#[derive(Debug)]
pub struct ThoughtTree {
    nodes: HashMap<NodeId, ToTNode>,
    root: NodeId,
    branching_factor: usize,
    max_depth: usize,
    /// `(parent, fnv1a64(child_question))` -> already-created child, the
    /// idempotency key for `expand` (spec §8 property 9).
    expansion_keys: HashMap<(NodeId, u64), NodeId>,
}

impl ThoughtTree {
    pub fn new(root_question: impl Into<String>, branching_factor: usize, max_depth: usize) -> Self {
        let root_id = NodeId::new_v4();
        let root = ToTNode {
            id: root_id,
            parent: None,
            question: root_question.into(),
            state: NodeState::Open,
            research: false,
            answer: None,
            depth: 0,
            children: Vec::new(),
            graph_entities: Vec::new(),
            tested_axioms: HashMap::new(),
        };
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            branching_factor,
            max_depth,
            expansion_keys: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn branching_factor(&self) -> usize {
        self.branching_factor
    }

    pub fn get(&self, id: &NodeId) -> Option<&ToTNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create (or, if this exact `(parent, question)` pair was already
    /// expanded, return) a child node under `parent`.
    pub fn expand(&mut self, parent_id: NodeId, question: impl Into<String>) -> CoreResult<NodeId> {
        let question = question.into();
        let key = (parent_id, fnv1a64(&question));
        if let Some(&existing) = self.expansion_keys.get(&key) {
            return Ok(existing);
        }

        let parent = self.nodes.get(&parent_id).ok_or_else(|| CoreError::UnknownEntity(parent_id.to_string()))?;
        if parent.state == NodeState::Pruned {
            return Err(CoreError::InvalidInput(format!("cannot expand pruned node {parent_id}")));
        }
        if parent.children.len() >= self.branching_factor {
            return Err(CoreError::BranchLimit(format!("node {parent_id} already has {} children (limit {})", parent.children.len(), self.branching_factor)));
        }
        if parent.depth + 1 > self.max_depth {
            return Err(CoreError::BranchLimit(format!("max depth {} exceeded", self.max_depth)));
        }

        let child_id = NodeId::new_v4();
        let child = ToTNode {
            id: child_id,
            parent: Some(parent_id),
            question,
            state: NodeState::Open,
            research: false,
            answer: None,
            depth: parent.depth + 1,
            children: Vec::new(),
            graph_entities: Vec::new(),
            tested_axioms: HashMap::new(),
        };
        self.nodes.insert(child_id, child);
        self.nodes.get_mut(&parent_id).unwrap().children.push(child_id);
        if let Some(p) = self.nodes.get_mut(&parent_id) {
            if p.state == NodeState::Open {
                p.state = NodeState::Expanded;
            }
        }
        self.expansion_keys.insert(key, child_id);
        Ok(child_id)
    }

    /// Records a node's answer along with the graph entities it drew on and
    /// the axioms tested while producing it (spec §4.5), so the coverage
    /// analyzer can read real data off the node instead of an empty default.
    pub fn answer(&mut self, node_id: NodeId, answer: impl Into<String>, graph_entities: Vec<EntityId>, tested_axioms: HashMap<AxiomId, f32>) -> CoreResult<()> {
        let node = self.nodes.get_mut(&node_id).ok_or_else(|| CoreError::UnknownEntity(node_id.to_string()))?;
        if node.state == NodeState::Pruned {
            return Err(CoreError::InvalidInput(format!("cannot answer pruned node {node_id}")));
        }
        node.answer = Some(answer.into());
        node.state = NodeState::Answered;
        node.graph_entities = graph_entities;
        node.tested_axioms = tested_axioms;
        Ok(())
    }

    /// Prunes `node_id` and every descendant, since a pruned branch's
    /// children can no longer contribute to the tree either.
    pub fn prune(&mut self, node_id: NodeId) -> CoreResult<()> {
        if !self.nodes.contains_key(&node_id) {
            return Err(CoreError::UnknownEntity(node_id.to_string()));
        }
        let mut stack = vec![node_id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.state = NodeState::Pruned;
                stack.extend(node.children.clone());
            }
        }
        Ok(())
    }

    pub fn mark_research(&mut self, node_id: NodeId) -> CoreResult<()> {
        let node = self.nodes.get_mut(&node_id).ok_or_else(|| CoreError::UnknownEntity(node_id.to_string()))?;
        node.research = true;
        Ok(())
    }

    pub fn children(&self, node_id: &NodeId) -> Vec<&ToTNode> {
        self.nodes
            .get(node_id)
            .map(|n| n.children.iter().filter_map(|c| self.nodes.get(c)).collect())
            .unwrap_or_default()
    }

    /// The chain of node ids from the root down to `node_id`, inclusive.
    pub fn path(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = Some(node_id);
        while let Some(id) = current {
            path.push(id);
            current = self.nodes.get(&id).and_then(|n| n.parent);
        }
        path.reverse();
        path
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToTNode> {
        self.nodes.values()
    }
}
