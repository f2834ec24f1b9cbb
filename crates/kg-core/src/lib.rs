//! Shared primitives for the reasoning core: ids, the one error type every
//! crate composes results over, a pluggable tokenizer for budget-aware
//! serialization, and a cooperative cancellation token.
//!
//! Nothing here owns state; it exists so `kg-graph`, `kg-tot`, `kg-mcts`, and
//! friends can hand errors and ids to each other without everyone depending
//! on everyone.

pub mod cancel;
pub mod digest;
pub mod tokenizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use cancel::CancelToken;
pub use tokenizer::{HeuristicTokenizer, Tokenizer};

/// Stable, user/LLM-assigned identity for a graph entity (spec: "stable string id").
pub type EntityId = String;

/// Runtime-assigned identity for a claim edge.
pub type EdgeId = Uuid;

/// Identity of a source (a URL or an upload id).
pub type SourceId = String;

/// Identity of a user-authored axiom.
pub type AxiomId = String;

/// Identity of a Tree-of-Thoughts / MCTS node.
pub type NodeId = Uuid;

/// Identity of a conflict record.
pub type ConflictId = Uuid;

/// Monotonically increasing snapshot id, bumped on every graph mutation.
///
/// Used both to reproduce serializer output deterministically and to
/// invalidate MCTS/coverage caches (global-on-write, see DESIGN.md).
pub type SnapshotId = u64;

pub type Timestamp = DateTime<Utc>;

/// The one error enum every core crate's public operations return through.
///
/// `Conflict` and `ResourceExhausted` are recoverable: the orchestrator
/// catches them and either degrades the phase or raises a pending
/// intervention. `Internal` is not recoverable and aborts the phase.
#[derive(Debug, thiserror::Error, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("graph capacity exceeded (cap={cap}, size={size})")]
    CapacityExceeded { cap: usize, size: usize },

    #[error("unresolved conflict: {0}")]
    Conflict(String),

    #[error("branch limit exceeded: {0}")]
    BranchLimit(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("schema validation failed: {0}")]
    Schema(String),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// `Cancelled` is never logged as a failure (spec §7); callers should
    /// check this before routing an error into a failure-count metric.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CoreError::Cancelled)
    }

    /// Recoverable errors are the ones a phase can degrade from rather than
    /// abort on (spec §7: "otherwise the phase degrades").
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Conflict(_) | CoreError::ResourceExhausted(_) | CoreError::Timeout(_)
        )
    }
}

/// Four-dimensional coverage score, shared between `kg-mcts` (which consumes
/// it for the selection gap bonus) and `kg-orchestrator` (which surfaces it
/// in coverage reports).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageScore {
    pub entity_density: f32,
    pub exploration_depth: f32,
    pub axiom_coverage: f32,
    pub neighbor_coverage: f32,
    pub overall: f32,
}

impl CoverageScore {
    pub const ZERO: CoverageScore = CoverageScore {
        entity_density: 0.0,
        exploration_depth: 0.0,
        axiom_coverage: 0.0,
        neighbor_coverage: 0.0,
        overall: 0.0,
    };

    /// `overall = 0.3*entity + 0.2*depth + 0.3*axiom + 0.2*neighbor` (spec §4.7).
    pub fn new(entity_density: f32, exploration_depth: f32, axiom_coverage: f32, neighbor_coverage: f32) -> Self {
        let overall = 0.3 * entity_density + 0.2 * exploration_depth + 0.3 * axiom_coverage + 0.2 * neighbor_coverage;
        Self {
            entity_density: entity_density.clamp(0.0, 1.0),
            exploration_depth: exploration_depth.clamp(0.0, 1.0),
            axiom_coverage: axiom_coverage.clamp(0.0, 1.0),
            neighbor_coverage: neighbor_coverage.clamp(0.0, 1.0),
            overall: overall.clamp(0.0, 1.0),
        }
    }
}

/// Clamp a signed score into `[-1, 1]` (weights, axiom scores) — the
/// recurring invariant of spec §8 property 1.
pub fn clamp_signed(v: f32) -> f32 {
    v.clamp(-1.0, 1.0)
}

/// Clamp an unsigned score into `[0, 1]` (confidences, coverage dimensions).
pub fn clamp_unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}
