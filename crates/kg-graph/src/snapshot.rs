//! Snapshot JSON: the external, versioned serialization of a graph (spec §6
//! "Snapshot JSON schema").

use kg_core::{SnapshotId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::conflict::Conflict;
use crate::edge::ClaimEdge;
use crate::entity::Entity;
use crate::source::Source;

pub const SCHEMA_VERSION: u32 = 1;

/// `merge_policy` records which confidence-combination formula
/// `Entity::merge_evidence` implements, so a consumer reading the snapshot
/// doesn't have to guess (spec §9 open question (a): inverse-variance vs
/// max-authority vs weighted average — this engine uses a weighted average
/// toward the new observation, discounted by existing corroboration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub merge_policy: String,
}

impl Default for SnapshotMeta {
    fn default() -> Self {
        Self {
            merge_policy: "confidence_weighted_average".to_string(),
        }
    }
}

/// `{schema_version, snapshot_id, created_at, entities, edges, sources,
/// conflicts, meta}` exactly as spec §6 defines it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema_version: u32,
    pub snapshot_id: SnapshotId,
    pub created_at: Timestamp,
    pub entities: Vec<Entity>,
    pub edges: Vec<ClaimEdge>,
    pub sources: Vec<Source>,
    pub conflicts: Vec<Conflict>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    pub fn new(
        snapshot_id: SnapshotId,
        entities: Vec<Entity>,
        edges: Vec<ClaimEdge>,
        sources: Vec<Source>,
        conflicts: Vec<Conflict>,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            snapshot_id,
            created_at: chrono::Utc::now(),
            entities,
            edges,
            sources,
            conflicts,
            meta: SnapshotMeta::default(),
        }
    }

    pub fn to_json(&self) -> kg_core::CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| kg_core::CoreError::Schema(e.to_string()))
    }

    pub fn from_json(data: &str) -> kg_core::CoreResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(data).map_err(|e| kg_core::CoreError::Schema(e.to_string()))?;
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(kg_core::CoreError::Schema(format!(
                "unsupported snapshot schema_version {}, expected {}",
                snapshot.schema_version, SCHEMA_VERSION
            )));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let snapshot = Snapshot::new(7, Vec::new(), Vec::new(), Vec::new(), Vec::new());
        let json = snapshot.to_json().unwrap();
        let restored = Snapshot::from_json(&json).unwrap();
        assert_eq!(restored.snapshot_id, 7);
        assert_eq!(restored.meta.merge_policy, "confidence_weighted_average");
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let mut snapshot = Snapshot::new(1, Vec::new(), Vec::new(), Vec::new(), Vec::new());
        snapshot.schema_version = 99;
        let json = snapshot.to_json().unwrap();
        assert!(Snapshot::from_json(&json).is_err());
    }
}
