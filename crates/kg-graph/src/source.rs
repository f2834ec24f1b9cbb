//! Sources: where a claim came from, and how much we trust that class of
//! source (spec §3 "Source", glossary "Authority tier").

use kg_core::{SourceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fixed mapping from source class to trust weight: official → social.
pub const AUTHORITY_OFFICIAL: f32 = 1.0;
pub const AUTHORITY_ESTABLISHED: f32 = 0.9;
pub const AUTHORITY_COMMUNITY: f32 = 0.7;
pub const AUTHORITY_SOCIAL: f32 = 0.5;

/// A registered evidence source. Created on ingest, never mutated
/// afterward (spec §3 lifecycle).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub uri: String,
    pub authority_tier: f32,
    pub timestamp: Timestamp,
}

impl Source {
    pub fn new(id: impl Into<SourceId>, uri: impl Into<String>, authority_tier: f32, timestamp: Timestamp) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            authority_tier: snap_to_tier(authority_tier),
            timestamp,
        }
    }
}

/// Snap an arbitrary authority value to the nearest of the four fixed tiers,
/// so callers can pass a rough class ("official", "social", ...) through a
/// float without needing the exact constant.
pub fn snap_to_tier(raw: f32) -> f32 {
    const TIERS: [f32; 4] = [AUTHORITY_SOCIAL, AUTHORITY_COMMUNITY, AUTHORITY_ESTABLISHED, AUTHORITY_OFFICIAL];
    TIERS
        .iter()
        .copied()
        .min_by(|a, b| (a - raw).abs().partial_cmp(&(b - raw).abs()).unwrap())
        .unwrap_or(AUTHORITY_SOCIAL)
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SourceRegistry {
    sources: HashMap<SourceId, Source>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Source) {
        self.sources.insert(source.id.clone(), source);
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_nearest_tier() {
        assert_eq!(snap_to_tier(0.95), AUTHORITY_OFFICIAL);
        assert_eq!(snap_to_tier(0.82), AUTHORITY_ESTABLISHED);
        assert_eq!(snap_to_tier(0.63), AUTHORITY_COMMUNITY);
    }
}
