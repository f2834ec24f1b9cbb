//! Graph nodes: entities with source-attributed confidence.

use kg_core::{clamp_unit, EntityId, SourceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A node in the knowledge graph (spec §3: "Entity (graph node)").
///
/// Invariant: `confidence` is monotonically updated only through
/// `merge_evidence` — nothing else in this crate writes to it directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub confidence: f32,
    pub sources: BTreeSet<SourceId>,
    pub created_at: Timestamp,
    /// Derived: set by whoever scores this entity against the axiom set.
    pub axiom_alignment: f32,
    /// Derived: true once any edge touching this entity is disputed.
    pub disputed: bool,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, entity_type: impl Into<String>, confidence: f32, source: SourceId) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source);
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            confidence: clamp_unit(confidence),
            sources,
            created_at: chrono::Utc::now(),
            axiom_alignment: 0.0,
            disputed: false,
        }
    }

    /// The only path by which `confidence` may change: folding in another
    /// observation of the same entity. Confidence moves toward the new
    /// observation, weighted by how many sources already back the entity —
    /// more corroboration means a single new claim moves confidence less.
    pub fn merge_evidence(&mut self, observed_confidence: f32, source: SourceId) {
        let n = self.sources.len().max(1) as f32;
        self.confidence = clamp_unit((self.confidence * n + clamp_unit(observed_confidence)) / (n + 1.0));
        self.sources.insert(source);
    }

    /// Text used for axiom keyword matching: type + id + source list, since
    /// entities don't carry free-form attributes in this model.
    pub fn axiom_text(&self) -> String {
        format!("{} {} {}", self.entity_type, self.id, self.sources.iter().cloned().collect::<Vec<_>>().join(" "))
    }
}

/// Columnar-ish entity storage: a flat map plus a type index, sized for the
/// low-thousands node caps this engine runs under (spec §4.1
/// `CapacityExceeded`) rather than the millions-of-rows bitmap indexing a
/// larger store would need.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EntityStore {
    entities: HashMap<EntityId, Entity>,
    by_type: HashMap<String, BTreeSet<EntityId>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn insert(&mut self, entity: Entity) {
        self.by_type
            .entry(entity.entity_type.clone())
            .or_default()
            .insert(entity.id.clone());
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        if let Some(set) = self.by_type.get_mut(&entity.entity_type) {
            set.remove(id);
        }
        Some(entity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn by_type(&self, entity_type: &str) -> impl Iterator<Item = &Entity> {
        self.by_type
            .get(entity_type)
            .into_iter()
            .flatten()
            .filter_map(move |id| self.entities.get(id))
    }
}
