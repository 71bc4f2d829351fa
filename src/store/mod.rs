//! Knowledge store contract and its two backends.
//!
//! The core never talks to storage directly: it consumes the narrow
//! [`KnowledgeStore`] lookup contract. Two implementations ship with the crate:
//!
//! - [`MemStore`]: an in-memory index over a [`KnowledgeBase`] dataset
//! - [`DurableStore`]: a redb file opened once and reused for point lookups
//!
//! Both validate persisted invariants when records are loaded, so callers
//! never see a malformed [`DimensionPosition`](crate::position::DimensionPosition).

pub mod dataset;
pub mod durable;
pub mod mem;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::EntityProfile;
use crate::error::StoreError;
use crate::position::Dimension;

pub use dataset::KnowledgeBase;
pub use durable::DurableStore;
pub use mem::MemStore;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Dictionary-encoded anchor identifier.
pub type AnchorId = u64;

/// Marker prepended to relation names on incoming edges.
pub const INVERSE_PREFIX: &str = "inverse_";

/// Which edges of an entity to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

impl Direction {
    fn includes_outgoing(self) -> bool {
        matches!(self, Self::Outgoing | Self::Both)
    }

    fn includes_incoming(self) -> bool {
        matches!(self, Self::Incoming | Self::Both)
    }
}

/// One neighbour returned by [`KnowledgeStore::get_related`].
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedEntity {
    /// The entity at the other end of the edge.
    pub profile: EntityProfile,
    /// Relation name; incoming edges carry the [`INVERSE_PREFIX`].
    pub relation: String,
    pub weight: f64,
    /// `true` when the edge points at the queried entity.
    pub inverse: bool,
}

impl RelatedEntity {
    /// Relation name with any inverse marker removed.
    pub fn base_relation(&self) -> &str {
        self.relation
            .strip_prefix(INVERSE_PREFIX)
            .unwrap_or(&self.relation)
    }
}

/// An anchor attached to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorLink {
    pub anchor_id: AnchorId,
    pub label: String,
    /// Anchor category such as `GEOGRAPHY` or `KNOWN_FOR`.
    pub category: Option<String>,
    pub weight: f64,
}

impl AnchorLink {
    /// Whether the anchor's category equals `category` (case-insensitive).
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(category))
    }
}

/// An entity sharing an anchor, with its membership weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorMember {
    pub entity_id: String,
    pub weight: f64,
}

/// Optional restrictions for label search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Only entities with `vital_level <= max_vital_level`.
    pub max_vital_level: Option<u8>,
}

impl SearchFilter {
    fn admits(&self, profile: &EntityProfile) -> bool {
        match self.max_vital_level {
            None => true,
            Some(max) => profile.entity.vital_level.is_some_and(|v| v <= max),
        }
    }
}

/// Lookup contract the grounding core consumes.
///
/// Every call is a synchronous point lookup. Implementations are reused
/// sequentially across calls; they are not required to be `Sync`.
pub trait KnowledgeStore {
    /// Entity by id.
    fn get(&self, id: &str) -> StoreResult<Option<EntityProfile>>;

    /// Entity by canonical title.
    fn get_by_title(&self, title: &str) -> StoreResult<Option<EntityProfile>>;

    /// Case-insensitive substring search on labels, most important first.
    fn search_filtered(
        &self,
        label: &str,
        limit: usize,
        filter: SearchFilter,
    ) -> StoreResult<Vec<EntityProfile>>;

    /// Case-insensitive exact label match, most important first.
    fn search_exact(&self, label: &str, limit: usize) -> StoreResult<Vec<EntityProfile>>;

    /// Neighbours along direct relations.
    fn get_related(
        &self,
        id: &str,
        relation: Option<&str>,
        direction: Direction,
        limit: usize,
    ) -> StoreResult<Vec<RelatedEntity>>;

    /// Anchors attached to an entity, strongest first.
    fn get_entity_anchors(&self, id: &str) -> StoreResult<Vec<AnchorLink>>;

    /// Entities sharing an anchor, strongest first.
    fn get_entities_with_anchor(&self, anchor: AnchorId, limit: usize) -> StoreResult<Vec<AnchorMember>>;

    /// Root label of a dimension.
    fn get_zero_state(&self, dimension: Dimension) -> StoreResult<Option<String>>;

    /// Root labels of every dimension that has one.
    fn get_all_zero_states(&self) -> StoreResult<BTreeMap<Dimension, String>>;

    /// Number of entities, optionally restricted to `vital_level <= max`.
    fn count(&self, max_vital_level: Option<u8>) -> StoreResult<usize>;

    /// Substring search without filters.
    fn search(&self, label: &str, limit: usize) -> StoreResult<Vec<EntityProfile>> {
        self.search_filtered(label, limit, SearchFilter::default())
    }
}

impl<S: KnowledgeStore + ?Sized> KnowledgeStore for &S {
    fn get(&self, id: &str) -> StoreResult<Option<EntityProfile>> {
        (**self).get(id)
    }

    fn get_by_title(&self, title: &str) -> StoreResult<Option<EntityProfile>> {
        (**self).get_by_title(title)
    }

    fn search_filtered(
        &self,
        label: &str,
        limit: usize,
        filter: SearchFilter,
    ) -> StoreResult<Vec<EntityProfile>> {
        (**self).search_filtered(label, limit, filter)
    }

    fn search_exact(&self, label: &str, limit: usize) -> StoreResult<Vec<EntityProfile>> {
        (**self).search_exact(label, limit)
    }

    fn get_related(
        &self,
        id: &str,
        relation: Option<&str>,
        direction: Direction,
        limit: usize,
    ) -> StoreResult<Vec<RelatedEntity>> {
        (**self).get_related(id, relation, direction, limit)
    }

    fn get_entity_anchors(&self, id: &str) -> StoreResult<Vec<AnchorLink>> {
        (**self).get_entity_anchors(id)
    }

    fn get_entities_with_anchor(&self, anchor: AnchorId, limit: usize) -> StoreResult<Vec<AnchorMember>> {
        (**self).get_entities_with_anchor(anchor, limit)
    }

    fn get_zero_state(&self, dimension: Dimension) -> StoreResult<Option<String>> {
        (**self).get_zero_state(dimension)
    }

    fn get_all_zero_states(&self) -> StoreResult<BTreeMap<Dimension, String>> {
        (**self).get_all_zero_states()
    }

    fn count(&self, max_vital_level: Option<u8>) -> StoreResult<usize> {
        (**self).count(max_vital_level)
    }
}

/// Order profiles by descending pagerank (ties by id for stable output) and truncate.
pub(crate) fn rank_by_importance(mut profiles: Vec<EntityProfile>, limit: usize) -> Vec<EntityProfile> {
    profiles.sort_by(|a, b| {
        b.entity
            .importance()
            .total_cmp(&a.entity.importance())
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });
    profiles.truncate(limit);
    profiles
}

/// Whether an edge's relation passes an optional exact relation filter.
pub(crate) fn relation_matches(filter: Option<&str>, relation: &str) -> bool {
    filter.is_none_or(|f| f == relation)
}

/// Tag an incoming relation name with the inverse marker.
pub(crate) fn inverse_name(relation: &str) -> String {
    format!("{INVERSE_PREFIX}{relation}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, EntityProfile};

    #[test]
    fn ranking_prefers_pagerank_and_treats_missing_as_zero() {
        let a = EntityProfile::new(Entity::new("Q1", "Paris").with_pagerank(0.2));
        let b = EntityProfile::new(Entity::new("Q2", "Paris Hilton").with_pagerank(0.5));
        let c = EntityProfile::new(Entity::new("Q3", "Paris, Texas"));
        let ranked = rank_by_importance(vec![a, c, b], 2);
        let ids: Vec<_> = ranked.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["Q2", "Q1"]);
    }

    #[test]
    fn base_relation_strips_inverse_marker() {
        let rel = RelatedEntity {
            profile: EntityProfile::new(Entity::new("Q1", "Bell")),
            relation: inverse_name("invented"),
            weight: 1.0,
            inverse: true,
        };
        assert_eq!(rel.relation, "inverse_invented");
        assert_eq!(rel.base_relation(), "invented");
    }

    #[test]
    fn vital_level_filter() {
        let filter = SearchFilter { max_vital_level: Some(2) };
        assert!(filter.admits(&EntityProfile::new(Entity::new("Q1", "A").with_vital_level(1))));
        assert!(!filter.admits(&EntityProfile::new(Entity::new("Q2", "B").with_vital_level(3))));
        assert!(!filter.admits(&EntityProfile::new(Entity::new("Q3", "C"))));
    }
}
