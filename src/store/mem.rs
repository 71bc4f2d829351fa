//! In-memory knowledge store.
//!
//! Indexes a validated [`KnowledgeBase`] into hash maps for point lookups.
//! Used for fixtures, tests and small embedded datasets. All data is lost on
//! process exit.

use std::collections::{BTreeMap, HashMap};

use crate::entity::EntityProfile;
use crate::position::{Dimension, same_label};

use super::dataset::{AnchorRecord, KnowledgeBase};
use super::{
    AnchorId, AnchorLink, AnchorMember, Direction, KnowledgeStore, RelatedEntity, SearchFilter,
    StoreResult, inverse_name, rank_by_importance, relation_matches,
};

/// Edge as indexed from one endpoint: `(other end, relation, weight)`.
type Edge = (String, String, f64);

/// Read-only in-memory store over a [`KnowledgeBase`].
#[derive(Debug, Default)]
pub struct MemStore {
    profiles: HashMap<String, EntityProfile>,
    titles: HashMap<String, String>,
    outgoing: HashMap<String, Vec<Edge>>,
    incoming: HashMap<String, Vec<Edge>>,
    anchors: HashMap<AnchorId, AnchorRecord>,
    entity_anchors: HashMap<String, Vec<(AnchorId, f64)>>,
    anchor_members: HashMap<AnchorId, Vec<(String, f64)>>,
    zero_states: BTreeMap<Dimension, String>,
}

impl MemStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and index a dataset.
    pub fn from_knowledge_base(kb: KnowledgeBase) -> StoreResult<Self> {
        kb.validate()?;
        let mut store = Self::new();

        for profile in kb.entities {
            let id = profile.entity.id.as_str().to_string();
            store.titles.insert(profile.entity.title.clone(), id.clone());
            store.profiles.insert(id, profile);
        }
        for link in kb.links {
            store.outgoing.entry(link.source_id.clone()).or_default().push((
                link.target_id.clone(),
                link.relation.clone(),
                link.weight,
            ));
            store
                .incoming
                .entry(link.target_id)
                .or_default()
                .push((link.source_id, link.relation, link.weight));
        }
        for anchor in kb.anchors {
            store.anchors.insert(anchor.id, anchor);
        }
        for membership in kb.entity_anchors {
            store
                .entity_anchors
                .entry(membership.entity_id.clone())
                .or_default()
                .push((membership.anchor_id, membership.weight));
            store
                .anchor_members
                .entry(membership.anchor_id)
                .or_default()
                .push((membership.entity_id, membership.weight));
        }
        for members in store.anchor_members.values_mut() {
            members.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        for anchors in store.entity_anchors.values_mut() {
            anchors.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        store.zero_states = kb.zero_states;

        tracing::debug!(
            entities = store.profiles.len(),
            anchors = store.anchors.len(),
            "indexed in-memory knowledge store"
        );
        Ok(store)
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn collect_edges(
        &self,
        edges: Option<&Vec<Edge>>,
        relation: Option<&str>,
        inverse: bool,
        limit: usize,
        out: &mut Vec<RelatedEntity>,
    ) {
        let Some(edges) = edges else { return };
        let matching = edges
            .iter()
            .filter(|(_, rel, _)| relation_matches(relation, rel))
            .take(limit);
        for (other, rel, weight) in matching {
            if let Some(profile) = self.profiles.get(other) {
                out.push(RelatedEntity {
                    profile: profile.clone(),
                    relation: if inverse { inverse_name(rel) } else { rel.clone() },
                    weight: *weight,
                    inverse,
                });
            }
        }
    }
}

impl KnowledgeStore for MemStore {
    fn get(&self, id: &str) -> StoreResult<Option<EntityProfile>> {
        Ok(self.profiles.get(id).cloned())
    }

    fn get_by_title(&self, title: &str) -> StoreResult<Option<EntityProfile>> {
        Ok(self
            .titles
            .get(title)
            .and_then(|id| self.profiles.get(id))
            .cloned())
    }

    fn search_filtered(
        &self,
        label: &str,
        limit: usize,
        filter: SearchFilter,
    ) -> StoreResult<Vec<EntityProfile>> {
        let needle = label.to_lowercase();
        let hits = self
            .profiles
            .values()
            .filter(|p| p.entity.label.to_lowercase().contains(&needle))
            .filter(|p| filter.admits(p))
            .cloned()
            .collect();
        Ok(rank_by_importance(hits, limit))
    }

    fn search_exact(&self, label: &str, limit: usize) -> StoreResult<Vec<EntityProfile>> {
        let hits = self
            .profiles
            .values()
            .filter(|p| same_label(&p.entity.label, label))
            .cloned()
            .collect();
        Ok(rank_by_importance(hits, limit))
    }

    fn get_related(
        &self,
        id: &str,
        relation: Option<&str>,
        direction: Direction,
        limit: usize,
    ) -> StoreResult<Vec<RelatedEntity>> {
        let mut related = Vec::new();
        if direction.includes_outgoing() {
            self.collect_edges(self.outgoing.get(id), relation, false, limit, &mut related);
        }
        if direction.includes_incoming() {
            self.collect_edges(self.incoming.get(id), relation, true, limit, &mut related);
        }
        related.truncate(limit);
        Ok(related)
    }

    fn get_entity_anchors(&self, id: &str) -> StoreResult<Vec<AnchorLink>> {
        let Some(memberships) = self.entity_anchors.get(id) else {
            return Ok(Vec::new());
        };
        Ok(memberships
            .iter()
            .filter_map(|(anchor_id, weight)| {
                self.anchors.get(anchor_id).map(|a| AnchorLink {
                    anchor_id: a.id,
                    label: a.label.clone(),
                    category: a.category.clone(),
                    weight: *weight,
                })
            })
            .collect())
    }

    fn get_entities_with_anchor(&self, anchor: AnchorId, limit: usize) -> StoreResult<Vec<AnchorMember>> {
        Ok(self
            .anchor_members
            .get(&anchor)
            .map(|members| {
                members
                    .iter()
                    .take(limit)
                    .map(|(entity_id, weight)| AnchorMember {
                        entity_id: entity_id.clone(),
                        weight: *weight,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_zero_state(&self, dimension: Dimension) -> StoreResult<Option<String>> {
        Ok(self.zero_states.get(&dimension).cloned())
    }

    fn get_all_zero_states(&self) -> StoreResult<BTreeMap<Dimension, String>> {
        Ok(self.zero_states.clone())
    }

    fn count(&self, max_vital_level: Option<u8>) -> StoreResult<usize> {
        let filter = SearchFilter { max_vital_level };
        Ok(self.profiles.values().filter(|p| filter.admits(p)).count())
    }
}
