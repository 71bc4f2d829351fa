//! Serializable knowledge-base dataset.
//!
//! A [`KnowledgeBase`] mirrors the persisted schema (entities with their
//! positions, EPA and properties; entity links; anchors and memberships;
//! dimension zero states). It is the input to both store backends and can be
//! loaded from JSON.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::EntityProfile;
use crate::error::StoreError;
use crate::position::Dimension;

use super::{AnchorId, StoreResult};

/// Directed, weighted relation between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_id: String,
    pub target_id: String,
    pub relation: String,
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

/// A dictionary-encoded semantic anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub id: AnchorId,
    pub label: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Membership of an entity in an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnchorRecord {
    pub entity_id: String,
    pub anchor_id: AnchorId,
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

/// Complete dataset for a knowledge store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub entities: Vec<EntityProfile>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub anchors: Vec<AnchorRecord>,
    #[serde(default)]
    pub entity_anchors: Vec<EntityAnchorRecord>,
    #[serde(default)]
    pub zero_states: BTreeMap<Dimension, String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a dataset from JSON.
    pub fn from_json_str(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization {
            message: format!("invalid knowledge base JSON: {e}"),
        })
    }

    /// Load a dataset from a JSON file.
    pub fn load_json(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::Missing {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Io { source: e })?;
        Self::from_json_str(&content)
    }

    /// Add an entity profile.
    pub fn add_entity(&mut self, profile: EntityProfile) -> &mut Self {
        self.entities.push(profile);
        self
    }

    /// Add a directed relation `source --relation--> target`.
    pub fn link(
        &mut self,
        source_id: impl Into<String>,
        relation: impl Into<String>,
        target_id: impl Into<String>,
        weight: f64,
    ) -> &mut Self {
        self.links.push(LinkRecord {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation: relation.into(),
            weight,
        });
        self
    }

    /// Declare an anchor.
    pub fn anchor(&mut self, id: AnchorId, label: impl Into<String>, category: Option<&str>) -> &mut Self {
        self.anchors.push(AnchorRecord {
            id,
            label: label.into(),
            category: category.map(str::to_string),
        });
        self
    }

    /// Attach an entity to an anchor.
    pub fn attach(&mut self, entity_id: impl Into<String>, anchor_id: AnchorId, weight: f64) -> &mut Self {
        self.entity_anchors.push(EntityAnchorRecord {
            entity_id: entity_id.into(),
            anchor_id,
            weight,
        });
        self
    }

    /// Set the zero state of a dimension.
    pub fn zero_state(&mut self, dimension: Dimension, label: impl Into<String>) -> &mut Self {
        self.zero_states.insert(dimension, label.into());
        self
    }

    /// Check referential integrity: unique entity and anchor ids, positions
    /// keyed by their own dimension, and every link or membership pointing at
    /// declared records.
    pub fn validate(&self) -> StoreResult<()> {
        let mut ids = HashSet::new();
        for profile in &self.entities {
            if !ids.insert(profile.entity.id.as_str()) {
                return Err(StoreError::Import {
                    message: format!("duplicate entity id {}", profile.entity.id),
                });
            }
            if let Some((key, position)) = profile
                .positions
                .iter()
                .find(|(key, position)| **key != position.dimension())
            {
                return Err(StoreError::Malformed {
                    entity_id: profile.entity.id.to_string(),
                    reason: format!("{} position stored under the {key} key", position.dimension()),
                });
            }
        }

        for link in &self.links {
            for end in [&link.source_id, &link.target_id] {
                if !ids.contains(end.as_str()) {
                    return Err(StoreError::Import {
                        message: format!(
                            "link {} -[{}]-> {} references unknown entity {end}",
                            link.source_id, link.relation, link.target_id
                        ),
                    });
                }
            }
        }

        let mut anchor_ids = HashSet::new();
        for anchor in &self.anchors {
            if !anchor_ids.insert(anchor.id) {
                return Err(StoreError::Import {
                    message: format!("duplicate anchor id {}", anchor.id),
                });
            }
        }

        for membership in &self.entity_anchors {
            if !ids.contains(membership.entity_id.as_str()) {
                return Err(StoreError::Import {
                    message: format!("anchor membership references unknown entity {}", membership.entity_id),
                });
            }
            if !anchor_ids.contains(&membership.anchor_id) {
                return Err(StoreError::Import {
                    message: format!("anchor membership references unknown anchor {}", membership.anchor_id),
                });
            }
        }
        Ok(())
    }
}
