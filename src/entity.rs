//! Core entity types.
//!
//! An [`Entity`] is an immutable record loaded from the knowledge store. An
//! [`EntityProfile`] aggregates the entity with its dimension positions, EPA
//! coordinates and free-form properties; profiles are built per lookup and
//! owned by the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epa::EpaValues;
use crate::position::{Dimension, DimensionPosition};

/// Stable entity identifier (a Wikidata Q-number such as `Q90`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::borrow::Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A Wikipedia/Wikidata entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Canonical article title.
    pub title: String,
    /// Display name; may be ambiguous across entities.
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Importance tier, 1 is most important.
    #[serde(default)]
    pub vital_level: Option<u8>,
    /// Link-graph importance, used to rank ambiguous search results.
    #[serde(default)]
    pub pagerank: Option<f64>,
}

impl Entity {
    /// Create an entity whose title equals its label.
    pub fn new(id: impl Into<EntityId>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            id: id.into(),
            title: label.clone(),
            label,
            description: None,
            vital_level: None,
            pagerank: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_vital_level(mut self, level: u8) -> Self {
        self.vital_level = Some(level);
        self
    }

    pub fn with_pagerank(mut self, pagerank: f64) -> Self {
        self.pagerank = Some(pagerank);
        self
    }

    /// Ranking key for search results: missing pagerank counts as 0.
    pub fn importance(&self) -> f64 {
        self.pagerank.unwrap_or(0.0)
    }
}

/// A property value: a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

impl PropertyValue {
    /// Case-insensitive substring test over the value (any element for lists).
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        match self {
            Self::Text(s) => s.to_lowercase().contains(&needle),
            Self::List(items) => items.iter().any(|s| s.to_lowercase().contains(&needle)),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => f.write_str(&items.join(", ")),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Complete grounding information for one entity.
///
/// Holds at most one position per dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityProfile {
    pub entity: Entity,
    #[serde(default)]
    pub(crate) positions: BTreeMap<Dimension, DimensionPosition>,
    #[serde(default)]
    pub epa: EpaValues,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl EntityProfile {
    /// Profile with no positions, neutral EPA and no properties.
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            positions: BTreeMap::new(),
            epa: EpaValues::default(),
            properties: BTreeMap::new(),
        }
    }

    /// Set the position for its dimension, replacing any previous one.
    pub fn with_position(mut self, position: DimensionPosition) -> Self {
        self.positions.insert(position.dimension(), position);
        self
    }

    pub fn with_epa(mut self, epa: EpaValues) -> Self {
        self.epa = epa;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &EntityId {
        &self.entity.id
    }

    pub fn label(&self) -> &str {
        &self.entity.label
    }

    /// All positions in dimension order.
    pub fn positions(&self) -> impl Iterator<Item = &DimensionPosition> {
        self.positions.values()
    }

    /// One-line human-readable summary: label, id, EPA and up to three positions.
    pub fn summary(&self) -> String {
        let (e, p, a) = self.epa.as_vector();
        let dims: Vec<String> = self.positions().take(3).map(ToString::to_string).collect();
        format!(
            "{} ({}): E={e:+} P={p:+} A={a:+} | {}",
            self.entity.label,
            self.entity.id,
            dims.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_position_per_dimension() {
        let first = DimensionPosition::from_path(Dimension::Spatial, ["Earth", "Europe"]).unwrap();
        let second = DimensionPosition::from_path(Dimension::Spatial, ["Earth", "Asia"]).unwrap();
        let p = EntityProfile::new(Entity::new("Q1", "X"))
            .with_position(first)
            .with_position(second);
        assert_eq!(p.positions().count(), 1);
        assert!(p.is_descendant_of("Asia", Dimension::Spatial));
    }

    #[test]
    fn summary_lists_positions() {
        let p = EntityProfile::new(Entity::new("Q90", "Paris")).with_position(
            DimensionPosition::from_path(Dimension::Spatial, ["Earth", "Europe", "France", "Paris"]).unwrap(),
        );
        assert_eq!(
            p.summary(),
            "Paris (Q90): E=+0 P=+0 A=+0 | +3:SPATIAL/Earth/Europe/France/Paris"
        );
    }

    #[test]
    fn property_mentions() {
        let list = PropertyValue::List(vec!["physicist".into(), "philosopher".into()]);
        assert!(list.mentions("Physicist"));
        assert!(!list.mentions("chemist"));
        assert_eq!(list.to_string(), "physicist, philosopher");
    }

    #[test]
    fn profile_json_round_trip_keeps_positions() {
        let p = EntityProfile::new(Entity::new("Q90", "Paris").with_pagerank(0.9))
            .with_position(DimensionPosition::from_path(Dimension::Spatial, ["Earth", "France", "Paris"]).unwrap())
            .with_property("population", "2.1 million");
        let json = serde_json::to_string(&p).unwrap();
        let back: EntityProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
