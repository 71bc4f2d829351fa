//! Persistent knowledge store backed by redb.
//!
//! The store is a single redb file written once by [`DurableStore::create`]
//! and then opened read-mostly with [`DurableStore::open`]. Opening a missing
//! file fails immediately. Records are bincode-encoded and re-validated on
//! every read, so a malformed persisted position surfaces as
//! [`StoreError::Malformed`] instead of a wrong signed distance.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::entity::{Entity, EntityProfile, PropertyValue};
use crate::epa::{EpaValues, Ternary};
use crate::error::StoreError;
use crate::position::{Dimension, DimensionPosition, RawPosition, same_label};

use super::dataset::{AnchorRecord, KnowledgeBase};
use super::{
    AnchorId, AnchorLink, AnchorMember, Direction, KnowledgeStore, RelatedEntity, SearchFilter,
    StoreResult, inverse_name, rank_by_importance, relation_matches,
};

/// Entity id → encoded [`StoredProfile`].
const ENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("entities");
/// Title → entity id.
const TITLES: TableDefinition<&str, &str> = TableDefinition::new("titles");
/// Lower-cased label → encoded list of entity ids.
const LABELS: TableDefinition<&str, &[u8]> = TableDefinition::new("labels");
/// Source id → encoded outgoing edges.
const OUTGOING: TableDefinition<&str, &[u8]> = TableDefinition::new("links_out");
/// Target id → encoded incoming edges.
const INCOMING: TableDefinition<&str, &[u8]> = TableDefinition::new("links_in");
/// Anchor id → encoded [`AnchorRecord`].
const ANCHORS: TableDefinition<u64, &[u8]> = TableDefinition::new("anchors");
/// Entity id → encoded `(anchor id, weight)` list.
const ENTITY_ANCHORS: TableDefinition<&str, &[u8]> = TableDefinition::new("entity_anchors");
/// Anchor id → encoded `(entity id, weight)` list.
const ANCHOR_MEMBERS: TableDefinition<u64, &[u8]> = TableDefinition::new("anchor_members");
/// Dimension name → zero-state label.
const ZERO_STATES: TableDefinition<&str, &str> = TableDefinition::new("zero_states");

/// Tagged property value; bincode cannot decode the untagged JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
enum StoredValue {
    Text(String),
    List(Vec<String>),
}

/// Flat on-disk form of an [`EntityProfile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    entity: Entity,
    positions: Vec<(Dimension, i64, u32, Vec<String>, String)>,
    epa: (i64, i64, i64, f64),
    properties: Vec<(String, StoredValue)>,
}

impl From<&EntityProfile> for StoredProfile {
    fn from(profile: &EntityProfile) -> Self {
        Self {
            entity: profile.entity.clone(),
            positions: profile
                .positions()
                .cloned()
                .map(RawPosition::from)
                .map(|p| (p.dimension, p.path_sign, p.path_depth, p.path_nodes, p.zero_state))
                .collect(),
            epa: {
                let (e, p, a) = profile.epa.as_vector();
                (e, p, a, profile.epa.confidence())
            },
            properties: profile
                .properties
                .iter()
                .map(|(k, v)| {
                    let stored = match v {
                        PropertyValue::Text(s) => StoredValue::Text(s.clone()),
                        PropertyValue::List(items) => StoredValue::List(items.clone()),
                    };
                    (k.clone(), stored)
                })
                .collect(),
        }
    }
}

impl StoredProfile {
    /// Rebuild the profile, validating every persisted invariant.
    fn into_profile(self) -> StoreResult<EntityProfile> {
        let id = self.entity.id.to_string();
        let malformed = |reason: String| StoreError::Malformed {
            entity_id: id.clone(),
            reason,
        };

        let (e, p, a, confidence) = self.epa;
        let epa = EpaValues::new(
            Ternary::try_from(e).map_err(|err| malformed(err.to_string()))?,
            Ternary::try_from(p).map_err(|err| malformed(err.to_string()))?,
            Ternary::try_from(a).map_err(|err| malformed(err.to_string()))?,
            confidence,
        )
        .map_err(|err| malformed(err.to_string()))?;

        let mut profile = EntityProfile::new(self.entity).with_epa(epa);
        let mut seen = HashSet::new();
        for (dimension, path_sign, path_depth, path_nodes, zero_state) in self.positions {
            if !seen.insert(dimension) {
                return Err(malformed(format!("duplicate {dimension} position")));
            }
            let position = DimensionPosition::try_from(RawPosition {
                dimension,
                path_sign,
                path_depth,
                path_nodes,
                zero_state,
            })
            .map_err(|err| malformed(err.to_string()))?;
            profile = profile.with_position(position);
        }
        for (key, value) in self.properties {
            let value = match value {
                StoredValue::Text(s) => PropertyValue::Text(s),
                StoredValue::List(items) => PropertyValue::List(items),
            };
            profile = profile.with_property(key, value);
        }
        Ok(profile)
    }
}

/// Edge as stored under one endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEdge {
    other: String,
    relation: String,
    weight: f64,
}

fn redb_err<E: std::fmt::Display>(context: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("failed to encode record: {e}"),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("failed to decode record: {e}"),
    })
}

/// Persistent knowledge store using redb.
///
/// The database handle is acquired once at open time and released when the
/// store is dropped. Reads use MVCC snapshots.
pub struct DurableStore {
    db: Database,
    path: PathBuf,
}

impl DurableStore {
    /// Open an existing store. A missing file is an error, never an empty store.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if !path.exists() {
            return Err(StoreError::Missing {
                path: path.display().to_string(),
            });
        }
        let db = Database::open(path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", path.display()),
        })?;
        tracing::info!(path = %path.display(), "opened knowledge store");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    /// Write a validated dataset to a new store file, replacing any existing one.
    pub fn create(path: &Path, kb: &KnowledgeBase) -> StoreResult<Self> {
        kb.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io { source: e })?;
        }
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| StoreError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Redb {
            message: format!("failed to create redb at {}: {e}", path.display()),
        })?;
        let store = Self {
            db,
            path: path.to_path_buf(),
        };
        store.import(kb)?;
        tracing::info!(
            path = %path.display(),
            entities = kb.entities.len(),
            links = kb.links.len(),
            anchors = kb.anchors.len(),
            "created knowledge store"
        );
        Ok(store)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn import(&self, kb: &KnowledgeBase) -> StoreResult<()> {
        let mut labels: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut outgoing: BTreeMap<&str, Vec<StoredEdge>> = BTreeMap::new();
        let mut incoming: BTreeMap<&str, Vec<StoredEdge>> = BTreeMap::new();
        let mut entity_anchors: BTreeMap<&str, Vec<(AnchorId, f64)>> = BTreeMap::new();
        let mut anchor_members: BTreeMap<AnchorId, Vec<(String, f64)>> = BTreeMap::new();

        for profile in &kb.entities {
            labels
                .entry(profile.entity.label.to_lowercase())
                .or_default()
                .push(profile.entity.id.to_string());
        }
        for link in &kb.links {
            outgoing.entry(&link.source_id).or_default().push(StoredEdge {
                other: link.target_id.clone(),
                relation: link.relation.clone(),
                weight: link.weight,
            });
            incoming.entry(&link.target_id).or_default().push(StoredEdge {
                other: link.source_id.clone(),
                relation: link.relation.clone(),
                weight: link.weight,
            });
        }
        for m in &kb.entity_anchors {
            entity_anchors
                .entry(&m.entity_id)
                .or_default()
                .push((m.anchor_id, m.weight));
            anchor_members
                .entry(m.anchor_id)
                .or_default()
                .push((m.entity_id.clone(), m.weight));
        }
        for list in entity_anchors.values_mut() {
            list.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        for list in anchor_members.values_mut() {
            list.sort_by(|a, b| b.1.total_cmp(&a.1));
        }

        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        {
            let mut entities = txn.open_table(ENTITIES).map_err(redb_err("open_table"))?;
            let mut titles = txn.open_table(TITLES).map_err(redb_err("open_table"))?;
            for profile in &kb.entities {
                let bytes = encode(&StoredProfile::from(profile))?;
                entities
                    .insert(profile.entity.id.as_str(), bytes.as_slice())
                    .map_err(redb_err("insert"))?;
                titles
                    .insert(profile.entity.title.as_str(), profile.entity.id.as_str())
                    .map_err(redb_err("insert"))?;
            }

            let mut label_table = txn.open_table(LABELS).map_err(redb_err("open_table"))?;
            for (label, ids) in &labels {
                label_table
                    .insert(label.as_str(), encode(ids)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }

            let mut out_table = txn.open_table(OUTGOING).map_err(redb_err("open_table"))?;
            for (id, edges) in &outgoing {
                out_table
                    .insert(*id, encode(edges)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }
            let mut in_table = txn.open_table(INCOMING).map_err(redb_err("open_table"))?;
            for (id, edges) in &incoming {
                in_table
                    .insert(*id, encode(edges)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }

            let mut anchor_table = txn.open_table(ANCHORS).map_err(redb_err("open_table"))?;
            for anchor in &kb.anchors {
                anchor_table
                    .insert(anchor.id, encode(anchor)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }
            let mut ea_table = txn.open_table(ENTITY_ANCHORS).map_err(redb_err("open_table"))?;
            for (id, list) in &entity_anchors {
                ea_table
                    .insert(*id, encode(list)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }
            let mut am_table = txn.open_table(ANCHOR_MEMBERS).map_err(redb_err("open_table"))?;
            for (anchor, list) in &anchor_members {
                am_table
                    .insert(*anchor, encode(list)?.as_slice())
                    .map_err(redb_err("insert"))?;
            }

            let mut zero_table = txn.open_table(ZERO_STATES).map_err(redb_err("open_table"))?;
            for (dimension, label) in &kb.zero_states {
                zero_table
                    .insert(dimension.as_str(), label.as_str())
                    .map_err(redb_err("insert"))?;
            }
        }
        txn.commit().map_err(redb_err("commit"))?;
        Ok(())
    }

    /// Decode the value stored under `key` in a `&str`-keyed table.
    fn read<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StoreResult<Option<T>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let guard = table.get(key).map_err(redb_err("get"))?;
        guard.map(|g| decode(g.value())).transpose()
    }

    /// Decode the value stored under `key` in a `u64`-keyed table.
    fn read_by_anchor<T: DeserializeOwned>(
        &self,
        table: TableDefinition<u64, &[u8]>,
        key: AnchorId,
    ) -> StoreResult<Option<T>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let guard = table.get(key).map_err(redb_err("get"))?;
        guard.map(|g| decode(g.value())).transpose()
    }

    fn profile(&self, id: &str) -> StoreResult<Option<EntityProfile>> {
        self.read::<StoredProfile>(ENTITIES, id)?
            .map(StoredProfile::into_profile)
            .transpose()
    }

    /// Ids whose lower-cased label satisfies `accept`.
    fn ids_by_label(&self, accept: impl Fn(&str) -> bool) -> StoreResult<Vec<String>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(LABELS).map_err(redb_err("open_table"))?;
        let mut ids = Vec::new();
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (label, value) = entry.map_err(redb_err("iter"))?;
            if accept(label.value()) {
                ids.extend(decode::<Vec<String>>(value.value())?);
            }
        }
        Ok(ids)
    }

    fn profiles_for(&self, ids: Vec<String>) -> StoreResult<Vec<EntityProfile>> {
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.profile(&id)? {
                profiles.push(p);
            }
        }
        Ok(profiles)
    }

    fn collect_edges(
        &self,
        table: TableDefinition<&str, &[u8]>,
        id: &str,
        relation: Option<&str>,
        inverse: bool,
        limit: usize,
        out: &mut Vec<RelatedEntity>,
    ) -> StoreResult<()> {
        let edges: Vec<StoredEdge> = self.read(table, id)?.unwrap_or_default();
        for edge in edges
            .into_iter()
            .filter(|e| relation_matches(relation, &e.relation))
            .take(limit)
        {
            if let Some(profile) = self.profile(&edge.other)? {
                out.push(RelatedEntity {
                    profile,
                    relation: if inverse {
                        inverse_name(&edge.relation)
                    } else {
                        edge.relation
                    },
                    weight: edge.weight,
                    inverse,
                });
            }
        }
        Ok(())
    }
}

impl KnowledgeStore for DurableStore {
    fn get(&self, id: &str) -> StoreResult<Option<EntityProfile>> {
        self.profile(id)
    }

    fn get_by_title(&self, title: &str) -> StoreResult<Option<EntityProfile>> {
        let id = {
            let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
            let table = txn.open_table(TITLES).map_err(redb_err("open_table"))?;
            let guard = table.get(title).map_err(redb_err("get"))?;
            guard.map(|g| g.value().to_string())
        };
        match id {
            Some(id) => self.profile(&id),
            None => Ok(None),
        }
    }

    fn search_filtered(
        &self,
        label: &str,
        limit: usize,
        filter: SearchFilter,
    ) -> StoreResult<Vec<EntityProfile>> {
        let needle = label.to_lowercase();
        let ids = self.ids_by_label(|candidate| candidate.contains(&needle))?;
        let hits = self
            .profiles_for(ids)?
            .into_iter()
            .filter(|p| filter.admits(p))
            .collect();
        Ok(rank_by_importance(hits, limit))
    }

    fn search_exact(&self, label: &str, limit: usize) -> StoreResult<Vec<EntityProfile>> {
        let ids: Vec<String> = self
            .read(LABELS, &label.to_lowercase())?
            .unwrap_or_default();
        let hits = self
            .profiles_for(ids)?
            .into_iter()
            .filter(|p| same_label(&p.entity.label, label))
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
            self.collect_edges(OUTGOING, id, relation, false, limit, &mut related)?;
        }
        if direction.includes_incoming() {
            self.collect_edges(INCOMING, id, relation, true, limit, &mut related)?;
        }
        related.truncate(limit);
        Ok(related)
    }

    fn get_entity_anchors(&self, id: &str) -> StoreResult<Vec<AnchorLink>> {
        let memberships: Vec<(AnchorId, f64)> = self.read(ENTITY_ANCHORS, id)?.unwrap_or_default();
        let mut links = Vec::with_capacity(memberships.len());
        for (anchor_id, weight) in memberships {
            if let Some(anchor) = self.read_by_anchor::<AnchorRecord>(ANCHORS, anchor_id)? {
                links.push(AnchorLink {
                    anchor_id,
                    label: anchor.label,
                    category: anchor.category,
                    weight,
                });
            }
        }
        Ok(links)
    }

    fn get_entities_with_anchor(&self, anchor: AnchorId, limit: usize) -> StoreResult<Vec<AnchorMember>> {
        let members: Vec<(String, f64)> = self
            .read_by_anchor(ANCHOR_MEMBERS, anchor)?
            .unwrap_or_default();
        Ok(members
            .into_iter()
            .take(limit)
            .map(|(entity_id, weight)| AnchorMember { entity_id, weight })
            .collect())
    }

    fn get_zero_state(&self, dimension: Dimension) -> StoreResult<Option<String>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(ZERO_STATES).map_err(redb_err("open_table"))?;
        let guard = table.get(dimension.as_str()).map_err(redb_err("get"))?;
        Ok(guard.map(|g| g.value().to_string()))
    }

    fn get_all_zero_states(&self) -> StoreResult<BTreeMap<Dimension, String>> {
        let mut states = BTreeMap::new();
        for dimension in Dimension::ALL {
            if let Some(label) = self.get_zero_state(dimension)? {
                states.insert(dimension, label);
            }
        }
        Ok(states)
    }

    fn count(&self, max_vital_level: Option<u8>) -> StoreResult<usize> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(ENTITIES).map_err(redb_err("open_table"))?;
        if max_vital_level.is_none() {
            return Ok(table.len().map_err(redb_err("len"))? as usize);
        }
        let filter = SearchFilter { max_vital_level };
        let mut count = 0;
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (_, value) = entry.map_err(redb_err("iter"))?;
            let stored: StoredProfile = decode(value.value())?;
            if filter.admits(&EntityProfile::new(stored.entity)) {
                count += 1;
            }
        }
        Ok(count)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use tempfile::TempDir;

    fn dataset() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_entity(
            EntityProfile::new(Entity::new("Q90", "Paris").with_pagerank(0.9).with_vital_level(3))
                .with_position(
                    DimensionPosition::from_path(Dimension::Spatial, ["Earth", "Europe", "France", "Paris"]).unwrap(),
                )
                .with_epa(EpaValues::new(Ternary::Positive, Ternary::Neutral, Ternary::Negative, 0.7).unwrap())
                .with_property("nicknames", PropertyValue::List(vec!["City of Light".into()])),
        )
        .add_entity(EntityProfile::new(Entity::new("Q142", "France").with_pagerank(0.95).with_vital_level(2)))
        .link("Q90", "capital_of", "Q142", 1.0)
        .anchor(3, "Seine", Some("GEOGRAPHY"))
        .attach("Q90", 3, 0.6)
        .zero_state(Dimension::Spatial, "Earth");
        kb
    }

    #[test]
    fn missing_file_fails_fast() {
        let dir = TempDir::new().unwrap();
        let err = DurableStore::open(&dir.path().join("absent.redb")).unwrap_err();
        assert!(matches!(err, StoreError::Missing { .. }));
    }

    #[test]
    fn records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.redb");
        let kb = dataset();
        {
            DurableStore::create(&path, &kb).unwrap();
        }

        let store = DurableStore::open(&path).unwrap();
        let paris = store.get("Q90").unwrap().unwrap();
        assert_eq!(&paris, &kb.entities[0]);
        assert_eq!(paris.distance_from_zero(Dimension::Spatial), 3);

        assert_eq!(store.search_exact("paris", 5).unwrap().len(), 1);
        assert_eq!(store.search("r", 5).unwrap()[0].label(), "France");
        assert_eq!(store.get_by_title("France").unwrap().unwrap().id().as_str(), "Q142");

        let incoming = store.get_related("Q142", None, Direction::Incoming, 10).unwrap();
        assert_eq!(incoming[0].relation, "inverse_capital_of");
        assert_eq!(incoming[0].base_relation(), "capital_of");

        let anchors = store.get_entity_anchors("Q90").unwrap();
        assert_eq!(anchors[0].label, "Seine");
        assert_eq!(store.get_entities_with_anchor(3, 5).unwrap()[0].entity_id, "Q90");

        assert_eq!(store.get_zero_state(Dimension::Spatial).unwrap().as_deref(), Some("Earth"));
        assert_eq!(store.count(None).unwrap(), 2);
        assert_eq!(store.count(Some(2)).unwrap(), 1);
    }

    #[test]
    fn malformed_persisted_position_is_rejected_on_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kb.redb");
        let store = DurableStore::create(&path, &dataset()).unwrap();

        let bad = StoredProfile {
            entity: Entity::new("Q1", "Broken"),
            positions: vec![(Dimension::Spatial, 1, 7, vec!["Earth".into(), "Nowhere".into()], "Earth".into())],
            epa: (0, 0, 0, 1.0),
            properties: Vec::new(),
        };
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(ENTITIES).unwrap();
            table.insert("Q1", encode(&bad).unwrap().as_slice()).unwrap();
        }
        txn.commit().unwrap();

        assert!(matches!(store.get("Q1"), Err(StoreError::Malformed { .. })));
    }
}
