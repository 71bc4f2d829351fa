//! Two-layer spreading activation over the knowledge store.
//!
//! Activation starts at one or more source entities and decays outward
//! through two link layers:
//!
//! 1. **Direct relations**: each hop multiplies by `decay`, the relation's
//!    configured weight and the edge weight.
//! 2. **Anchors**: entities sharing a semantic anchor are linked across the
//!    graph; each hop multiplies by `anchor_decay`, the anchor weight and the
//!    co-member's weight, and accumulates into a per-category
//!    [`SemanticBank`] total on the target.
//!
//! Expansion is best-first. Per-query state lives in an arena of node
//! states indexed by position; the priority queue only holds arena
//! indices, so a queued entry can never diverge from the live best-known
//! state. Each entity is expanded at most once.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::time::{Duration, Instant};

use serde::{Deserialize, Deserializer, Serialize};

use crate::entity::{EntityId, EntityProfile};
use crate::error::SpreadError;
use crate::store::{Direction, KnowledgeStore};

/// Result type for spreading operations.
pub type SpreadResult<T> = std::result::Result<T, SpreadError>;

/// Marker prefix recorded in [`ActivationResult::relations`] for anchor hops.
pub const ANCHOR_RELATION_PREFIX: &str = "anchor:";

/// Tuning parameters for one spreading run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadingConfig {
    /// Per-hop multiplier for direct relations.
    pub decay: f64,
    /// Minimum activation to keep propagating or keep a result.
    pub threshold: f64,
    /// Hop limit from any source.
    pub max_depth: usize,
    pub max_results: usize,
    /// Enable the anchor layer.
    pub use_anchors: bool,
    /// Per-hop multiplier for anchor hops.
    pub anchor_decay: f64,
    /// Entities admitted per shared anchor.
    pub anchor_limit: usize,
    /// Anchors expanded per entity.
    pub max_anchors: usize,
    /// Outgoing relations fetched per expansion.
    pub relation_fanout: usize,
    /// Weight for relation names missing from `relation_weights`.
    pub default_relation_weight: f64,
    /// Per-relation weights, merged over the built-in table when deserialized.
    #[serde(deserialize_with = "merge_relation_weights")]
    pub relation_weights: BTreeMap<String, f64>,
}

impl Default for SpreadingConfig {
    fn default() -> Self {
        Self {
            decay: 0.7,
            threshold: 0.15,
            max_depth: 2,
            max_results: 50,
            use_anchors: true,
            anchor_decay: 0.4,
            anchor_limit: 5,
            max_anchors: 10,
            relation_fanout: 20,
            default_relation_weight: 0.5,
            relation_weights: default_relation_weights(),
        }
    }
}

fn default_relation_weights() -> BTreeMap<String, f64> {
    [
        ("same_as", 1.0),
        ("part_of", 0.9),
        ("located_in", 0.8),
        ("instance_of", 0.8),
        ("subclass_of", 0.7),
        ("capital_of", 0.8),
        ("created", 0.8),
        ("developed", 0.8),
        ("discovered", 0.8),
        ("invented", 0.8),
        ("wrote", 0.8),
        ("born_in", 0.7),
        ("worked_at", 0.7),
        ("awarded", 0.7),
        ("related_to", 0.5),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// A configured weight table overrides individual defaults; unnamed relations
/// keep their default weight.
fn merge_relation_weights<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<String, f64>::deserialize(deserializer)?;
    let mut weights = default_relation_weights();
    weights.extend(overrides);
    Ok(weights)
}

impl SpreadingConfig {
    /// Check value ranges.
    pub fn validate(&self) -> SpreadResult<()> {
        let invalid = |message: String| Err(SpreadError::InvalidConfig { message });
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return invalid(format!("decay must be in (0, 1], got {}", self.decay));
        }
        if !(self.anchor_decay > 0.0 && self.anchor_decay <= 1.0) {
            return invalid(format!("anchor_decay must be in (0, 1], got {}", self.anchor_decay));
        }
        if !(0.0..1.0).contains(&self.threshold) {
            return invalid(format!("threshold must be in [0, 1), got {}", self.threshold));
        }
        if self.max_results == 0 {
            return invalid("max_results must be positive".into());
        }
        if let Some((name, w)) = self
            .relation_weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return invalid(format!("relation weight for {name} must be non-negative, got {w}"));
        }
        if !self.default_relation_weight.is_finite() || self.default_relation_weight < 0.0 {
            return invalid(format!(
                "default_relation_weight must be non-negative, got {}",
                self.default_relation_weight
            ));
        }
        Ok(())
    }

    /// Weight for a relation name; unknown names get the default weight.
    pub fn relation_weight(&self, relation: &str) -> f64 {
        self.relation_weights
            .get(relation)
            .or_else(|| self.relation_weights.get(&relation.to_lowercase()))
            .copied()
            .unwrap_or(self.default_relation_weight)
    }
}

/// Category-specific accumulator for activation that arrived through anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticBank {
    Spatial,
    Temporal,
    Mental,
    Substantives,
}

impl SemanticBank {
    /// Bank fed by an anchor category. Unknown or missing categories feed MENTAL.
    pub fn from_category(category: Option<&str>) -> Self {
        match category.map(str::to_ascii_uppercase).as_deref() {
            Some("GEOGRAPHY") => Self::Spatial,
            Some("HISTORY") => Self::Temporal,
            Some("TYPE") => Self::Substantives,
            _ => Self::Mental,
        }
    }
}

/// One entity reached by a spreading run.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationResult {
    pub profile: EntityProfile,
    /// Best activation found, in (0, 1] for unit source activation.
    pub activation: f64,
    /// Entity ids from the source to this entity.
    pub path: Vec<EntityId>,
    /// Relation names traversed, `anchor:<label>` for anchor hops.
    pub relations: Vec<String>,
    /// Total activation received per bank through anchor hops.
    pub bank_activations: BTreeMap<SemanticBank, f64>,
}

impl ActivationResult {
    pub fn id(&self) -> &EntityId {
        self.profile.id()
    }

    /// Hops from the source.
    pub fn depth(&self) -> usize {
        self.relations.len()
    }

    /// Bank that received the most anchor activation, if any did.
    pub fn dominant_bank(&self) -> Option<SemanticBank> {
        self.bank_activations
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(bank, _)| *bank)
    }
}

/// Work bound for a single run. Exhausting it ends expansion early and
/// returns whatever was reached so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpreadBudget {
    /// Maximum number of entities expanded.
    pub max_expansions: Option<usize>,
    /// Wall-clock deadline.
    pub deadline: Option<Instant>,
}

impl SpreadBudget {
    /// No limits beyond depth and threshold.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Budget used by [`SpreadingActivation::spread`]: twice `max_results` expansions.
    pub fn for_config(config: &SpreadingConfig) -> Self {
        Self {
            max_expansions: Some(config.max_results.saturating_mul(2)),
            deadline: None,
        }
    }

    pub fn with_max_expansions(mut self, max: usize) -> Self {
        self.max_expansions = Some(max);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    fn exhausted(&self, expansions: usize) -> bool {
        self.max_expansions.is_some_and(|max| expansions >= max)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Per-entity state for one run.
#[derive(Debug)]
struct NodeState {
    id: EntityId,
    profile: Option<EntityProfile>,
    activation: f64,
    depth: usize,
    path: Vec<EntityId>,
    relations: Vec<String>,
    banks: BTreeMap<SemanticBank, f64>,
    source: bool,
    expanded: bool,
}

/// Max-heap entry: arena index ordered by the activation it was queued with.
#[derive(Debug, Clone, Copy)]
struct Queued {
    activation: f64,
    index: usize,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> Ordering {
        self.activation
            .total_cmp(&other.activation)
            .then_with(|| other.index.cmp(&self.index))
    }
}

/// Per-query mutable state.
#[derive(Debug, Default)]
struct SpreadContext {
    nodes: Vec<NodeState>,
    index: HashMap<EntityId, usize>,
    queue: BinaryHeap<Queued>,
    expansions: usize,
}

impl SpreadContext {
    /// Arena index for `id`, creating a blank state on first sight.
    fn intern(&mut self, id: &EntityId) -> usize {
        if let Some(&i) = self.index.get(id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(NodeState {
            id: id.clone(),
            profile: None,
            activation: 0.0,
            depth: 0,
            path: Vec::new(),
            relations: Vec::new(),
            banks: BTreeMap::new(),
            source: false,
            expanded: false,
        });
        self.index.insert(id.clone(), i);
        i
    }

    fn seed(&mut self, id: &EntityId, activation: f64) {
        let i = self.intern(id);
        let node = &mut self.nodes[i];
        node.source = true;
        node.path = vec![id.clone()];
        if activation > node.activation {
            node.activation = activation;
            self.queue.push(Queued { activation, index: i });
        }
    }

    /// Record a hop from `parent` to `child`. Returns true if the child's best
    /// activation improved.
    fn activate(&mut self, parent: usize, child: usize, activation: f64, relation: String) -> bool {
        if self.nodes[child].source || activation <= self.nodes[child].activation {
            return false;
        }
        let mut path = self.nodes[parent].path.clone();
        path.push(self.nodes[child].id.clone());
        let mut relations = self.nodes[parent].relations.clone();
        relations.push(relation);
        let depth = self.nodes[parent].depth + 1;

        let node = &mut self.nodes[child];
        node.activation = activation;
        node.depth = depth;
        node.path = path;
        node.relations = relations;
        if !node.expanded {
            self.queue.push(Queued { activation, index: child });
        }
        true
    }
}

/// Spreading-activation engine over a borrowed or owned store.
///
/// The engine itself is stateless between calls; every run owns its own
/// context.
pub struct SpreadingActivation<S> {
    store: S,
    config: SpreadingConfig,
}

impl<S: KnowledgeStore> SpreadingActivation<S> {
    /// Engine with the default configuration.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: SpreadingConfig::default(),
        }
    }

    /// Engine with a validated configuration.
    pub fn with_config(store: S, config: SpreadingConfig) -> SpreadResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &SpreadingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Spread from a single source with the configured anchor setting.
    pub fn spread(&self, source_id: &str, initial_activation: f64) -> SpreadResult<Vec<ActivationResult>> {
        self.spread_with(
            &[(source_id, initial_activation)],
            self.config.use_anchors,
            SpreadBudget::for_config(&self.config),
        )
    }

    /// Spread from several sources at once.
    pub fn spread_multiple(&self, sources: &[(&str, f64)]) -> SpreadResult<Vec<ActivationResult>> {
        self.spread_with(
            sources,
            self.config.use_anchors,
            SpreadBudget::for_config(&self.config),
        )
    }

    /// Full-control entry point: explicit anchor toggle and work budget.
    pub fn spread_with(
        &self,
        sources: &[(&str, f64)],
        use_anchors: bool,
        budget: SpreadBudget,
    ) -> SpreadResult<Vec<ActivationResult>> {
        if sources.is_empty() {
            return Err(SpreadError::NoSources);
        }

        let mut ctx = SpreadContext::default();
        for (id, activation) in sources {
            ctx.seed(&EntityId::from(*id), *activation);
        }

        while let Some(Queued { index, .. }) = ctx.queue.pop() {
            if ctx.nodes[index].expanded {
                continue;
            }
            if budget.exhausted(ctx.expansions) {
                tracing::debug!(
                    expansions = ctx.expansions,
                    reached = ctx.nodes.len(),
                    "spread budget exhausted, returning partial results"
                );
                break;
            }
            ctx.nodes[index].expanded = true;
            ctx.expansions += 1;

            let (activation, depth) = (ctx.nodes[index].activation, ctx.nodes[index].depth);
            if depth >= self.config.max_depth || activation < self.config.threshold {
                continue;
            }
            let id = ctx.nodes[index].id.clone();
            tracing::trace!(entity = %id, activation, depth, "expanding");

            self.expand_relations(&mut ctx, index, &id, activation)?;
            if use_anchors {
                self.expand_anchors(&mut ctx, index, &id, activation)?;
            }
        }

        let results = self.collect(ctx)?;
        tracing::debug!(
            sources = sources.len(),
            results = results.len(),
            use_anchors,
            "spread complete"
        );
        Ok(results)
    }

    /// Layer 1: outgoing relations.
    fn expand_relations(
        &self,
        ctx: &mut SpreadContext,
        index: usize,
        id: &EntityId,
        activation: f64,
    ) -> SpreadResult<()> {
        let related = self
            .store
            .get_related(id.as_str(), None, Direction::Outgoing, self.config.relation_fanout)?;
        for rel in related {
            let next = activation * self.config.decay * self.config.relation_weight(&rel.relation) * rel.weight;
            if next < self.config.threshold {
                continue;
            }
            let child = ctx.intern(rel.profile.id());
            if ctx.activate(index, child, next, rel.relation) {
                ctx.nodes[child].profile = Some(rel.profile);
            }
        }
        Ok(())
    }

    /// Layer 2: co-members of the entity's strongest anchors.
    fn expand_anchors(
        &self,
        ctx: &mut SpreadContext,
        index: usize,
        id: &EntityId,
        activation: f64,
    ) -> SpreadResult<()> {
        let anchors = self.store.get_entity_anchors(id.as_str())?;
        for anchor in anchors.into_iter().take(self.config.max_anchors) {
            let bank = SemanticBank::from_category(anchor.category.as_deref());
            let members = self
                .store
                .get_entities_with_anchor(anchor.anchor_id, self.config.anchor_limit)?;
            for member in members {
                if member.entity_id == id.as_str() {
                    continue;
                }
                let next = activation * self.config.anchor_decay * anchor.weight * member.weight;
                if next < self.config.threshold {
                    continue;
                }
                let child = ctx.intern(&EntityId::from(member.entity_id));
                if !ctx.nodes[child].source {
                    *ctx.nodes[child].banks.entry(bank).or_insert(0.0) += next;
                }
                ctx.activate(
                    index,
                    child,
                    next,
                    format!("{ANCHOR_RELATION_PREFIX}{}", anchor.label),
                );
            }
        }
        Ok(())
    }

    /// Ranked, source-free, bounded result list.
    fn collect(&self, ctx: SpreadContext) -> SpreadResult<Vec<ActivationResult>> {
        let mut reached: Vec<NodeState> = ctx
            .nodes
            .into_iter()
            .filter(|n| !n.source && n.activation > 0.0)
            .collect();
        reached.sort_by(|a, b| b.activation.total_cmp(&a.activation).then_with(|| a.id.cmp(&b.id)));

        let mut results = Vec::with_capacity(reached.len().min(self.config.max_results));
        for node in reached {
            if results.len() >= self.config.max_results {
                break;
            }
            let profile = match node.profile {
                Some(p) => p,
                None => match self.store.get(node.id.as_str())? {
                    Some(p) => p,
                    None => continue,
                },
            };
            results.push(ActivationResult {
                profile,
                activation: node.activation,
                path: node.path,
                relations: node.relations,
                bank_activations: node.banks,
            });
        }
        Ok(results)
    }

    /// Entities activated by all of `entity_ids` together at or above `threshold`.
    pub fn context_entities(
        &self,
        entity_ids: &[&str],
        threshold: f64,
        use_anchors: bool,
    ) -> SpreadResult<Vec<EntityProfile>> {
        let sources: Vec<(&str, f64)> = entity_ids.iter().map(|id| (*id, 1.0)).collect();
        let results = self.spread_with(&sources, use_anchors, SpreadBudget::for_config(&self.config))?;
        Ok(results
            .into_iter()
            .filter(|r| r.activation >= threshold)
            .map(|r| r.profile)
            .collect())
    }

    /// One-hop anchor neighbourhood of an entity.
    ///
    /// Each neighbour is scored `anchor_weight * member_weight` through the
    /// first anchor that reaches it, optionally restricted to one category.
    /// Returns `(profile, anchor label, activation)` strongest first.
    pub fn anchor_neighbors(
        &self,
        entity_id: &str,
        category: Option<&str>,
        limit: usize,
    ) -> SpreadResult<Vec<(EntityProfile, String, f64)>> {
        let mut seen = HashSet::new();
        let mut neighbors = Vec::new();
        for anchor in self.store.get_entity_anchors(entity_id)? {
            if category.is_some_and(|c| !anchor.in_category(c)) {
                continue;
            }
            for member in self.store.get_entities_with_anchor(anchor.anchor_id, 10)? {
                if member.entity_id == entity_id || !seen.insert(member.entity_id.clone()) {
                    continue;
                }
                if let Some(profile) = self.store.get(&member.entity_id)? {
                    neighbors.push((profile, anchor.label.clone(), anchor.weight * member.weight));
                }
            }
        }
        neighbors.sort_by(|a, b| b.2.total_cmp(&a.2));
        neighbors.truncate(limit);
        Ok(neighbors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::store::{KnowledgeBase, MemStore};

    fn entity(id: &str, label: &str) -> EntityProfile {
        EntityProfile::new(Entity::new(id, label))
    }

    /// A -> B -> C chain plus an anchor shared by A and D.
    fn chain() -> MemStore {
        let mut kb = KnowledgeBase::new();
        kb.add_entity(entity("A", "Alpha"))
            .add_entity(entity("B", "Beta"))
            .add_entity(entity("C", "Gamma"))
            .add_entity(entity("D", "Delta"))
            .add_entity(entity("E", "Epsilon"))
            .link("A", "part_of", "B", 1.0)
            .link("B", "part_of", "C", 1.0)
            .link("A", "mystery", "E", 1.0)
            .anchor(1, "Europe", Some("GEOGRAPHY"))
            .anchor(2, "Physics", Some("KNOWN_FOR"))
            .attach("A", 1, 1.0)
            .attach("D", 1, 1.0)
            .attach("A", 2, 1.0)
            .attach("D", 2, 0.5);
        MemStore::from_knowledge_base(kb).unwrap()
    }

    #[test]
    fn default_config_is_valid() {
        let config = SpreadingConfig::default();
        config.validate().unwrap();
        assert_eq!(config.relation_weight("part_of"), 0.9);
        assert_eq!(config.relation_weight("PART_OF"), 0.9);
        assert_eq!(config.relation_weight("never_heard_of"), 0.5);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SpreadingConfig {
            decay: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            SpreadingActivation::with_config(chain(), config),
            Err(SpreadError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn banks_from_categories() {
        assert_eq!(SemanticBank::from_category(Some("GEOGRAPHY")), SemanticBank::Spatial);
        assert_eq!(SemanticBank::from_category(Some("history")), SemanticBank::Temporal);
        assert_eq!(SemanticBank::from_category(Some("TYPE")), SemanticBank::Substantives);
        assert_eq!(SemanticBank::from_category(Some("SCOPE")), SemanticBank::Mental);
        assert_eq!(SemanticBank::from_category(None), SemanticBank::Mental);
    }

    #[test]
    fn direct_relations_decay_per_hop() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let results = engine.spread_with(&[("A", 1.0)], false, SpreadBudget::unlimited()).unwrap();

        let b = results.iter().find(|r| r.id().as_str() == "B").unwrap();
        assert!((b.activation - 0.7 * 0.9).abs() < 1e-9);
        assert_eq!(b.relations, vec!["part_of"]);

        let c = results.iter().find(|r| r.id().as_str() == "C").unwrap();
        assert!((c.activation - 0.63 * 0.63).abs() < 1e-9);
        let path: Vec<_> = c.path.iter().map(EntityId::as_str).collect();
        assert_eq!(path, vec!["A", "B", "C"]);
        assert_eq!(c.depth(), 2);

        // Unknown relation falls back to the default weight.
        let e = results.iter().find(|r| r.id().as_str() == "E").unwrap();
        assert!((e.activation - 0.35).abs() < 1e-9);
    }

    #[test]
    fn anchor_hops_fill_banks() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let results = engine.spread("A", 1.0).unwrap();

        let d = results.iter().find(|r| r.id().as_str() == "D").unwrap();
        assert!((d.activation - 0.4).abs() < 1e-9);
        assert_eq!(d.relations, vec!["anchor:Europe"]);
        assert!((d.bank_activations[&SemanticBank::Spatial] - 0.4).abs() < 1e-9);
        assert!((d.bank_activations[&SemanticBank::Mental] - 0.2).abs() < 1e-9);
        assert_eq!(d.dominant_bank(), Some(SemanticBank::Spatial));

        let without = engine.spread_with(&[("A", 1.0)], false, SpreadBudget::unlimited()).unwrap();
        assert!(without.iter().all(|r| r.id().as_str() != "D"));
    }

    #[test]
    fn results_exclude_sources_and_are_ranked() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let results = engine.spread_multiple(&[("A", 1.0), ("B", 1.0)]).unwrap();
        assert!(results.iter().all(|r| r.id().as_str() != "A" && r.id().as_str() != "B"));
        assert!(results.windows(2).all(|w| w[0].activation >= w[1].activation));
        let unique: HashSet<_> = results.iter().map(|r| r.id().clone()).collect();
        assert_eq!(unique.len(), results.len());
    }

    #[test]
    fn isolated_source_and_high_threshold_yield_nothing() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        assert!(engine.spread("C", 1.0).unwrap().is_empty());

        let strict = SpreadingConfig {
            threshold: 0.99,
            ..Default::default()
        };
        let engine = SpreadingActivation::with_config(&store, strict).unwrap();
        assert!(engine.spread("A", 1.0).unwrap().is_empty());
    }

    #[test]
    fn no_sources_is_an_error() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        assert!(matches!(
            engine.spread_multiple(&[]),
            Err(SpreadError::NoSources)
        ));
    }

    #[test]
    fn exhausted_budget_returns_partial_results() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        // One expansion: only the source is expanded, so C (two hops) is never reached.
        let partial = engine
            .spread_with(&[("A", 1.0)], true, SpreadBudget::unlimited().with_max_expansions(1))
            .unwrap();
        assert!(partial.iter().any(|r| r.id().as_str() == "B"));
        assert!(partial.iter().all(|r| r.id().as_str() != "C"));

        let none = engine
            .spread_with(&[("A", 1.0)], true, SpreadBudget::unlimited().with_max_expansions(0))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn expired_deadline_stops_before_any_expansion() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let expired = SpreadBudget::unlimited().with_timeout(Duration::ZERO);
        assert!(expired.deadline.is_some());
        let results = engine.spread_with(&[("A", 1.0)], true, expired).unwrap();
        assert!(results.is_empty());

        let generous = SpreadBudget::unlimited().with_timeout(Duration::from_secs(60));
        let results = engine.spread_with(&[("A", 1.0)], true, generous).unwrap();
        assert!(results.iter().any(|r| r.id().as_str() == "C"));
    }

    #[test]
    fn max_results_truncates() {
        let store = chain();
        let config = SpreadingConfig {
            max_results: 1,
            ..Default::default()
        };
        let engine = SpreadingActivation::with_config(&store, config).unwrap();
        let results = engine
            .spread_with(&[("A", 1.0)], true, SpreadBudget::unlimited())
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id().as_str(), "B");
    }

    #[test]
    fn anchor_neighbourhood() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let all = engine.anchor_neighbors("A", None, 10).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].1, "Europe");
        assert!((all[0].2 - 1.0).abs() < 1e-9);

        let known_for = engine.anchor_neighbors("A", Some("KNOWN_FOR"), 10).unwrap();
        assert_eq!(known_for[0].1, "Physics");
        assert!((known_for[0].2 - 0.5).abs() < 1e-9);
    }

    #[test]
    fn context_entities_apply_threshold() {
        let store = chain();
        let engine = SpreadingActivation::new(&store);
        let context = engine.context_entities(&["A"], 0.5, true).unwrap();
        let labels: Vec<_> = context.iter().map(EntityProfile::label).collect();
        assert_eq!(labels, vec!["Beta"]);
    }
}
