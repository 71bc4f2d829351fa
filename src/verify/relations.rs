//! Relation-name matching.
//!
//! Stored relation names come from several vocabularies (`invented`,
//! `inventor_of`, ConceptNet's `AtLocation`). Matching compares normalized
//! names: lower-cased with `_`, `-` and spaces removed.
//!
//! The generic `RelatedTo` relation is never part of a verb's table. It is
//! accepted only through [`RelationMatcher::classify`] when the generic
//! fallback is enabled, reported as [`RelationMatch::Generic`], and never
//! counts toward a contradiction.

use std::collections::HashSet;

/// Normalized name of the generic relation.
pub const GENERIC_RELATION: &str = "relatedto";

/// Normalized relation names that place an entity inside another.
const LOCATION_RELATIONS: &[&str] = &["atlocation", "partof", "locatedin", "isin", "in", "capitalof"];

/// Lower-case a relation name and drop `_`, `-` and spaces.
pub fn normalize_relation(relation: &str) -> String {
    relation
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Stored relation names that express a claimed verb.
///
/// Unknown verbs map to themselves.
pub fn relations_for_verb(verb: &str) -> Vec<String> {
    let verb = verb.to_lowercase();
    let table: &[&str] = match verb.as_str() {
        "created" => &["creator_of", "created", "invented"],
        "wrote" => &["author_of", "wrote"],
        "invented" => &["inventor_of", "invented", "created"],
        "developed" => &["developer_of", "developed", "created"],
        "discovered" => &["discoverer_of", "discovered"],
        "founded" => &["founder_of", "founded"],
        "built" => &["builder_of", "built", "constructed"],
        "capital" => &["capital_of", "AtLocation", "PartOf"],
        "located" => &["located_in", "part_of", "AtLocation", "PartOf"],
        _ => return vec![verb],
    };
    table.iter().map(|s| s.to_string()).collect()
}

/// Passive participle used in corrections ("was written by").
pub fn participle(verb: &str) -> &str {
    match verb {
        "wrote" => "written",
        other => other,
    }
}

/// Whether a relation places its source inside its target.
pub fn is_location_relation(relation: &str) -> bool {
    LOCATION_RELATIONS.contains(&normalize_relation(relation).as_str())
}

/// How a stored relation matched a claimed verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationMatch {
    /// The relation expresses the verb.
    Specific,
    /// Only the generic `RelatedTo` relation matched.
    Generic,
    None,
}

/// Matches stored relation names against one claimed verb.
#[derive(Debug, Clone)]
pub struct RelationMatcher {
    /// Lower-cased candidate names, for substring matching.
    candidates: Vec<String>,
    normalized: HashSet<String>,
    generic_fallback: bool,
}

impl RelationMatcher {
    pub fn for_verb(verb: &str, generic_fallback: bool) -> Self {
        let names = relations_for_verb(verb);
        Self {
            normalized: names.iter().map(|n| normalize_relation(n)).collect(),
            candidates: names.iter().map(|n| n.to_lowercase()).collect(),
            generic_fallback,
        }
    }

    /// Whether `relation` expresses the verb itself.
    pub fn matches_specific(&self, relation: &str) -> bool {
        let lower = relation.to_lowercase();
        self.normalized.contains(&normalize_relation(relation))
            || self.candidates.iter().any(|c| lower.contains(c.as_str()))
    }

    /// Classify a relation for supporting evidence.
    pub fn classify(&self, relation: &str) -> RelationMatch {
        if self.matches_specific(relation) {
            RelationMatch::Specific
        } else if self.generic_fallback && normalize_relation(relation) == GENERIC_RELATION {
            RelationMatch::Generic
        } else {
            RelationMatch::None
        }
    }
}
