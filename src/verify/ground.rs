//! Mention grounding: map a text span to the entity it most likely names.

use crate::entity::EntityProfile;
use crate::store::{KnowledgeStore, StoreResult};

const ARTICLES: [&str; 3] = ["the", "a", "an"];

/// Drop one leading article ("the", "a", "an"), case-insensitively.
pub fn strip_article(mention: &str) -> &str {
    let trimmed = mention.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) if ARTICLES.iter().any(|a| first.eq_ignore_ascii_case(a)) => rest.trim_start(),
        _ => trimmed,
    }
}

/// Upper-case the first letter of every word.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spellings to try for a mention, most specific first, without duplicates.
pub fn mention_variants(mention: &str) -> Vec<String> {
    let original = mention.trim();
    let normalized = strip_article(original);
    let candidates = if normalized != original {
        [normalized.to_string(), title_case(normalized), original.to_string()]
    } else {
        [original.to_string(), normalized.to_string(), title_case(normalized)]
    };
    let mut variants: Vec<String> = Vec::with_capacity(3);
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Resolves mentions against a store.
///
/// For each variant an exact label match is tried before a substring match;
/// the store ranks both by pagerank, so the first hit is the most important
/// candidate.
#[derive(Debug, Clone, Copy)]
pub struct Grounder<'s, S> {
    store: &'s S,
    limit: usize,
}

impl<'s, S: KnowledgeStore> Grounder<'s, S> {
    pub fn new(store: &'s S, limit: usize) -> Self {
        Self { store, limit }
    }

    pub fn ground(&self, mention: &str) -> StoreResult<Option<EntityProfile>> {
        for variant in mention_variants(mention) {
            if let Some(hit) = self.store.search_exact(&variant, self.limit)?.into_iter().next() {
                return Ok(Some(hit));
            }
            if let Some(hit) = self.store.search(&variant, self.limit)?.into_iter().next() {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::store::{KnowledgeBase, MemStore};

    #[test]
    fn articles_are_stripped_once() {
        assert_eq!(strip_article("the telephone"), "telephone");
        assert_eq!(strip_article("The  Louvre"), "Louvre");
        assert_eq!(strip_article("An apple"), "apple");
        assert_eq!(strip_article("Theodore"), "Theodore");
        assert_eq!(strip_article("the"), "the");
        assert_eq!(strip_article("a the b"), "the b");
    }

    #[test]
    fn variants_prefer_normalized_form() {
        assert_eq!(
            mention_variants("the eiffel tower"),
            vec!["eiffel tower", "Eiffel Tower", "the eiffel tower"]
        );
        assert_eq!(mention_variants("Paris"), vec!["Paris"]);
    }

    #[test]
    fn exact_match_beats_more_important_substring_match() {
        let mut kb = KnowledgeBase::new();
        kb.add_entity(EntityProfile::new(Entity::new("Q90", "Paris").with_pagerank(0.5)))
            .add_entity(EntityProfile::new(Entity::new("Q1", "Paris Saint-Germain").with_pagerank(0.9)))
            .add_entity(EntityProfile::new(Entity::new("Q17", "Telephone")));
        let store = MemStore::from_knowledge_base(kb).unwrap();
        let grounder = Grounder::new(&store, 5);

        assert_eq!(grounder.ground("paris").unwrap().unwrap().id().as_str(), "Q90");
        assert_eq!(grounder.ground("the telephone").unwrap().unwrap().id().as_str(), "Q17");
        assert_eq!(grounder.ground("Saint").unwrap().unwrap().id().as_str(), "Q1");
        assert!(grounder.ground("Xyzzy123").unwrap().is_none());
    }
}
