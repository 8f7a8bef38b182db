//! Query → relevant categories.
//!
//! Two passes over the registry: keyword/token equality, then entity
//! substring matching. Entities nobody claims are filed under the dynamic
//! category, which grows the registry as a side effect.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::category::{CategoryRegistry, DYNAMIC_CATEGORY};
use super::entity::{extract_entities, tokenize};

/// Result of classifying one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Relevant category names, deduplicated, in registry order
    pub categories: Vec<String>,
    /// Entities that matched nothing and were added to the dynamic category
    pub discovered: Vec<String>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// The relevant categories, or every known category when none matched.
    pub fn or_all(&self, registry: &CategoryRegistry) -> Vec<String> {
        if self.categories.is_empty() {
            registry.names()
        } else {
            self.categories.clone()
        }
    }
}

/// Lower-cased token frequencies for a query.
pub fn token_counts(query: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(query) {
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    counts
}

/// Classify a query against the registry, registering unmatched entities.
pub fn classify(registry: &mut CategoryRegistry, query: &str) -> Classification {
    let tokens = token_counts(query);
    let mut relevant: HashSet<String> = HashSet::new();

    for category in registry.iter() {
        if category.matches_token(&tokens) {
            relevant.insert(category.name.clone());
        }
    }

    let mut discovered = Vec::new();
    for entity in extract_entities(query) {
        let owner = registry
            .iter()
            .find(|c| c.matches_entity(&entity))
            .map(|c| c.name.clone());

        match owner {
            Some(name) => {
                relevant.insert(name);
            }
            None => {
                debug!(entity = %entity, "Filing unmatched entity under dynamic category");
                registry.add_keyword(DYNAMIC_CATEGORY, &entity);
                relevant.insert(DYNAMIC_CATEGORY.to_string());
                discovered.push(entity);
            }
        }
    }

    let categories = registry
        .names()
        .into_iter()
        .filter(|name| relevant.contains(name))
        .collect();

    Classification {
        categories,
        discovered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_tokens_select_categories() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(&mut registry, "We need more tests for this module");
        assert_eq!(result.categories, vec!["implementation", "testing"]);
        assert!(result.discovered.is_empty());
    }

    #[test]
    fn keyword_match_ignores_case() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(&mut registry, "what about DEPLOYMENT and the readme?");
        assert_eq!(result.categories, vec!["deployment", "documentation"]);
    }

    #[test]
    fn possessive_keyword_still_matches() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(&mut registry, "what is this module's purpose");
        assert_eq!(result.categories, vec!["implementation"]);
    }

    #[test]
    fn pronoun_contraction_does_not_grow_dynamic() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(&mut registry, "Now I'm stuck on the tests");
        assert_eq!(result.categories, vec!["testing"]);
        assert!(result.discovered.is_empty());
        assert!(!registry.contains(DYNAMIC_CATEGORY));
    }

    #[test]
    fn every_builtin_keyword_token_selects_its_category() {
        let registry = CategoryRegistry::builtin();
        for category in registry.iter() {
            for keyword in category.keywords.iter().filter(|k| !k.contains(' ')) {
                let mut scratch = registry.clone();
                let result = classify(&mut scratch, &format!("tell me about {keyword} please"));
                assert!(
                    result.categories.contains(&category.name),
                    "{keyword:?} did not select {:?}: {:?}",
                    category.name,
                    result.categories
                );
            }
        }
    }

    #[test]
    fn entities_match_by_substring_and_unknowns_go_dynamic() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(
            &mut registry,
            "How should the renderer architecture use Vulkan and external APIs?",
        );
        assert_eq!(
            result.categories,
            vec!["architecture and design", "external APIs", DYNAMIC_CATEGORY]
        );
        assert_eq!(result.discovered, vec!["Vulkan"]);
        assert_eq!(
            registry.get(DYNAMIC_CATEGORY).unwrap().keywords,
            vec!["Vulkan"]
        );
    }

    #[test]
    fn architecture_question_with_unknown_technology() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(
            &mut registry,
            "How does the overall architecture of the project integrate with external APIs \
             and how should we manage Vulkan image buffers?",
        );
        assert_eq!(
            result.categories,
            vec!["architecture and design", "external APIs", DYNAMIC_CATEGORY]
        );
    }

    #[test]
    fn repeated_entity_resolves_to_dynamic_without_duplication() {
        let mut registry = CategoryRegistry::builtin();
        classify(&mut registry, "we picked Vulkan");

        let again = classify(&mut registry, "is Vulkan fast enough?");
        assert_eq!(again.categories, vec![DYNAMIC_CATEGORY]);
        assert!(again.discovered.is_empty());
        assert_eq!(registry.get(DYNAMIC_CATEGORY).unwrap().keywords.len(), 1);
    }

    #[test]
    fn first_matching_category_wins_for_entities() {
        let mut registry = CategoryRegistry::builtin();
        // "DesignAPI" holds keywords of both; architecture comes first.
        let result = classify(&mut registry, "ship it with DesignAPI");
        assert!(result.categories.contains(&"architecture and design".to_string()));
        assert!(!result.categories.contains(&"external APIs".to_string()));
    }

    #[test]
    fn empty_result_falls_back_to_all_categories() {
        let mut registry = CategoryRegistry::builtin();
        let result = classify(&mut registry, "hello there");
        assert!(result.is_empty());
        assert_eq!(result.or_all(&registry), registry.names());
    }

    #[test]
    fn token_counts_lowercase_and_count() {
        let counts = token_counts("Tests, tests and TESTS.");
        assert_eq!(counts.get("tests"), Some(&3));
        assert_eq!(counts.get(","), Some(&1));
    }
}
