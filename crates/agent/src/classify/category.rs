//! Category registry — topical buckets and their trigger keywords.
//!
//! The registry is an explicit value owned by whoever runs the pipeline; it
//! is never process-global. Iteration order is insertion order and decides
//! tie-breaks during entity classification, so it is kept in a `Vec`.

use ctxkeep_config::CategoryConfig;
use serde::{Deserialize, Serialize};

/// Name of the reserved category that collects unmatched entities.
pub const DYNAMIC_CATEGORY: &str = "dynamic";

/// The eight built-in software-engineering categories, in registry order.
pub const BUILTIN_CATEGORIES: [(&str, &[&str]); 8] = [
    (
        "requirements",
        &[
            "requirements",
            "specifications",
            "needs",
            "criteria",
            "goals",
            "objectives",
            "user story",
        ],
    ),
    (
        "architecture and design",
        &[
            "architecture",
            "design",
            "structure",
            "blueprint",
            "framework",
            "model",
            "diagram",
            "pattern",
        ],
    ),
    (
        "implementation",
        &[
            "implementation",
            "coding",
            "development",
            "function",
            "method",
            "procedure",
            "class",
            "module",
            "algorithm",
        ],
    ),
    (
        "testing",
        &[
            "testing",
            "tests",
            "validation",
            "verification",
            "unit test",
            "integration test",
            "test case",
            "test plan",
            "QA",
        ],
    ),
    (
        "external APIs",
        &[
            "API",
            "external service",
            "integration",
            "third-party service",
            "REST",
            "SOAP",
            "webhook",
            "endpoint",
            "API key",
        ],
    ),
    (
        "deployment",
        &[
            "deployment",
            "release",
            "environment",
            "production",
            "staging",
            "CI/CD",
            "pipeline",
            "rollout",
            "rollback",
        ],
    ),
    (
        "documentation",
        &[
            "documentation",
            "doc",
            "README",
            "guide",
            "manual",
            "comments",
            "annotations",
            "spec",
        ],
    ),
    (
        "project management",
        &[
            "project management",
            "timeline",
            "milestones",
            "tasks",
            "issues",
            "tickets",
            "backlog",
            "sprint",
            "agile",
            "kanban",
            "scrum",
        ],
    ),
];

/// A named category with its keyword list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether any keyword equals one of the (already lower-cased) tokens.
    pub fn matches_token(&self, tokens: &std::collections::HashMap<String, usize>) -> bool {
        self.keywords
            .iter()
            .any(|k| tokens.contains_key(&k.to_lowercase()))
    }

    /// Whether any keyword occurs inside `entity`, ignoring case.
    pub fn matches_entity(&self, entity: &str) -> bool {
        let entity = entity.to_lowercase();
        self.keywords
            .iter()
            .any(|k| entity.contains(&k.to_lowercase()))
    }

    fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }
}

/// Ordered, name-unique collection of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The eight built-in categories.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, keywords) in BUILTIN_CATEGORIES {
            registry.insert(Category::new(name, keywords.iter().copied()));
        }
        registry
    }

    /// Built-ins extended by configured categories.
    ///
    /// A configured name equal to an existing one adds its keywords to that
    /// category instead of creating a duplicate.
    pub fn from_config(extra: &[CategoryConfig]) -> Self {
        let mut registry = Self::builtin();
        for category in extra {
            registry.insert(Category::new(category.name.trim(), category.keywords.iter().cloned()));
        }
        registry
    }

    /// Add a category, merging keywords if the name already exists.
    pub fn insert(&mut self, category: Category) {
        match self.get_mut(&category.name) {
            Some(existing) => {
                for keyword in category.keywords {
                    if !existing.has_keyword(&keyword) {
                        existing.keywords.push(keyword);
                    }
                }
            }
            None => self.categories.push(category),
        }
    }

    /// Append a keyword to a category, creating the category at the end of
    /// the registry when absent. Returns `false` if the keyword was already
    /// present (case-insensitive).
    pub fn add_keyword(&mut self, category: &str, keyword: &str) -> bool {
        if let Some(existing) = self.get_mut(category) {
            if existing.has_keyword(keyword) {
                return false;
            }
            existing.keywords.push(keyword.to_string());
            return true;
        }
        self.categories.push(Category::new(category, [keyword]));
        true
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    /// Category names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
