//! Query classification: which categories of stored key points matter for
//! this turn.

pub mod category;
pub mod classifier;
pub mod entity;

pub use category::{BUILTIN_CATEGORIES, Category, CategoryRegistry, DYNAMIC_CATEGORY};
pub use classifier::{Classification, classify};
pub use entity::extract_entities;
