//! The context-keeping pipeline — the heart of ctxkeep.
//!
//! Every user turn follows the same path:
//!
//! 1. **Load** recent interactions for the session
//! 2. **Extract** key points from them into per-category summaries
//! 3. **Classify** the new query into relevant categories
//! 4. **Assemble** system prompt + key points + transcript under a word budget
//! 5. **Generate** the answer and store the turn
//!
//! A turn whose assembled context is over budget is rejected before the
//! provider is called and leaves no trace in the store.

pub mod classify;
pub mod context;
pub mod extraction;
pub mod generator;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use classify::{Category, CategoryRegistry, Classification, DYNAMIC_CATEGORY, classify};
pub use context::{AssembledPrompt, AssemblyError, AssemblyInput, ContextAssembler, SYSTEM_PROMPT};
pub use extraction::{KeyPointExtractor, parse_key_points};
pub use generator::ResponseGenerator;
pub use pipeline::{ContextKeeper, REJECTION_MESSAGE, TurnOutcome};
