//! Prompt assembly under a word budget.
//!
//! The assembled prompt has three context layers, always in this order:
//!
//! | Layer | Source |
//! |-------|--------|
//! | 1. System | Fixed software-engineering role description |
//! | 2. Key points | Stored summaries of the relevant categories |
//! | 3. Transcript | Recent `User:` / `Bot:` turns |
//!
//! Nothing is trimmed: a context that does not fit rejects the turn.

pub mod assembler;
pub mod token;

pub use assembler::{
    AssembledPrompt, AssemblyError, AssemblyInput, ContextAssembler, SYSTEM_PROMPT,
    collect_key_points,
};
