//! # ctxkeep Core
//!
//! Domain types, traits, and error definitions for the ctxkeep context manager.
//! This crate has **no runtime or I/O dependencies**; it defines the domain
//! model that all other crates implement against.
//!
//! Every seam is a trait here (`Provider`, `InteractionStore`,
//! `KeyPointStore`); implementations live in their respective crates, which
//! keeps the pipeline testable against mock providers and in-memory stores.

pub mod error;
pub mod memory;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ExtractionError, MemoryError, ProviderError, Result};
pub use memory::{ContextStore, Interaction, InteractionStore, KeyPointStore, KeyPointSummary};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::SessionId;
