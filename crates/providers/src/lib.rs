//! LLM Provider implementations for ctxkeep.
//!
//! All providers implement the `ctxkeep_core::Provider` trait.
//! [`build_from_config`] assembles the configured backend with retries.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryingProvider};
pub use router::{build_from_config, resolve_model};
