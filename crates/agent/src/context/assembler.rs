//! Context assembly for a single turn.
//!
//! Joins the system prompt, the relevant key-point summaries and the recent
//! transcript into one prompt, then enforces the word budget over the
//! combined context plus the new user input.
//!
//! # Determinism
//!
//! Identical inputs always produce identical prompts. Store access happens
//! before assembly ([`collect_key_points`]), so `assemble` is pure.

use crate::context::token;
use ctxkeep_config::{ContextConfig, TranscriptOrder};
use ctxkeep_core::error::MemoryError;
use ctxkeep_core::memory::{Interaction, KeyPointStore};
use ctxkeep_core::session::SessionId;

/// Role description placed at the top of every prompt.
pub const SYSTEM_PROMPT: &str = "\
You are an advanced AI assistant specialized in software development. Your role is to assist users with various aspects of software engineering, including but not limited to:
- Requirements gathering and analysis
- Software architecture and design
- Implementation and coding in multiple programming languages
- Testing and quality assurance
- Integration with external APIs and services
- Deployment and CI/CD practices
- Documentation and technical writing
- Project management and agile methodologies

When providing responses, ensure they are detailed, technically accurate, and relevant to the user's query. Use appropriate software development terminology and examples where necessary. Stay focused on the context of software engineering and aim to provide practical and actionable advice.

If the user introduces new topics or specific technologies, incorporate those into the conversation and adapt your responses accordingly. Your goal is to be a comprehensive and knowledgeable resource for software development-related queries.";

// ── Types ─────────────────────────────────────────────────────────────────

/// Everything needed to assemble one prompt.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInput<'a> {
    /// Summaries for the relevant categories, in category order
    pub key_points: &'a [String],
    /// Recent turns as the store returns them (newest first)
    pub history: &'a [Interaction],
    /// The new user message
    pub user_input: &'a str,
}

/// The assembled prompt and its measured size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    /// System prompt, key points and transcript
    pub combined_context: String,
    /// `combined_context` followed by the new `User:` line and an open `Bot:`
    pub prompt: String,
    pub context_words: usize,
    pub input_words: usize,
}

/// Errors from context assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// Combined context plus user input exceed the word limit.
    BudgetExceeded {
        context_words: usize,
        input_words: usize,
        limit: usize,
    },
}

impl std::fmt::Display for AssemblyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BudgetExceeded {
                context_words,
                input_words,
                limit,
            } => write!(
                f,
                "Context ({} words) + user input ({} words) exceed limit ({} words)",
                context_words, input_words, limit
            ),
        }
    }
}

impl std::error::Error for AssemblyError {}

// ── Assembler ─────────────────────────────────────────────────────────────

/// The context assembler. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    system_prompt: String,
    word_limit: usize,
    order: TranscriptOrder,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(ContextConfig::default().word_limit)
    }
}

impl ContextAssembler {
    /// An assembler with the built-in system prompt and oldest-first transcript.
    pub fn new(word_limit: usize) -> Self {
        Self {
            system_prompt: SYSTEM_PROMPT.to_string(),
            word_limit,
            order: TranscriptOrder::default(),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        let mut assembler =
            Self::new(config.word_limit).with_transcript_order(config.transcript_order);
        if let Some(prompt) = &config.system_prompt_override {
            assembler = assembler.with_system_prompt(prompt.clone());
        }
        assembler
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_transcript_order(mut self, order: TranscriptOrder) -> Self {
        self.order = order;
        self
    }

    pub fn word_limit(&self) -> usize {
        self.word_limit
    }

    /// Assemble the prompt and check it against the word limit.
    ///
    /// Layout: `system + "\n\n" + key points + "\n\n" + transcript`, then
    /// `"\nUser: {input}\nBot:"`. Empty summaries are skipped. A total equal
    /// to the limit is accepted.
    pub fn assemble(&self, input: &AssemblyInput<'_>) -> Result<AssembledPrompt, AssemblyError> {
        let key_points = input
            .key_points
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        let transcript = self.transcript(input.history);

        let combined_context = format!("{}\n\n{}\n\n{}", self.system_prompt, key_points, transcript);

        let context_words = token::word_count(&combined_context);
        let input_words = token::word_count(input.user_input);

        if !token::within_budget(context_words, input_words, self.word_limit) {
            return Err(AssemblyError::BudgetExceeded {
                context_words,
                input_words,
                limit: self.word_limit,
            });
        }

        let prompt = format!("{}\nUser: {}\nBot:", combined_context, input.user_input);

        Ok(AssembledPrompt {
            combined_context,
            prompt,
            context_words,
            input_words,
        })
    }

    fn transcript(&self, history: &[Interaction]) -> String {
        let line = |i: &Interaction| format!("User: {}\nBot: {}", i.user_input, i.model_response);
        let lines: Vec<String> = match self.order {
            TranscriptOrder::OldestFirst => history.iter().rev().map(line).collect(),
            TranscriptOrder::NewestFirst => history.iter().map(line).collect(),
        };
        lines.join("\n")
    }
}

/// Fetch the stored summaries for `categories`, in the given order.
///
/// Categories without a summary yield an empty string, which the assembler
/// skips.
pub async fn collect_key_points<S: KeyPointStore + ?Sized>(
    store: &S,
    session: &SessionId,
    categories: &[String],
) -> Result<Vec<String>, MemoryError> {
    let mut summaries = Vec::with_capacity(categories.len());
    for category in categories {
        summaries.push(store.get_key_points(session, category).await?);
    }
    Ok(summaries)
}
