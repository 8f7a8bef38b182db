//! Key-point extraction — pre-turn housekeeping.
//!
//! Before classifying a new query, the recent transcript is sent to the
//! model with a request to list key points as `<category>: <point>` lines.
//! The reply is parsed against the known category names and the per-category
//! text is merged into the key-point store.
//!
//! The line format is a contract with the model. In strict mode a line that
//! breaks it fails the extraction instead of being silently dropped.

use std::sync::Arc;

use ctxkeep_config::ExtractionConfig;
use ctxkeep_core::error::{Error, ExtractionError, ProviderError};
use ctxkeep_core::memory::Interaction;
use ctxkeep_core::provider::{Provider, ProviderRequest};
use tracing::{debug, warn};

/// Reply meaning "nothing worth keeping".
pub const NO_KEY_POINTS: &str = "NONE";

/// Build the extraction prompt for a transcript.
///
/// `history` is newest first, as the store returns it; the prompt replays it
/// chronologically.
pub fn build_prompt(history: &[Interaction], categories: &[String]) -> String {
    let transcript = history
        .iter()
        .rev()
        .map(|i| format!("User: {}\nBot: {}", i.user_input, i.model_response))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Extract key points from the following conversation and categorize them into {}.\n\
         \n\
         Reply with one line per key point in the form `<category>: <point>`, where \
         <category> is exactly one of the names above. If there is nothing worth \
         keeping, reply with the single line {}.\n\
         \n\
         {}",
        categories.join(", "),
        NO_KEY_POINTS,
        transcript
    )
}

/// Parse a model reply into `(category, points)` pairs.
///
/// Pairs come back in `categories` order, one per category that received at
/// least one non-empty point; multiple points are joined with `\n`. Category
/// prefixes are matched case-insensitively, longest name first, and a
/// leading `- ` or `* ` bullet is ignored.
pub fn parse_key_points(
    text: &str,
    categories: &[String],
    strict: bool,
) -> Result<Vec<(String, String)>, ExtractionError> {
    let mut by_length: Vec<&String> = categories.iter().collect();
    by_length.sort_by_key(|name| std::cmp::Reverse(name.len()));

    let mut collected: Vec<Vec<String>> = vec![Vec::new(); categories.len()];

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line)
            .trim();

        if line.is_empty() || line.eq_ignore_ascii_case(NO_KEY_POINTS) {
            continue;
        }

        let matched = by_length
            .iter()
            .find_map(|name| split_category(line, name).map(|point| (*name, point)));

        match matched {
            Some((name, point)) => {
                if point.is_empty() {
                    continue;
                }
                if let Some(slot) = categories.iter().position(|c| c == name) {
                    collected[slot].push(point.to_string());
                }
            }
            None if strict => {
                return Err(ExtractionError::Malformed {
                    line_number: index + 1,
                    line: raw.to_string(),
                });
            }
            None => {
                warn!(line_number = index + 1, line = %raw, "Dropping unrecognised key-point line");
            }
        }
    }

    Ok(categories
        .iter()
        .zip(collected)
        .filter(|(_, points)| !points.is_empty())
        .map(|(name, points)| (name.clone(), points.join("\n")))
        .collect())
}

/// `Some(point)` when `line` is `<name>:<point>` (name case-insensitive).
fn split_category<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let head = line.get(..name.len())?;
    if !head.eq_ignore_ascii_case(name) {
        return None;
    }
    let rest = line[name.len()..].trim_start();
    rest.strip_prefix(':').map(str::trim)
}

/// Runs extraction requests against the generation provider.
pub struct KeyPointExtractor {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    strict: bool,
}

impl KeyPointExtractor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self::from_config(provider, model, &ExtractionConfig::default())
    }

    pub fn from_config(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            strict: config.strict,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Extract per-category key points from recent history.
    ///
    /// An empty history yields nothing without calling the provider.
    pub async fn extract(
        &self,
        history: &[Interaction],
        categories: &[String],
    ) -> Result<Vec<(String, String)>, Error> {
        if history.is_empty() {
            return Ok(Vec::new());
        }

        let request = ProviderRequest::new(&self.model, build_prompt(history, categories))
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        let text = response.first_trimmed().ok_or(ProviderError::EmptyResponse)?;

        let points = parse_key_points(text, categories, self.strict)?;
        debug!(
            turns = history.len(),
            categories = points.len(),
            "Extracted key points"
        );
        Ok(points)
    }
}
