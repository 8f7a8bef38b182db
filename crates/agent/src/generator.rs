//! Response generation — one completion per turn.

use std::sync::Arc;

use ctxkeep_core::error::ProviderError;
use ctxkeep_core::provider::{Provider, ProviderRequest};
use tracing::debug;

pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Wraps the provider with the fixed sampling settings used for answers.
pub struct ResponseGenerator {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Request a single candidate and return its trimmed text.
    ///
    /// Provider faults propagate unchanged; retrying is the provider
    /// wrapper's job.
    pub async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ProviderRequest::new(&self.model, prompt)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = self.provider.complete(request).await?;
        let text = response
            .first_trimmed()
            .ok_or(ProviderError::EmptyResponse)?
            .to_string();

        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generated response"
            );
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, make_text_response};
    use ctxkeep_core::provider::ProviderResponse;

    #[tokio::test]
    async fn returns_trimmed_first_candidate() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(ProviderResponse {
            candidates: vec!["  Use a trait object.\n".into(), "ignored".into()],
            usage: None,
            model: "mock".into(),
        })]));
        let generator = ResponseGenerator::new(provider.clone(), "gpt-4");

        let text = generator.generate("prompt").await.unwrap();
        assert_eq!(text, "Use a trait object.");

        let request = &provider.requests()[0];
        assert_eq!(request.model, "gpt-4");
        assert_eq!(request.prompt, "prompt");
        assert_eq!(request.candidates, 1);
        assert_eq!(request.max_tokens, Some(DEFAULT_MAX_TOKENS));
        assert!((request.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn max_tokens_is_configurable() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response("ok"))]));
        let generator = ResponseGenerator::new(provider.clone(), "m").with_max_tokens(512);
        generator.generate("p").await.unwrap();
        assert_eq!(provider.requests()[0].max_tokens, Some(512));
    }

    #[tokio::test]
    async fn no_candidates_is_empty_response() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(ProviderResponse {
            candidates: vec![],
            usage: None,
            model: "mock".into(),
        })]));
        let generator = ResponseGenerator::new(provider, "m");
        assert!(matches!(
            generator.generate("p").await,
            Err(ProviderError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn provider_errors_propagate() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let generator = ResponseGenerator::new(provider, "m");
        assert!(matches!(
            generator.generate("p").await,
            Err(ProviderError::AuthenticationFailed(_))
        ));
    }
}
