//! The per-turn pipeline.
//!
//! One call to [`ContextKeeper::run_turn`] does everything a user query
//! needs:
//!
//! 1. **Load** the session's recent interactions
//! 2. **Extract** key points from them and merge into the store
//! 3. **Classify** the query (falls back to every category)
//! 4. **Assemble** the prompt; reject the turn if it is over budget
//! 5. **Generate** a response and persist the turn
//!
//! Turns for the same session are serialized: the extraction merge and the
//! dynamic-category insertion must not interleave between turns.

use std::collections::HashMap;
use std::sync::Arc;

use ctxkeep_config::AppConfig;
use ctxkeep_core::error::Result;
use ctxkeep_core::memory::ContextStore;
use ctxkeep_core::provider::Provider;
use ctxkeep_core::session::SessionId;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::classify::{CategoryRegistry, DYNAMIC_CATEGORY, classify};
use crate::context::{AssemblyError, AssemblyInput, ContextAssembler, collect_key_points};
use crate::extraction::KeyPointExtractor;
use crate::generator::ResponseGenerator;

/// Shown to the user when a turn is rejected for size.
pub const REJECTION_MESSAGE: &str = "Context size exceeds the token limit.";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered and the turn was stored.
    Answered {
        response: String,
        /// Categories whose key points were offered as context
        categories: Vec<String>,
    },
    /// The assembled context was over the word limit. Nothing was generated
    /// or stored.
    Rejected {
        context_words: usize,
        input_words: usize,
        limit: usize,
    },
}

impl TurnOutcome {
    /// Text to show the user for this outcome.
    pub fn reply(&self) -> &str {
        match self {
            Self::Answered { response, .. } => response,
            Self::Rejected { .. } => REJECTION_MESSAGE,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Runs turns against one store, one provider and one shared registry.
pub struct ContextKeeper {
    store: Arc<dyn ContextStore>,
    generator: ResponseGenerator,
    extractor: Option<KeyPointExtractor>,
    assembler: ContextAssembler,
    registry: RwLock<CategoryRegistry>,
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
    history_limit: usize,
}

impl ContextKeeper {
    /// A keeper with built-in categories and default settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ContextStore>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            store,
            generator: ResponseGenerator::new(provider.clone(), model.clone()),
            extractor: Some(KeyPointExtractor::new(provider, model)),
            assembler: ContextAssembler::default(),
            registry: RwLock::new(CategoryRegistry::builtin()),
            session_locks: Mutex::new(HashMap::new()),
            history_limit: AppConfig::default().context.history_limit,
        }
    }

    /// A keeper configured from `config`, generating with `model`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ContextStore>,
        model: impl Into<String>,
        config: &AppConfig,
    ) -> Self {
        let model = model.into();
        let extractor = config.extraction.enabled.then(|| {
            KeyPointExtractor::from_config(provider.clone(), model.clone(), &config.extraction)
        });

        Self {
            store,
            generator: ResponseGenerator::new(provider, model)
                .with_max_tokens(config.default_max_tokens)
                .with_temperature(config.default_temperature),
            extractor,
            assembler: ContextAssembler::from_config(&config.context),
            registry: RwLock::new(CategoryRegistry::from_config(&config.categories)),
            session_locks: Mutex::new(HashMap::new()),
            history_limit: config.context.history_limit,
        }
    }

    pub fn with_registry(mut self, registry: CategoryRegistry) -> Self {
        self.registry = RwLock::new(registry);
        self
    }

    pub fn with_assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn without_extraction(mut self) -> Self {
        self.extractor = None;
        self
    }

    /// A copy of the registry as it stands, dynamic entries included.
    pub async fn registry(&self) -> CategoryRegistry {
        self.registry.read().await.clone()
    }

    pub fn store(&self) -> &Arc<dyn ContextStore> {
        &self.store
    }

    /// Run one user turn for `session`.
    ///
    /// Provider and store failures abort the turn with an error. Budget
    /// overflow is not an error: it returns [`TurnOutcome::Rejected`].
    pub async fn run_turn(&self, session: &SessionId, user_input: &str) -> Result<TurnOutcome> {
        let lock = self.session_lock(session).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.turn(session, user_input).await
        };
        self.release_session_lock(session, lock).await;
        outcome
    }

    async fn turn(&self, session: &SessionId, user_input: &str) -> Result<TurnOutcome> {
        let history = self
            .store
            .recent_interactions(session, self.history_limit)
            .await?;
        debug!(session = %session, turns = history.len(), "Loaded recent interactions");

        if let Some(extractor) = &self.extractor {
            let categories = self.extraction_categories().await;
            for (category, points) in extractor.extract(&history, &categories).await? {
                self.store
                    .append_key_points(session, &category, &points)
                    .await?;
                debug!(session = %session, category = %category, "Merged key points");
            }
        }

        let categories = {
            let mut registry = self.registry.write().await;
            let classification = classify(&mut registry, user_input);
            if !classification.discovered.is_empty() {
                info!(
                    session = %session,
                    entities = ?classification.discovered,
                    "New dynamic keywords"
                );
            }
            if classification.is_empty() {
                debug!(session = %session, "No category matched, using all");
            }
            classification.or_all(&registry)
        };

        let key_points = collect_key_points(self.store.as_ref(), session, &categories).await?;

        let assembled = match self.assembler.assemble(&AssemblyInput {
            key_points: &key_points,
            history: &history,
            user_input,
        }) {
            Ok(assembled) => assembled,
            Err(AssemblyError::BudgetExceeded {
                context_words,
                input_words,
                limit,
            }) => {
                warn!(
                    session = %session,
                    context_words,
                    input_words,
                    limit,
                    "Turn rejected: context over word limit"
                );
                return Ok(TurnOutcome::Rejected {
                    context_words,
                    input_words,
                    limit,
                });
            }
        };

        let response = self.generator.generate(&assembled.prompt).await?;
        self.store
            .store_interaction(session, user_input, &response)
            .await?;

        info!(
            session = %session,
            categories = ?categories,
            context_words = assembled.context_words,
            "Turn answered"
        );

        Ok(TurnOutcome::Answered {
            response,
            categories,
        })
    }

    /// Categories offered to the extractor: everything except dynamic.
    async fn extraction_categories(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .iter()
            .filter(|c| c.name != DYNAMIC_CATEGORY)
            .map(|c| c.name.clone())
            .collect()
    }

    async fn session_lock(&self, session: &SessionId) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks.entry(session.clone()).or_default().clone()
    }

    /// Forget the session's lock once no other turn holds or awaits it, so
    /// the map only tracks sessions with a turn in flight.
    async fn release_session_lock(&self, session: &SessionId, lock: Arc<Mutex<()>>) {
        let mut locks = self.session_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{SequentialMockProvider, make_text_response};
    use ctxkeep_core::error::{Error, ExtractionError, ProviderError};
    use ctxkeep_core::memory::{InteractionStore, KeyPointStore};
    use ctxkeep_memory::InMemoryStore;

    fn keeper(provider: Arc<SequentialMockProvider>, store: Arc<InMemoryStore>) -> ContextKeeper {
        ContextKeeper::new(provider, store, "mock-model")
    }

    #[tokio::test]
    async fn first_turn_answers_and_stores_once() {
        let provider = Arc::new(SequentialMockProvider::texts(&["  Add table-driven tests.  "]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone());
        let session = SessionId::new();

        let outcome = keeper
            .run_turn(&session, "We need more tests for this module")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Answered {
                response: "Add table-driven tests.".into(),
                categories: vec!["implementation".into(), "testing".into()],
            }
        );
        // No history yet, so no extraction call.
        assert_eq!(provider.call_count(), 1);
        assert_eq!(store.count_interactions(&session).await.unwrap(), 1);

        let stored = store.recent_interactions(&session, 5).await.unwrap();
        assert_eq!(stored[0].user_input, "We need more tests for this module");
        assert_eq!(stored[0].model_response, "Add table-driven tests.");
    }

    #[tokio::test]
    async fn second_turn_extracts_then_uses_key_points() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "Start with unit tests.",
            "testing: parser needs unit tests\nNONE",
            "Mock the clock.",
        ]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone());
        let session = SessionId::new();

        keeper.run_turn(&session, "how should I start testing?").await.unwrap();
        let outcome = keeper
            .run_turn(&session, "what tests cover timeouts?")
            .await
            .unwrap();

        assert_eq!(outcome.reply(), "Mock the clock.");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(
            store.get_key_points(&session, "testing").await.unwrap(),
            "parser needs unit tests"
        );

        let requests = provider.requests();
        assert!(requests[1].prompt.contains("User: how should I start testing?\nBot: Start with unit tests."));
        let answer_prompt = &requests[2].prompt;
        assert!(answer_prompt.starts_with("You are an advanced AI assistant"));
        assert!(answer_prompt.contains("\n\nparser needs unit tests\n\nUser: how should I start testing?"));
        assert!(answer_prompt.ends_with("User: what tests cover timeouts?\nBot:"));
    }

    #[tokio::test]
    async fn over_budget_rejects_without_generating_or_storing() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone())
            .with_assembler(ContextAssembler::new(7).with_system_prompt("SYS"));
        let session = SessionId::new();

        let outcome = keeper
            .run_turn(&session, "We need more tests for this module")
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TurnOutcome::Rejected {
                context_words: 1,
                input_words: 7,
                limit: 7
            }
        );
        assert_eq!(outcome.reply(), REJECTION_MESSAGE);
        assert_eq!(provider.call_count(), 0);
        assert_eq!(store.count_interactions(&session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn at_budget_generates_exactly_once() {
        let provider = Arc::new(SequentialMockProvider::texts(&["fine"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone())
            .with_assembler(ContextAssembler::new(8).with_system_prompt("SYS"));
        let session = SessionId::new();

        let outcome = keeper
            .run_turn(&session, "We need more tests for this module")
            .await
            .unwrap();

        assert!(!outcome.is_rejected());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(store.count_interactions(&session).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unmatched_query_uses_every_category() {
        let provider = Arc::new(SequentialMockProvider::texts(&["hi"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider, store);

        let outcome = keeper.run_turn(&SessionId::new(), "hello there").await.unwrap();
        let TurnOutcome::Answered { categories, .. } = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(categories, CategoryRegistry::builtin().names());
    }

    #[tokio::test]
    async fn dynamic_entities_persist_across_sessions() {
        let provider = Arc::new(SequentialMockProvider::texts(&["a", "b"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider, store);

        keeper.run_turn(&SessionId::new(), "we picked Vulkan").await.unwrap();
        let outcome = keeper
            .run_turn(&SessionId::new(), "is Vulkan fast enough?")
            .await
            .unwrap();

        let TurnOutcome::Answered { categories, .. } = outcome else {
            panic!("expected an answer");
        };
        assert_eq!(categories, vec![DYNAMIC_CATEGORY.to_string()]);
        let registry = keeper.registry().await;
        assert_eq!(registry.get(DYNAMIC_CATEGORY).unwrap().keywords, vec!["Vulkan"]);
    }

    #[tokio::test]
    async fn disabled_extraction_never_calls_the_extractor() {
        let provider = Arc::new(SequentialMockProvider::texts(&["one", "two"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone()).without_extraction();
        let session = SessionId::new();

        keeper.run_turn(&session, "first").await.unwrap();
        keeper.run_turn(&session, "second").await.unwrap();

        assert_eq!(provider.call_count(), 2);
        assert!(store.list_key_points(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_extraction_aborts_the_turn() {
        let provider = Arc::new(SequentialMockProvider::texts(&["ok", "Sure, here they are:"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider.clone(), store.clone());
        let session = SessionId::new();

        keeper.run_turn(&session, "first").await.unwrap();
        let err = keeper.run_turn(&session, "second").await.unwrap_err();

        assert!(matches!(err, Error::Extraction(ExtractionError::Malformed { .. })));
        assert_eq!(store.count_interactions(&session).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn provider_failure_stores_nothing() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(ProviderError::Network(
            "connection refused".into(),
        ))]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider, store.clone());
        let session = SessionId::new();

        let err = keeper.run_turn(&session, "hello").await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Network(_))));
        assert_eq!(store.count_interactions(&session).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_turns_on_one_session_are_serialized() {
        // First turn answers; the second sees its history, extracts, answers.
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_text_response("first answer")),
            Ok(make_text_response("NONE")),
            Ok(make_text_response("second answer")),
        ]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = Arc::new(keeper(provider.clone(), store.clone()));
        let session = SessionId::new();

        let (a, b) = tokio::join!(
            keeper.run_turn(&session, "question one"),
            keeper.run_turn(&session, "question two"),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(provider.call_count(), 3);
        assert_eq!(store.count_interactions(&session).await.unwrap(), 2);
        assert!(keeper.session_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn finished_sessions_release_their_lock() {
        let provider = Arc::new(SequentialMockProvider::texts(&["one", "two", "three"]));
        let store = Arc::new(InMemoryStore::new());
        let keeper = keeper(provider, store).without_extraction();

        for _ in 0..3 {
            keeper.run_turn(&SessionId::new(), "hello").await.unwrap();
        }

        assert!(keeper.session_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn config_controls_generation_settings() {
        let provider = Arc::new(SequentialMockProvider::texts(&["ok"]));
        let store = Arc::new(InMemoryStore::new());
        let mut config = AppConfig::default();
        config.default_max_tokens = 64;
        config.context.system_prompt_override = Some("ROLE".into());

        let keeper = ContextKeeper::from_config(provider.clone(), store, "gpt-4o", &config);
        keeper.run_turn(&SessionId::new(), "hi").await.unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.max_tokens, Some(64));
        assert!(request.prompt.starts_with("ROLE\n\n"));
    }
}
