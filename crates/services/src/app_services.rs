use std::sync::Arc;

use storage::{KeyValueStore, NativeBridge, SqliteHost, StorageAdapter};
use tracing::info;
use vocab_core::QuizConfig;

use crate::content::{ContentClient, ContentFetcher, HttpContentClient};
use crate::error::AppServicesError;
use crate::orchestrator::{RandomWords, RequestOrchestrator, ShuffledWords};
use crate::resilience::{
    CircuitBreaker, ConnectionState, ResilientExecutor, RetryPolicy, Sleeper, TokioSleeper,
};
use crate::sessions::{Debouncer, FlashcardFlow, QuizFlow};
use crate::streak_service::StreakService;
use crate::Clock;

/// Host page visibility changes forwarded by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Visible,
    Hidden,
    Terminating,
}

/// Everything the services layer needs from the host.
pub struct ServiceParts {
    pub config: QuizConfig,
    pub clock: Clock,
    pub store: Arc<dyn KeyValueStore>,
    pub client: Arc<dyn ContentClient>,
    pub sleeper: Arc<dyn Sleeper>,
    pub connection: ConnectionState,
    pub words: Vec<String>,
}

/// Assembles app-facing services over one store and one content client.
#[derive(Clone)]
pub struct AppServices {
    config: QuizConfig,
    clock: Clock,
    connection: ConnectionState,
    breaker: Arc<CircuitBreaker>,
    orchestrator: RequestOrchestrator,
    streaks: StreakService,
}

impl AppServices {
    /// Build services backed by a `SQLite` native host and the HTTP proxy.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the config is invalid, the database
    /// cannot be opened, or the word list is empty.
    pub async fn new_sqlite(
        db_url: &str,
        config: QuizConfig,
        clock: Clock,
        words: Vec<String>,
    ) -> Result<Self, AppServicesError> {
        config.validate()?;
        let host = SqliteHost::open(db_url).await?;
        let bridge = NativeBridge::new(Arc::new(host), config.bridge_timeout);
        let client = HttpContentClient::new(config.endpoint.clone());
        info!(endpoint = client.endpoint(), "content endpoint configured");

        Self::from_parts(ServiceParts {
            config,
            clock,
            store: Arc::new(StorageAdapter::with_bridge(bridge)),
            client: Arc::new(client),
            sleeper: Arc::new(TokioSleeper),
            connection: ConnectionState::default(),
            words,
        })
        .await
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if the config is invalid or the word list
    /// is empty.
    pub async fn from_parts(parts: ServiceParts) -> Result<Self, AppServicesError> {
        let ServiceParts {
            config,
            clock,
            store,
            client,
            sleeper,
            connection,
            words,
        } = parts;
        config.validate()?;

        let quiz_words = RandomWords::new(words.clone())?;
        let flashcard_words = ShuffledWords::new(words)?;

        let breaker = Arc::new(CircuitBreaker::new(
            clock.clone(),
            config.circuit_breaker_threshold,
            config.circuit_breaker_timeout,
        ));
        let executor = Arc::new(ResilientExecutor::new(
            Arc::clone(&breaker),
            RetryPolicy::new(config.retry_attempts, config.retry_delay),
            sleeper,
            Arc::new(connection.clone()),
            &config,
        ));
        let fetcher = Arc::new(ContentFetcher::new(client, executor, config.limits));
        let orchestrator =
            RequestOrchestrator::new(fetcher, Box::new(quiz_words), Box::new(flashcard_words));
        let streaks = StreakService::load(clock.clone(), store, config.words_per_streak).await;

        Ok(Self {
            config,
            clock,
            connection,
            breaker,
            orchestrator,
            streaks,
        })
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    #[must_use]
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    #[must_use]
    pub fn orchestrator(&self) -> &RequestOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn streaks(&self) -> StreakService {
        self.streaks.clone()
    }

    #[must_use]
    pub fn quiz_flow(&self) -> QuizFlow {
        QuizFlow::new(
            self.orchestrator.clone(),
            self.streaks.clone(),
            Debouncer::new(self.clock.clone(), self.config.debounce_delay),
        )
    }

    #[must_use]
    pub fn flashcard_flow(&self) -> FlashcardFlow {
        FlashcardFlow::new(
            self.orchestrator.clone(),
            self.streaks.clone(),
            Debouncer::new(self.clock.clone(), self.config.debounce_delay),
        )
    }

    /// Hidden and terminating pages flush streak state; hiding also aborts
    /// fetches for slots with nothing cached. Becoming visible restarts them.
    pub async fn on_lifecycle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Visible => self.orchestrator.on_visible(),
            LifecycleEvent::Hidden => {
                self.orchestrator.on_hidden();
                self.streaks.flush().await;
            }
            LifecycleEvent::Terminating => {
                self.streaks.flush().await;
            }
        }
    }
}
