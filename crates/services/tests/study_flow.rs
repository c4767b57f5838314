use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use services::content::{ContentClient, ContentFetcher};
use services::resilience::{CircuitBreaker, ResilientExecutor, RetryPolicy, Sleeper};
use services::{
    AppServices, Clock, ConnectionState, FetchError, LifecycleEvent, ServiceParts, StudyError,
};
use storage::{MemoryHost, NativeBridge, StorageAdapter};
use vocab_core::QuizConfig;
use vocab_core::model::StudyMode;
use vocab_core::time::fixed_now;

const QUESTION: &str = "```json\n{\"sentence\": \"The storm began to _____ by evening.\", \
    \"options\": [\"abate\", \"expand\", \"ignite\", \"linger\", \"erupt\"], \
    \"correctIndex\": 0, \
    \"explanations\": [\"Correct: to lessen.\", \"Wrong.\", \"Wrong.\", \"Wrong.\", \"Wrong.\"]}\n```";

const FLASHCARD: &str = r#"{"definition": "to become less intense", "example": "The wind abated overnight."}"#;

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, FetchError>>>,
    calls: AtomicUsize,
    hang: AtomicBool,
}

impl ScriptedClient {
    fn push(&self, reply: Result<String, FetchError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        if prompt.contains("definition") {
            Ok(FLASHCARD.to_string())
        } else {
            Ok(QUESTION.to_string())
        }
    }
}

struct NoSleep;

#[async_trait]
impl Sleeper for NoSleep {
    async fn sleep(&self, _duration: Duration) {}
}

fn config() -> QuizConfig {
    QuizConfig {
        words_per_streak: 2,
        ..QuizConfig::default()
    }
}

async fn services(
    client: Arc<ScriptedClient>,
    host: &MemoryHost,
    clock: &Clock,
) -> AppServices {
    let bridge = NativeBridge::new(Arc::new(host.clone()), Duration::from_secs(2));
    AppServices::from_parts(ServiceParts {
        config: config(),
        clock: clock.clone(),
        store: Arc::new(StorageAdapter::with_bridge(bridge)),
        client,
        sleeper: Arc::new(NoSleep),
        connection: ConnectionState::default(),
        words: vec!["abate".into()],
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn circuit_opens_after_five_failures_and_recovers() {
    let mut clock = Clock::manual(fixed_now());
    let client = Arc::new(ScriptedClient::default());
    for _ in 0..5 {
        client.push(Err(FetchError::Http { status: 400 }));
    }
    let config = config();
    let executor = Arc::new(ResilientExecutor::new(
        Arc::new(CircuitBreaker::new(
            clock.clone(),
            config.circuit_breaker_threshold,
            config.circuit_breaker_timeout,
        )),
        RetryPolicy::new(config.retry_attempts, config.retry_delay),
        Arc::new(NoSleep),
        Arc::new(ConnectionState::default()),
        &config,
    ));
    let fetcher = ContentFetcher::new(client.clone(), Arc::clone(&executor), config.limits);

    for _ in 0..5 {
        assert_eq!(
            fetcher.fetch_question("abate").await,
            Err(FetchError::Http { status: 400 })
        );
    }
    assert_eq!(client.calls(), 5);

    let rejected = fetcher.fetch_question("abate").await.unwrap_err();
    assert_eq!(rejected, FetchError::CircuitOpen { wait_secs: 60 });
    assert!(rejected.to_string().contains("Too many failures"));
    assert_eq!(client.calls(), 5, "open circuit makes no network call");

    clock.advance(chrono::Duration::seconds(60));
    let question = fetcher.fetch_question("abate").await.unwrap();
    assert_eq!(question.correct_option(), "abate");
    assert_eq!(client.calls(), 6);
    assert_eq!(executor.breaker().consecutive_failures(), 0);
}

#[tokio::test]
async fn unparsable_content_fails_without_retry() {
    let clock = Clock::manual(fixed_now());
    let client = Arc::new(ScriptedClient::default());
    client.push(Ok("Sorry, I can't do that.".into()));
    let host = MemoryHost::new();
    let app = services(client.clone(), &host, &clock).await;

    let err = app.orchestrator().quiz().consume().await.unwrap_err();
    assert_eq!(err, FetchError::Parse);
    assert_eq!(client.calls(), 1);
    assert_eq!(app.breaker().consecutive_failures(), 1);
}

#[tokio::test]
async fn quiz_answers_count_toward_the_streak() {
    let mut clock = Clock::manual(fixed_now());
    let client = Arc::new(ScriptedClient::default());
    let host = MemoryHost::new();
    let app = services(client, &host, &clock).await;
    let mut flow = app.quiz_flow();

    let correct = flow.next_question().await.unwrap().correct_index();
    assert_eq!(flow.current().unwrap().correct_option(), "abate");
    assert!(matches!(
        flow.next_question().await,
        Err(StudyError::Debounced)
    ));

    let first = flow.answer(correct).unwrap();
    assert!(first.outcome.is_correct);
    assert_eq!(first.streak.progress, 1);
    assert!(!first.streak.completed);

    clock.advance(chrono::Duration::seconds(1));
    let correct = flow.next_question().await.unwrap().correct_index();
    let second = flow.answer((correct + 1) % 5).unwrap();
    assert!(!second.outcome.is_correct);
    assert!(second.streak.just_completed);
    assert_eq!(second.streak.streak, 1);
    assert_eq!(flow.score(), (1, 2));

    app.on_lifecycle(LifecycleEvent::Terminating).await;
    let stored = host.snapshot();
    assert_eq!(stored["yds_quiz_streak"], "1");
    assert_eq!(stored["yds_quiz_completed_today"], "true");
}

#[tokio::test]
async fn flashcard_ratings_count_toward_their_own_streak() {
    let clock = Clock::manual(fixed_now());
    let client = Arc::new(ScriptedClient::default());
    let host = MemoryHost::new();
    let app = services(client, &host, &clock).await;
    let mut flow = app.flashcard_flow();

    let card = flow.next_card().await.unwrap();
    assert_eq!(card.word, "abate");
    assert_eq!(card.content.definition(), "to become less intense");

    let status = flow.rate(true).unwrap();
    assert_eq!(status.mode, StudyMode::Flashcard);
    assert_eq!(status.progress, 1);
    assert_eq!(app.streaks().status(StudyMode::Quiz).progress, 0);
    assert_eq!(flow.score(), (1, 1));
}

#[tokio::test]
async fn streak_survives_a_restart_and_breaks_after_a_gap() {
    let mut clock = Clock::manual(fixed_now());
    let host = MemoryHost::new();

    let app = services(Arc::new(ScriptedClient::default()), &host, &clock).await;
    app.streaks().record_word(StudyMode::Quiz);
    app.streaks().record_word(StudyMode::Quiz);
    app.on_lifecycle(LifecycleEvent::Hidden).await;

    clock.advance(chrono::Duration::days(1));
    let next_day = services(Arc::new(ScriptedClient::default()), &host, &clock).await;
    let status = next_day.streaks().status(StudyMode::Quiz);
    assert_eq!(status.streak, 1);
    assert_eq!(status.progress, 0);
    assert!(!status.completed);
    next_day.on_lifecycle(LifecycleEvent::Terminating).await;

    clock.advance(chrono::Duration::days(3));
    let after_gap = services(Arc::new(ScriptedClient::default()), &host, &clock).await;
    assert_eq!(after_gap.streaks().status(StudyMode::Quiz).streak, 0);
}

#[tokio::test]
async fn hiding_aborts_uncached_fetches_without_counting_a_failure() {
    let clock = Clock::manual(fixed_now());
    let client = Arc::new(ScriptedClient::default());
    client.hang.store(true, Ordering::SeqCst);
    let host = MemoryHost::new();
    let app = services(client.clone(), &host, &clock).await;
    let flow = app.quiz_flow();

    assert!(flow.warm_up());
    tokio::task::yield_now().await;
    app.on_lifecycle(LifecycleEvent::Hidden).await;
    assert!(!app.orchestrator().quiz().is_in_flight());
    assert_eq!(app.breaker().consecutive_failures(), 0);

    client.hang.store(false, Ordering::SeqCst);
    app.on_lifecycle(LifecycleEvent::Visible).await;
    app.orchestrator().quiz().settle().await;
    assert!(app.orchestrator().quiz().has_cached());
}
