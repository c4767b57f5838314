//! Prefetching and single-flight request management per content slot.
//!
//! A slot holds at most one of: a cached result waiting to be consumed, or a
//! request in flight. A second `prefetch` while something is in flight is a
//! no-op, and a `consume` that arrives mid-flight awaits the same request.
//! Cached results are handed out exactly once.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{AbortHandle, BoxFuture, Shared, abortable};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use vocab_core::model::{FlashcardContent, Question, SessionError, WordDeck};

use crate::content::ContentFetcher;
use crate::error::FetchError;

/// Content category with its own cache and in-flight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Quiz,
    Flashcard,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Quiz => f.write_str("quiz"),
            SlotKind::Flashcard => f.write_str("flashcard"),
        }
    }
}

/// Content handed to the UI together with the word it was generated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served<T> {
    pub word: String,
    pub content: T,
}

//
// ─── WORD SOURCES ──────────────────────────────────────────────────────────────
//

/// Supplies the next word a slot should fetch content for.
pub trait WordSource: Send {
    fn next_word(&mut self) -> Option<String>;
}

/// Independent uniform draws, as the quiz does.
pub struct RandomWords {
    deck: WordDeck,
    rng: StdRng,
}

impl RandomWords {
    /// # Errors
    ///
    /// Returns `SessionError::EmptyWordList` for an empty list.
    pub fn new(words: Vec<String>) -> Result<Self, SessionError> {
        Self::with_rng(words, StdRng::from_os_rng())
    }

    /// # Errors
    ///
    /// Returns `SessionError::EmptyWordList` for an empty list.
    pub fn with_rng(words: Vec<String>, mut rng: StdRng) -> Result<Self, SessionError> {
        let deck = WordDeck::new(words, &mut rng)?;
        Ok(Self { deck, rng })
    }
}

impl WordSource for RandomWords {
    fn next_word(&mut self) -> Option<String> {
        Some(self.deck.random_word(&mut self.rng).to_string())
    }
}

/// Walks a shuffled order and reshuffles at the end, as flashcards do.
pub struct ShuffledWords {
    deck: WordDeck,
    rng: StdRng,
}

impl ShuffledWords {
    /// # Errors
    ///
    /// Returns `SessionError::EmptyWordList` for an empty list.
    pub fn new(words: Vec<String>) -> Result<Self, SessionError> {
        Self::with_rng(words, StdRng::from_os_rng())
    }

    /// # Errors
    ///
    /// Returns `SessionError::EmptyWordList` for an empty list.
    pub fn with_rng(words: Vec<String>, mut rng: StdRng) -> Result<Self, SessionError> {
        let deck = WordDeck::new(words, &mut rng)?;
        Ok(Self { deck, rng })
    }
}

impl WordSource for ShuffledWords {
    fn next_word(&mut self) -> Option<String> {
        Some(self.deck.next_word(&mut self.rng).to_string())
    }
}

//
// ─── SLOT ──────────────────────────────────────────────────────────────────────
//

/// Produces the content for one word.
pub type FetchFn<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T, FetchError>> + Send + Sync>;

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

struct InFlight<T> {
    id: u64,
    word: String,
    future: SharedFetch<T>,
    abort: AbortHandle,
    /// A consumer is awaiting this request and will take its result.
    claimed: bool,
}

struct SlotState<T> {
    cached: Option<Served<T>>,
    in_flight: Option<InFlight<T>>,
    /// Word whose fetch failed or was cancelled; it is retried before drawing
    /// a new one.
    retry_word: Option<String>,
    words: Box<dyn WordSource>,
    next_id: u64,
}

/// What a consumer does with the slot's in-flight request.
enum Turn<T> {
    Own(u64, String, SharedFetch<T>),
    Wait(u64, SharedFetch<T>),
}

impl<T> SlotState<T> {
    fn take_word(&mut self) -> Option<String> {
        self.retry_word.take().or_else(|| self.words.next_word())
    }
}

/// Cache plus single-flight request for one content kind.
pub struct PrefetchSlot<T> {
    kind: SlotKind,
    fetch: FetchFn<T>,
    state: Arc<Mutex<SlotState<T>>>,
}

impl<T> Clone for PrefetchSlot<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            fetch: Arc::clone(&self.fetch),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> PrefetchSlot<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(kind: SlotKind, words: Box<dyn WordSource>, fetch: FetchFn<T>) -> Self {
        Self {
            kind,
            fetch,
            state: Arc::new(Mutex::new(SlotState {
                cached: None,
                in_flight: None,
                retry_word: None,
                words,
                next_id: 0,
            })),
        }
    }

    #[must_use]
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Start fetching the next word in the background.
    ///
    /// Returns `false` without doing anything when content is already cached
    /// or a request is in flight, or when there is no word to fetch.
    pub fn prefetch(&self) -> bool {
        let mut state = self.lock();
        if state.cached.is_some() || state.in_flight.is_some() {
            debug!(slot = %self.kind, "prefetch skipped; slot busy");
            return false;
        }
        let Some(word) = state.take_word() else {
            return false;
        };
        debug!(slot = %self.kind, word = %word, "prefetching");
        self.start(&mut state, word, false);
        true
    }

    /// Hand out content: the cached result if present, else the in-flight
    /// request's result, else a fresh fetch. A new prefetch is started after
    /// every successful consume.
    ///
    /// # Errors
    ///
    /// Returns the `FetchError` of the request that was awaited. The word is
    /// kept and retried by the next fetch.
    pub async fn consume(&self) -> Result<Served<T>, FetchError> {
        let served = self.take_or_fetch().await?;
        self.prefetch();
        Ok(served)
    }

    async fn take_or_fetch(&self) -> Result<Served<T>, FetchError> {
        let (id, word, future) = loop {
            let step = {
                let mut state = self.lock();
                if let Some(served) = state.cached.take() {
                    debug!(slot = %self.kind, word = %served.word, "serving cached content");
                    return Ok(served);
                }
                match state.in_flight.as_mut() {
                    // Another consumer owns this result; wait our turn.
                    Some(in_flight) if in_flight.claimed => {
                        Turn::Wait(in_flight.id, in_flight.future.clone())
                    }
                    Some(in_flight) => {
                        debug!(slot = %self.kind, word = %in_flight.word, "joining in-flight request");
                        in_flight.claimed = true;
                        Turn::Own(in_flight.id, in_flight.word.clone(), in_flight.future.clone())
                    }
                    None => {
                        let word = state.take_word().ok_or(FetchError::NoWords)?;
                        let (id, future) = self.start(&mut state, word.clone(), true);
                        Turn::Own(id, word, future)
                    }
                }
            };

            match step {
                Turn::Own(id, word, future) => break (id, word, future),
                Turn::Wait(id, future) => {
                    let outcome = future.await;
                    let mut state = self.lock();
                    if state.in_flight.as_ref().is_some_and(|f| f.id == id) {
                        state.in_flight = None;
                    }
                    if let Err(FetchError::Aborted) = outcome {
                        return Err(FetchError::Aborted);
                    }
                }
            }
        };

        let result = future.await;
        let mut state = self.lock();
        if state.in_flight.as_ref().is_some_and(|f| f.id == id) {
            state.in_flight = None;
        }
        match result {
            Ok(content) => Ok(Served { word, content }),
            Err(err) => {
                state.retry_word.get_or_insert(word);
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn has_cached(&self) -> bool {
        self.lock().cached.is_some()
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    /// Abort the in-flight request if nothing is cached yet.
    ///
    /// The aborted word is kept for the next fetch and the breaker is not
    /// touched. Returns whether a request was aborted.
    pub fn cancel_uncached(&self) -> bool {
        let mut state = self.lock();
        if state.cached.is_some() {
            return false;
        }
        let Some(in_flight) = state.in_flight.take() else {
            return false;
        };
        info!(slot = %self.kind, word = %in_flight.word, "cancelling in-flight request");
        in_flight.abort.abort();
        if !in_flight.claimed {
            state.retry_word = Some(in_flight.word);
        }
        true
    }

    /// Wait for the in-flight request, if any, to land in the cache.
    pub async fn settle(&self) {
        let pending = self
            .lock()
            .in_flight
            .as_ref()
            .map(|f| (f.id, f.future.clone()));
        if let Some((id, future)) = pending {
            let result = future.await;
            finish(&self.state, self.kind, id, &result);
        }
    }

    fn start(
        &self,
        state: &mut SlotState<T>,
        word: String,
        claimed: bool,
    ) -> (u64, SharedFetch<T>) {
        let id = state.next_id;
        state.next_id += 1;

        let (request, abort) = abortable((self.fetch)(word.clone()));
        let future: SharedFetch<T> = request
            .map(|outcome| outcome.unwrap_or(Err(FetchError::Aborted)))
            .boxed()
            .shared();

        state.in_flight = Some(InFlight {
            id,
            word,
            future: future.clone(),
            abort,
            claimed,
        });

        // Drive the request even if nobody awaits it, and clear the marker
        // when it lands.
        let driver = future.clone();
        let shared_state = Arc::clone(&self.state);
        let kind = self.kind;
        tokio::spawn(async move {
            let result = driver.await;
            finish(&shared_state, kind, id, &result);
        });

        (id, future)
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Move a finished, unclaimed request into the cache (or back to the retry
/// word on failure). Only the request still marked in flight is applied.
fn finish<T: Clone>(
    state: &Mutex<SlotState<T>>,
    kind: SlotKind,
    id: u64,
    result: &Result<T, FetchError>,
) {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(in_flight) = state.in_flight.take_if(|f| f.id == id) else {
        return;
    };
    if in_flight.claimed {
        return;
    }
    match result {
        Ok(content) => {
            debug!(slot = %kind, word = %in_flight.word, "prefetched content cached");
            state.cached = Some(Served {
                word: in_flight.word,
                content: content.clone(),
            });
        }
        Err(err) => {
            warn!(slot = %kind, word = %in_flight.word, error = %err, "prefetch failed");
            state.retry_word = Some(in_flight.word);
        }
    }
}

//
// ─── ORCHESTRATOR ──────────────────────────────────────────────────────────────
//

/// The quiz and flashcard slots, fully independent of each other.
#[derive(Clone)]
pub struct RequestOrchestrator {
    quiz: PrefetchSlot<Question>,
    flashcard: PrefetchSlot<FlashcardContent>,
    cancelled: Arc<Mutex<Vec<SlotKind>>>,
}

impl RequestOrchestrator {
    #[must_use]
    pub fn new(
        fetcher: Arc<ContentFetcher>,
        quiz_words: Box<dyn WordSource>,
        flashcard_words: Box<dyn WordSource>,
    ) -> Self {
        let question_fetcher = Arc::clone(&fetcher);
        let quiz: FetchFn<Question> = Arc::new(move |word: String| {
            let fetcher = Arc::clone(&question_fetcher);
            async move { fetcher.fetch_question(&word).await }.boxed()
        });
        let flashcard: FetchFn<FlashcardContent> = Arc::new(move |word: String| {
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.fetch_flashcard(&word).await }.boxed()
        });

        Self::from_slots(
            PrefetchSlot::new(SlotKind::Quiz, quiz_words, quiz),
            PrefetchSlot::new(SlotKind::Flashcard, flashcard_words, flashcard),
        )
    }

    #[must_use]
    pub fn from_slots(
        quiz: PrefetchSlot<Question>,
        flashcard: PrefetchSlot<FlashcardContent>,
    ) -> Self {
        Self {
            quiz,
            flashcard,
            cancelled: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> &PrefetchSlot<Question> {
        &self.quiz
    }

    #[must_use]
    pub fn flashcard(&self) -> &PrefetchSlot<FlashcardContent> {
        &self.flashcard
    }

    pub fn prefetch(&self, kind: SlotKind) -> bool {
        match kind {
            SlotKind::Quiz => self.quiz.prefetch(),
            SlotKind::Flashcard => self.flashcard.prefetch(),
        }
    }

    /// Page hidden: abort requests for slots with nothing cached.
    pub fn on_hidden(&self) {
        let mut cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        if self.quiz.cancel_uncached() {
            cancelled.push(SlotKind::Quiz);
        }
        if self.flashcard.cancel_uncached() {
            cancelled.push(SlotKind::Flashcard);
        }
    }

    /// Page visible again: restart the prefetches cancelled on hide.
    pub fn on_visible(&self) {
        let kinds: Vec<SlotKind> = self
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for kind in kinds {
            self.prefetch(kind);
        }
    }
}
