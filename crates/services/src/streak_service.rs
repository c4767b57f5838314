use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use storage::KeyValueStore;
use vocab_core::Clock;
use vocab_core::model::{StreakBook, StreakStatus, StudyMode};

/// Both modes at a glance, for the home screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakOverview {
    pub quiz: StreakStatus,
    pub flashcard: StreakStatus,
}

struct Book {
    book: StreakBook,
    /// Bumped on every in-memory change.
    revision: u64,
}

struct Inner {
    clock: Clock,
    store: Arc<dyn KeyValueStore>,
    quota: u32,
    book: Mutex<Book>,
    /// Serializes writes and remembers the last revision that reached storage.
    persisted: tokio::sync::Mutex<u64>,
    events: broadcast::Sender<StreakStatus>,
}

/// Daily streak tracking for quiz and flashcard study.
///
/// The in-memory book is authoritative. Every change is written through to
/// the store in the background; writes are serialized and always store the
/// latest snapshot, so a slow write can never overwrite a newer one.
#[derive(Clone)]
pub struct StreakService {
    inner: Arc<Inner>,
}

impl StreakService {
    /// Load persisted streaks and apply any date rollover.
    pub async fn load(clock: Clock, store: Arc<dyn KeyValueStore>, quota: u32) -> Self {
        let entries = store.load_all().await;
        let book = StreakBook::from_entries(&entries, quota);
        let (events, _) = broadcast::channel(16);

        let service = Self {
            inner: Arc::new(Inner {
                clock,
                store,
                quota,
                book: Mutex::new(Book { book, revision: 0 }),
                persisted: tokio::sync::Mutex::new(0),
                events,
            }),
        };

        if service.roll_over() {
            service.flush().await;
        }
        service
    }

    #[must_use]
    pub fn quota(&self) -> u32 {
        self.inner.quota
    }

    /// Count one studied word and persist in the background.
    ///
    /// Completion of the daily quota is also announced to subscribers.
    pub fn record_word(&self, mode: StudyMode) -> StreakStatus {
        let today = self.inner.clock.today();
        let status = {
            let mut book = self.lock();
            let rollover = book.book.roll_over(today);
            log_broken(&rollover.broken);
            let before = book.book.record(mode).progress;
            let status = book.book.record_word(mode, self.inner.quota);
            if rollover.changed || status.progress != before || status.just_completed {
                book.revision += 1;
            }
            status
        };

        if status.just_completed {
            info!(mode = %mode, streak = status.streak, "daily goal completed");
            let _ = self.inner.events.send(status);
        }
        self.persist_in_background();
        status
    }

    #[must_use]
    pub fn status(&self, mode: StudyMode) -> StreakStatus {
        if self.roll_over() {
            self.persist_in_background();
        }
        self.lock().book.status(mode, self.inner.quota)
    }

    #[must_use]
    pub fn overview(&self) -> StreakOverview {
        StreakOverview {
            quiz: self.status(StudyMode::Quiz),
            flashcard: self.status(StudyMode::Flashcard),
        }
    }

    /// Completion events, one per mode per day.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StreakStatus> {
        self.inner.events.subscribe()
    }

    /// Zero both modes and wipe storage.
    pub async fn reset(&self) {
        let mut persisted = self.inner.persisted.lock().await;
        let revision = {
            let mut book = self.lock();
            book.book = StreakBook::default();
            book.revision += 1;
            book.revision
        };
        self.inner.store.clear().await;
        *persisted = revision;
        info!("streaks reset");
    }

    /// Write the latest snapshot if it has not reached storage yet.
    ///
    /// Returns whether storage now holds the latest snapshot.
    pub async fn flush(&self) -> bool {
        persist_latest(&self.inner).await
    }

    fn roll_over(&self) -> bool {
        let today = self.inner.clock.today();
        let mut book = self.lock();
        let rollover = book.book.roll_over(today);
        log_broken(&rollover.broken);
        if rollover.changed {
            book.revision += 1;
        }
        rollover.changed
    }

    fn persist_in_background(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            persist_latest(&inner).await;
        });
    }

    fn lock(&self) -> MutexGuard<'_, Book> {
        self.inner.book.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn persist_latest(inner: &Inner) -> bool {
    let mut persisted = inner.persisted.lock().await;
    let (revision, entries) = {
        let book = inner.book.lock().unwrap_or_else(PoisonError::into_inner);
        (book.revision, book.book.to_entries())
    };
    if revision == *persisted {
        return true;
    }

    let saves = entries
        .iter()
        .map(|(key, value)| inner.store.save(key, value));
    let confirmed = join_all(saves).await.into_iter().all(|ok| ok);
    if confirmed {
        *persisted = revision;
        debug!(revision, "streaks saved");
    } else {
        warn!(revision, "streak save was not confirmed; will retry on next change");
    }
    confirmed
}

fn log_broken(broken: &[StudyMode]) {
    for mode in broken {
        info!(mode = %mode, "streak broken after a missed day");
    }
}
