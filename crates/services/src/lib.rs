#![forbid(unsafe_code)]

pub mod app_services;
pub mod content;
pub mod error;
pub mod orchestrator;
pub mod resilience;
pub mod sessions;
pub mod streak_service;

pub use vocab_core::Clock;

pub use app_services::{AppServices, LifecycleEvent, ServiceParts};
pub use error::{AppServicesError, FetchError, StudyError};
pub use orchestrator::{PrefetchSlot, RequestOrchestrator, Served, SlotKind, WordSource};
pub use resilience::{CircuitBreaker, ConnectionMonitor, ConnectionQuality, ConnectionState};
pub use sessions::{Debouncer, FlashcardCard, FlashcardFlow, QuizAnswer, QuizFlow};
pub use streak_service::{StreakOverview, StreakService};
