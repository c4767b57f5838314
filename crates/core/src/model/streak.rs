use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::{format_date, parse_date};

//
// ─── STORAGE KEYS ──────────────────────────────────────────────────────────────
//

/// Persisted key names. They must match the native host's key space.
pub mod keys {
    pub const QUIZ_STREAK: &str = "yds_quiz_streak";
    pub const FLASHCARD_STREAK: &str = "yds_flashcard_streak";
    pub const QUIZ_PROGRESS: &str = "yds_quiz_progress";
    pub const FLASHCARD_PROGRESS: &str = "yds_flashcard_progress";
    pub const LAST_STUDY_DATE: &str = "yds_last_study_date";
    pub const QUIZ_COMPLETED_TODAY: &str = "yds_quiz_completed_today";
    pub const FLASHCARD_COMPLETED_TODAY: &str = "yds_flashcard_completed_today";

    pub const ALL: [&str; 7] = [
        QUIZ_STREAK,
        FLASHCARD_STREAK,
        QUIZ_PROGRESS,
        FLASHCARD_PROGRESS,
        LAST_STUDY_DATE,
        QUIZ_COMPLETED_TODAY,
        FLASHCARD_COMPLETED_TODAY,
    ];
}

//
// ─── MODE ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Quiz,
    Flashcard,
}

impl StudyMode {
    pub const ALL: [StudyMode; 2] = [StudyMode::Quiz, StudyMode::Flashcard];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StudyMode::Quiz => "Quiz",
            StudyMode::Flashcard => "Flashcards",
        }
    }

    fn keys(self) -> (&'static str, &'static str, &'static str) {
        match self {
            StudyMode::Quiz => (
                keys::QUIZ_STREAK,
                keys::QUIZ_PROGRESS,
                keys::QUIZ_COMPLETED_TODAY,
            ),
            StudyMode::Flashcard => (
                keys::FLASHCARD_STREAK,
                keys::FLASHCARD_PROGRESS,
                keys::FLASHCARD_COMPLETED_TODAY,
            ),
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudyMode::Quiz => f.write_str("quiz"),
            StudyMode::Flashcard => f.write_str("flashcard"),
        }
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Daily progress and consecutive-day streak for one mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub streak: u32,
    pub progress: u32,
    pub completed_today: bool,
}

/// Result of recording a word (or querying a mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakStatus {
    pub mode: StudyMode,
    pub completed: bool,
    pub progress: u32,
    pub total: u32,
    pub streak: u32,
    pub just_completed: bool,
}

impl StreakStatus {
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.progress)
    }
}

/// What a date rollover did to the book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rollover {
    pub changed: bool,
    pub broken: Vec<StudyMode>,
}

//
// ─── BOOK ──────────────────────────────────────────────────────────────────────
//

/// Both modes plus the shared last-study date.
///
/// Pure state machine: callers supply `today` and persist the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakBook {
    quiz: StreakRecord,
    flashcard: StreakRecord,
    last_study_date: Option<NaiveDate>,
}

impl StreakBook {
    #[must_use]
    pub fn new(
        quiz: StreakRecord,
        flashcard: StreakRecord,
        last_study_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            quiz,
            flashcard,
            last_study_date,
        }
    }

    #[must_use]
    pub fn record(&self, mode: StudyMode) -> &StreakRecord {
        match mode {
            StudyMode::Quiz => &self.quiz,
            StudyMode::Flashcard => &self.flashcard,
        }
    }

    fn record_mut(&mut self, mode: StudyMode) -> &mut StreakRecord {
        match mode {
            StudyMode::Quiz => &mut self.quiz,
            StudyMode::Flashcard => &mut self.flashcard,
        }
    }

    #[must_use]
    pub fn last_study_date(&self) -> Option<NaiveDate> {
        self.last_study_date
    }

    /// Reset daily progress when `today` differs from the last study date.
    ///
    /// A gap of more than one day breaks the streak of every mode that had not
    /// completed its quota on the last study date. A last study date in the
    /// future (clock moved backwards) resets progress without breaking streaks.
    /// Idempotent for a given `today`.
    pub fn roll_over(&mut self, today: NaiveDate) -> Rollover {
        if self.last_study_date == Some(today) {
            return Rollover::default();
        }

        let mut broken = Vec::new();
        if let Some(last) = self.last_study_date {
            if (today - last).num_days() > 1 {
                for mode in StudyMode::ALL {
                    let record = self.record_mut(mode);
                    if !record.completed_today {
                        record.streak = 0;
                        broken.push(mode);
                    }
                }
            }
        }

        for mode in StudyMode::ALL {
            let record = self.record_mut(mode);
            record.progress = 0;
            record.completed_today = false;
        }
        self.last_study_date = Some(today);

        Rollover {
            changed: true,
            broken,
        }
    }

    /// Count one studied word for `mode`.
    ///
    /// Reaching `quota` marks the day complete and bumps the streak once;
    /// later calls on the same day are no-ops.
    pub fn record_word(&mut self, mode: StudyMode, quota: u32) -> StreakStatus {
        let record = self.record_mut(mode);
        if record.completed_today {
            return self.status(mode, quota);
        }

        record.progress = record.progress.saturating_add(1).min(quota);
        let just_completed = record.progress >= quota;
        if just_completed {
            record.completed_today = true;
            record.streak = record.streak.saturating_add(1);
        }

        StreakStatus {
            just_completed,
            ..self.status(mode, quota)
        }
    }

    #[must_use]
    pub fn status(&self, mode: StudyMode, quota: u32) -> StreakStatus {
        let record = self.record(mode);
        StreakStatus {
            mode,
            completed: record.completed_today,
            progress: record.progress,
            total: quota,
            streak: record.streak,
            just_completed: false,
        }
    }

    /// Flatten into the seven persisted key/value pairs.
    #[must_use]
    pub fn to_entries(&self) -> Vec<(&'static str, String)> {
        let mut entries = Vec::with_capacity(keys::ALL.len());
        for mode in StudyMode::ALL {
            let (streak_key, progress_key, completed_key) = mode.keys();
            let record = self.record(mode);
            entries.push((streak_key, record.streak.to_string()));
            entries.push((progress_key, record.progress.to_string()));
            entries.push((completed_key, record.completed_today.to_string()));
        }
        entries.push((
            keys::LAST_STUDY_DATE,
            self.last_study_date.map(format_date).unwrap_or_default(),
        ));
        entries
    }

    /// Rebuild from persisted pairs; missing or malformed values fall back to zero/false.
    ///
    /// Progress is capped at `quota`; a day whose stored progress already
    /// meets `quota` counts as completed without touching the streak.
    #[must_use]
    pub fn from_entries(entries: &HashMap<String, String>, quota: u32) -> Self {
        let number = |key: &str| {
            entries
                .get(key)
                .and_then(|raw| raw.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        let flag = |key: &str| entries.get(key).is_some_and(|raw| raw == "true");

        let mut book = Self {
            last_study_date: entries
                .get(keys::LAST_STUDY_DATE)
                .and_then(|raw| parse_date(raw)),
            ..Self::default()
        };
        for mode in StudyMode::ALL {
            let (streak_key, progress_key, completed_key) = mode.keys();
            let progress = number(progress_key);
            *book.record_mut(mode) = StreakRecord {
                streak: number(streak_key),
                progress: progress.min(quota),
                completed_today: flag(completed_key) || progress >= quota,
            };
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const QUOTA: u32 = 20;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, n).unwrap()
    }

    #[test]
    fn twentieth_word_completes_the_day_once() {
        let mut book = StreakBook::default();
        book.roll_over(day(1));

        for _ in 0..19 {
            let status = book.record_word(StudyMode::Quiz, QUOTA);
            assert!(!status.completed);
        }
        let status = book.record_word(StudyMode::Quiz, QUOTA);
        assert!(status.completed);
        assert!(status.just_completed);
        assert_eq!(status.streak, 1);
        assert_eq!(status.progress, 20);

        let again = book.record_word(StudyMode::Quiz, QUOTA);
        assert!(again.completed);
        assert!(!again.just_completed);
        assert_eq!(again.streak, 1);
        assert_eq!(again.progress, 20);

        assert_eq!(book.record(StudyMode::Flashcard).progress, 0);
    }

    #[test]
    fn two_day_gap_breaks_incomplete_streak() {
        let quiz = StreakRecord {
            streak: 4,
            progress: 7,
            completed_today: false,
        };
        let flashcard = StreakRecord {
            streak: 3,
            progress: 20,
            completed_today: true,
        };
        let mut book = StreakBook::new(quiz, flashcard, Some(day(10) - Duration::days(2)));

        let rollover = book.roll_over(day(10));
        assert!(rollover.changed);
        assert_eq!(rollover.broken, vec![StudyMode::Quiz]);
        assert_eq!(book.record(StudyMode::Quiz).streak, 0);
        assert_eq!(book.record(StudyMode::Quiz).progress, 0);
        assert_eq!(book.record(StudyMode::Flashcard).streak, 3);
        assert!(!book.record(StudyMode::Flashcard).completed_today);
        assert_eq!(book.last_study_date(), Some(day(10)));
    }

    #[test]
    fn one_day_gap_preserves_streak() {
        let quiz = StreakRecord {
            streak: 4,
            progress: 7,
            completed_today: false,
        };
        let mut book = StreakBook::new(quiz, StreakRecord::default(), Some(day(9)));
        let rollover = book.roll_over(day(10));
        assert!(rollover.broken.is_empty());
        assert_eq!(book.record(StudyMode::Quiz).streak, 4);
        assert_eq!(book.record(StudyMode::Quiz).progress, 0);
    }

    #[test]
    fn rollover_is_idempotent_within_a_day() {
        let mut book = StreakBook::new(
            StreakRecord {
                streak: 2,
                progress: 5,
                completed_today: false,
            },
            StreakRecord::default(),
            Some(day(1)),
        );
        assert!(book.roll_over(day(5)).changed);
        book.record_word(StudyMode::Quiz, QUOTA);
        let snapshot = book.clone();
        assert!(!book.roll_over(day(5)).changed);
        assert_eq!(book, snapshot);
    }

    #[test]
    fn future_last_date_does_not_break_streaks() {
        let mut book = StreakBook::new(
            StreakRecord {
                streak: 6,
                progress: 3,
                completed_today: false,
            },
            StreakRecord::default(),
            Some(day(20)),
        );
        let rollover = book.roll_over(day(10));
        assert!(rollover.broken.is_empty());
        assert_eq!(book.record(StudyMode::Quiz).streak, 6);
        assert_eq!(book.record(StudyMode::Quiz).progress, 0);
    }

    #[test]
    fn entries_round_trip_and_tolerate_garbage() {
        let mut book = StreakBook::default();
        book.roll_over(day(3));
        book.record_word(StudyMode::Flashcard, 1);

        let entries: HashMap<String, String> = book
            .to_entries()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(entries.len(), keys::ALL.len());
        assert_eq!(entries[keys::LAST_STUDY_DATE], "2024-05-03");
        assert_eq!(entries[keys::FLASHCARD_COMPLETED_TODAY], "true");
        assert_eq!(StreakBook::from_entries(&entries, 1), book);

        let mut garbage = HashMap::new();
        garbage.insert(keys::QUIZ_STREAK.to_string(), "lots".to_string());
        garbage.insert(keys::QUIZ_PROGRESS.to_string(), "99".to_string());
        garbage.insert(keys::LAST_STUDY_DATE.to_string(), String::new());
        let parsed = StreakBook::from_entries(&garbage, QUOTA);
        assert_eq!(parsed.record(StudyMode::Quiz).streak, 0);
        assert_eq!(parsed.record(StudyMode::Quiz).progress, QUOTA);
        assert_eq!(parsed.last_study_date(), None);
    }

    #[test]
    fn lowered_quota_keeps_progress_in_range() {
        let mut stored = HashMap::new();
        stored.insert(keys::QUIZ_STREAK.to_string(), "4".to_string());
        stored.insert(keys::QUIZ_PROGRESS.to_string(), "5".to_string());
        stored.insert(keys::QUIZ_COMPLETED_TODAY.to_string(), "false".to_string());
        stored.insert(keys::LAST_STUDY_DATE.to_string(), "2024-05-03".to_string());

        let mut book = StreakBook::from_entries(&stored, 3);
        let loaded = book.status(StudyMode::Quiz, 3);
        assert_eq!(loaded.progress, 3);
        assert!(loaded.completed);
        assert_eq!(loaded.streak, 4);

        book.roll_over(day(3));
        let status = book.record_word(StudyMode::Quiz, 3);
        assert!(status.progress <= status.total);
        assert!(!status.just_completed);
        assert_eq!(status.streak, 4);
    }
}
