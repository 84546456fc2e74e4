// src/lib.rs
// cardsched - spaced-repetition scheduling for quiz-study flash cards.
//
// The scheduler is a pure function over one card record. Storage, clocks and session
// ordering live around it so the boundary layer can persist and serve cards.

pub mod card;
pub mod clock;
pub mod config;
pub mod debug;
pub mod due;
pub mod error;
pub mod grading;
pub mod scheduler;
pub mod stats;
pub mod storage;

pub use card::{CardKey, CardRecord, CardState, Quality};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{GradingThresholds, LeechAction, SchedulerConfig, SchedulerParams};
pub use due::{build_session, interval_description, is_due, is_overdue, SessionLimits};
pub use error::{ConfigError, SchedulerError, StoreError};
pub use grading::suggest_grade_from_time;
pub use scheduler::{AppliedRule, Scheduler, SchedulingResult, Sm2Scheduler};
