// src/card.rs
// The review record kept for every (user, question) pair.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SchedulerConfig;
use crate::error::SchedulerError;

/// Where a card sits in the review life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CardState {
    New,
    Learning,
    Review,
    Relearning,
    Suspended,
}

impl CardState {
    /// The tag used when the state is persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardState::New => "new",
            CardState::Learning => "learning",
            CardState::Review => "review",
            CardState::Relearning => "relearning",
            CardState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardState {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(CardState::New),
            "learning" => Ok(CardState::Learning),
            "review" => Ok(CardState::Review),
            "relearning" => Ok(CardState::Relearning),
            "suspended" => Ok(CardState::Suspended),
            other => Err(SchedulerError::InvalidState(other.to_string())),
        }
    }
}

impl TryFrom<String> for CardState {
    type Error = SchedulerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CardState> for String {
    fn from(state: CardState) -> Self {
        state.as_str().to_string()
    }
}

/// Represents how well a review went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Quality {
    Again = 0,
    Hard = 1,
    Good = 2,
    Easy = 3,
}

impl TryFrom<i64> for Quality {
    type Error = SchedulerError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Again),
            1 => Ok(Quality::Hard),
            2 => Ok(Quality::Good),
            3 => Ok(Quality::Easy),
            other => Err(SchedulerError::InvalidQuality(other)),
        }
    }
}

impl From<Quality> for i64 {
    fn from(quality: Quality) -> Self {
        quality as i64
    }
}

/// Identifies the owner of a [`CardRecord`]. Records for different keys are independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardKey {
    pub user_id: String,
    pub question_id: i64,
}

impl CardKey {
    pub fn new(user_id: impl Into<String>, question_id: i64) -> Self {
        Self {
            user_id: user_id.into(),
            question_id,
        }
    }
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.user_id, self.question_id)
    }
}

/// The review state of one card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub state: CardState,
    /// Index into the active step table; only meaningful while learning or relearning.
    pub current_step: usize,
    pub ease_factor: f64,
    /// Days until the next review. Learning steps produce fractional values.
    pub interval: f64,
    pub repetitions: u32,
    pub lapses: u32,
    pub last_review_date: Option<DateTime<Utc>>,
    pub last_answered: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub times_answered: u32,
    pub times_correct: u32,
    #[serde(default)]
    pub starred: bool,
}

impl CardRecord {
    /// A card that has never been reviewed.
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            state: CardState::New,
            current_step: 0,
            ease_factor: config.params().starting_ease_factor,
            interval: config.params().graduating_interval,
            repetitions: 0,
            lapses: 0,
            last_review_date: None,
            last_answered: None,
            next_review: None,
            times_answered: 0,
            times_correct: 0,
            starred: false,
        }
    }
}

impl Default for CardRecord {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}
