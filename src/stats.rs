// src/stats.rs
// Per-card progress summaries shown next to a question.

use serde::Serialize;

use crate::card::CardRecord;

const MASTER_MIN_REPETITIONS: u32 = 3;
const MASTER_MIN_EASE: f64 = 2.3;
const MATURE_INTERVAL_DAYS: f64 = 21.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    New,
    Apprentice,
    Guru,
    Master,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningStatus {
    New,
    Learning,
    Mature,
}

/// Share of answers that were graded Good or better, as a rounded percentage.
pub fn accuracy_percent(card: &CardRecord) -> u32 {
    if card.times_answered == 0 {
        return 0;
    }
    (card.times_correct as f64 / card.times_answered as f64 * 100.0).round() as u32
}

pub fn mastery_level(card: &CardRecord) -> MasteryLevel {
    if card.repetitions == 0 {
        return MasteryLevel::New;
    }
    let seasoned =
        card.repetitions >= MASTER_MIN_REPETITIONS && card.ease_factor >= MASTER_MIN_EASE;
    if seasoned && card.interval >= MATURE_INTERVAL_DAYS {
        MasteryLevel::Master
    } else if seasoned {
        MasteryLevel::Guru
    } else {
        MasteryLevel::Apprentice
    }
}

pub fn learning_status(card: &CardRecord) -> LearningStatus {
    if card.repetitions == 0 {
        LearningStatus::New
    } else if card.interval < MATURE_INTERVAL_DAYS {
        LearningStatus::Learning
    } else {
        LearningStatus::Mature
    }
}
