// src/due.rs
// Due-queries and review-session ordering used by the presentation layer.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::card::{CardRecord, CardState};
use crate::config::SchedulerConfig;

/// True for cards that should be shown now. New cards are always due.
pub fn is_due(card: &CardRecord, now: DateTime<Utc>) -> bool {
    if card.state == CardState::New {
        return true;
    }
    match card.next_review {
        Some(next_review) => next_review <= now,
        None => false,
    }
}

/// True when a scheduled card is more than one day past its review time.
pub fn is_overdue(card: &CardRecord, now: DateTime<Utc>) -> bool {
    if card.state == CardState::New {
        return false;
    }
    card.next_review
        .map_or(false, |next_review| now - next_review > Duration::days(1))
}

/// Short human-readable form of an interval given in days: `10m`, `4d`, `3mo`, `2y`.
///
/// Anything that is not a positive finite number of days renders as `0m`.
pub fn interval_description(interval_days: f64) -> String {
    if !interval_days.is_finite() || interval_days <= 0.0 {
        "0m".to_string()
    } else if interval_days < 1.0 {
        format!("{}m", (interval_days * 24.0 * 60.0).round() as i64)
    } else if interval_days < 30.0 {
        format!("{}d", interval_days.round() as i64)
    } else if interval_days < 365.0 {
        format!("{}mo", (interval_days / 30.44).round() as i64)
    } else {
        format!("{}y", (interval_days / 365.25).round() as i64)
    }
}

/// Per-session caps on the number of cards served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub new_cards: usize,
    pub review_cards: usize,
}

impl SessionLimits {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            new_cards: config.params().daily_new_cards,
            review_cards: config.params().daily_review_cards,
        }
    }
}

/// Priority bucket of a due card. Lower buckets are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Starred,
    Overdue,
    DueToday,
    New,
}

/// Classifies a card for session building; `None` if it should not be shown.
pub fn priority(card: &CardRecord, now: DateTime<Utc>) -> Option<Priority> {
    if card.state == CardState::Suspended || !is_due(card, now) {
        return None;
    }
    if card.starred {
        Some(Priority::Starred)
    } else if card.state == CardState::New {
        Some(Priority::New)
    } else if is_overdue(card, now) {
        Some(Priority::Overdue)
    } else {
        Some(Priority::DueToday)
    }
}

/// Picks and orders the cards for one study session.
///
/// Starred cards come first, then overdue, then due today, then new. Scheduled cards in a
/// bucket are served oldest `next_review` first; new cards are shuffled.
/// New-state cards count against `limits.new_cards`, everything else against
/// `limits.review_cards`.
pub fn build_session<K: Clone, R: Rng + ?Sized>(
    cards: &[(K, CardRecord)],
    now: DateTime<Utc>,
    limits: SessionLimits,
    rng: &mut R,
) -> Vec<K> {
    let mut buckets: [Vec<&(K, CardRecord)>; 4] = Default::default();
    for entry in cards {
        if let Some(p) = priority(&entry.1, now) {
            buckets[p as usize].push(entry);
        }
    }

    for bucket in &mut buckets[..Priority::New as usize] {
        bucket.sort_by_key(|(_, card)| card.next_review);
    }
    buckets[Priority::New as usize].shuffle(rng);

    let mut new_taken = 0;
    let mut review_taken = 0;
    let mut session = Vec::new();
    for (key, card) in buckets.iter().flatten() {
        if card.state == CardState::New {
            if new_taken >= limits.new_cards {
                continue;
            }
            new_taken += 1;
        } else {
            if review_taken >= limits.review_cards {
                continue;
            }
            review_taken += 1;
        }
        session.push(key.clone());
    }

    log::debug!(
        "Built session of {} cards ({} new, {} review) from {} candidates",
        session.len(),
        new_taken,
        review_taken,
        cards.len()
    );
    session
}
