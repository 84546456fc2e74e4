// src/scheduler.rs
// Contains the logic for the spaced repetition system.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::card::{CardRecord, CardState, Quality};
use crate::config::{LeechAction, SchedulerConfig};
use crate::error::SchedulerError;

/// Smallest interval a learning step can produce, in days (about 1.4 minutes).
pub const MIN_STEP_INTERVAL_DAYS: f64 = 0.001;

const MINUTES_PER_DAY: f64 = 24.0 * 60.0;
const MILLIS_PER_DAY: f64 = 24.0 * 60.0 * 60.0 * 1000.0;

/// The rules that can fire during a scheduling call, in the order they fired.
/// Diagnostic only; nothing downstream branches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedRule {
    EnteredLearning,
    AgainRestart,
    EasyGraduation,
    EaseBonus,
    LearningAgainRestart,
    EasyGraduationFromLearning,
    LearningHardRepeat,
    LearningStepAdvanced,
    GraduatedToReview,
    #[serde(rename = "failed_interval_reduced_4x")]
    FailedIntervalReduced4x,
    EasePenaltyAgain,
    LapseRecorded,
    LeechDetected,
    LeechSuspended,
    EasePenaltyHard,
    HardIntervalMultiplier,
    EaseBonusEasy,
    EasyBonusMultiplier,
    GoodStandardProgression,
    IntervalModifier,
    #[serde(rename = "relearning_again_reduced_4x")]
    RelearningAgainReduced4x,
    RelearningEasyGraduation,
    RelearningGraduated,
    RelearningStepAdvanced,
}

impl AppliedRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppliedRule::EnteredLearning => "entered_learning",
            AppliedRule::AgainRestart => "again_restart",
            AppliedRule::EasyGraduation => "easy_graduation",
            AppliedRule::EaseBonus => "ease_bonus",
            AppliedRule::LearningAgainRestart => "learning_again_restart",
            AppliedRule::EasyGraduationFromLearning => "easy_graduation_from_learning",
            AppliedRule::LearningHardRepeat => "learning_hard_repeat",
            AppliedRule::LearningStepAdvanced => "learning_step_advanced",
            AppliedRule::GraduatedToReview => "graduated_to_review",
            AppliedRule::FailedIntervalReduced4x => "failed_interval_reduced_4x",
            AppliedRule::EasePenaltyAgain => "ease_penalty_again",
            AppliedRule::LapseRecorded => "lapse_recorded",
            AppliedRule::LeechDetected => "leech_detected",
            AppliedRule::LeechSuspended => "leech_suspended",
            AppliedRule::EasePenaltyHard => "ease_penalty_hard",
            AppliedRule::HardIntervalMultiplier => "hard_interval_multiplier",
            AppliedRule::EaseBonusEasy => "ease_bonus_easy",
            AppliedRule::EasyBonusMultiplier => "easy_bonus_multiplier",
            AppliedRule::GoodStandardProgression => "good_standard_progression",
            AppliedRule::IntervalModifier => "interval_modifier",
            AppliedRule::RelearningAgainReduced4x => "relearning_again_reduced_4x",
            AppliedRule::RelearningEasyGraduation => "relearning_easy_graduation",
            AppliedRule::RelearningGraduated => "relearning_graduated",
            AppliedRule::RelearningStepAdvanced => "relearning_step_advanced",
        }
    }
}

/// Audit record describing one scheduling call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingResult {
    pub from_state: CardState,
    pub to_state: CardState,
    pub prev_interval: f64,
    pub next_interval: f64,
    pub next_review: DateTime<Utc>,
    pub ease_factor: f64,
    pub quality: Quality,
    pub response_time_ms: Option<u64>,
    pub applied_rules: Vec<AppliedRule>,
}

/// A trait defining the core behavior of any scheduling algorithm.
pub trait Scheduler {
    fn config(&self) -> &SchedulerConfig;

    /// Computes the next state of `card` after a review graded `quality` at `now`.
    /// The input record is left untouched; the caller persists the returned one.
    fn schedule(
        &self,
        card: &CardRecord,
        quality: Quality,
        response_time_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(CardRecord, SchedulingResult), SchedulerError>;
}

/// The step-based SM-2 variant used by the quiz app.
///
/// Review lapses cut the interval to a quarter instead of restarting from the first
/// learning step.
#[derive(Debug, Clone, Default)]
pub struct Sm2Scheduler {
    config: SchedulerConfig,
}

impl Sm2Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Same as [`Scheduler::schedule`] but accepts an unvalidated integer grade.
    pub fn schedule_raw(
        &self,
        card: &CardRecord,
        quality: i64,
        response_time_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(CardRecord, SchedulingResult), SchedulerError> {
        let quality = Quality::try_from(quality)?;
        self.schedule(card, quality, response_time_ms, now)
    }

    fn handle_new(&self, card: &mut CardRecord, quality: Quality, applied: &mut Vec<AppliedRule>) {
        if quality == Quality::Easy {
            self.easy_graduate(card);
            applied.extend([AppliedRule::EasyGraduation, AppliedRule::EaseBonus]);
            return;
        }

        // Again, Hard and Good all start the learning steps from the top.
        card.state = CardState::Learning;
        card.current_step = 0;
        card.interval = self.learning_step(0);
        applied.push(AppliedRule::EnteredLearning);
        if quality == Quality::Again {
            applied.push(AppliedRule::AgainRestart);
        }
    }

    fn handle_learning(&self, card: &mut CardRecord, quality: Quality, applied: &mut Vec<AppliedRule>) {
        match quality {
            Quality::Again => {
                card.current_step = 0;
                card.interval = self.learning_step(0);
                applied.push(AppliedRule::LearningAgainRestart);
            }
            Quality::Easy => {
                self.easy_graduate(card);
                applied.extend([AppliedRule::EasyGraduationFromLearning, AppliedRule::EaseBonus]);
            }
            Quality::Hard if card.current_step > 0 => {
                card.interval = self.learning_step(card.current_step);
                applied.push(AppliedRule::LearningHardRepeat);
            }
            // Good, or Hard on the first step.
            Quality::Hard | Quality::Good => {
                card.current_step += 1;
                if card.current_step >= self.config.params().learning_steps.len() {
                    card.state = CardState::Review;
                    card.current_step = 0;
                    card.interval = self.config.params().graduating_interval;
                    card.ease_factor = self.config.params().starting_ease_factor;
                    card.repetitions = 1;
                    applied.push(AppliedRule::GraduatedToReview);
                } else {
                    card.interval = self.learning_step(card.current_step);
                    applied.push(AppliedRule::LearningStepAdvanced);
                }
            }
        }
    }

    fn handle_review(&self, card: &mut CardRecord, quality: Quality, applied: &mut Vec<AppliedRule>) {
        let p = self.config.params();
        let old_interval = card.interval;

        if quality == Quality::Again {
            card.state = CardState::Relearning;
            card.current_step = 0;
            card.lapses += 1;
            card.ease_factor = self.config.clamp_ease(card.ease_factor + p.again_penalty);
            card.interval = (old_interval / 4.0).clamp(1.0, p.max_interval);
            applied.extend([
                AppliedRule::FailedIntervalReduced4x,
                AppliedRule::EasePenaltyAgain,
                AppliedRule::LapseRecorded,
            ]);

            if card.lapses >= p.leech_threshold {
                applied.push(AppliedRule::LeechDetected);
                log::warn!("Leech detected after {} lapses", card.lapses);
                if p.leech_action == LeechAction::Suspend {
                    card.state = CardState::Suspended;
                    applied.push(AppliedRule::LeechSuspended);
                }
            }
            return;
        }

        card.repetitions += 1;
        let interval = match quality {
            Quality::Hard => {
                card.ease_factor = self.config.clamp_ease(card.ease_factor + p.hard_penalty);
                applied.extend([AppliedRule::EasePenaltyHard, AppliedRule::HardIntervalMultiplier]);
                (old_interval * p.hard_interval_multiplier).round().max(1.0)
            }
            Quality::Easy => {
                card.ease_factor = self.config.clamp_ease(card.ease_factor + p.easy_bonus_ease);
                applied.extend([AppliedRule::EaseBonusEasy, AppliedRule::EasyBonusMultiplier]);
                (old_interval * card.ease_factor * p.easy_bonus).round()
            }
            _ => {
                applied.push(AppliedRule::GoodStandardProgression);
                (old_interval * card.ease_factor).round()
            }
        };

        card.interval = (interval * p.interval_modifier)
            .round()
            .clamp(1.0, p.max_interval);
        if p.interval_modifier != 1.0 {
            applied.push(AppliedRule::IntervalModifier);
        }
    }

    fn handle_relearning(&self, card: &mut CardRecord, quality: Quality, applied: &mut Vec<AppliedRule>) {
        let p = self.config.params();

        match quality {
            Quality::Again => {
                card.current_step = 0;
                card.interval = (card.interval / 4.0).clamp(1.0, p.max_interval);
                applied.push(AppliedRule::RelearningAgainReduced4x);
            }
            Quality::Easy => {
                card.state = CardState::Review;
                card.current_step = 0;
                card.interval = (card.interval * p.easy_bonus).round().clamp(1.0, p.max_interval);
                card.ease_factor = self.config.clamp_ease(card.ease_factor + p.easy_bonus_ease);
                applied.extend([AppliedRule::RelearningEasyGraduation, AppliedRule::EaseBonus]);
            }
            Quality::Hard | Quality::Good => {
                card.current_step += 1;
                if card.current_step >= p.relearning_steps.len() {
                    card.state = CardState::Review;
                    card.current_step = 0;
                    // Keeps the reduced lapse interval; only sub-day step values are lifted.
                    card.interval = card.interval.clamp(1.0, p.max_interval);
                    applied.push(AppliedRule::RelearningGraduated);
                } else {
                    card.interval = self.relearning_step(card.current_step);
                    applied.push(AppliedRule::RelearningStepAdvanced);
                }
            }
        }
    }

    fn easy_graduate(&self, card: &mut CardRecord) {
        let p = self.config.params();
        card.state = CardState::Review;
        card.current_step = 0;
        card.interval = p.easy_interval;
        card.ease_factor = self.config.clamp_ease(p.starting_ease_factor + p.easy_bonus_ease);
        card.repetitions = 1;
    }

    fn learning_step(&self, index: usize) -> f64 {
        step_interval(&self.config.params().learning_steps, index)
    }

    fn relearning_step(&self, index: usize) -> f64 {
        step_interval(&self.config.params().relearning_steps, index)
    }
}

impl Scheduler for Sm2Scheduler {
    fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn schedule(
        &self,
        card: &CardRecord,
        quality: Quality,
        response_time_ms: Option<u64>,
        now: DateTime<Utc>,
    ) -> Result<(CardRecord, SchedulingResult), SchedulerError> {
        if card.state == CardState::Suspended {
            return Err(SchedulerError::Suspended);
        }

        let mut next = card.clone();
        let mut applied = Vec::new();

        next.times_answered += 1;
        next.last_answered = Some(now);
        next.last_review_date = Some(now);
        if quality >= Quality::Good {
            next.times_correct += 1;
        }

        match card.state {
            CardState::New => self.handle_new(&mut next, quality, &mut applied),
            CardState::Learning => self.handle_learning(&mut next, quality, &mut applied),
            CardState::Review => self.handle_review(&mut next, quality, &mut applied),
            CardState::Relearning => self.handle_relearning(&mut next, quality, &mut applied),
            CardState::Suspended => return Err(SchedulerError::Suspended),
        }

        let next_review = next_review_at(now, next.interval);
        next.next_review = Some(next_review);

        log::debug!(
            "Scheduled {:?}: {} -> {}, interval {:.3} -> {:.3} days",
            quality,
            card.state,
            next.state,
            card.interval,
            next.interval
        );

        let result = SchedulingResult {
            from_state: card.state,
            to_state: next.state,
            prev_interval: card.interval,
            next_interval: next.interval,
            next_review,
            ease_factor: next.ease_factor,
            quality,
            response_time_ms,
            applied_rules: applied,
        };
        Ok((next, result))
    }
}

/// Converts a step length in minutes to days, never going below [`MIN_STEP_INTERVAL_DAYS`].
pub fn minutes_to_days(minutes: f64) -> f64 {
    (minutes / MINUTES_PER_DAY).max(MIN_STEP_INTERVAL_DAYS)
}

fn step_interval(steps: &[f64], index: usize) -> f64 {
    // Steps can shrink between configurations; stay on the last one if so.
    let minutes = steps.get(index).or_else(|| steps.last()).copied().unwrap_or(1.0);
    minutes_to_days(minutes)
}

/// Saturates at the latest representable instant instead of overflowing.
fn next_review_at(now: DateTime<Utc>, interval_days: f64) -> DateTime<Utc> {
    let millis = (interval_days * MILLIS_PER_DAY).round() as i64;
    Duration::try_milliseconds(millis)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerParams;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn review_card(interval: f64, ease: f64, lapses: u32) -> CardRecord {
        CardRecord {
            state: CardState::Review,
            interval,
            ease_factor: ease,
            lapses,
            repetitions: 3,
            ..CardRecord::default()
        }
    }

    fn scheduler_with(params: SchedulerParams) -> Sm2Scheduler {
        Sm2Scheduler::new(SchedulerConfig::new(params).unwrap())
    }

    #[test]
    fn test_new_easy_graduates_directly() {
        let params = SchedulerParams {
            max_ease_factor: 3.0,
            ..SchedulerParams::default()
        };
        let scheduler = scheduler_with(params.clone());
        let (card, result) = scheduler
            .schedule(&CardRecord::default(), Quality::Easy, None, now())
            .unwrap();

        assert_eq!(result.to_state, CardState::Review);
        assert!(approx(result.next_interval, params.easy_interval));
        assert!(approx(card.ease_factor, params.starting_ease_factor + params.easy_bonus_ease));
        assert_eq!(card.repetitions, 1);
        assert_eq!(result.applied_rules, vec![AppliedRule::EasyGraduation, AppliedRule::EaseBonus]);
    }

    #[test]
    fn test_new_easy_ease_is_capped_by_default_max() {
        let scheduler = Sm2Scheduler::default();
        let (card, _) = scheduler
            .schedule(&CardRecord::default(), Quality::Easy, None, now())
            .unwrap();
        assert!(approx(card.ease_factor, 2.5));
        assert!(approx(card.interval, 4.0));
    }

    #[test]
    fn test_new_non_easy_enters_learning() {
        let scheduler = Sm2Scheduler::default();
        for quality in [Quality::Again, Quality::Hard, Quality::Good] {
            let (card, result) = scheduler
                .schedule(&CardRecord::default(), quality, None, now())
                .unwrap();
            assert_eq!(card.state, CardState::Learning);
            assert_eq!(card.current_step, 0);
            assert!(approx(card.interval, MIN_STEP_INTERVAL_DAYS));
            assert_eq!(result.applied_rules[0], AppliedRule::EnteredLearning);
        }
    }

    #[test]
    fn test_good_through_learning_steps_graduates() {
        let scheduler = Sm2Scheduler::default();
        let steps = scheduler.config().params().learning_steps.len();

        let mut card = CardRecord::default();
        // The first Good moves a New card onto step 0; each further Good advances one step.
        let (c, _) = scheduler.schedule(&card, Quality::Good, None, now()).unwrap();
        card = c;
        let mut last = None;
        for _ in 0..steps {
            let (c, r) = scheduler.schedule(&card, Quality::Good, None, now()).unwrap();
            card = c;
            last = Some(r);
        }

        let result = last.unwrap();
        assert_eq!(result.to_state, CardState::Review);
        assert!(approx(result.next_interval, 1.0));
        assert!(approx(card.ease_factor, 2.5));
        assert_eq!(card.repetitions, 1);
        assert!(result.applied_rules.contains(&AppliedRule::GraduatedToReview));
    }

    #[test]
    fn test_learning_step_advance_and_hard_repeat() {
        let scheduler = Sm2Scheduler::default();
        let learning = CardRecord {
            state: CardState::Learning,
            current_step: 0,
            interval: minutes_to_days(1.0),
            ..CardRecord::default()
        };

        // Hard on the first step advances.
        let (card, result) = scheduler.schedule(&learning, Quality::Hard, None, now()).unwrap();
        assert_eq!(card.current_step, 1);
        assert!(approx(card.interval, 10.0 / 1440.0));
        assert_eq!(result.applied_rules, vec![AppliedRule::LearningStepAdvanced]);

        // Hard on a later step repeats it.
        let (card, result) = scheduler.schedule(&card, Quality::Hard, None, now()).unwrap();
        assert_eq!(card.state, CardState::Learning);
        assert_eq!(card.current_step, 1);
        assert!(approx(card.interval, 10.0 / 1440.0));
        assert_eq!(result.applied_rules, vec![AppliedRule::LearningHardRepeat]);

        // Again goes back to the first step.
        let (card, _) = scheduler.schedule(&card, Quality::Again, None, now()).unwrap();
        assert_eq!(card.current_step, 0);
        assert!(approx(card.interval, minutes_to_days(1.0)));
    }

    #[test]
    fn test_learning_easy_graduates_early() {
        let scheduler = Sm2Scheduler::default();
        let learning = CardRecord {
            state: CardState::Learning,
            current_step: 1,
            ..CardRecord::default()
        };
        let (card, result) = scheduler.schedule(&learning, Quality::Easy, None, now()).unwrap();
        assert_eq!(card.state, CardState::Review);
        assert!(approx(card.interval, 4.0));
        assert_eq!(card.repetitions, 1);
        assert_eq!(
            result.applied_rules,
            vec![AppliedRule::EasyGraduationFromLearning, AppliedRule::EaseBonus]
        );
    }

    #[test]
    fn test_review_hard_scenario() {
        let scheduler = Sm2Scheduler::default();
        let (card, result) = scheduler
            .schedule(&review_card(10.0, 2.5, 0), Quality::Hard, None, now())
            .unwrap();
        assert!(approx(card.ease_factor, 2.35));
        assert!(approx(card.interval, 12.0));
        assert_eq!(card.repetitions, 4);
        assert_eq!(result.to_state, CardState::Review);
    }

    #[test]
    fn test_review_again_scenario() {
        let scheduler = Sm2Scheduler::default();
        let (card, result) = scheduler
            .schedule(&review_card(10.0, 2.5, 0), Quality::Again, None, now())
            .unwrap();
        assert_eq!(card.state, CardState::Relearning);
        assert_eq!(card.lapses, 1);
        assert!(approx(card.interval, 2.5));
        assert!(approx(card.ease_factor, 2.3));
        assert_eq!(card.current_step, 0);
        assert_eq!(
            result.applied_rules,
            vec![
                AppliedRule::FailedIntervalReduced4x,
                AppliedRule::EasePenaltyAgain,
                AppliedRule::LapseRecorded
            ]
        );
    }

    #[test]
    fn test_review_good_and_easy() {
        let scheduler = Sm2Scheduler::default();
        let (card, _) = scheduler
            .schedule(&review_card(10.0, 2.3, 0), Quality::Good, None, now())
            .unwrap();
        assert!(approx(card.interval, 23.0));
        assert!(approx(card.ease_factor, 2.3));

        // Easy uses the updated ease: round(10 * 2.45 * 1.3) = 32.
        let (card, result) = scheduler
            .schedule(&review_card(10.0, 2.3, 0), Quality::Easy, None, now())
            .unwrap();
        assert!(approx(card.ease_factor, 2.45));
        assert!(approx(card.interval, 32.0));
        assert!(!result.applied_rules.contains(&AppliedRule::IntervalModifier));
    }

    #[test]
    fn test_interval_modifier_applies_after_success() {
        let scheduler = scheduler_with(SchedulerParams {
            interval_modifier: 0.5,
            ..SchedulerParams::default()
        });
        let (card, result) = scheduler
            .schedule(&review_card(10.0, 2.5, 0), Quality::Good, None, now())
            .unwrap();
        assert!(approx(card.interval, 13.0));
        assert_eq!(result.applied_rules.last(), Some(&AppliedRule::IntervalModifier));

        let (card, _) = scheduler
            .schedule(&review_card(1.0, 1.3, 0), Quality::Hard, None, now())
            .unwrap();
        assert!(approx(card.interval, 1.0));
    }

    #[test]
    fn test_relearning_transitions() {
        let scheduler = Sm2Scheduler::default();
        let relearning = CardRecord {
            state: CardState::Relearning,
            interval: 10.0,
            ease_factor: 2.3,
            lapses: 1,
            ..CardRecord::default()
        };

        let (again, result) = scheduler.schedule(&relearning, Quality::Again, None, now()).unwrap();
        assert_eq!(again.state, CardState::Relearning);
        assert!(approx(again.interval, 2.5));
        assert_eq!(again.lapses, 1);
        assert_eq!(result.applied_rules, vec![AppliedRule::RelearningAgainReduced4x]);

        let (again, _) = scheduler.schedule(&again, Quality::Again, None, now()).unwrap();
        assert!(approx(again.interval, 1.0));

        let (good, result) = scheduler.schedule(&relearning, Quality::Good, None, now()).unwrap();
        assert_eq!(good.state, CardState::Review);
        assert!(approx(good.interval, 10.0));
        assert_eq!(result.applied_rules, vec![AppliedRule::RelearningGraduated]);

        let (easy, _) = scheduler.schedule(&relearning, Quality::Easy, None, now()).unwrap();
        assert_eq!(easy.state, CardState::Review);
        assert!(approx(easy.interval, 13.0));
        assert!(approx(easy.ease_factor, 2.45));
    }

    #[test]
    fn test_relearning_with_multiple_steps() {
        let scheduler = scheduler_with(SchedulerParams {
            relearning_steps: vec![10.0, 60.0],
            ..SchedulerParams::default()
        });
        let relearning = CardRecord {
            state: CardState::Relearning,
            interval: 3.0,
            ..CardRecord::default()
        };
        let (card, result) = scheduler.schedule(&relearning, Quality::Hard, None, now()).unwrap();
        assert_eq!(card.state, CardState::Relearning);
        assert_eq!(card.current_step, 1);
        assert!(approx(card.interval, 60.0 / 1440.0));
        assert_eq!(result.applied_rules, vec![AppliedRule::RelearningStepAdvanced]);

        let (card, _) = scheduler.schedule(&card, Quality::Good, None, now()).unwrap();
        assert_eq!(card.state, CardState::Review);
        assert!(approx(card.interval, 1.0));
    }

    #[test]
    fn test_leech_suspends_and_further_reviews_are_rejected() {
        let scheduler = Sm2Scheduler::default();
        let mut card = review_card(30.0, 2.5, 0);

        for lapse in 1..=8u32 {
            let (c, result) = scheduler.schedule(&card, Quality::Again, None, now()).unwrap();
            assert_eq!(c.lapses, lapse);
            if lapse < 8 {
                assert_eq!(result.to_state, CardState::Relearning);
                // Graduate back to review for the next lapse.
                card = scheduler.schedule(&c, Quality::Good, None, now()).unwrap().0;
            } else {
                assert_eq!(result.to_state, CardState::Suspended);
                assert!(result.applied_rules.contains(&AppliedRule::LeechDetected));
                assert!(result.applied_rules.contains(&AppliedRule::LeechSuspended));
                card = c;
            }
        }

        let before = card.clone();
        assert_eq!(
            scheduler.schedule(&card, Quality::Again, None, now()),
            Err(SchedulerError::Suspended)
        );
        assert_eq!(card, before);
    }

    #[test]
    fn test_leech_tag_keeps_relearning() {
        let scheduler = scheduler_with(SchedulerParams {
            leech_threshold: 2,
            leech_action: LeechAction::Tag,
            ..SchedulerParams::default()
        });
        let (card, result) = scheduler
            .schedule(&review_card(8.0, 2.0, 1), Quality::Again, None, now())
            .unwrap();
        assert_eq!(card.state, CardState::Relearning);
        assert_eq!(card.lapses, 2);
        assert!(result.applied_rules.contains(&AppliedRule::LeechDetected));
        assert!(!result.applied_rules.contains(&AppliedRule::LeechSuspended));
    }

    #[test]
    fn test_counters_and_next_review() {
        let scheduler = Sm2Scheduler::default();
        let card = review_card(10.0, 2.5, 0);

        let (good, result) = scheduler.schedule(&card, Quality::Good, Some(4200), now()).unwrap();
        assert_eq!(good.times_answered, 1);
        assert_eq!(good.times_correct, 1);
        assert_eq!(good.last_review_date, Some(now()));
        assert_eq!(good.last_answered, Some(now()));
        assert_eq!(good.next_review, Some(now() + Duration::days(25)));
        assert_eq!(result.next_review, now() + Duration::days(25));
        assert_eq!(result.response_time_ms, Some(4200));

        let (hard, _) = scheduler.schedule(&card, Quality::Hard, None, now()).unwrap();
        assert_eq!(hard.times_answered, 1);
        assert_eq!(hard.times_correct, 0);
    }

    #[test]
    fn test_learning_step_next_review_in_minutes() {
        let scheduler = Sm2Scheduler::default();
        let (card, _) = scheduler
            .schedule(&CardRecord::default(), Quality::Good, None, now())
            .unwrap();
        // A one-minute step is lifted to the 0.001-day floor.
        assert_eq!(card.next_review, Some(now() + Duration::milliseconds(86_400)));

        let (card, _) = scheduler.schedule(&card, Quality::Good, None, now()).unwrap();
        assert_eq!(card.next_review, Some(now() + Duration::minutes(10)));
    }

    #[test]
    fn test_minutes_to_days_floor() {
        assert!(approx(minutes_to_days(1.0), MIN_STEP_INTERVAL_DAYS));
        assert!(approx(minutes_to_days(1440.0), 1.0));
    }

    #[test]
    fn test_input_record_is_not_mutated() {
        let scheduler = Sm2Scheduler::default();
        let card = review_card(10.0, 2.5, 0);
        let snapshot = card.clone();
        let _ = scheduler.schedule(&card, Quality::Again, None, now()).unwrap();
        assert_eq!(card, snapshot);
    }

    #[test]
    fn test_schedule_raw_rejects_out_of_range_quality() {
        let scheduler = Sm2Scheduler::default();
        assert_eq!(
            scheduler.schedule_raw(&CardRecord::default(), 4, None, now()),
            Err(SchedulerError::InvalidQuality(4))
        );
        assert!(scheduler.schedule_raw(&CardRecord::default(), 2, None, now()).is_ok());
    }

    #[test]
    fn test_ease_and_interval_bounds_hold_everywhere() {
        let scheduler = Sm2Scheduler::default();
        let min = scheduler.config().params().min_ease_factor;
        let max = scheduler.config().params().max_ease_factor;
        let qualities = [Quality::Again, Quality::Hard, Quality::Good, Quality::Easy];

        // Walk every grade sequence of length 6 from a fresh card.
        let mut frontier = vec![CardRecord::default()];
        for _ in 0..6 {
            let mut next_frontier = Vec::new();
            for card in &frontier {
                for &q in &qualities {
                    match scheduler.schedule(card, q, None, now()) {
                        Ok((next, result)) => {
                            assert!(next.ease_factor >= min - EPS && next.ease_factor <= max + EPS);
                            assert!(next.interval > 0.0);
                            assert!(approx(result.ease_factor, next.ease_factor));
                            next_frontier.push(next);
                        }
                        Err(e) => assert_eq!(e, SchedulerError::Suspended),
                    }
                }
            }
            frontier = next_frontier;
        }
    }

    #[test]
    fn test_long_good_streak_stops_at_max_interval() {
        let scheduler = Sm2Scheduler::default();
        let max = scheduler.config().params().max_interval;
        let mut card = review_card(1.0, 2.5, 0);
        for _ in 0..50 {
            let (next, result) = scheduler.schedule(&card, Quality::Good, None, now()).unwrap();
            assert!(next.interval <= max);
            assert!(result.next_review > now());
            card = next;
        }
        assert!(approx(card.interval, max));
        assert_eq!(card.next_review, Some(now() + Duration::days(max as i64)));

        let (easy, _) = scheduler.schedule(&card, Quality::Easy, None, now()).unwrap();
        assert!(approx(easy.interval, max));
    }

    #[test]
    fn test_oversized_stored_interval_is_pulled_back() {
        let scheduler = Sm2Scheduler::default();
        let max = scheduler.config().params().max_interval;

        let (card, _) = scheduler
            .schedule(&review_card(1e12, 2.5, 0), Quality::Good, None, now())
            .unwrap();
        assert!(approx(card.interval, max));

        let relearning = CardRecord {
            state: CardState::Relearning,
            interval: 1e15,
            ..CardRecord::default()
        };
        let (card, _) = scheduler.schedule(&relearning, Quality::Good, None, now()).unwrap();
        assert!(approx(card.interval, max));
    }

    #[test]
    fn test_next_review_saturates_instead_of_overflowing() {
        assert_eq!(next_review_at(now(), 1e30), DateTime::<Utc>::MAX_UTC);
        assert_eq!(next_review_at(now(), 1e9), DateTime::<Utc>::MAX_UTC);
        assert_eq!(next_review_at(now(), 2.0), now() + Duration::days(2));
    }

    #[test]
    fn test_rule_names_match_serialized_form() {
        for rule in [
            AppliedRule::EasyGraduation,
            AppliedRule::FailedIntervalReduced4x,
            AppliedRule::RelearningAgainReduced4x,
            AppliedRule::LapseRecorded,
        ] {
            let json = serde_json::to_value(rule).unwrap();
            assert_eq!(json, rule.as_str());
        }
    }
}
