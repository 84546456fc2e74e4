// src/grading.rs
// Suggests a quality grade from how long an answer took.

use crate::card::Quality;
use crate::config::GradingThresholds;

/// Maps a response to a grade.
///
/// Wrong answers are always `Again`. Correct answers are bucketed by elapsed seconds
/// against the thresholds; every boundary is exclusive, so an answer landing exactly on a
/// threshold gets the harder grade. A correct answer slower than `slow_threshold` is
/// graded `Again` even though it was correct.
pub fn suggest_grade_from_time(
    response_time_ms: u64,
    was_correct: bool,
    thresholds: &GradingThresholds,
) -> Quality {
    if !was_correct {
        return Quality::Again;
    }

    let seconds = response_time_ms as f64 / 1000.0;
    if seconds < thresholds.fast_threshold {
        Quality::Easy
    } else if seconds < thresholds.normal_threshold {
        Quality::Good
    } else if seconds < thresholds.slow_threshold {
        Quality::Hard
    } else {
        Quality::Again
    }
}
