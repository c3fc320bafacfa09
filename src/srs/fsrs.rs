use chrono::{DateTime, Duration, Utc};

use super::types::{CardState, Grade, ScheduleOutcome, SchedulingSnapshot};

/// Static FSRS weight vector.
pub const W: [f64; 17] = [
    0.4, 0.6, 2.4, 5.8, 4.93, 0.94, 0.86, 0.01, 1.49, 0.14, 0.94, 2.18, 0.05, 0.34, 1.26, 0.29,
    2.61,
];

/// Recall probability the intervals are tuned for.
pub const TARGET_RETENTION: f64 = 0.9;

pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Floor applied to every stability the engine produces or divides by.
pub const MIN_STABILITY: f64 = 0.01;

/// Upper bound on a single interval, keeps `now + interval` representable.
pub const MAX_INTERVAL_DAYS: i64 = 36_500;

/// Days until the next review for a given stability, never less than one.
pub fn interval_days(stability: f64) -> i64 {
    let raw = 9.0 * stability * (1.0 / TARGET_RETENTION - 1.0);
    // `as` saturates on overflow and maps NaN to 0
    (raw.round() as i64).clamp(1, MAX_INTERVAL_DAYS)
}

pub fn next_review_after(now: DateTime<Utc>, stability: f64) -> DateTime<Utc> {
    now + Duration::days(interval_days(stability))
}

fn sanitize_stability(stability: f64) -> f64 {
    if stability.is_finite() && stability > MIN_STABILITY {
        stability
    } else if stability == f64::INFINITY {
        f64::MAX
    } else {
        MIN_STABILITY
    }
}

fn revert_difficulty(difficulty: f64, grade: Grade) -> f64 {
    let g = f64::from(grade.value());
    let candidate = (difficulty - W[6] * (g - 3.0)).clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
    W[7] * 4.0 + (1.0 - W[7]) * candidate
}

fn forget_stability(stability: f64, difficulty: f64) -> f64 {
    W[11]
        * difficulty.powf(-W[12])
        * ((stability + 1.0).powf(W[13]) - 1.0)
        * (W[14] * (1.0 - TARGET_RETENTION)).exp()
}

fn recall_stability(stability: f64, difficulty: f64, grade: Grade) -> f64 {
    let hard_penalty = if grade == Grade::Hard { W[15] } else { 1.0 };
    let easy_bonus = if grade == Grade::Easy { W[16] } else { 1.0 };
    stability
        * (1.0
            + W[8].exp()
                * (11.0 - difficulty)
                * stability.powf(-W[9])
                * ((W[10] * (1.0 - TARGET_RETENTION)).exp() - 1.0)
                * hard_penalty
                * easy_bonus)
}

/// Applies one review to a card snapshot.
///
/// Pure: the same snapshot, grade and `now` always give the same outcome.
/// A failed grade on a card already in REVIEW keeps it in REVIEW; there is no
/// relearning state.
pub fn schedule(snapshot: &SchedulingSnapshot, grade: Grade, now: DateTime<Utc>) -> ScheduleOutcome {
    let g = f64::from(grade.value());

    let (stability, difficulty, state) = match snapshot.state {
        CardState::New => {
            let stability = W[usize::from(grade.value() - 1)];
            let difficulty = W[4] - (g - 3.0) * W[5];
            let state = if grade == Grade::Again {
                CardState::Learning
            } else {
                CardState::Review
            };
            (stability, difficulty, state)
        }
        state @ (CardState::Learning | CardState::Review) => {
            let difficulty = revert_difficulty(snapshot.difficulty, grade);
            let previous = sanitize_stability(snapshot.stability);
            let stability = if grade == Grade::Again {
                forget_stability(previous, difficulty)
            } else {
                recall_stability(previous, difficulty, grade)
            };
            (stability, difficulty, state)
        }
    };

    let stability = sanitize_stability(stability);
    let interval_days = interval_days(stability);

    ScheduleOutcome {
        stability,
        difficulty,
        reps: snapshot.reps.saturating_add(1),
        state,
        interval_days,
        next_review: now + Duration::days(interval_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-09T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn review_card(stability: f64, difficulty: f64, reps: u32) -> SchedulingSnapshot {
        SchedulingSnapshot {
            stability,
            difficulty,
            reps,
            state: CardState::Review,
        }
    }

    #[test]
    fn new_card_good_initialises_from_weights() {
        let now = fixed_now();
        let out = schedule(&SchedulingSnapshot::new_card(), Grade::Good, now);

        assert_eq!(out.state, CardState::Review);
        assert_eq!(out.stability, W[2]);
        assert_eq!(out.difficulty, W[4]);
        assert_eq!(out.reps, 1);
        let expected_days = (9.0 * W[2] * (1.0 / 0.9 - 1.0)).round() as i64;
        assert_eq!(out.interval_days, expected_days);
        assert_eq!(out.next_review, now + Duration::days(expected_days));
    }

    #[test]
    fn new_card_again_enters_learning() {
        let out = schedule(&SchedulingSnapshot::new_card(), Grade::Again, fixed_now());
        assert_eq!(out.state, CardState::Learning);
        assert_eq!(out.stability, W[0]);
        assert_eq!(out.difficulty, W[4] + 2.0 * W[5]);
    }

    #[test]
    fn new_card_stability_matches_grade_weight() {
        for grade in Grade::ALL {
            let out = schedule(&SchedulingSnapshot::new_card(), grade, fixed_now());
            assert_eq!(out.stability, W[usize::from(grade.value() - 1)]);
            let expected = if grade == Grade::Again {
                CardState::Learning
            } else {
                CardState::Review
            };
            assert_eq!(out.state, expected);
        }
    }

    #[test]
    fn review_card_again_stays_in_review() {
        let out = schedule(&review_card(10.0, 5.0, 3), Grade::Again, fixed_now());

        let d_prime = (5.0 - W[6] * (1.0 - 3.0)).clamp(1.0, 10.0);
        let difficulty = W[7] * 4.0 + (1.0 - W[7]) * d_prime;
        let stability = W[11]
            * difficulty.powf(-W[12])
            * ((10.0_f64 + 1.0).powf(W[13]) - 1.0)
            * (W[14] * (1.0 - 0.9)).exp();

        assert_eq!(out.state, CardState::Review);
        assert_eq!(out.reps, 4);
        assert!((out.difficulty - difficulty).abs() < 1e-12);
        assert!((out.stability - stability).abs() < 1e-12);
        assert!(out.stability < 10.0);
    }

    #[test]
    fn learning_card_stays_learning_on_success() {
        let snapshot = SchedulingSnapshot {
            stability: W[0],
            difficulty: 6.8,
            reps: 1,
            state: CardState::Learning,
        };
        let out = schedule(&snapshot, Grade::Good, fixed_now());
        assert_eq!(out.state, CardState::Learning);
        assert!(out.stability > W[0]);
    }

    #[test]
    fn easy_grows_more_than_good_and_good_more_than_hard() {
        let card = review_card(8.0, 5.0, 4);
        let hard = schedule(&card, Grade::Hard, fixed_now());
        let good = schedule(&card, Grade::Good, fixed_now());
        let easy = schedule(&card, Grade::Easy, fixed_now());

        assert!(hard.stability < good.stability);
        assert!(good.stability < easy.stability);
        assert!(hard.stability > 8.0);
    }

    #[test]
    fn difficulty_is_clamped_before_reversion() {
        let easy_floor = schedule(&review_card(5.0, 1.0, 9), Grade::Easy, fixed_now());
        assert!((easy_floor.difficulty - (W[7] * 4.0 + (1.0 - W[7]) * 1.0)).abs() < 1e-12);

        let again_ceiling = schedule(&review_card(5.0, 10.0, 9), Grade::Again, fixed_now());
        assert!((again_ceiling.difficulty - (W[7] * 4.0 + (1.0 - W[7]) * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn zero_stability_on_reviewed_card_is_floored() {
        let out = schedule(&review_card(0.0, 5.0, 2), Grade::Again, fixed_now());
        assert!(out.stability >= MIN_STABILITY);
        assert!(out.stability.is_finite());

        let out = schedule(&review_card(0.0, 5.0, 2), Grade::Good, fixed_now());
        assert!(out.stability >= MIN_STABILITY);
        assert!(out.stability.is_finite());
    }

    #[test]
    fn interval_has_one_day_floor_and_cap() {
        assert_eq!(interval_days(0.0), 1);
        assert_eq!(interval_days(f64::NAN), 1);
        assert_eq!(interval_days(10.0), 10);
        assert_eq!(interval_days(f64::MAX), MAX_INTERVAL_DAYS);
    }

    #[test]
    fn schedule_is_deterministic() {
        let card = review_card(3.3, 7.1, 5);
        let a = schedule(&card, Grade::Hard, fixed_now());
        let b = schedule(&card, Grade::Hard, fixed_now());
        assert_eq!(a, b);
    }
}
