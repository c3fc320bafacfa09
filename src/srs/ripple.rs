//! Ripple boost: an EASY answer lends a little stability to sibling cards in
//! the same topic without asking the learner to grade them.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use super::fsrs;
use super::types::CardState;

pub const RIPPLE_BOOST_FACTOR: f64 = 1.05;

/// Upper bound on siblings touched per review.
pub const MAX_RIPPLE_SIBLINGS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RippleBoost {
    pub stability: f64,
    pub next_review: DateTime<Utc>,
}

/// The scheduling fields ripple selection reads from a sibling.
pub trait RippleCandidate {
    fn candidate_id(&self) -> &str;
    fn state(&self) -> CardState;
    fn next_review(&self) -> DateTime<Utc>;
}

/// A sibling qualifies when it has been reviewed and is not due yet.
pub fn is_eligible<C: RippleCandidate + ?Sized>(card: &C, now: DateTime<Utc>) -> bool {
    card.state() != CardState::New && card.next_review() > now
}

/// Difficulty is deliberately absent from the result: no evidence about the
/// sibling was observed.
pub fn boost(stability: f64, now: DateTime<Utc>) -> RippleBoost {
    let stability = stability * RIPPLE_BOOST_FACTOR;
    RippleBoost {
        stability,
        next_review: fsrs::next_review_after(now, stability),
    }
}

/// Picks up to [`MAX_RIPPLE_SIBLINGS`] eligible siblings of `reviewed_card_id`
/// uniformly at random and returns their ids in ascending order, which is the
/// order their rows are written in.
pub fn select_siblings<C: RippleCandidate, R: Rng + ?Sized>(
    candidates: &[C],
    reviewed_card_id: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Vec<String> {
    let mut eligible: Vec<&C> = candidates
        .iter()
        .filter(|c| c.candidate_id() != reviewed_card_id && is_eligible(*c, now))
        .collect();
    eligible.shuffle(rng);
    eligible.truncate(MAX_RIPPLE_SIBLINGS);

    let mut ids: Vec<String> = eligible
        .into_iter()
        .map(|c| c.candidate_id().to_string())
        .collect();
    ids.sort();
    ids
}
