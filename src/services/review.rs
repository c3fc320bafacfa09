use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::cache::{self, QueueCache};
use crate::srs::{ripple, CardState, Grade};
use crate::store::operations::reviews::{ReviewCommand, ReviewCommit};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("card not found: {0}")]
    NotFound(String),
    #[error("invalid grade: {0}")]
    InvalidGrade(String),
    #[error("card {card_id} does not belong to the caller")]
    Unauthorized { card_id: String },
    #[error("review transaction failed: {0}")]
    TransactionFailure(#[source] StoreError),
}

impl From<crate::srs::InvalidGrade> for ReviewError {
    fn from(err: crate::srs::InvalidGrade) -> Self {
        Self::InvalidGrade(err.0)
    }
}

/// What the caller sees after a committed review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub card_id: String,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub state: CardState,
    pub next_review: DateTime<Utc>,
    pub streak: u32,
    pub reviews_today: u32,
    pub rippled: usize,
}

impl From<ReviewCommit> for ReviewOutcome {
    fn from(commit: ReviewCommit) -> Self {
        Self {
            card_id: commit.card.id,
            stability: commit.card.stability,
            difficulty: commit.card.difficulty,
            reps: commit.card.reps,
            state: commit.card.state,
            next_review: commit.card.next_review,
            streak: commit.streak,
            reviews_today: commit.reviews_today,
            rippled: commit.rippled,
        }
    }
}

#[derive(Clone)]
pub struct ReviewService {
    store: Arc<Store>,
    cache: Arc<dyn QueueCache>,
}

impl ReviewService {
    pub fn new(store: Arc<Store>, cache: Arc<dyn QueueCache>) -> Self {
        Self { store, cache }
    }

    pub async fn submit_review(
        &self,
        user_id: &str,
        card_id: &str,
        grade: Grade,
        duration_ms: u64,
    ) -> Result<ReviewOutcome, ReviewError> {
        self.submit_review_at(user_id, card_id, grade, duration_ms, Utc::now())
            .await
    }

    pub async fn submit_review_at(
        &self,
        user_id: &str,
        card_id: &str,
        grade: Grade,
        duration_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome, ReviewError> {
        let card = self
            .store
            .get_card(card_id)
            .map_err(ReviewError::TransactionFailure)?
            .ok_or_else(|| ReviewError::NotFound(card_id.to_string()))?;

        let owner = self
            .store
            .resolve_topic_owner(&card.topic_id)
            .map_err(ReviewError::TransactionFailure)?;
        if owner.as_deref() != Some(user_id) {
            tracing::warn!(user_id, card_id, "Review rejected: card owned by another user");
            return Err(ReviewError::Unauthorized {
                card_id: card_id.to_string(),
            });
        }

        let sibling_ids = if grade == Grade::Easy {
            let siblings = self
                .store
                .list_topic_cards(&card.topic_id)
                .map_err(ReviewError::TransactionFailure)?;
            ripple::select_siblings(&siblings, card_id, now, &mut rand::thread_rng())
        } else {
            Vec::new()
        };

        let command = ReviewCommand {
            user_id: user_id.to_string(),
            card_id: card_id.to_string(),
            grade,
            duration_ms,
            log_id: uuid::Uuid::new_v4().to_string(),
            sibling_ids,
        };

        let commit = self
            .store
            .commit_review(&command, now)
            .map_err(|err| match err {
                StoreError::NotFound { .. } => ReviewError::NotFound(card_id.to_string()),
                other => {
                    tracing::error!(user_id, card_id, error = %other, "Review transaction aborted");
                    ReviewError::TransactionFailure(other)
                }
            })?;

        tracing::info!(
            user_id,
            card_id,
            grade = %grade,
            state = ?commit.card.state,
            next_review = %commit.card.next_review,
            rippled = commit.rippled,
            "Review committed"
        );

        self.invalidate_queues(user_id, &card.subject_id).await;
        Ok(commit.into())
    }

    async fn invalidate_queues(&self, user_id: &str, subject_id: &str) {
        for key in [
            cache::queue_key_all(user_id),
            cache::queue_key_subject(user_id, subject_id),
        ] {
            if let Err(err) = self.cache.delete(&key).await {
                tracing::warn!(key = %key, error = %err, "Queue cache invalidation failed");
            }
        }
    }
}
