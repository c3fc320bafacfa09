use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cache::{self, QueueCache};
use crate::constants::{CRAM_POOL_LIMIT, DUE_QUEUE_LIMIT, GLOBAL_CRAM_LIMIT};
use crate::store::operations::cards::Card;
use crate::store::operations::hierarchy::Subject;
use crate::store::{Store, StoreError};

/// Due cards first by `next_review` (ties by id), then NEW cards by creation
/// time, truncated to `limit`.
pub fn order_due_queue(mut due: Vec<Card>, mut new: Vec<Card>, limit: usize) -> Vec<Card> {
    due.sort_by(|a, b| a.next_review.cmp(&b.next_review).then_with(|| a.id.cmp(&b.id)));
    new.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    due.extend(new);
    due.truncate(limit);
    due
}

#[derive(Clone)]
pub struct QueueBuilder {
    store: Arc<Store>,
    cache: Arc<dyn QueueCache>,
    ttl: Duration,
}

impl QueueBuilder {
    pub fn new(store: Arc<Store>, cache: Arc<dyn QueueCache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn due_queue(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
    ) -> Result<Vec<Card>, StoreError> {
        self.due_queue_at(user_id, subject_id, Utc::now()).await
    }

    pub async fn due_queue_at(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Card>, StoreError> {
        let key = match subject_id {
            Some(subject_id) => cache::queue_key_subject(user_id, subject_id),
            None => cache::queue_key_all(user_id),
        };

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Card>>(&raw) {
                Ok(cards) => {
                    tracing::debug!(key = %key, count = cards.len(), "Due queue served from cache");
                    return Ok(cards);
                }
                Err(err) => tracing::warn!(key = %key, error = %err, "Discarding undecodable cached queue"),
            },
            Ok(None) => {}
            Err(err) => tracing::warn!(key = %key, error = %err, "Queue cache read failed"),
        }

        let mut due = Vec::new();
        let mut new = Vec::new();
        for subject in self.scoped_subjects(user_id, subject_id)? {
            let listed = self
                .store
                .due_cards_for_subject(&subject.id, now, DUE_QUEUE_LIMIT)?;
            due.extend(listed.due);
            new.extend(listed.new);
        }
        let queue = order_due_queue(due, new, DUE_QUEUE_LIMIT);

        match serde_json::to_string(&queue) {
            Ok(raw) => {
                if let Err(err) = self.cache.set(&key, raw, self.ttl).await {
                    tracing::warn!(key = %key, error = %err, "Queue cache write failed");
                }
            }
            Err(err) => tracing::warn!(key = %key, error = %err, "Queue encoding failed"),
        }

        Ok(queue)
    }

    pub fn cram_queue(&self, user_id: &str, subject_id: &str) -> Result<Vec<Card>, StoreError> {
        self.cram_queue_with_rng(user_id, subject_id, &mut rand::thread_rng())
    }

    pub fn cram_queue_with_rng<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        subject_id: &str,
        rng: &mut R,
    ) -> Result<Vec<Card>, StoreError> {
        let Some(subject) = self.store.get_owned_subject(user_id, subject_id)? else {
            return Ok(Vec::new());
        };
        let mut cards = self.store.list_subject_cards(&subject.id, CRAM_POOL_LIMIT)?;
        cards.shuffle(rng);
        Ok(cards)
    }

    pub fn global_cram_queue(&self, user_id: &str) -> Result<Vec<Card>, StoreError> {
        self.global_cram_queue_with_rng(user_id, &mut rand::thread_rng())
    }

    pub fn global_cram_queue_with_rng<R: Rng + ?Sized>(
        &self,
        user_id: &str,
        rng: &mut R,
    ) -> Result<Vec<Card>, StoreError> {
        let mut pool = Vec::new();
        for subject in self.store.list_user_subjects(user_id)? {
            let remaining = CRAM_POOL_LIMIT.saturating_sub(pool.len());
            if remaining == 0 {
                break;
            }
            pool.extend(self.store.list_subject_cards(&subject.id, remaining)?);
        }
        pool.shuffle(rng);
        pool.truncate(GLOBAL_CRAM_LIMIT);
        Ok(pool)
    }

    /// A subject the user does not own scopes the queue to nothing.
    fn scoped_subjects(
        &self,
        user_id: &str,
        subject_id: Option<&str>,
    ) -> Result<Vec<Subject>, StoreError> {
        match subject_id {
            Some(subject_id) => Ok(self
                .store
                .get_owned_subject(user_id, subject_id)?
                .into_iter()
                .collect()),
            None => self.store.list_user_subjects(user_id),
        }
    }
}
