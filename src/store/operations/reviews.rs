use chrono::{DateTime, Utc};
use sled::transaction::ConflictableTransactionError;
use sled::Transactional;

use crate::srs::{fsrs, ripple, Grade};
use crate::store::operations::cards::{reindex_card, Card};
use crate::store::operations::review_logs::ReviewLog;
use crate::store::operations::users::UserProfile;
use crate::store::{decode_count, keys};
use crate::store::{Store, StoreError, TxResult};

/// Everything a single review writes, gathered before the transaction opens.
#[derive(Debug, Clone)]
pub struct ReviewCommand {
    pub user_id: String,
    pub card_id: String,
    pub grade: Grade,
    pub duration_ms: u64,
    pub log_id: String,
    /// Ripple candidates picked from a pre-transaction snapshot, ascending id.
    /// Ignored unless `grade` is EASY.
    pub sibling_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewCommit {
    pub card: Card,
    pub log: ReviewLog,
    pub streak: u32,
    pub reviews_today: u32,
    pub rippled: usize,
}

impl Store {
    /// Applies one review atomically: card schedule and index, review log,
    /// streak, heatmap counter and (on EASY) the ripple boost. sled re-runs the
    /// closure on conflict, so it only reads state through the transaction.
    pub fn commit_review(
        &self,
        command: &ReviewCommand,
        now: DateTime<Utc>,
    ) -> Result<ReviewCommit, StoreError> {
        keys::validate_segment("user", &command.user_id)?;
        keys::validate_segment("card", &command.card_id)?;

        let card_key = keys::card_key(&command.card_id);
        let user_key = keys::user_key(&command.user_id);
        let today = now.date_naive();
        let activity_key = keys::activity_day_key(&command.user_id, today);

        let mut sibling_ids: Vec<&str> = if command.grade == Grade::Easy {
            command
                .sibling_ids
                .iter()
                .map(String::as_str)
                .filter(|id| *id != command.card_id)
                .collect()
        } else {
            Vec::new()
        };
        sibling_ids.sort_unstable();
        sibling_ids.dedup();
        sibling_ids.truncate(ripple::MAX_RIPPLE_SIBLINGS);

        (
            &self.cards,
            &self.card_due_index,
            &self.new_card_index,
            &self.review_logs,
            &self.users,
            &self.activity_days,
        )
            .transaction(
                |(tx_cards, tx_due_index, tx_new_index, tx_logs, tx_users, tx_activity)| -> TxResult<ReviewCommit> {
                    let raw = tx_cards.get(card_key.as_bytes())?.ok_or_else(|| {
                        ConflictableTransactionError::Abort(StoreError::not_found(
                            "card",
                            &command.card_id,
                        ))
                    })?;
                    let before: Card = Self::tx_deserialize(&raw)?;

                    let outcome = fsrs::schedule(&before.snapshot(), command.grade, now);
                    let mut card = before.clone();
                    card.apply(&outcome);
                    tx_cards.insert(card_key.as_bytes(), Self::tx_serialize(&card)?)?;
                    reindex_card(tx_due_index, tx_new_index, &before, &card)?;

                    let log = ReviewLog {
                        id: command.log_id.clone(),
                        card_id: command.card_id.clone(),
                        user_id: command.user_id.clone(),
                        grade: command.grade,
                        duration_ms: command.duration_ms,
                        reviewed_at: now,
                    };
                    tx_logs.insert(log.key().as_bytes(), Self::tx_serialize(&log)?)?;

                    let mut profile = match tx_users.get(user_key.as_bytes())? {
                        Some(raw) => Self::tx_deserialize::<UserProfile>(&raw)?,
                        None => UserProfile::new(command.user_id.clone(), now),
                    };
                    profile.record_activity(today, now);
                    tx_users.insert(user_key.as_bytes(), Self::tx_serialize(&profile)?)?;

                    let reviews_today = tx_activity
                        .get(activity_key.as_bytes())?
                        .map(|raw| decode_count(&raw))
                        .unwrap_or(0)
                        .saturating_add(1);
                    tx_activity.insert(activity_key.as_bytes(), reviews_today.to_be_bytes().to_vec())?;

                    let mut rippled = 0usize;
                    for sibling_id in &sibling_ids {
                        let sibling_key = keys::card_key(sibling_id);
                        let Some(raw) = tx_cards.get(sibling_key.as_bytes())? else {
                            continue;
                        };
                        let sibling: Card = Self::tx_deserialize(&raw)?;
                        // The candidate list is a snapshot; recheck against current state.
                        if sibling.topic_id != card.topic_id || !ripple::is_eligible(&sibling, now) {
                            continue;
                        }
                        let boost = ripple::boost(sibling.stability, now);
                        let mut boosted = sibling.clone();
                        boosted.stability = boost.stability;
                        boosted.next_review = boost.next_review;
                        tx_cards.insert(sibling_key.as_bytes(), Self::tx_serialize(&boosted)?)?;
                        reindex_card(tx_due_index, tx_new_index, &sibling, &boosted)?;
                        rippled += 1;
                    }

                    Ok(ReviewCommit {
                        card,
                        log,
                        streak: profile.streak,
                        reviews_today,
                        rippled,
                    })
                },
            )
            .map_err(StoreError::from)
    }
}
