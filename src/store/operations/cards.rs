use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::TransactionalTree;
use sled::Transactional;

use crate::srs::ripple::RippleCandidate;
use crate::srs::{CardState, ScheduleOutcome, SchedulingSnapshot};
use crate::store::keys;
use crate::store::{Store, StoreError, TxResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub topic_id: String,
    /// Copied from the topic at creation; cards never change subject.
    pub subject_id: String,
    pub front: String,
    pub back: String,
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub state: CardState,
    pub next_review: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        id: impl Into<String>,
        topic_id: impl Into<String>,
        subject_id: impl Into<String>,
        front: impl Into<String>,
        back: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            topic_id: topic_id.into(),
            subject_id: subject_id.into(),
            front: front.into(),
            back: back.into(),
            stability: 0.0,
            difficulty: 0.0,
            reps: 0,
            state: CardState::New,
            next_review: created_at,
            created_at,
        }
    }

    pub fn snapshot(&self) -> SchedulingSnapshot {
        SchedulingSnapshot {
            stability: self.stability,
            difficulty: self.difficulty,
            reps: self.reps,
            state: self.state,
        }
    }

    pub fn apply(&mut self, outcome: &ScheduleOutcome) {
        self.stability = outcome.stability;
        self.difficulty = outcome.difficulty;
        self.reps = outcome.reps;
        self.state = outcome.state;
        self.next_review = outcome.next_review;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == CardState::New || self.next_review <= now
    }

    /// NEW cards live in the new-card index keyed by creation time, all
    /// others in the due index keyed by `next_review`.
    fn index_key(&self) -> String {
        match self.state {
            CardState::New => keys::card_time_index_key(
                &self.subject_id,
                self.created_at.timestamp_millis(),
                &self.id,
            ),
            CardState::Learning | CardState::Review => keys::card_time_index_key(
                &self.subject_id,
                self.next_review.timestamp_millis(),
                &self.id,
            ),
        }
    }
}

impl RippleCandidate for Card {
    fn candidate_id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> CardState {
        self.state
    }

    fn next_review(&self) -> DateTime<Utc> {
        self.next_review
    }
}

/// Moves a card's scheduling index entry from its `before` to its `after` position.
pub(crate) fn reindex_card(
    tx_due_index: &TransactionalTree,
    tx_new_index: &TransactionalTree,
    before: &Card,
    after: &Card,
) -> TxResult<()> {
    let old_tree = if before.state == CardState::New {
        tx_new_index
    } else {
        tx_due_index
    };
    old_tree.remove(before.index_key().as_bytes())?;

    let new_tree = if after.state == CardState::New {
        tx_new_index
    } else {
        tx_due_index
    };
    new_tree.insert(after.index_key().as_bytes(), &[])?;
    Ok(())
}

/// Cards of one subject that are ready for review, plus its NEW cards.
#[derive(Debug, Clone, Default)]
pub struct SubjectDueCards {
    /// Non-NEW cards with `next_review <= now`, earliest first.
    pub due: Vec<Card>,
    /// NEW cards, oldest first.
    pub new: Vec<Card>,
}

impl Store {
    pub fn create_card(&self, card: &Card) -> Result<(), StoreError> {
        keys::validate_segment("card", &card.id)?;
        keys::validate_segment("topic", &card.topic_id)?;
        keys::validate_segment("subject", &card.subject_id)?;

        let topic = self
            .get_topic(&card.topic_id)?
            .ok_or_else(|| StoreError::not_found("topic", &card.topic_id))?;
        if topic.subject_id != card.subject_id {
            return Err(StoreError::Validation(format!(
                "card subject {} does not match topic subject {}",
                card.subject_id, topic.subject_id
            )));
        }

        let key = keys::card_key(&card.id);
        let topic_index_key = keys::cards_by_topic_key(&card.topic_id, &card.id);
        let schedule_index_key = card.index_key();
        let bytes = Self::serialize(card)?;
        let is_new = card.state == CardState::New;

        (
            &self.cards,
            &self.cards_by_topic,
            &self.card_due_index,
            &self.new_card_index,
        )
            .transaction(
                |(tx_cards, tx_by_topic, tx_due_index, tx_new_index)| -> TxResult<()> {
                    if tx_cards.get(key.as_bytes())?.is_some() {
                        return Err(sled::transaction::ConflictableTransactionError::Abort(
                            StoreError::Conflict {
                                entity: "card".to_string(),
                                key: key.clone(),
                            },
                        ));
                    }
                    tx_cards.insert(key.as_bytes(), bytes.as_slice())?;
                    tx_by_topic.insert(topic_index_key.as_bytes(), &[])?;
                    if is_new {
                        tx_new_index.insert(schedule_index_key.as_bytes(), &[])?;
                    } else {
                        tx_due_index.insert(schedule_index_key.as_bytes(), &[])?;
                    }
                    Ok(())
                },
            )
            .map_err(StoreError::from)
    }

    pub fn get_card(&self, card_id: &str) -> Result<Option<Card>, StoreError> {
        match self.cards.get(keys::card_key(card_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_topic_cards(&self, topic_id: &str) -> Result<Vec<Card>, StoreError> {
        let prefix = keys::owner_prefix(topic_id);
        let mut cards = Vec::new();
        for item in self.cards_by_topic.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some(card_id) = key.get(prefix.len()..).and_then(|s| std::str::from_utf8(s).ok())
            else {
                continue;
            };
            // Index entries can outlive a card removed by the content service.
            if let Some(card) = self.get_card(card_id)? {
                cards.push(card);
            }
        }
        Ok(cards)
    }

    /// Up to `limit` cards of a subject in store order, any state.
    pub fn list_subject_cards(&self, subject_id: &str, limit: usize) -> Result<Vec<Card>, StoreError> {
        let mut cards = Vec::new();
        for topic_id in self.list_subject_topic_ids(subject_id)? {
            for card in self.list_topic_cards(&topic_id)? {
                if cards.len() >= limit {
                    return Ok(cards);
                }
                cards.push(card);
            }
        }
        Ok(cards)
    }

    pub fn due_cards_for_subject(
        &self,
        subject_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<SubjectDueCards, StoreError> {
        let prefix = keys::owner_prefix(subject_id);
        let now_ms = now.timestamp_millis();
        let mut result = SubjectDueCards::default();

        for item in self.card_due_index.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some((due_ms, card_id)) = keys::parse_time_index_key(&key) else {
                tracing::warn!(subject_id, "Skipping malformed due index key");
                continue;
            };
            if due_ms > now_ms || result.due.len() >= limit {
                break;
            }
            if let Some(card) = self.get_card(&card_id)? {
                // Millisecond keys can lag the stored timestamp by a fraction.
                if card.is_due(now) {
                    result.due.push(card);
                }
            }
        }

        for item in self.new_card_index.scan_prefix(prefix.as_bytes()) {
            if result.new.len() >= limit {
                break;
            }
            let (key, _) = item?;
            let Some((_, card_id)) = keys::parse_time_index_key(&key) else {
                tracing::warn!(subject_id, "Skipping malformed new-card index key");
                continue;
            };
            if let Some(card) = self.get_card(&card_id)? {
                result.new.push(card);
            }
        }

        Ok(result)
    }

    pub fn count_cards(&self) -> usize {
        self.cards.len()
    }
}
