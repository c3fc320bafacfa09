pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub users: sled::Tree,
    pub subjects: sled::Tree,
    pub topics: sled::Tree,
    pub cards: sled::Tree,
    pub review_logs: sled::Tree,
    pub activity_days: sled::Tree,
    pub config_versions: sled::Tree,
    // Secondary index trees
    pub subjects_by_user: sled::Tree,
    pub topics_by_subject: sled::Tree,
    pub cards_by_topic: sled::Tree,
    pub card_due_index: sled::Tree,
    pub new_card_index: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl StoreError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<TransactionError<StoreError>> for StoreError {
    fn from(error: TransactionError<StoreError>) -> Self {
        match error {
            TransactionError::Abort(store_error) => store_error,
            TransactionError::Storage(storage_error) => StoreError::Sled(storage_error),
        }
    }
}

pub(crate) type TxResult<T> = Result<T, ConflictableTransactionError<StoreError>>;

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let users = db.open_tree(trees::USERS)?;
        let subjects = db.open_tree(trees::SUBJECTS)?;
        let topics = db.open_tree(trees::TOPICS)?;
        let cards = db.open_tree(trees::CARDS)?;
        let review_logs = db.open_tree(trees::REVIEW_LOGS)?;
        let activity_days = db.open_tree(trees::ACTIVITY_DAYS)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;
        let subjects_by_user = db.open_tree(trees::SUBJECTS_BY_USER)?;
        let topics_by_subject = db.open_tree(trees::TOPICS_BY_SUBJECT)?;
        let cards_by_topic = db.open_tree(trees::CARDS_BY_TOPIC)?;
        let card_due_index = db.open_tree(trees::CARD_DUE_INDEX)?;
        let new_card_index = db.open_tree(trees::NEW_CARD_INDEX)?;

        Ok(Self {
            db,
            users,
            subjects,
            topics,
            cards,
            review_logs,
            activity_days,
            config_versions,
            subjects_by_user,
            topics_by_subject,
            cards_by_topic,
            card_due_index,
            new_card_index,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub(crate) fn tx_serialize<T: Serialize>(value: &T) -> TxResult<Vec<u8>> {
        Self::serialize(value).map_err(ConflictableTransactionError::Abort)
    }

    pub(crate) fn tx_deserialize<T: DeserializeOwned>(bytes: &[u8]) -> TxResult<T> {
        Self::deserialize(bytes).map_err(ConflictableTransactionError::Abort)
    }
}

/// Day counters are stored as 4 big-endian bytes.
pub(crate) fn decode_count(raw: &[u8]) -> u32 {
    let bytes: [u8; 4] = raw.try_into().unwrap_or([0; 4]);
    u32::from_be_bytes(bytes)
}
