//! Ownership chain records (subject -> topic). Naming, renaming and deletion
//! belong to the content service; the core only creates, reads and walks them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{Store, StoreError, TxResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    pub fn create_subject(&self, subject: &Subject) -> Result<(), StoreError> {
        keys::validate_segment("subject", &subject.id)?;
        keys::validate_segment("user", &subject.user_id)?;
        let key = keys::subject_key(&subject.id);
        let index_key = keys::subjects_by_user_key(&subject.user_id, &subject.id);
        let bytes = Self::serialize(subject)?;

        (&self.subjects, &self.subjects_by_user)
            .transaction(|(tx_subjects, tx_index)| -> TxResult<()> {
                tx_subjects.insert(key.as_bytes(), bytes.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(StoreError::from)
    }

    pub fn get_subject(&self, subject_id: &str) -> Result<Option<Subject>, StoreError> {
        match self.subjects.get(keys::subject_key(subject_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Returns the subject only when `user_id` owns it.
    pub fn get_owned_subject(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<Option<Subject>, StoreError> {
        Ok(self
            .get_subject(subject_id)?
            .filter(|subject| subject.user_id == user_id))
    }

    pub fn list_user_subjects(&self, user_id: &str) -> Result<Vec<Subject>, StoreError> {
        let prefix = keys::owner_prefix(user_id);
        let mut subjects = Vec::new();
        for item in self.subjects_by_user.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            let Some(subject_id) = key.get(prefix.len()..).and_then(|s| std::str::from_utf8(s).ok())
            else {
                continue;
            };
            if let Some(subject) = self.get_subject(subject_id)? {
                subjects.push(subject);
            }
        }
        Ok(subjects)
    }

    pub fn create_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        keys::validate_segment("topic", &topic.id)?;
        if self.get_subject(&topic.subject_id)?.is_none() {
            return Err(StoreError::not_found("subject", &topic.subject_id));
        }
        let key = keys::topic_key(&topic.id);
        let index_key = keys::topics_by_subject_key(&topic.subject_id, &topic.id);
        let bytes = Self::serialize(topic)?;

        (&self.topics, &self.topics_by_subject)
            .transaction(|(tx_topics, tx_index)| -> TxResult<()> {
                tx_topics.insert(key.as_bytes(), bytes.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(StoreError::from)
    }

    pub fn get_topic(&self, topic_id: &str) -> Result<Option<Topic>, StoreError> {
        match self.topics.get(keys::topic_key(topic_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn list_subject_topic_ids(&self, subject_id: &str) -> Result<Vec<String>, StoreError> {
        let prefix = keys::owner_prefix(subject_id);
        let mut ids = Vec::new();
        for item in self.topics_by_subject.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            if let Some(topic_id) = key.get(prefix.len()..).and_then(|s| std::str::from_utf8(s).ok())
            {
                ids.push(topic_id.to_string());
            }
        }
        Ok(ids)
    }

    /// Walks topic -> subject and returns the owning user id, or `None` when
    /// any link of the chain is missing.
    pub fn resolve_topic_owner(&self, topic_id: &str) -> Result<Option<String>, StoreError> {
        let Some(topic) = self.get_topic(topic_id)? else {
            return Ok(None);
        };
        Ok(self.get_subject(&topic.subject_id)?.map(|s| s.user_id))
    }
}
