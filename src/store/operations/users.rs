use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

/// The part of a user the review pipeline owns. Identity and credentials
/// live with the auth service; this record only carries gamification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub streak: u32,
    pub last_active_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            streak: 0,
            last_active_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Counts `today` as an active day and advances the streak.
    pub fn record_activity(&mut self, today: NaiveDate, now: DateTime<Utc>) {
        self.streak = next_streak(self.streak, self.last_active_date, today);
        self.last_active_date = Some(today);
        self.updated_at = now;
    }
}

/// Same day keeps the streak, the day after extends it, anything else
/// (first activity, a gap, a clock that went backwards) restarts at 1.
pub fn next_streak(current: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_active {
        Some(last) if last == today => current,
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    }
}

impl Store {
    pub fn create_user(&self, profile: &UserProfile) -> Result<(), StoreError> {
        keys::validate_segment("user", &profile.id)?;
        let key = keys::user_key(&profile.id);
        let cas_result = self.users.compare_and_swap(
            key.as_bytes(),
            None::<&[u8]>,
            Some(Self::serialize(profile)?),
        )?;
        if cas_result.is_err() {
            return Err(StoreError::Conflict {
                entity: "user".to_string(),
                key: profile.id.clone(),
            });
        }
        Ok(())
    }

    pub fn get_user_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        match self.users.get(keys::user_key(user_id).as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
