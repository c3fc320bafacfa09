use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::srs::Grade;
use crate::store::keys;
use crate::store::{Store, StoreError};

/// Append-only record of one review. Never rewritten by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLog {
    pub id: String,
    pub card_id: String,
    pub user_id: String,
    pub grade: Grade,
    pub duration_ms: u64,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewLog {
    pub fn key(&self) -> String {
        keys::review_log_key(&self.user_id, self.reviewed_at.timestamp_millis(), &self.id)
    }
}

impl Store {
    /// Newest first.
    pub fn get_user_review_logs(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ReviewLog>, StoreError> {
        let prefix = keys::owner_prefix(user_id);
        let mut logs = Vec::new();
        for item in self.review_logs.scan_prefix(prefix.as_bytes()) {
            if logs.len() >= limit {
                break;
            }
            let (_, value) = item?;
            logs.push(Self::deserialize::<ReviewLog>(&value)?);
        }
        Ok(logs)
    }

    pub fn count_card_review_logs(&self, user_id: &str, card_id: &str) -> Result<usize, StoreError> {
        let prefix = keys::owner_prefix(user_id);
        let mut count = 0usize;
        for item in self.review_logs.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let log: ReviewLog = Self::deserialize(&value)?;
            if log.card_id == card_id {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Review counts for the most recent `days` calendar days that have any
    /// reviews, returned oldest first.
    pub fn recent_daily_review_counts(
        &self,
        user_id: &str,
        days: usize,
    ) -> Result<Vec<(NaiveDate, u32)>, StoreError> {
        let prefix = keys::owner_prefix(user_id);
        let mut by_day: BTreeMap<NaiveDate, u32> = BTreeMap::new();
        for item in self.review_logs.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let log: ReviewLog = Self::deserialize(&value)?;
            let day = log.reviewed_at.date_naive();
            // Keys are newest first, so the first `days` distinct dates are the latest ones.
            if !by_day.contains_key(&day) && by_day.len() >= days {
                break;
            }
            *by_day.entry(day).or_insert(0) += 1;
        }
        Ok(by_day.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::tempdir;

    use super::*;

    fn log(id: &str, reviewed_at: DateTime<Utc>) -> ReviewLog {
        ReviewLog {
            id: id.to_string(),
            card_id: "c1".to_string(),
            user_id: "u1".to_string(),
            grade: Grade::Good,
            duration_ms: 900,
            reviewed_at,
        }
    }

    #[test]
    fn daily_counts_keep_latest_days_in_ascending_order() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("logs-db").to_str().unwrap()).unwrap();
        let base = DateTime::parse_from_rfc3339("2025-03-10T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let mut n = 0;
        for offset in 0..4 {
            for _ in 0..=offset {
                n += 1;
                let entry = log(&format!("l{n}"), base - Duration::days(offset));
                store
                    .review_logs
                    .insert(entry.key().as_bytes(), Store::serialize(&entry).unwrap())
                    .unwrap();
            }
        }

        let counts = store.recent_daily_review_counts("u1", 2).unwrap();
        assert_eq!(
            counts,
            vec![
                ((base - Duration::days(1)).date_naive(), 2),
                (base.date_naive(), 1),
            ]
        );
        assert_eq!(store.get_user_review_logs("u1", 3).unwrap()[0].reviewed_at, base);
    }
}
