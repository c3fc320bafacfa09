use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::store::{decode_count, keys};
use crate::store::{Store, StoreError};

impl Store {
    /// The full heatmap for a user, one entry per active calendar day.
    pub fn get_activity_log(&self, user_id: &str) -> Result<BTreeMap<NaiveDate, u32>, StoreError> {
        let prefix = keys::owner_prefix(user_id);
        let mut log = BTreeMap::new();
        for item in self.activity_days.scan_prefix(prefix.as_bytes()) {
            let (key, value) = item?;
            match keys::parse_activity_day(&key) {
                Some(day) => {
                    log.insert(day, decode_count(&value));
                }
                None => tracing::warn!(user_id, "Skipping malformed activity key"),
            }
        }
        Ok(log)
    }
}
