use chrono::NaiveDate;

use crate::store::StoreError;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ids become key segments, so the separator is not allowed inside them.
pub fn validate_segment(entity: &str, id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains(':') {
        return Err(StoreError::Validation(format!(
            "{entity} id must be non-empty and must not contain ':'"
        )));
    }
    Ok(())
}

pub fn user_key(user_id: &str) -> String {
    user_id.to_string()
}

pub fn subject_key(subject_id: &str) -> String {
    subject_id.to_string()
}

pub fn subjects_by_user_key(user_id: &str, subject_id: &str) -> String {
    format!("{}:{}", user_id, subject_id)
}

pub fn topic_key(topic_id: &str) -> String {
    topic_id.to_string()
}

pub fn topics_by_subject_key(subject_id: &str, topic_id: &str) -> String {
    format!("{}:{}", subject_id, topic_id)
}

pub fn card_key(card_id: &str) -> String {
    card_id.to_string()
}

pub fn cards_by_topic_key(topic_id: &str, card_id: &str) -> String {
    format!("{}:{}", topic_id, card_id)
}

/// Shared by the due index (keyed on `next_review`) and the new-card index
/// (keyed on `created_at`); ascending timestamp order within a subject.
pub fn card_time_index_key(subject_id: &str, timestamp_ms: i64, card_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    format!("{}:{:020}:{}", subject_id, ts, card_id)
}

/// Splits a `{owner}:{ts:020}:{id}` key into its timestamp and trailing id.
pub fn parse_time_index_key(key: &[u8]) -> Option<(i64, String)> {
    let text = std::str::from_utf8(key).ok()?;
    let mut parts = text.rsplitn(3, ':');
    let id = parts.next()?;
    let ts = parts.next()?.parse::<u64>().ok()?;
    parts.next()?;
    Some((i64::try_from(ts).ok()?, id.to_string()))
}

pub fn review_log_key(user_id: &str, timestamp_ms: i64, log_id: &str) -> String {
    let ts = timestamp_ms.max(0) as u64;
    let reverse_ts = u64::MAX - ts;
    format!("{}:{:020}:{}", user_id, reverse_ts, log_id)
}

pub fn activity_day_key(user_id: &str, day: NaiveDate) -> String {
    format!("{}:{}", user_id, day.format(DATE_FORMAT))
}

pub fn parse_activity_day(key: &[u8]) -> Option<NaiveDate> {
    let text = std::str::from_utf8(key).ok()?;
    let (_, day) = text.rsplit_once(':')?;
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// Prefix for every `{owner}:...` keyed index.
pub fn owner_prefix(owner_id: &str) -> String {
    format!("{}:", owner_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_log_key_orders_by_time_desc() {
        let k_new = review_log_key("u1", 2000, "l2");
        let k_old = review_log_key("u1", 1000, "l1");
        assert!(k_new < k_old);
    }

    #[test]
    fn time_index_orders_ascending_and_parses() {
        let early = card_time_index_key("s1", 1_000, "c9");
        let late = card_time_index_key("s1", 2_000, "c1");
        assert!(early < late);
        assert_eq!(
            parse_time_index_key(late.as_bytes()),
            Some((2_000, "c1".to_string()))
        );
    }

    #[test]
    fn activity_day_round_trips() {
        let day = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        let key = activity_day_key("u1", day);
        assert_eq!(key, "u1:2025-01-09");
        assert_eq!(parse_activity_day(key.as_bytes()), Some(day));
    }

    #[test]
    fn separator_is_rejected_in_ids() {
        assert!(validate_segment("card", "a:b").is_err());
        assert!(validate_segment("card", "").is_err());
        assert!(validate_segment("card", "c-1").is_ok());
    }
}
