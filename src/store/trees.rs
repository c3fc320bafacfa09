pub const USERS: &str = "users";
pub const SUBJECTS: &str = "subjects";
pub const TOPICS: &str = "topics";
pub const CARDS: &str = "cards";
pub const REVIEW_LOGS: &str = "review_logs";
pub const ACTIVITY_DAYS: &str = "activity_days";
pub const CONFIG_VERSIONS: &str = "config_versions";

// Secondary index trees
pub const SUBJECTS_BY_USER: &str = "subjects_by_user";
pub const TOPICS_BY_SUBJECT: &str = "topics_by_subject";
pub const CARDS_BY_TOPIC: &str = "cards_by_topic";
pub const CARD_DUE_INDEX: &str = "card_due_index";
pub const NEW_CARD_INDEX: &str = "new_card_index";
