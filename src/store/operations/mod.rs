pub mod activity;
pub mod cards;
pub mod hierarchy;
pub mod review_logs;
pub mod reviews;
pub mod users;
