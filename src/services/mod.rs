pub mod analytics;
pub mod queue;
pub mod review;

pub use queue::QueueBuilder;
pub use review::{ReviewError, ReviewOutcome, ReviewService};
