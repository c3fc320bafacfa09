pub mod fsrs;
pub mod ripple;
pub mod types;

pub use types::{CardState, Grade, InvalidGrade, ScheduleOutcome, SchedulingSnapshot};
