use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Learner's self-reported recall quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Again, Grade::Hard, Grade::Good, Grade::Easy];

    /// Numeric rating in `1..=4`.
    pub fn value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Again => "AGAIN",
            Self::Hard => "HARD",
            Self::Good => "GOOD",
            Self::Easy => "EASY",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid grade: {0}")]
pub struct InvalidGrade(pub String);

impl FromStr for Grade {
    type Err = InvalidGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Self::from_value(n).ok_or_else(|| InvalidGrade(s.to_string()));
        }
        match trimmed.to_ascii_uppercase().as_str() {
            "AGAIN" => Ok(Self::Again),
            "HARD" => Ok(Self::Hard),
            "GOOD" => Ok(Self::Good),
            "EASY" => Ok(Self::Easy),
            _ => Err(InvalidGrade(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Grade {
    type Error = InvalidGrade;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_value(value).ok_or_else(|| InvalidGrade(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardState {
    New,
    Learning,
    Review,
}

/// The scheduling fields the engine reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulingSnapshot {
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub state: CardState,
}

impl SchedulingSnapshot {
    pub fn new_card() -> Self {
        Self {
            stability: 0.0,
            difficulty: 0.0,
            reps: 0,
            state: CardState::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOutcome {
    pub stability: f64,
    pub difficulty: f64,
    pub reps: u32,
    pub state: CardState,
    pub interval_days: i64,
    pub next_review: DateTime<Utc>,
}
