use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: SqlitePool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub content: String,
    pub done: Done,
}

/// Completion flag. On the wire and in the database this is the integer
/// `0` or `1`; anything else is rejected during deserialization.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Done {
    #[default]
    Pending,
    Complete,
}

impl Done {
    pub fn flipped(self) -> Self {
        match self {
            Done::Pending => Done::Complete,
            Done::Complete => Done::Pending,
        }
    }

    pub fn is_complete(self) -> bool {
        self == Done::Complete
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("done must be 0 or 1, got {0}")]
pub struct InvalidFlag(pub i64);

impl TryFrom<i64> for Done {
    type Error = InvalidFlag;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Done::Pending),
            1 => Ok(Done::Complete),
            other => Err(InvalidFlag(other)),
        }
    }
}

impl From<Done> for i64 {
    fn from(done: Done) -> Self {
        match done {
            Done::Pending => 0,
            Done::Complete => 1,
        }
    }
}

impl fmt::Display for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}
