//! Session history models.

use std::str::FromStr;

use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
    Interrupted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "Running",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
            SessionStatus::Interrupted => "Interrupted",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            SessionStatus::Running,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
            SessionStatus::Interrupted,
        ]
        .into_iter()
        .find(|status| status.as_str() == s)
        .ok_or_else(|| anyhow!("unknown session status '{s}'"))
    }
}

/// One row of the sleep history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    /// `None` for sessions started without a timer.
    pub target_secs: Option<u64>,
    pub elapsed_secs: u64,
    pub sound_count: u32,
    pub updated_at: DateTime<Utc>,
}
