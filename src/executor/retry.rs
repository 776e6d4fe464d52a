//! Blind re-run policy for failed units

use serde::{Deserialize, Serialize};

/// How often a failed unit is put through the whole sequence again
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    /// Single attempt, no re-runs
    pub fn none() -> Self {
        Self::default()
    }

    /// Upper bound on attempts for one unit
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another attempt follows attempt number `attempt` (1-based)
    pub fn should_retry(&self, attempt: u32, passed: bool) -> bool {
        !passed && attempt <= self.max_retries
    }
}
