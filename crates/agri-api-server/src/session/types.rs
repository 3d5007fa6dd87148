use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversation turn. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Per-session conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    /// Message history in chronological order (bounded, oldest dropped first)
    pub messages: Vec<Message>,

    /// Session creation time
    pub created_at: Instant,

    /// Last activity timestamp, bumped on every append
    pub last_activity: Instant,
}

impl Session {
    pub fn new_at(now: Instant) -> Self {
        Self {
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// How long this session has been idle as of `now`.
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}
