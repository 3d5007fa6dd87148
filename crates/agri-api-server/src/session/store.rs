use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::types::{Message, Role, Session};

/// Sliding window of retained messages per session.
pub const MAX_HISTORY_MESSAGES: usize = 20;

/// Trailing window covered by the per-session rate limiter.
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Session>,
    rate_windows: HashMap<String, VecDeque<Instant>>,
}

/// Thread-safe store for conversation history and rate-limit state.
///
/// One mutex guards both maps, so a rate check and an append for the same
/// session can never interleave. Critical sections are bounded by the
/// history cap and hold no I/O.
pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Current history for a session, creating an empty session if absent.
    pub fn get_or_create(&self, session_id: &str) -> Vec<Message> {
        self.get_or_create_at(session_id, Instant::now())
    }

    fn get_or_create_at(&self, session_id: &str, now: Instant) -> Vec<Message> {
        let mut inner = self.inner.lock();
        inner
            .conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new_at(now))
            .messages
            .clone()
    }

    /// Append a message, bumping last activity and enforcing the sliding
    /// window. Creates the session if absent.
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) {
        self.append_at(session_id, role, content.into(), Instant::now());
    }

    fn append_at(&self, session_id: &str, role: Role, content: String, now: Instant) {
        let mut inner = self.inner.lock();
        let session = inner
            .conversations
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new_at(now));

        session.messages.push(Message::new(role, content));
        session.last_activity = now;

        if session.messages.len() > MAX_HISTORY_MESSAGES {
            let excess = session.messages.len() - MAX_HISTORY_MESSAGES;
            session.messages.drain(0..excess);
            debug!(
                "Session {} history truncated to most recent {}",
                session_id, MAX_HISTORY_MESSAGES
            );
        }
    }

    /// Returns true when the session is rate limited. Timestamps older than
    /// the window are purged first; a session already at the limit is
    /// rejected without recording the attempt.
    pub fn check_and_record_rate(&self, session_id: &str, limit_per_minute: usize) -> bool {
        self.check_and_record_rate_at(session_id, limit_per_minute, Instant::now())
    }

    fn check_and_record_rate_at(
        &self,
        session_id: &str,
        limit_per_minute: usize,
        now: Instant,
    ) -> bool {
        let mut inner = self.inner.lock();
        let window = inner
            .rate_windows
            .entry(session_id.to_string())
            .or_default();

        while window
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) > RATE_WINDOW)
        {
            window.pop_front();
        }

        if window.len() >= limit_per_minute {
            return true;
        }

        window.push_back(now);
        false
    }

    /// Drop a session's history and rate window. Idempotent.
    pub fn clear(&self, session_id: &str) {
        let mut inner = self.inner.lock();
        inner.conversations.remove(session_id);
        inner.rate_windows.remove(session_id);
    }

    /// Remove every session idle for at least `idle_timeout`, together with
    /// its rate window. Returns the number of sessions removed.
    pub fn sweep_expired(&self, idle_timeout: Duration) -> usize {
        self.sweep_expired_at(idle_timeout, Instant::now())
    }

    fn sweep_expired_at(&self, idle_timeout: Duration, now: Instant) -> usize {
        let mut inner = self.inner.lock();

        let expired: Vec<String> = inner
            .conversations
            .iter()
            .filter(|(_, session)| session.idle_for(now) >= idle_timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            inner.conversations.remove(id);
        }

        // Rate windows follow their session, including any orphaned by a
        // request that never produced a conversation.
        let Inner {
            conversations,
            rate_windows,
        } = &mut *inner;
        rate_windows.retain(|id, _| conversations.contains_key(id));

        if !expired.is_empty() {
            info!("Cleaned up {} expired sessions", expired.len());
        }

        expired.len()
    }

    /// Number of live sessions.
    pub fn active_sessions(&self) -> usize {
        self.inner.lock().conversations.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
