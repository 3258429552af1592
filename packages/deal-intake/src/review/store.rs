//! In-memory review sessions with inactivity expiry.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::session::ReviewSession;
use crate::deal::Candidate;

pub type UserId = i64;

/// Review sessions keyed by user, expiring after a period of inactivity.
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<UserId, ReviewSession>,
    timeout: chrono::Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            timeout: chrono::Duration::from_std(timeout).unwrap_or_else(|_| chrono::Duration::days(36_500)),
        }
    }

    /// Begin reviewing `candidates`, replacing any previous session.
    pub fn start(
        &mut self,
        user: UserId,
        candidates: Vec<Candidate>,
        now: DateTime<Utc>,
    ) -> &mut ReviewSession {
        let session = ReviewSession::new(candidates, now);
        match self.sessions.entry(user) {
            Entry::Occupied(mut entry) => {
                tracing::debug!(user_id = user, "Replacing existing review session");
                entry.insert(session);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(session),
        }
    }

    /// The live session for `user`, with its activity refreshed. Expired
    /// sessions are dropped instead.
    pub fn get_mut(&mut self, user: UserId, now: DateTime<Utc>) -> Option<&mut ReviewSession> {
        if self.is_expired(user, now) {
            tracing::info!(user_id = user, "Review session expired");
            self.sessions.remove(&user);
            return None;
        }
        let session = self.sessions.get_mut(&user)?;
        session.last_activity = now;
        Some(session)
    }

    pub fn get(&self, user: UserId) -> Option<&ReviewSession> {
        self.sessions.get(&user)
    }

    pub fn discard(&mut self, user: UserId) -> Option<ReviewSession> {
        self.sessions.remove(&user)
    }

    /// Drop every expired session, returning how many went.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let timeout = self.timeout;
        self.sessions
            .retain(|_, session| now.signed_duration_since(session.last_activity) <= timeout);

        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::info!(removed, "Swept expired review sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, user: UserId, now: DateTime<Utc>) -> bool {
        self.sessions
            .get(&user)
            .is_some_and(|session| now.signed_duration_since(session.last_activity) > self.timeout)
    }
}
