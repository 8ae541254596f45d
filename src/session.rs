//! Bounded per-session conversation history.
//!
//! Sessions live in process memory only. Each one keeps the most recent
//! `max_history` exchanges; adding one more evicts the oldest.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use uuid::Uuid;

/// One question and the answer given to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub query: String,
    pub answer: String,
}

pub struct SessionStore {
    max_history: usize,
    sessions: RwLock<HashMap<String, VecDeque<Exchange>>>,
}

impl SessionStore {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history: max_history.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// A fresh session id. Nothing is stored until an exchange is added.
    pub fn new_session_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Start an empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = Self::new_session_id();
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), VecDeque::new());
        id
    }

    /// Number of stored sessions, including cleared ones.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(session_id)
    }

    /// Append an exchange, creating the session if it does not exist yet.
    pub fn add_exchange(&self, session_id: &str, query: &str, answer: &str) {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push_back(Exchange {
            query: query.to_string(),
            answer: answer.to_string(),
        });
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    /// Retained exchanges, oldest first.
    pub fn exchanges(&self, session_id: &str) -> Vec<Exchange> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// History rendered as alternating `User:` / `Assistant:` lines.
    ///
    /// `None` for unknown sessions and sessions with no exchanges.
    pub fn history(&self, session_id: &str) -> Option<String> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let history = sessions.get(session_id)?;
        if history.is_empty() {
            return None;
        }
        Some(
            history
                .iter()
                .map(|e| format!("User: {}\nAssistant: {}", e.query, e.answer))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    /// Forget a session's exchanges but keep the id usable.
    ///
    /// Returns `false` if the session did not exist.
    pub fn clear_session(&self, session_id: &str) -> bool {
        match self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(session_id)
        {
            Some(history) => {
                history.clear();
                true
            }
            None => false,
        }
    }
}
