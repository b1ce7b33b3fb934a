//! Chat sessions and the in-memory session store.
//!
//! Each session sits behind its own async mutex. A chat turn holds that lock
//! from merge to reply, so turns on one session never interleave, while the
//! map lock is only held for lookups and inserts.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;
use wayfarer_core::TravelRequest;

use crate::error::ChatError;

/// Shared handle to one session.
pub type SessionHandle = Arc<AsyncMutex<Session>>;

// =============================================================================
// Phase state machine
// =============================================================================

/// Where a session is in the booking dialogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Gathering trip fields.
    Collecting,
    /// All fields known; search in progress.
    Ready,
    /// A package was found and reported.
    Booked,
    /// Deleted. Terminal.
    Cleared,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionPhase::Collecting => "collecting",
            SessionPhase::Ready => "ready",
            SessionPhase::Booked => "booked",
            SessionPhase::Cleared => "cleared",
        };
        f.write_str(s)
    }
}

/// Validate that a phase transition is allowed.
///
/// Valid transitions:
/// - Collecting -> Ready
/// - Ready -> Booked
/// - Ready -> Collecting (no viable package, search failure)
/// - Booked -> Collecting (the traveler changes a booked trip)
/// - any live phase -> Cleared
pub fn validate_transition(from: SessionPhase, to: SessionPhase) -> Result<(), ChatError> {
    let valid = matches!(
        (from, to),
        (SessionPhase::Collecting, SessionPhase::Ready)
            | (SessionPhase::Ready, SessionPhase::Booked)
            | (SessionPhase::Ready, SessionPhase::Collecting)
            | (SessionPhase::Booked, SessionPhase::Collecting)
            | (SessionPhase::Collecting, SessionPhase::Cleared)
            | (SessionPhase::Ready, SessionPhase::Cleared)
            | (SessionPhase::Booked, SessionPhase::Cleared)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

// =============================================================================
// Session
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One traveler's conversation and the trip it has described so far.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub request: TravelRequest,
    pub phase: SessionPhase,
    /// Completed user turns.
    pub turns: u32,
    pub history: VecDeque<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            request: TravelRequest::default(),
            phase: SessionPhase::Collecting,
            turns: 0,
            history: VecDeque::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn transition(&mut self, to: SessionPhase) -> Result<(), ChatError> {
        validate_transition(self.phase, to)?;
        tracing::debug!(session_id = %self.id, from = %self.phase, to = %to, "Session phase change");
        self.phase = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Append a message, dropping the oldest beyond `max_history`.
    pub fn record(&mut self, role: ChatRole, content: &str, max_history: usize) {
        self.history.push_back(ChatMessage {
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        });
        while self.history.len() > max_history {
            self.history.pop_front();
        }
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            phase: self.phase,
            request: self.request.clone(),
            missing_fields: self
                .request
                .missing_fields()
                .iter()
                .map(|f| f.as_str().to_string())
                .collect(),
            turns: self.turns,
            history: self.history.iter().cloned().collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Read-only view of a session for the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub phase: SessionPhase,
    pub request: TravelRequest,
    pub missing_fields: Vec<String>,
    pub turns: u32,
    pub history: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Store
// =============================================================================

/// Process-lifetime map from session id to session. No expiry.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, SessionHandle>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::StorageError(format!("session lock poisoned: {}", e)))
    }

    /// Return the session for `id`, creating a fresh one under a newly
    /// generated id when `id` is absent, blank or unknown.
    pub fn resolve(&self, id: Option<&str>) -> Result<SessionHandle, ChatError> {
        let mut sessions = self.lock()?;
        if let Some(existing) = id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .and_then(|id| sessions.get(id))
        {
            return Ok(Arc::clone(existing));
        }

        let new_id = Uuid::new_v4().to_string();
        let handle = Arc::new(AsyncMutex::new(Session::new(new_id.clone())));
        sessions.insert(new_id.clone(), Arc::clone(&handle));
        tracing::info!(session_id = %new_id, requested = ?id, "Session created");
        Ok(handle)
    }

    pub fn get(&self, id: &str) -> Result<Option<SessionHandle>, ChatError> {
        Ok(self.lock()?.get(id).cloned())
    }

    /// Remove a session. Returns whether it existed.
    ///
    /// Waits for any in-flight turn on the session, then marks it cleared so a
    /// turn that was queued behind it starts over with a new session.
    pub async fn remove(&self, id: &str) -> Result<bool, ChatError> {
        let removed = self.lock()?.remove(id);
        let Some(handle) = removed else {
            return Ok(false);
        };
        let mut session = handle.lock().await;
        if session.phase != SessionPhase::Cleared {
            session.transition(SessionPhase::Cleared)?;
        }
        tracing::info!(session_id = %id, "Session cleared");
        Ok(true)
    }

    pub async fn snapshot(&self, id: &str) -> Result<Option<SessionSnapshot>, ChatError> {
        let Some(handle) = self.get(id)? else {
            return Ok(None);
        };
        let session = handle.lock().await;
        Ok(Some(session.snapshot()))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
