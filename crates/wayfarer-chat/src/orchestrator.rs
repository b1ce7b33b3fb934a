//! Trip orchestrator: the per-turn decision of whether to ask, search or send.
//!
//! One call to [`TripOrchestrator::handle_message`] is one chat turn. It merges
//! what the extractor found into the session's request, then either asks a
//! follow-up question or searches and emails a package.

use std::sync::Arc;

use wayfarer_core::config::ChatConfig;
use wayfarer_providers::{Mailer, TripExtractor, TripSearch};

use crate::error::ChatError;
use crate::response::{self, ChatReply};
use crate::session::{ChatRole, Session, SessionPhase, SessionSnapshot, SessionStore};

/// Coordinates extraction, session state, search and delivery.
pub struct TripOrchestrator {
    store: SessionStore,
    extractor: Arc<dyn TripExtractor>,
    search: Arc<dyn TripSearch>,
    mailer: Arc<dyn Mailer>,
    config: ChatConfig,
}

impl TripOrchestrator {
    pub fn new(
        config: ChatConfig,
        extractor: Arc<dyn TripExtractor>,
        search: Arc<dyn TripSearch>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        tracing::info!(
            extractor = extractor.name(),
            search = search.name(),
            mailer = mailer.name(),
            "Trip orchestrator ready"
        );
        Self {
            store: SessionStore::new(),
            extractor,
            search,
            mailer,
            config,
        }
    }

    /// Handle one chat message.
    ///
    /// An absent or unknown `session_id` starts a new session; the reply
    /// carries the id to use for the next turn. Provider failures become
    /// `question` or `error` replies; only input validation and internal
    /// faults are returned as `Err`.
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<ChatReply, ChatError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        // A session deleted while we waited for its lock is replaced by a new one.
        let mut requested = session_id;
        let mut session = loop {
            let handle = self.store.resolve(requested)?;
            let guard = handle.lock_owned().await;
            if guard.phase != SessionPhase::Cleared {
                break guard;
            }
            requested = None;
        };

        session.turns += 1;
        session.record(ChatRole::User, message, self.config.max_history);

        let reply = match self.run_turn(&mut session, message).await {
            Ok(reply) => reply,
            Err(err) => self.failure_reply(&mut session, err)?,
        };

        session.record(ChatRole::Assistant, &reply.message, self.config.max_history);
        tracing::info!(
            session_id = %session.id,
            turn = session.turns,
            phase = %session.phase,
            reply = ?reply.kind,
            "Chat turn handled"
        );
        Ok(reply)
    }

    async fn run_turn(&self, session: &mut Session, message: &str) -> Result<ChatReply, ChatError> {
        let extraction = self.extractor.extract(message, &session.request).await?;
        let changed = session.request.merge(extraction.patch);
        tracing::debug!(session_id = %session.id, changed = ?changed, "Merged extracted fields");

        if session.phase == SessionPhase::Booked {
            if changed.is_empty() {
                return Ok(ChatReply::question(
                    &session.id,
                    response::already_booked(&session.request),
                ));
            }
            session.transition(SessionPhase::Collecting)?;
        }

        let follow_up = extraction
            .follow_up_question
            .filter(|q| !q.trim().is_empty());
        let extractor_holds_back = !extraction.is_complete && follow_up.is_some();
        if !session.request.is_complete() || extractor_holds_back {
            let question = follow_up.unwrap_or_else(|| response::follow_up_question(&session.request));
            return Ok(ChatReply::question(&session.id, question));
        }

        // Prices are quoted in the default currency; a foreign budget can never match.
        let currency = &self.config.default_currency;
        if let Some(budget) = &session.request.budget {
            if !budget.currency().eq_ignore_ascii_case(currency) {
                tracing::info!(
                    session_id = %session.id,
                    budget = %budget,
                    "Budget in foreign currency"
                );
                return Ok(ChatReply::question(
                    &session.id,
                    response::budget_currency_mismatch(&session.request, currency),
                ));
            }
        }

        session.transition(SessionPhase::Ready)?;
        let package = match self.search.search(&session.request).await {
            Ok(Some(package)) if package.within_budget(session.request.budget.as_ref()) => package,
            Ok(Some(package)) => {
                session.transition(SessionPhase::Collecting)?;
                return Err(ChatError::NoViablePackage(format!(
                    "total {} exceeds budget",
                    package.total_price()
                )));
            }
            Ok(None) => {
                session.transition(SessionPhase::Collecting)?;
                return Err(ChatError::NoViablePackage("no offers".to_string()));
            }
            Err(e) => {
                session.transition(SessionPhase::Collecting)?;
                return Err(e.into());
            }
        };

        let email_sent = match self.mailer.send(&session.request, &package).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Package not emailed");
                false
            }
        };

        session.transition(SessionPhase::Booked)?;
        tracing::info!(
            session_id = %session.id,
            total = %package.total_price(),
            email_sent,
            "Package booked"
        );
        Ok(ChatReply::complete(
            &session.id,
            &session.request,
            package,
            email_sent,
        ))
    }

    /// Turn a provider failure into a reply. Internal faults pass through.
    fn failure_reply(&self, session: &mut Session, err: ChatError) -> Result<ChatReply, ChatError> {
        match err {
            ChatError::ExtractionFailure(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Extraction failed");
                Ok(ChatReply::error(&session.id, response::EXTRACTION_FAILED))
            }
            ChatError::NoViablePackage(reason) => {
                tracing::info!(session_id = %session.id, reason = %reason, "No viable package");
                Ok(ChatReply::question(
                    &session.id,
                    response::no_viable_package(&session.request),
                ))
            }
            ChatError::SearchFailure(e) => {
                tracing::warn!(session_id = %session.id, error = %e, "Search failed");
                Ok(ChatReply::error(&session.id, response::SEARCH_FAILED))
            }
            other => Err(other),
        }
    }

    /// Delete a session. Returns whether it existed.
    pub async fn clear_session(&self, session_id: &str) -> Result<bool, ChatError> {
        self.store.remove(session_id).await
    }

    pub async fn session_snapshot(&self, session_id: &str) -> Result<SessionSnapshot, ChatError> {
        self.store
            .snapshot(session_id)
            .await?
            .ok_or_else(|| ChatError::SessionNotFound(session_id.to_string()))
    }

    pub fn active_sessions(&self) -> usize {
        self.store.len()
    }
}
