//! AI session types: turns, session handles, provider replies.
//!
//! A [`SessionHandle`] is the stateful chat context kept for one
//! conversation. It carries the system instruction it was started with and
//! the chronological turn history that every subsequent send builds on.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::llm::Usage;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
        }
    }
}

/// One role-tagged unit of a session's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            content: content.into(),
        }
    }
}

/// Stateful chat context for a single conversation.
///
/// Owned by exactly one registry entry. Providers append to the history
/// on a successful send and must leave it untouched on failure.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    system_instruction: Arc<str>,
    history: Vec<Turn>,
}

impl SessionHandle {
    /// Start a handle with the given system instruction and prior turns.
    pub fn new(system_instruction: Arc<str>, history: Vec<Turn>) -> Self {
        Self {
            id: Uuid::now_v7(),
            system_instruction,
            history,
        }
    }

    /// Identifier of this provider session (for log correlation only).
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a turn to the end of the history.
    pub fn push(&mut self, turn: Turn) {
        self.history.push(turn);
    }

    /// Remove up to `count` turns from the end of the history.
    ///
    /// Returns the number of turns actually removed.
    pub fn truncate_last(&mut self, count: usize) -> usize {
        let removed = count.min(self.history.len());
        self.history.truncate(self.history.len() - removed);
        removed
    }
}

/// What a provider returns from a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    /// The assistant's reply text.
    pub text: String,
    /// How many turns the send appended to the handle's history.
    pub turns_appended: usize,
    /// Token usage, when the backend reports it.
    pub usage: Option<Usage>,
}

/// Errors from the AI session layer.
///
/// Transport failures, backend errors, and timeouts all collapse into
/// `ProviderUnavailable`: the caller can only retry later.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    #[error("AI provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },
}

impl AiError {
    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        AiError::ProviderUnavailable {
            provider: provider.into(),
            reason: reason.into(),
        }
    }
}
