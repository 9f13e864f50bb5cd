//! Conversation service: message exchange, titles, and conversation CRUD.
//!
//! `ConversationService` sits between the HTTP layer and the
//! [`SessionRegistry`]. It persists every user message before the AI is
//! asked, so a provider outage never loses what the user wrote, and reseeds
//! a conversation's AI session from its stored transcript when the registry
//! no longer holds one (after a restart or an eviction).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tebnegar_types::ai::Turn;
use tebnegar_types::conversation::{
    AiAnalysis, Conversation, ConversationSummary, ConversationWithMessages, Message,
    PostedMessage, SenderType, DEFAULT_CONVERSATION_TITLE, MAX_MESSAGE_CHARS, MAX_TITLE_CHARS,
    MIN_SEARCH_KEYWORD_CHARS,
};
use tebnegar_types::error::{RepositoryError, ServiceError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::provider::AiProvider;
use crate::ai::registry::SessionRegistry;
use crate::conversation::repository::ConversationRepository;
use crate::conversation::title::{clean_title, FALLBACK_TITLE, TITLE_PROMPT};
use crate::repository::Page;

/// Orchestrates conversations and their AI sessions.
///
/// Generic over the repository and provider so tebnegar-core never depends
/// on tebnegar-infra.
pub struct ConversationService<R: ConversationRepository, P: AiProvider> {
    repo: R,
    registry: Arc<SessionRegistry<P>>,
}

impl<R: ConversationRepository, P: AiProvider> ConversationService<R, P> {
    pub fn new(repo: R, registry: Arc<SessionRegistry<P>>) -> Self {
        Self { repo, registry }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn registry(&self) -> &Arc<SessionRegistry<P>> {
        &self.registry
    }

    // --- Message exchange ---

    /// Store a user message, get the assistant's reply, and store that too.
    ///
    /// The user message is durable even when the provider fails; in that
    /// case no AI message or analysis is written and the provider error is
    /// returned. There is no retry.
    #[tracing::instrument(name = "post_message", skip_all, fields(conversation_id = %conversation_id))]
    pub async fn post_message(
        &self,
        conversation_id: Uuid,
        content: &str,
    ) -> Result<PostedMessage, ServiceError> {
        validate_message(content)?;

        let user_message = Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_type: SenderType::User,
            content: content.to_string(),
            reply_to: None,
            created_at: Utc::now(),
        };
        self.repo.save_user_message(&user_message).await?;

        let key = conversation_id.to_string();
        let repo = &self.repo;
        let started = Instant::now();
        let reply = self
            .registry
            .send_message_with(&key, content, move || async move {
                load_transcript(repo, &conversation_id).await
            })
            .await
            .inspect_err(|e| warn!(error = %e, "AI provider failed; user message kept"))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let ai_message = Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_type: SenderType::Ai,
            content: reply.text,
            reply_to: Some(user_message.id),
            created_at: Utc::now(),
        };
        let token_usage = reply.usage.map_or_else(
            || json!({}),
            |usage| {
                json!({
                    "input_tokens": usage.input_tokens,
                    "output_tokens": usage.output_tokens,
                })
            },
        );
        let analysis = AiAnalysis {
            id: Uuid::now_v7(),
            message_id: ai_message.id,
            potential_conditions: Vec::new(),
            criticality_flag: false,
            processing_time_ms: elapsed_ms,
            ai_provider: self.registry.provider_name().to_string(),
            token_usage,
        };
        self.repo
            .save_ai_message_with_analysis(&ai_message, &analysis)
            .await?;

        info!(message_id = %ai_message.id, elapsed_ms, "AI reply stored");
        Ok(PostedMessage {
            message: ai_message,
            elapsed_time_ms: elapsed_ms,
        })
    }

    // --- Titles ---

    /// Ask the conversation's AI session for a short title.
    ///
    /// Never fails: an empty history, a provider error, a timeout, or an
    /// empty reply all yield [`FALLBACK_TITLE`]. The session history is the
    /// same afterwards as before.
    #[tracing::instrument(name = "generate_title", skip_all, fields(conversation_id = %conversation_id))]
    pub async fn generate_title(&self, conversation_id: Uuid) -> String {
        let key = conversation_id.to_string();
        let repo = &self.repo;
        let answer = self
            .registry
            .ask_ephemeral(&key, TITLE_PROMPT, move || async move {
                load_transcript(repo, &conversation_id).await
            })
            .await;

        match answer {
            Ok(Some(raw)) => clean_title(&raw).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
            Ok(None) => FALLBACK_TITLE.to_string(),
            Err(e) => {
                warn!(error = %e, "title generation failed; using fallback");
                FALLBACK_TITLE.to_string()
            }
        }
    }

    /// Generate a title and store it on the conversation.
    pub async fn generate_and_store_title(
        &self,
        conversation_id: Uuid,
    ) -> Result<String, ServiceError> {
        self.require_conversation(&conversation_id).await?;
        let title = self.generate_title(conversation_id).await;
        self.repo.update_title(&conversation_id, &title).await?;
        info!(conversation_id = %conversation_id, title = %title, "conversation title updated");
        Ok(title)
    }

    // --- CRUD ---

    /// Start a new conversation in a session.
    pub async fn create_conversation(&self, session_id: Uuid) -> Result<Conversation, ServiceError> {
        let conversation = Conversation {
            id: Uuid::now_v7(),
            session_id,
            title: DEFAULT_CONVERSATION_TITLE.to_string(),
            created_at: Utc::now(),
        };
        Ok(self.repo.create_conversation(&conversation).await?)
    }

    /// Conversations of a session, newest first.
    pub async fn list_conversations(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<Conversation>, ServiceError> {
        Ok(self.repo.list_conversations(&session_id).await?)
    }

    /// A conversation with its messages in chronological order.
    pub async fn get_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<ConversationWithMessages, ServiceError> {
        let conversation = self.require_conversation(&conversation_id).await?;
        let messages = self.repo.get_messages(&conversation_id).await?;
        Ok(ConversationWithMessages {
            conversation,
            messages,
        })
    }

    pub async fn rename_conversation(
        &self,
        conversation_id: Uuid,
        title: &str,
    ) -> Result<Conversation, ServiceError> {
        let title = title.trim();
        let len = title.chars().count();
        if len == 0 || len > MAX_TITLE_CHARS {
            return Err(ServiceError::Validation(format!(
                "title must be between 1 and {MAX_TITLE_CHARS} characters"
            )));
        }

        self.repo.update_title(&conversation_id, title).await?;
        self.require_conversation(&conversation_id).await
    }

    /// Delete a conversation and drop its AI session.
    pub async fn delete_conversation(&self, conversation_id: Uuid) -> Result<(), ServiceError> {
        self.repo.delete_conversation(&conversation_id).await?;
        self.registry.remove(&conversation_id.to_string());
        info!(conversation_id = %conversation_id, "conversation deleted");
        Ok(())
    }

    /// Admin transcript search by message content.
    pub async fn search_conversations(
        &self,
        keyword: &str,
        page: Page,
    ) -> Result<Vec<ConversationSummary>, ServiceError> {
        let keyword = keyword.trim();
        if keyword.chars().count() < MIN_SEARCH_KEYWORD_CHARS {
            return Err(ServiceError::Validation(format!(
                "keyword must be at least {MIN_SEARCH_KEYWORD_CHARS} characters"
            )));
        }
        Ok(self.repo.search_conversations(keyword, page).await?)
    }

    async fn require_conversation(&self, id: &Uuid) -> Result<Conversation, ServiceError> {
        self.repo
            .get_conversation(id)
            .await?
            .ok_or(ServiceError::Repository(RepositoryError::NotFound))
    }
}

fn validate_message(content: &str) -> Result<(), ServiceError> {
    if content.trim().is_empty() {
        return Err(ServiceError::Validation(
            "message content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::Validation(format!(
            "message content must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok(())
}

/// Turn a stored transcript into session history.
///
/// Only complete user -> AI pairs are kept, in user message order, so the
/// result alternates and has even length. An AI message is paired with the
/// user message it names in `reply_to`; rows interleaved by concurrent
/// posts therefore still pair correctly. An AI message without `reply_to`
/// pairs with the user message directly before it. A user message without
/// a reply (e.g. one whose exchange failed) is skipped.
pub fn transcript_turns(messages: &[Message]) -> Vec<Turn> {
    let mut replies: HashMap<Uuid, &Message> = HashMap::new();
    for message in messages {
        if message.sender_type == SenderType::Ai {
            if let Some(user_id) = message.reply_to {
                replies.entry(user_id).or_insert(message);
            }
        }
    }

    let mut turns = Vec::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        if message.sender_type != SenderType::User {
            continue;
        }
        let reply = replies.get(&message.id).copied().or_else(|| {
            messages
                .get(i + 1)
                .filter(|next| next.sender_type == SenderType::Ai && next.reply_to.is_none())
        });
        if let Some(reply) = reply {
            turns.push(Turn::user(message.content.clone()));
            turns.push(Turn::model(reply.content.clone()));
        }
    }
    turns
}

async fn load_transcript<R: ConversationRepository>(repo: &R, conversation_id: &Uuid) -> Vec<Turn> {
    match repo.get_messages(conversation_id).await {
        Ok(messages) => transcript_turns(&messages),
        Err(e) => {
            warn!(conversation_id = %conversation_id, error = %e, "could not load transcript; starting fresh session");
            Vec::new()
        }
    }
}
