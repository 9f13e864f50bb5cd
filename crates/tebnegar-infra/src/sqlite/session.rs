//! SQLite user session repository implementation.

use chrono::{DateTime, Utc};
use tebnegar_core::repository::session::SessionRepository;
use tebnegar_types::conversation::Conversation;
use tebnegar_types::error::RepositoryError;
use tebnegar_types::session::UserSession;
use uuid::Uuid;

use super::format_datetime;
use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn create_with_conversation(
        &self,
        session: &UserSession,
        conversation: &Conversation,
    ) -> Result<(), RepositoryError> {
        let attribution = &session.attribution;
        let client_metadata = attribution
            .client_metadata
            .as_ref()
            .map(|value| value.to_string());

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO sessions (id, ip_address, user_agent, landing_page_url, referrer_url,
                   utm_source, utm_medium, utm_campaign, utm_term, utm_content, client_metadata,
                   started_at, ended_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(&attribution.landing_page_url)
        .bind(&attribution.referrer_url)
        .bind(&attribution.utm_source)
        .bind(&attribution.utm_medium)
        .bind(&attribution.utm_campaign)
        .bind(&attribution.utm_term)
        .bind(&attribution.utm_content)
        .bind(client_metadata)
        .bind(format_datetime(&session.started_at))
        .bind(session.ended_at.as_ref().map(format_datetime))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO conversations (id, session_id, title, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.session_id.to_string())
        .bind(&conversation.title)
        .bind(format_datetime(&conversation.created_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn end(&self, id: &Uuid, ended_at: DateTime<Utc>) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("UPDATE sessions SET ended_at = ? WHERE id = ? AND ended_at IS NULL")
                .bind(format_datetime(&ended_at))
                .bind(id.to_string())
                .execute(&self.pool.writer)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
