//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `tebnegar-core` using sqlx with
//! split read/write pools: raw queries, private Row structs, reads on the
//! reader pool and writes on the writer pool.

use sqlx::Row;
use tebnegar_core::conversation::repository::ConversationRepository;
use tebnegar_core::repository::Page;
use tebnegar_types::conversation::{
    AiAnalysis, Conversation, ConversationSummary, Message, SenderType,
};
use tebnegar_types::error::RepositoryError;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `ConversationRepository`.
#[derive(Clone)]
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    session_id: String,
    title: String,
    created_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_conversation(self) -> Result<Conversation, RepositoryError> {
        Ok(Conversation {
            id: parse_uuid(&self.id, "conversation id")?,
            session_id: parse_uuid(&self.session_id, "session_id")?,
            title: self.title,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    sender_type: String,
    content: String,
    reply_to: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            sender_type: row.try_get("sender_type")?,
            content: row.try_get("content")?,
            reply_to: row.try_get("reply_to")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let sender_type: SenderType = self
            .sender_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id: parse_uuid(&self.id, "message id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            sender_type,
            content: self.content,
            reply_to: self
                .reply_to
                .as_deref()
                .map(|id| parse_uuid(id, "reply_to"))
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map an insert error, turning a foreign key failure into `NotFound`.
fn map_insert_err(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.message().contains("FOREIGN KEY") {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Query(e.to_string())
}

/// Escape LIKE wildcards so the keyword matches literally.
fn like_pattern(keyword: &str) -> String {
    let escaped = keyword
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

async fn insert_message<'e, E>(executor: E, message: &Message) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"INSERT INTO messages (id, conversation_id, sender_type, content, reply_to, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(message.id.to_string())
    .bind(message.conversation_id.to_string())
    .bind(message.sender_type.to_string())
    .bind(&message.content)
    .bind(message.reply_to.map(|id| id.to_string()))
    .bind(format_datetime(&message.created_at))
    .execute(executor)
    .await
    .map_err(map_insert_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<Conversation, RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversations (id, session_id, title, created_at)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.session_id.to_string())
        .bind(&conversation.title)
        .bind(format_datetime(&conversation.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_insert_err)?;

        Ok(conversation.clone())
    }

    async fn get_conversation(&self, id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let conversation_row = ConversationRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(conversation_row.into_conversation()?))
            }
            None => Ok(None),
        }
    }

    async fn list_conversations(
        &self,
        session_id: &Uuid,
    ) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM conversations WHERE session_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation_row = ConversationRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            conversations.push(conversation_row.into_conversation()?);
        }

        Ok(conversations)
    }

    async fn get_messages(&self, conversation_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }

    async fn get_message(&self, id: &Uuid) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let msg_row =
                    MessageRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(msg_row.into_message()?))
            }
            None => Ok(None),
        }
    }

    async fn save_user_message(&self, message: &Message) -> Result<(), RepositoryError> {
        insert_message(&self.pool.writer, message).await
    }

    async fn save_ai_message_with_analysis(
        &self,
        message: &Message,
        analysis: &AiAnalysis,
    ) -> Result<(), RepositoryError> {
        let conditions = serde_json::to_string(&analysis.potential_conditions)
            .map_err(|e| RepositoryError::Query(format!("invalid potential_conditions: {e}")))?;
        let token_usage = analysis.token_usage.to_string();

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        insert_message(&mut *tx, message).await?;

        sqlx::query(
            r#"INSERT INTO ai_analyses (id, message_id, potential_conditions, criticality_flag, processing_time_ms, ai_provider, token_usage)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(analysis.id.to_string())
        .bind(analysis.message_id.to_string())
        .bind(conditions)
        .bind(analysis.criticality_flag)
        .bind(i64::try_from(analysis.processing_time_ms).unwrap_or(i64::MAX))
        .bind(&analysis.ai_provider)
        .bind(token_usage)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update_title(&self, id: &Uuid, title: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE conversations SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_conversation(&self, id: &Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn search_conversations(
        &self,
        keyword: &str,
        page: Page,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.session_id, c.title, c.created_at,
                      (SELECT COUNT(*) FROM messages m2 WHERE m2.conversation_id = c.id) AS message_count
               FROM conversations c
               WHERE EXISTS (
                   SELECT 1 FROM messages m
                   WHERE m.conversation_id = c.id AND m.content LIKE ? ESCAPE '\'
               )
               ORDER BY c.created_at DESC, c.id DESC
               LIMIT ? OFFSET ?"#,
        )
        .bind(like_pattern(keyword))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_count: i64 = row
                .try_get("message_count")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let conversation = ConversationRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_conversation()?;
            summaries.push(ConversationSummary {
                id: conversation.id,
                session_id: conversation.session_id,
                title: conversation.title,
                created_at: conversation.created_at,
                message_count: message_count as u32,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn insert_session(pool: &DatabasePool) -> Uuid {
        let id = Uuid::now_v7();
        sqlx::query("INSERT INTO sessions (id, started_at) VALUES (?, ?)")
            .bind(id.to_string())
            .bind(format_datetime(&Utc::now()))
            .execute(&pool.writer)
            .await
            .unwrap();
        id
    }

    fn make_conversation(session_id: Uuid) -> Conversation {
        Conversation {
            id: Uuid::now_v7(),
            session_id,
            title: "New Chat".to_string(),
            created_at: Utc::now(),
        }
    }

    fn make_message(conversation_id: Uuid, sender: SenderType, content: &str) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id,
            sender_type: sender,
            content: content.to_string(),
            reply_to: None,
            created_at: Utc::now(),
        }
    }

    fn make_analysis(message_id: Uuid) -> AiAnalysis {
        AiAnalysis {
            id: Uuid::now_v7(),
            message_id,
            potential_conditions: Vec::new(),
            criticality_flag: false,
            processing_time_ms: 640,
            ai_provider: "gemini".to_string(),
            token_usage: json!({"input_tokens": 30, "output_tokens": 12}),
        }
    }

    async fn count(pool: &DatabasePool, table: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_create_and_get_conversation() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;

        let conversation = make_conversation(session_id);
        repo.create_conversation(&conversation).await.unwrap();

        let fetched = repo.get_conversation(&conversation.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, conversation.id);
        assert_eq!(fetched.session_id, session_id);
        assert_eq!(fetched.title, "New Chat");

        assert!(repo.get_conversation(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_conversation_unknown_session() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool);

        let err = repo
            .create_conversation(&make_conversation(Uuid::now_v7()))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_conversations_newest_first() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;

        let mut older = make_conversation(session_id);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = make_conversation(session_id);
        repo.create_conversation(&older).await.unwrap();
        repo.create_conversation(&newer).await.unwrap();

        let list = repo.list_conversations(&session_id).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, newer.id);
        assert_eq!(list[1].id, older.id);
    }

    #[tokio::test]
    async fn test_save_messages_in_order() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;
        let conversation = make_conversation(session_id);
        repo.create_conversation(&conversation).await.unwrap();

        let user = make_message(conversation.id, SenderType::User, "I have a sore throat");
        repo.save_user_message(&user).await.unwrap();
        let ai = Message {
            reply_to: Some(user.id),
            ..make_message(conversation.id, SenderType::Ai, "How long has it been sore?")
        };
        repo.save_ai_message_with_analysis(&ai, &make_analysis(ai.id))
            .await
            .unwrap();

        let messages = repo.get_messages(&conversation.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender_type, SenderType::User);
        assert_eq!(messages[0].reply_to, None);
        assert_eq!(messages[1].sender_type, SenderType::Ai);
        assert_eq!(messages[1].content, "How long has it been sore?");
        assert_eq!(messages[1].reply_to, Some(user.id));

        let (provider, usage): (String, String) =
            sqlx::query_as("SELECT ai_provider, token_usage FROM ai_analyses WHERE message_id = ?")
                .bind(ai.id.to_string())
                .fetch_one(&pool.reader)
                .await
                .unwrap();
        assert_eq!(provider, "gemini");
        let usage: serde_json::Value = serde_json::from_str(&usage).unwrap();
        assert_eq!(usage["input_tokens"], 30);

        let fetched = repo.get_message(&ai.id).await.unwrap().unwrap();
        assert_eq!(fetched.sender_type, SenderType::Ai);
    }

    #[tokio::test]
    async fn test_save_user_message_unknown_conversation() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());

        let err = repo
            .save_user_message(&make_message(Uuid::now_v7(), SenderType::User, "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
        assert_eq!(count(&pool, "messages").await, 0);
    }

    #[tokio::test]
    async fn test_ai_message_and_analysis_are_atomic() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;
        let conversation = make_conversation(session_id);
        repo.create_conversation(&conversation).await.unwrap();

        let first = make_message(conversation.id, SenderType::Ai, "first");
        repo.save_ai_message_with_analysis(&first, &make_analysis(first.id))
            .await
            .unwrap();

        // The analysis insert fails (duplicate id), so the message must roll back too.
        let second = make_message(conversation.id, SenderType::Ai, "second");
        let mut analysis = make_analysis(second.id);
        let existing: (String,) = sqlx::query_as("SELECT id FROM ai_analyses")
            .fetch_one(&pool.reader)
            .await
            .unwrap();
        analysis.id = Uuid::parse_str(&existing.0).unwrap();
        assert!(repo.save_ai_message_with_analysis(&second, &analysis).await.is_err());

        assert_eq!(count(&pool, "messages").await, 1);
        assert_eq!(count(&pool, "ai_analyses").await, 1);
    }

    #[tokio::test]
    async fn test_update_title() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;
        let conversation = make_conversation(session_id);
        repo.create_conversation(&conversation).await.unwrap();

        repo.update_title(&conversation.id, "Sore Throat Follow-up")
            .await
            .unwrap();
        let fetched = repo.get_conversation(&conversation.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Sore Throat Follow-up");

        let err = repo.update_title(&Uuid::now_v7(), "x").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_conversation_cascades() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;
        let conversation = make_conversation(session_id);
        repo.create_conversation(&conversation).await.unwrap();

        let ai = make_message(conversation.id, SenderType::Ai, "hello");
        repo.save_ai_message_with_analysis(&ai, &make_analysis(ai.id))
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO response_feedback (id, message_id, feedback_type, created_at) VALUES (?, ?, 'like', ?)",
        )
        .bind(Uuid::now_v7().to_string())
        .bind(ai.id.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(&pool.writer)
        .await
        .unwrap();

        repo.delete_conversation(&conversation.id).await.unwrap();

        assert_eq!(count(&pool, "conversations").await, 0);
        assert_eq!(count(&pool, "messages").await, 0);
        assert_eq!(count(&pool, "ai_analyses").await, 0);
        assert_eq!(count(&pool, "response_feedback").await, 0);

        let err = repo.delete_conversation(&conversation.id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_search_conversations() {
        let pool = test_pool().await;
        let repo = SqliteConversationRepository::new(pool.clone());
        let session_id = insert_session(&pool).await;

        let chest = make_conversation(session_id);
        repo.create_conversation(&chest).await.unwrap();
        repo.save_user_message(&make_message(chest.id, SenderType::User, "Sharp CHEST pain"))
            .await
            .unwrap();
        repo.save_user_message(&make_message(chest.id, SenderType::User, "since noon"))
            .await
            .unwrap();

        let other = make_conversation(session_id);
        repo.create_conversation(&other).await.unwrap();
        repo.save_user_message(&make_message(other.id, SenderType::User, "itchy rash"))
            .await
            .unwrap();

        let hits = repo
            .search_conversations("chest", Page::default())
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, chest.id);
        assert_eq!(hits[0].message_count, 2);

        // Wildcards in the keyword match literally.
        let none = repo.search_conversations("10%", Page::default()).await.unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
