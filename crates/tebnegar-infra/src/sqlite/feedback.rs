//! SQLite feedback repository implementation.
//!
//! Response feedback, survey answers, and the admin dashboard counts.

use sqlx::Row;
use tebnegar_core::repository::feedback::FeedbackRepository;
use tebnegar_core::repository::Page;
use tebnegar_types::error::RepositoryError;
use tebnegar_types::feedback::{
    DashboardStats, FeedbackType, ResponseFeedback, ResponseFeedbackView, SurveyResponse,
};

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid};

/// SQLite-backed implementation of `FeedbackRepository`.
#[derive(Clone)]
pub struct SqliteFeedbackRepository {
    pool: DatabasePool,
}

impl SqliteFeedbackRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct FeedbackViewRow {
    id: String,
    message_id: String,
    message_content: String,
    feedback_type: String,
    comment: Option<String>,
    created_at: String,
}

impl FeedbackViewRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            message_id: row.try_get("message_id")?,
            message_content: row.try_get("message_content")?,
            feedback_type: row.try_get("feedback_type")?,
            comment: row.try_get("comment")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_view(self) -> Result<ResponseFeedbackView, RepositoryError> {
        let feedback_type: FeedbackType = self
            .feedback_type
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ResponseFeedbackView {
            id: parse_uuid(&self.id, "feedback id")?,
            message_id: parse_uuid(&self.message_id, "message_id")?,
            message_content: self.message_content,
            feedback_type,
            comment: self.comment,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

async fn count(pool: &sqlx::SqlitePool, sql: &str) -> Result<u64, RepositoryError> {
    let (n,): (i64,) = sqlx::query_as(sql)
        .fetch_one(pool)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    Ok(n.max(0) as u64)
}

impl FeedbackRepository for SqliteFeedbackRepository {
    async fn save_response_feedback(
        &self,
        feedback: &ResponseFeedback,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO response_feedback (id, message_id, feedback_type, comment, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(feedback.id.to_string())
        .bind(feedback.message_id.to_string())
        .bind(feedback.feedback_type.to_string())
        .bind(&feedback.comment)
        .bind(format_datetime(&feedback.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "feedback already submitted for message {}",
                    feedback.message_id
                )))
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("FOREIGN KEY") => {
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn list_response_feedback(
        &self,
        feedback_type: Option<FeedbackType>,
        page: Page,
    ) -> Result<Vec<ResponseFeedbackView>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT f.id, f.message_id, m.content AS message_content, f.feedback_type,
                      f.comment, f.created_at
               FROM response_feedback f
               JOIN messages m ON m.id = f.message_id
               WHERE (?1 IS NULL OR f.feedback_type = ?1)
               ORDER BY f.created_at DESC, f.id DESC
               LIMIT ?2 OFFSET ?3"#,
        )
        .bind(feedback_type.map(|t| t.to_string()))
        .bind(i64::from(page.limit))
        .bind(i64::from(page.skip))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut views = Vec::with_capacity(rows.len());
        for row in &rows {
            let view_row =
                FeedbackViewRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            views.push(view_row.into_view()?);
        }

        Ok(views)
    }

    async fn save_survey(&self, survey: &SurveyResponse) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO survey_responses (id, session_id, rating, comment, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(survey.id.to_string())
        .bind(&survey.session_id)
        .bind(i64::from(survey.rating))
        .bind(&survey.comment)
        .bind(format_datetime(&survey.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
        let reader = &self.pool.reader;
        Ok(DashboardStats {
            total_sessions: count(reader, "SELECT COUNT(*) FROM sessions").await?,
            total_conversations: count(reader, "SELECT COUNT(*) FROM conversations").await?,
            total_messages: count(reader, "SELECT COUNT(*) FROM messages").await?,
            like_count: count(
                reader,
                "SELECT COUNT(*) FROM response_feedback WHERE feedback_type = 'like'",
            )
            .await?,
            dislike_count: count(
                reader,
                "SELECT COUNT(*) FROM response_feedback WHERE feedback_type = 'dislike'",
            )
            .await?,
        })
    }
}
