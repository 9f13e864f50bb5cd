//! Response feedback, satisfaction surveys, and admin statistics.

use chrono::Utc;
use tebnegar_types::conversation::SenderType;
use tebnegar_types::error::{RepositoryError, ServiceError};
use tebnegar_types::feedback::{
    DashboardStats, FeedbackType, ResponseFeedback, ResponseFeedbackView, SurveyResponse,
    MAX_COMMENT_CHARS,
};
use tracing::info;
use uuid::Uuid;

use crate::conversation::repository::ConversationRepository;
use crate::repository::feedback::FeedbackRepository;
use crate::repository::Page;

/// Collects user feedback and serves the admin views over it.
pub struct FeedbackService<F: FeedbackRepository, C: ConversationRepository> {
    feedback_repo: F,
    conversation_repo: C,
}

impl<F: FeedbackRepository, C: ConversationRepository> FeedbackService<F, C> {
    pub fn new(feedback_repo: F, conversation_repo: C) -> Self {
        Self {
            feedback_repo,
            conversation_repo,
        }
    }

    pub fn feedback_repo(&self) -> &F {
        &self.feedback_repo
    }

    /// Like or dislike an assistant message.
    ///
    /// The message must exist and must have been sent by the AI; a message
    /// takes feedback only once.
    pub async fn submit_response_feedback(
        &self,
        message_id: Uuid,
        feedback_type: FeedbackType,
        comment: Option<String>,
    ) -> Result<ResponseFeedback, ServiceError> {
        let comment = normalize_comment(comment)?;

        let message = self
            .conversation_repo
            .get_message(&message_id)
            .await?
            .ok_or(ServiceError::Repository(RepositoryError::NotFound))?;
        if message.sender_type != SenderType::Ai {
            return Err(ServiceError::Validation(
                "feedback can only be given on AI responses".to_string(),
            ));
        }

        let feedback = ResponseFeedback {
            id: Uuid::now_v7(),
            message_id,
            feedback_type,
            comment,
            created_at: Utc::now(),
        };
        self.feedback_repo.save_response_feedback(&feedback).await?;

        info!(message_id = %message_id, feedback = %feedback_type, "response feedback stored");
        Ok(feedback)
    }

    /// Feedback for the admin panel, newest first.
    pub async fn list_response_feedback(
        &self,
        feedback_type: Option<FeedbackType>,
        page: Page,
    ) -> Result<Vec<ResponseFeedbackView>, ServiceError> {
        Ok(self
            .feedback_repo
            .list_response_feedback(feedback_type, page)
            .await?)
    }

    /// Record a 1-5 satisfaction rating.
    pub async fn submit_survey(
        &self,
        session_id: String,
        rating: u8,
        comment: Option<String>,
    ) -> Result<SurveyResponse, ServiceError> {
        if !(1..=5).contains(&rating) {
            return Err(ServiceError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let session_id = session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(ServiceError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }
        let comment = normalize_comment(comment)?;

        let survey = SurveyResponse {
            id: Uuid::now_v7(),
            session_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        self.feedback_repo.save_survey(&survey).await?;
        info!(rating, "survey response stored");
        Ok(survey)
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        Ok(self.feedback_repo.dashboard_stats().await?)
    }
}

/// Blank comments become `None`; overlong ones are rejected.
fn normalize_comment(comment: Option<String>) -> Result<Option<String>, ServiceError> {
    let Some(comment) = comment else {
        return Ok(None);
    };
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(ServiceError::Validation(format!(
            "comment must be at most {MAX_COMMENT_CHARS} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tebnegar_types::conversation::{
        AiAnalysis, Conversation, ConversationSummary, Message,
    };

    use super::*;

    #[derive(Default)]
    struct InMemoryFeedback {
        feedback: Mutex<Vec<ResponseFeedback>>,
        surveys: Mutex<Vec<SurveyResponse>>,
    }

    impl FeedbackRepository for InMemoryFeedback {
        async fn save_response_feedback(
            &self,
            feedback: &ResponseFeedback,
        ) -> Result<(), RepositoryError> {
            let mut stored = self.feedback.lock().unwrap();
            if stored.iter().any(|f| f.message_id == feedback.message_id) {
                return Err(RepositoryError::Conflict(
                    "feedback already exists for this message".to_string(),
                ));
            }
            stored.push(feedback.clone());
            Ok(())
        }

        async fn list_response_feedback(
            &self,
            feedback_type: Option<FeedbackType>,
            page: Page,
        ) -> Result<Vec<ResponseFeedbackView>, RepositoryError> {
            Ok(self
                .feedback
                .lock()
                .unwrap()
                .iter()
                .rev()
                .filter(|f| feedback_type.is_none_or(|t| t == f.feedback_type))
                .skip(page.skip as usize)
                .take(page.limit as usize)
                .map(|f| ResponseFeedbackView {
                    id: f.id,
                    message_id: f.message_id,
                    message_content: String::new(),
                    feedback_type: f.feedback_type,
                    comment: f.comment.clone(),
                    created_at: f.created_at,
                })
                .collect())
        }

        async fn save_survey(&self, survey: &SurveyResponse) -> Result<(), RepositoryError> {
            self.surveys.lock().unwrap().push(survey.clone());
            Ok(())
        }

        async fn dashboard_stats(&self) -> Result<DashboardStats, RepositoryError> {
            let feedback = self.feedback.lock().unwrap();
            Ok(DashboardStats {
                like_count: feedback
                    .iter()
                    .filter(|f| f.feedback_type == FeedbackType::Like)
                    .count() as u64,
                dislike_count: feedback
                    .iter()
                    .filter(|f| f.feedback_type == FeedbackType::Dislike)
                    .count() as u64,
                ..Default::default()
            })
        }
    }

    /// Only `get_message` is needed by the feedback service.
    #[derive(Default)]
    struct Messages(Vec<Message>);

    impl ConversationRepository for Messages {
        async fn create_conversation(
            &self,
            conversation: &Conversation,
        ) -> Result<Conversation, RepositoryError> {
            Ok(conversation.clone())
        }

        async fn get_conversation(&self, _id: &Uuid) -> Result<Option<Conversation>, RepositoryError> {
            Ok(None)
        }

        async fn list_conversations(
            &self,
            _session_id: &Uuid,
        ) -> Result<Vec<Conversation>, RepositoryError> {
            Ok(Vec::new())
        }

        async fn get_messages(&self, _conversation_id: &Uuid) -> Result<Vec<Message>, RepositoryError> {
            Ok(self.0.clone())
        }

        async fn get_message(&self, id: &Uuid) -> Result<Option<Message>, RepositoryError> {
            Ok(self.0.iter().find(|m| m.id == *id).cloned())
        }

        async fn save_user_message(&self, _message: &Message) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn save_ai_message_with_analysis(
            &self,
            _message: &Message,
            _analysis: &AiAnalysis,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn update_title(&self, _id: &Uuid, _title: &str) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn delete_conversation(&self, _id: &Uuid) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn search_conversations(
            &self,
            _keyword: &str,
            _page: Page,
        ) -> Result<Vec<ConversationSummary>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn message(sender: SenderType) -> Message {
        Message {
            id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            sender_type: sender,
            content: "Rest and drink fluids.".to_string(),
            reply_to: None,
            created_at: Utc::now(),
        }
    }

    fn service(messages: Vec<Message>) -> FeedbackService<InMemoryFeedback, Messages> {
        FeedbackService::new(InMemoryFeedback::default(), Messages(messages))
    }

    #[tokio::test]
    async fn test_feedback_on_ai_message() {
        let ai = message(SenderType::Ai);
        let svc = service(vec![ai.clone()]);

        let stored = svc
            .submit_response_feedback(ai.id, FeedbackType::Like, Some("  helpful ".to_string()))
            .await
            .unwrap();

        assert_eq!(stored.comment.as_deref(), Some("helpful"));
        let stats = svc.dashboard_stats().await.unwrap();
        assert_eq!(stats.like_count, 1);
        assert_eq!(stats.dislike_count, 0);
    }

    #[tokio::test]
    async fn test_feedback_rejects_user_message() {
        let user = message(SenderType::User);
        let svc = service(vec![user.clone()]);

        let err = svc
            .submit_response_feedback(user.id, FeedbackType::Dislike, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_feedback_unknown_message_not_found() {
        let svc = service(Vec::new());
        let err = svc
            .submit_response_feedback(Uuid::now_v7(), FeedbackType::Like, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_second_feedback_conflicts() {
        let ai = message(SenderType::Ai);
        let svc = service(vec![ai.clone()]);

        svc.submit_response_feedback(ai.id, FeedbackType::Like, None)
            .await
            .unwrap();
        let err = svc
            .submit_response_feedback(ai.id, FeedbackType::Dislike, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_feedback_comment_length() {
        let ai = message(SenderType::Ai);
        let svc = service(vec![ai.clone()]);

        let err = svc
            .submit_response_feedback(
                ai.id,
                FeedbackType::Dislike,
                Some("x".repeat(MAX_COMMENT_CHARS + 1)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = svc
            .submit_response_feedback(ai.id, FeedbackType::Dislike, Some("   ".to_string()))
            .await
            .unwrap();
        assert!(stored.comment.is_none());
    }

    #[tokio::test]
    async fn test_list_feedback_filters_by_type() {
        let first = message(SenderType::Ai);
        let second = message(SenderType::Ai);
        let svc = service(vec![first.clone(), second.clone()]);
        svc.submit_response_feedback(first.id, FeedbackType::Like, None)
            .await
            .unwrap();
        svc.submit_response_feedback(second.id, FeedbackType::Dislike, None)
            .await
            .unwrap();

        let dislikes = svc
            .list_response_feedback(Some(FeedbackType::Dislike), Page::default())
            .await
            .unwrap();
        assert_eq!(dislikes.len(), 1);
        assert_eq!(dislikes[0].message_id, second.id);

        let all = svc.list_response_feedback(None, Page::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_survey_rating_bounds() {
        let svc = service(Vec::new());
        for bad in [0, 6] {
            let err = svc
                .submit_survey("s-1".to_string(), bad, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }

        let survey = svc
            .submit_survey("s-1".to_string(), 5, Some("very clear".to_string()))
            .await
            .unwrap();
        assert_eq!(survey.rating, 5);
        assert_eq!(svc.feedback_repo().surveys.lock().unwrap().len(), 1);
    }
}
