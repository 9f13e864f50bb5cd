//! Feedback repository trait definition.

use tebnegar_types::error::RepositoryError;
use tebnegar_types::feedback::{
    DashboardStats, FeedbackType, ResponseFeedback, ResponseFeedbackView, SurveyResponse,
};

use super::Page;

/// Repository trait for response feedback, surveys, and dashboard counts.
pub trait FeedbackRepository: Send + Sync {
    /// Store feedback. Fails with `Conflict` if the message already has some.
    fn save_response_feedback(
        &self,
        feedback: &ResponseFeedback,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Feedback joined with the rated message, newest first.
    fn list_response_feedback(
        &self,
        feedback_type: Option<FeedbackType>,
        page: Page,
    ) -> impl std::future::Future<Output = Result<Vec<ResponseFeedbackView>, RepositoryError>> + Send;

    fn save_survey(
        &self,
        survey: &SurveyResponse,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn dashboard_stats(
        &self,
    ) -> impl std::future::Future<Output = Result<DashboardStats, RepositoryError>> + Send;
}
