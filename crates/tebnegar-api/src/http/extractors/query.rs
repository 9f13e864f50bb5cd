//! Query parameter extractors for list endpoints.

use serde::Deserialize;

use tebnegar_core::repository::Page;
use tebnegar_types::feedback::FeedbackType;

/// `?session_id=` for listing a session's conversations.
#[derive(Debug, Deserialize, Default)]
pub struct ConversationListQuery {
    pub session_id: Option<String>,
}

/// Admin feedback listing.
#[derive(Debug, Deserialize, Default)]
pub struct FeedbackListQuery {
    pub feedback_type: Option<FeedbackType>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl FeedbackListQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

/// Admin transcript search.
#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl SearchQuery {
    pub fn page(&self) -> Page {
        page(self.skip, self.limit)
    }
}

fn page(skip: Option<u32>, limit: Option<u32>) -> Page {
    let default = Page::default();
    Page::new(skip.unwrap_or(default.skip), limit.unwrap_or(default.limit))
}
