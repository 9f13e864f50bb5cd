//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (tebnegar-infra) implements. The conversation port lives next to its
//! service in [`crate::conversation::repository`].

pub mod feedback;
pub mod session;

/// Offset pagination for admin list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: u32,
    pub limit: u32,
}

impl Page {
    /// Largest page size any list query returns.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page, clamping `limit` into `1..=MAX_LIMIT`.
    pub fn new(skip: u32, limit: u32) -> Self {
        Self {
            skip,
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: 20 }
    }
}
