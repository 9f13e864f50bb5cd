//! Request extractors shared by the handlers.

pub mod admin;
pub mod client;
pub mod query;
