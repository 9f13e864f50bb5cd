//! Shared domain types for TebNegar.
//!
//! This crate contains the domain types used across the TebNegar backend:
//! user sessions, conversations, messages, feedback, AI session handles,
//! LLM request/response shapes, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod ai;
pub mod config;
pub mod conversation;
pub mod error;
pub mod feedback;
pub mod llm;
pub mod session;
