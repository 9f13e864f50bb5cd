//! Per-conversation AI sessions.
//!
//! [`registry::SessionRegistry`] maps a conversation key to a stateful
//! [`SessionHandle`](tebnegar_types::ai::SessionHandle) created through an
//! [`provider::AiProvider`], and serializes access to each handle.

pub mod clock;
pub mod llm_chat;
pub mod persona;
pub mod provider;
pub mod registry;
