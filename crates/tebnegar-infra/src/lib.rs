//! Infrastructure layer for TebNegar.
//!
//! Contains implementations of the ports defined in `tebnegar-core`:
//! SQLite storage, the Gemini and OpenAI-compatible LLM clients, and
//! config file loading.

pub mod config;
pub mod llm;
pub mod sqlite;
