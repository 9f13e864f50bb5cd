//! Stateless LLM completion abstraction.

pub mod box_provider;
pub mod provider;
