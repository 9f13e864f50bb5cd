//! Business logic and repository trait definitions for TebNegar.
//!
//! This crate owns the per-conversation AI session registry and the
//! services built on it. It defines the "ports" (repository and provider
//! traits) that the infrastructure layer implements, and depends only on
//! `tebnegar-types` -- never on `tebnegar-infra` or any database/IO crate.

pub mod ai;
pub mod conversation;
pub mod llm;
pub mod repository;
pub mod service;
