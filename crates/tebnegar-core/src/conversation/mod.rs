//! Conversations: message exchange, title generation, CRUD.

pub mod repository;
pub mod service;
pub mod title;
