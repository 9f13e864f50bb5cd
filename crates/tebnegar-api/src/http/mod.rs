//! HTTP/REST API layer for TebNegar.
//!
//! Axum-based REST API at `/api/v1/` with an envelope response format,
//! admin API key checks, and CORS support.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
