//! Observability setup for TebNegar: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;
