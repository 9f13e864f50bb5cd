//! Business logic services (use cases) around sessions and feedback.
//!
//! Services depend on repository traits (ports), never on concrete
//! infrastructure implementations.

pub mod feedback;
pub mod session;
