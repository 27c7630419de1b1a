//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration, workers, or infrastructure.

pub mod errors;
pub mod providers;

pub use errors::{Result, RuntimeError, SessionError};
pub use providers::{AutoDecisionProvider, Choice, DecisionProvider, Prompt, ask_with_timeout};
