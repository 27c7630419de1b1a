//! Topic-based event bus for runtime events.
//!
//! Events are published to specific topics, and consumers can subscribe only
//! to the topics they need. Notification collaborators (chat messages, voice
//! cues) hang off these streams.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{AdmissionEvent, CombatEvent, SessionEvent};
