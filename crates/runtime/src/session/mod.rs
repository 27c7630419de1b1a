//! Dungeon sessions and the registry that owns them.

mod dungeon;
mod registry;

pub use dungeon::{
    ClosedEncounter, ContentMode, DungeonSession, EndReason, PendingAdmission, SessionStatus,
    StepEvent, StopRequest,
};
pub use registry::{SessionHandle, SessionRegistry};
