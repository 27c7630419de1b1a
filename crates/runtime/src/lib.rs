//! Session runtime for multiplayer dungeon combat.
//!
//! This crate wires the deterministic rules of `game-core` into concurrent
//! dungeon sessions. Consumers embed [`Runtime`] to start sessions, let
//! players step into each other's fights, and subscribe to events.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator, builder and configuration
//! - [`api`] exposes the errors and decision provider seam
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`session`] owns per-user session state and the session registry
//! - [`intervention`] validates and commits third-party admissions
//! - [`reward`] settles closed encounters
//! - [`instance`] tracks shared dungeon instances
//! - [`repository`] provides persistence adapters for characters and history
//! - `workers` keeps the per-session tasks internal to the crate
pub mod api;
pub mod events;
pub mod instance;
pub mod intervention;
pub mod repository;
pub mod reward;
pub mod runtime;
pub mod session;

mod workers;

pub use api::{
    AutoDecisionProvider, Choice, DecisionProvider, Prompt, Result, RuntimeError, SessionError,
};
pub use events::{AdmissionEvent, CombatEvent, Event, EventBus, SessionEvent, Topic};
pub use instance::{InstanceKey, SharedInstanceManager};
pub use intervention::{
    AdmissionDecision, AdmissionOutcome, AdmissionRejection, DropReason, InterventionService,
};
pub use repository::{
    ActorRecord, ActorRepository, EncounterLog, EncounterRecord, FileEncounterLog,
    InMemoryActorRepo, InMemoryEncounterLog, RepositoryError,
};
pub use reward::{PayoutFailure, RewardService, Settlement};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeConfig};
pub use session::{
    ContentMode, DungeonSession, EndReason, SessionHandle, SessionRegistry, SessionStatus,
    StopRequest,
};
