//! Worker tasks that back the runtime orchestration.
//!
//! Each started session gets its own [`SessionWorker`] task. Workers share
//! the services bundled in [`Services`] and stop on a cancellation token.

mod session;

pub(crate) use session::{Services, SessionWorker};
