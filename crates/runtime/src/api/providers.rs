//! Asynchronous abstraction for asking a user what to do next.
//!
//! Runtime users plug in [`DecisionProvider`] implementations so sessions can
//! run with chat buttons, scripted fixtures, or unattended defaults. Every
//! prompt is bounded by [`ask_with_timeout`]; a user that never answers
//! falls back to the prompt's safe default.
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use game_core::UserId;

/// Question put to the session owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    /// Monsters appeared. Fight or flee?
    EncounterStart {
        dungeon: String,
        step: u32,
        monsters: Vec<String>,
    },
    /// A round finished and the encounter is still running.
    RoundEnd { round: u32, hp: u32, max_hp: u32 },
}

impl Prompt {
    /// Answer used when the user does not respond in time.
    pub fn default_choice(&self) -> Choice {
        match self {
            Prompt::EncounterStart { .. } => Choice::Flee,
            Prompt::RoundEnd { .. } => Choice::Continue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    Fight,
    Flee,
    Continue,
    /// Leave the dungeon once the current event is over.
    Stop,
}

/// Source of user decisions.
///
/// Implementations may suspend for as long as they like; callers wrap every
/// call in [`ask_with_timeout`]. Returning `None` means "no answer".
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn ask(&self, user: UserId, prompt: &Prompt) -> Option<Choice>;
}

/// Fights every encounter and never stops on its own.
pub struct AutoDecisionProvider;

#[async_trait]
impl DecisionProvider for AutoDecisionProvider {
    async fn ask(&self, _user: UserId, prompt: &Prompt) -> Option<Choice> {
        Some(match prompt {
            Prompt::EncounterStart { .. } => Choice::Fight,
            Prompt::RoundEnd { .. } => Choice::Continue,
        })
    }
}

/// Asks `provider`, degrading to [`Prompt::default_choice`] on timeout or on
/// an empty answer.
pub async fn ask_with_timeout(
    provider: &dyn DecisionProvider,
    user: UserId,
    prompt: &Prompt,
    timeout: Duration,
) -> Choice {
    match tokio::time::timeout(timeout, provider.ask(user, prompt)).await {
        Ok(Some(choice)) => choice,
        Ok(None) => prompt.default_choice(),
        Err(_) => {
            tracing::debug!(
                target: "runtime::worker",
                user = %user,
                timeout_ms = timeout.as_millis() as u64,
                "decision timed out, using default"
            );
            prompt.default_choice()
        }
    }
}
