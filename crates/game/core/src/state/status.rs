//! Status effect stacks carried by combat actors.
//!
//! Status effects are timed, stackable conditions. Durations are counted in
//! rounds and decremented once per round by the
//! [`StatusEffectEngine`](crate::combat::StatusEffectEngine).
//!
//! # Stacking
//!
//! Applying a kind the actor already carries never creates a second entry:
//! the stack count grows (capped at [`CombatConfig::MAX_STATUS_STACKS`]) and
//! the duration is refreshed to the longer of the two.

use arrayvec::ArrayVec;

use crate::config::CombatConfig;

/// Active status effects on an actor, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffects {
    effects: ArrayVec<StatusEffect, { CombatConfig::MAX_STATUS_EFFECTS }>,
}

/// A single status entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    pub kind: StatusKind,
    pub stacks: u8,
    /// Rounds left before the entry is removed.
    pub remaining: u8,
}

/// Types of status effects.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StatusKind {
    // ========================================================================
    // Damage over time
    // ========================================================================
    /// Loses a share of max hp per stack each round.
    Burn,

    /// Loses a smaller share of max hp per stack each round.
    Poison,

    /// Flat damage per stack each round.
    Bleed,

    // ========================================================================
    // Control and modifiers
    // ========================================================================
    /// Loses the next action.
    Stun,

    /// Attack reduced per stack.
    Weaken,

    /// Defense increased per stack.
    Fortify,

    // ========================================================================
    // Healing over time
    // ========================================================================
    /// Heals a share of max hp per stack each round.
    Regeneration,
}

impl StatusKind {
    /// Returns true for conditions harmful to the carrier.
    pub const fn is_debuff(self) -> bool {
        matches!(
            self,
            Self::Burn | Self::Poison | Self::Bleed | Self::Stun | Self::Weaken
        )
    }
}

impl StatusEffects {
    /// Creates an empty status set.
    pub fn empty() -> Self {
        Self {
            effects: ArrayVec::new(),
        }
    }

    /// Applies `stacks` of `kind` lasting `duration` rounds.
    ///
    /// Returns the resulting entry, or `None` when the set is full and the
    /// kind is not already present.
    pub fn apply(&mut self, kind: StatusKind, stacks: u8, duration: u8) -> Option<StatusEffect> {
        if stacks == 0 || duration == 0 {
            return self.get(kind);
        }

        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == kind) {
            existing.stacks = existing
                .stacks
                .saturating_add(stacks)
                .min(CombatConfig::MAX_STATUS_STACKS);
            existing.remaining = existing.remaining.max(duration);
            return Some(*existing);
        }

        let entry = StatusEffect {
            kind,
            stacks: stacks.min(CombatConfig::MAX_STATUS_STACKS),
            remaining: duration,
        };
        self.effects.try_push(entry).ok().map(|_| entry)
    }

    /// Returns the entry for `kind`, if present.
    pub fn get(&self, kind: StatusKind) -> Option<StatusEffect> {
        self.effects.iter().find(|e| e.kind == kind).copied()
    }

    /// Stack count of `kind` (0 when absent).
    pub fn stacks(&self, kind: StatusKind) -> u8 {
        self.get(kind).map_or(0, |e| e.stacks)
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.stacks(kind) > 0
    }

    /// Removes the entry for `kind` and returns the consumed stack count.
    pub fn consume(&mut self, kind: StatusKind) -> u8 {
        let stacks = self.stacks(kind);
        self.effects.retain(|e| e.kind != kind);
        stacks
    }

    /// Decrements every duration by one round and drops expired entries.
    ///
    /// Returns the kinds that expired.
    pub fn tick(&mut self) -> Vec<StatusKind> {
        let mut expired = Vec::new();
        for effect in self.effects.iter_mut() {
            effect.remaining = effect.remaining.saturating_sub(1);
            if effect.remaining == 0 {
                expired.push(effect.kind);
            }
        }
        self.effects.retain(|e| e.remaining > 0);
        expired
    }

    /// Removes every debuff (used when an actor is revived).
    pub fn clear_debuffs(&mut self) {
        self.effects.retain(|e| !e.kind.is_debuff());
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}
