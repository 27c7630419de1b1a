/// Combat rule constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatConfig {
    /// Last round (inclusive) in which a third party may request admission.
    pub admission_window_rounds: u32,

    /// Maximum players in one encounter, leader included.
    pub max_party_size: usize,

    /// Seconds a user must wait between two committed admissions.
    pub intervention_cooldown_secs: u64,

    /// Two encounters in one shared instance that start within this many
    /// milliseconds of each other are reported as concurrent.
    pub correlation_window_ms: u64,

    /// Hard cap on rounds per encounter. Reaching it ends the fight as fled.
    pub max_rounds: u32,
}

impl CombatConfig {
    // ===== compile-time constants used as type parameters =====
    pub const MAX_STATUS_EFFECTS: usize = 8;
    pub const MAX_STATUS_STACKS: u8 = 10;

    // ===== scheduler constants =====
    /// Gauge an actor must bank to take a bonus action after the regular pass.
    pub const BONUS_ACTION_GAUGE: u32 = 250;
    /// Speed difference beyond which the first-strike advantage stops growing.
    pub const MAX_SPEED_ADVANTAGE: i64 = 50;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ADMISSION_WINDOW_ROUNDS: u32 = 3;
    pub const DEFAULT_MAX_PARTY_SIZE: usize = 4;
    pub const DEFAULT_INTERVENTION_COOLDOWN_SECS: u64 = 300;
    pub const DEFAULT_CORRELATION_WINDOW_MS: u64 = 30_000;
    pub const DEFAULT_MAX_ROUNDS: u32 = 50;

    pub fn new() -> Self {
        Self {
            admission_window_rounds: Self::DEFAULT_ADMISSION_WINDOW_ROUNDS,
            max_party_size: Self::DEFAULT_MAX_PARTY_SIZE,
            intervention_cooldown_secs: Self::DEFAULT_INTERVENTION_COOLDOWN_SECS,
            correlation_window_ms: Self::DEFAULT_CORRELATION_WINDOW_MS,
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self::new()
    }
}
