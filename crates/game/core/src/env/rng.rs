//! Deterministic dice for combat rolls.
//!
//! Every random decision inside an encounter (turn-order comparisons, counter
//! and chain procs, flee attempts, monster targeting) draws from a [`Dice`]
//! seeded once per encounter. Replaying an encounter with the same seed and
//! the same inputs yields the same rounds.

/// RNG oracle for deterministic random number generation.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Roll a d100 (1-100 inclusive).
    fn roll_d100(&self, seed: u64) -> u32 {
        (self.next_u32(seed) % 100) + 1
    }

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let range = max - min + 1;
        min + (self.next_u32(seed) % range)
    }
}

/// PCG-XSH-RR generator: 32-bit output from 64-bit state.
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::pcg_output(Self::pcg_step(seed))
    }
}

/// Compute a per-roll seed from the encounter seed, the draw counter, the
/// actor involved, and a context discriminator for multiple rolls per draw.
pub fn compute_seed(combat_seed: u64, nonce: u64, actor_id: u32, context: u32) -> u64 {
    let mut hash = combat_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (actor_id as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    // avalanche
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;

    hash
}

/// Stateful roll source owned by a combat context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dice {
    seed: u64,
    nonce: u64,
}

impl Dice {
    pub const fn new(seed: u64) -> Self {
        Self { seed, nonce: 0 }
    }

    pub const fn seed(&self) -> u64 {
        self.seed
    }

    fn next_seed(&mut self, context: u32) -> u64 {
        self.nonce += 1;
        compute_seed(self.seed, self.nonce, 0, context)
    }

    /// Roll 1-100 inclusive.
    pub fn d100(&mut self) -> u32 {
        let seed = self.next_seed(0);
        PcgRng.roll_d100(seed)
    }

    /// True with probability `percent`/100.
    pub fn chance(&mut self, percent: u32) -> bool {
        self.d100() <= percent
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn pick(&mut self, len: usize) -> usize {
        let seed = self.next_seed(1);
        PcgRng.range(seed, 0, len.saturating_sub(1) as u32) as usize
    }
}
