//! Session configuration shared by the world, the systems and the adapters.

use serde::{Deserialize, Serialize};

/// Difficulty selection. Only the pause between waves depends on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Long breaks between waves.
    Easy,
    /// Standard breaks between waves.
    #[default]
    Normal,
    /// Short breaks between waves.
    Hard,
}

impl Difficulty {
    /// Ticks between the end of one wave and the start of the next.
    #[must_use]
    pub const fn wave_delay_ticks(self) -> u32 {
        match self {
            Self::Easy => 900,
            Self::Normal => 600,
            Self::Hard => 300,
        }
    }
}

/// Parameters used to build a fresh session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of grid columns, border included.
    pub columns: u32,
    /// Number of grid rows, border included.
    pub rows: u32,
    /// Currency held before anything is built.
    pub starting_currency: u32,
    /// Base health at the start of the session.
    pub base_health: u32,
    /// Difficulty, which selects the wave delay.
    pub difficulty: Difficulty,
    /// Wave whose clearance wins the session.
    pub final_wave: u32,
    /// Seed for every random roll in the session.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            columns: 20,
            rows: 15,
            starting_currency: 1000,
            base_health: 20,
            difficulty: Difficulty::Normal,
            final_wave: 30,
            seed: 0x5eed_1e55_c0ff_ee00,
        }
    }
}
