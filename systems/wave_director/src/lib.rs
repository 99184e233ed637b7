#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic wave director responsible for emitting wave and spawn commands.
//!
//! The director counts down between waves, expands each wave into a staggered
//! spawn queue and waits for the battlefield to clear before scheduling the
//! next one. All randomness is drawn from a per-wave ChaCha8 stream whose seed
//! is derived from the session seed, so identical seeds replay identically.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use siegeline_core::{BossTrait, Command, EnemyKind, Event, GamePhase, Opening, SimulationConfig};
use tracing::debug;

const BOSS_INTERVAL: u32 = 10;
const BOSS_KIND: EnemyKind = EnemyKind::Grunt;
const RNG_STREAM_WAVE: &str = "siegeline.wave";

/// Waves at which a new enemy kind first appears.
const INTRODUCTIONS: [(u32, EnemyKind); 6] = [
    (6, EnemyKind::Runner),
    (7, EnemyKind::Swarmling),
    (8, EnemyKind::Armored),
    (9, EnemyKind::Flyer),
    (12, EnemyKind::Brood),
    (14, EnemyKind::Juggernaut),
];

/// Kinds cycled through once every kind has been introduced.
const ROTATION: [EnemyKind; 7] = [
    EnemyKind::Grunt,
    EnemyKind::Runner,
    EnemyKind::Swarmling,
    EnemyKind::Armored,
    EnemyKind::Flyer,
    EnemyKind::Brood,
    EnemyKind::Juggernaut,
];

/// Composition class of a wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveType {
    /// A wave made of a single regular enemy kind.
    Regular(EnemyKind),
    /// A single boss with one rolled trait.
    Boss,
}

/// Selects the composition class for a one-based wave index.
#[must_use]
pub fn wave_type(wave: u32) -> WaveType {
    if wave > 0 && wave % BOSS_INTERVAL == 0 {
        return WaveType::Boss;
    }
    if wave <= 5 {
        return WaveType::Regular(EnemyKind::Grunt);
    }
    if let Some((_, kind)) = INTRODUCTIONS.iter().find(|(at, _)| *at == wave) {
        return WaveType::Regular(*kind);
    }
    WaveType::Regular(ROTATION[(wave % 7) as usize])
}

/// Number of enemies spawned by a wave.
#[must_use]
pub fn wave_size(wave_type: WaveType, wave: u32) -> u32 {
    match wave_type {
        WaveType::Boss => 1,
        WaveType::Regular(kind) => match kind {
            EnemyKind::Grunt | EnemyKind::Runner | EnemyKind::Broodling => 8 + wave / 2,
            EnemyKind::Swarmling => 14 + wave,
            EnemyKind::Armored => 5 + wave / 3,
            EnemyKind::Flyer => 6 + wave / 3,
            EnemyKind::Juggernaut => 4 + wave / 4,
            EnemyKind::Brood => 3 + wave / 4,
        },
    }
}

/// Ticks between consecutive spawns of a wave.
#[must_use]
pub const fn stagger(wave_type: WaveType) -> u32 {
    match wave_type {
        WaveType::Boss => 0,
        WaveType::Regular(kind) => match kind {
            EnemyKind::Grunt => 60,
            EnemyKind::Runner => 45,
            EnemyKind::Swarmling | EnemyKind::Broodling => 15,
            EnemyKind::Armored => 75,
            EnemyKind::Flyer => 50,
            EnemyKind::Juggernaut | EnemyKind::Brood => 90,
        },
    }
}

/// Single entry of a wave's spawn queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlannedSpawn {
    /// Base kind of the enemy.
    pub kind: EnemyKind,
    /// Opening the enemy enters through.
    pub opening: Opening,
    /// Boss trait, present only on boss waves.
    pub boss: Option<BossTrait>,
}

impl PlannedSpawn {
    fn command(self) -> Command {
        Command::SpawnEnemy {
            kind: self.kind,
            opening: self.opening,
            boss: self.boss,
        }
    }
}

/// Fully expanded description of one wave.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavePlan {
    /// One-based index of the wave.
    pub wave: u32,
    /// Composition class.
    pub wave_type: WaveType,
    /// Ticks between consecutive spawns.
    pub stagger: u32,
    /// Spawns in emission order.
    pub spawns: Vec<PlannedSpawn>,
}

/// Expands a wave into its spawn queue using the session seed.
#[must_use]
pub fn plan_wave(wave: u32, seed: u64) -> WavePlan {
    let wave_type = wave_type(wave);
    let mut rng = ChaCha8Rng::seed_from_u64(derive_wave_seed(seed, wave));
    let count = wave_size(wave_type, wave);

    let spawns = (0..count)
        .map(|_| {
            let opening = if rng.gen_bool(0.5) {
                Opening::Top
            } else {
                Opening::Left
            };
            match wave_type {
                WaveType::Boss => PlannedSpawn {
                    kind: BOSS_KIND,
                    opening,
                    boss: Some(BossTrait::ALL[rng.gen_range(0..BossTrait::ALL.len())]),
                },
                WaveType::Regular(kind) => PlannedSpawn {
                    kind,
                    opening,
                    boss: None,
                },
            }
        })
        .collect();

    WavePlan {
        wave,
        wave_type,
        stagger: stagger(wave_type),
        spawns,
    }
}

fn derive_wave_seed(global_seed: u64, wave: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(RNG_STREAM_WAVE.as_bytes());
    hasher.update(wave.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Configuration parameters required to construct the wave director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    wave_delay: u32,
    final_wave: u32,
    seed: u64,
}

impl Config {
    /// Creates a new configuration from explicit values.
    #[must_use]
    pub const fn new(wave_delay: u32, final_wave: u32, seed: u64) -> Self {
        Self {
            wave_delay,
            final_wave,
            seed,
        }
    }

    /// Derives the director configuration from session settings.
    #[must_use]
    pub const fn from_simulation(config: &SimulationConfig) -> Self {
        Self::new(
            config.difficulty.wave_delay_ticks(),
            config.final_wave,
            config.seed,
        )
    }
}

/// Lifecycle stage of the director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirectorState {
    /// Waiting for the session to start.
    Dormant,
    /// Counting down to the next wave.
    Countdown {
        /// Ticks left before the wave begins.
        remaining: u32,
    },
    /// Emitting the current wave's spawns.
    Spawning,
    /// Waiting for the current wave's enemies to die or leak.
    Clearing,
    /// No further waves will run.
    Finished,
}

/// Pure system that schedules waves and emits spawn commands.
#[derive(Debug)]
pub struct WaveDirector {
    config: Config,
    state: DirectorState,
    wave: u32,
    queue: VecDeque<PlannedSpawn>,
    stagger: u32,
    stagger_remaining: u32,
    skip_requested: bool,
}

impl WaveDirector {
    /// Creates a dormant director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: DirectorState::Dormant,
            wave: 0,
            queue: VecDeque::new(),
            stagger: 0,
            stagger_remaining: 0,
            skip_requested: false,
        }
    }

    /// Creates a director that resumes counting down toward the wave after `wave`.
    #[must_use]
    pub fn resumed(config: Config, wave: u32) -> Self {
        let mut director = Self::new(config);
        director.wave = wave;
        director.state = DirectorState::Countdown {
            remaining: config.wave_delay,
        };
        director
    }

    /// Creates a director for a session that already ended after `wave`.
    #[must_use]
    pub fn concluded(config: Config, wave: u32) -> Self {
        let mut director = Self::new(config);
        director.wave = wave;
        director.state = DirectorState::Finished;
        director
    }

    /// Current lifecycle stage.
    #[must_use]
    pub const fn state(&self) -> DirectorState {
        self.state
    }

    /// Last wave that began, zero before the first.
    #[must_use]
    pub const fn wave(&self) -> u32 {
        self.wave
    }

    /// Spawns still queued for the current wave.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.queue.len()
    }

    /// Skips whatever remains of the current countdown.
    pub fn call_next_wave(&mut self) {
        if matches!(
            self.state,
            DirectorState::Dormant | DirectorState::Countdown { .. }
        ) {
            self.skip_requested = true;
        }
    }

    /// Consumes tick events and emits wave and spawn commands.
    pub fn handle(
        &mut self,
        events: &[Event],
        phase: GamePhase,
        live_enemies: usize,
        out: &mut Vec<Command>,
    ) {
        if phase != GamePhase::Running {
            return;
        }
        let ticks = events
            .iter()
            .filter(|event| matches!(event, Event::TimeAdvanced { .. }))
            .count();
        for _ in 0..ticks {
            self.step(live_enemies, out);
        }
    }

    fn step(&mut self, live_enemies: usize, out: &mut Vec<Command>) {
        match self.state {
            DirectorState::Dormant => {
                if self.skip_requested {
                    self.begin_wave(out);
                } else {
                    self.state = DirectorState::Countdown {
                        remaining: self.config.wave_delay,
                    };
                }
            }
            DirectorState::Countdown { remaining } => {
                if self.skip_requested || remaining <= 1 {
                    self.begin_wave(out);
                } else {
                    self.state = DirectorState::Countdown {
                        remaining: remaining - 1,
                    };
                }
            }
            DirectorState::Spawning => self.emit_spawns(out),
            DirectorState::Clearing => {
                if live_enemies > 0 {
                    return;
                }
                if self.wave >= self.config.final_wave {
                    out.push(Command::DeclareVictory);
                    self.state = DirectorState::Finished;
                } else {
                    self.state = DirectorState::Countdown {
                        remaining: self.config.wave_delay,
                    };
                }
            }
            DirectorState::Finished => {}
        }
    }

    fn begin_wave(&mut self, out: &mut Vec<Command>) {
        self.skip_requested = false;
        self.wave = self.wave.saturating_add(1);
        let plan = plan_wave(self.wave, self.config.seed);
        debug!(
            wave = plan.wave,
            kind = ?plan.wave_type,
            count = plan.spawns.len(),
            "wave planned"
        );
        out.push(Command::AnnounceWave { wave: plan.wave });
        self.queue = plan.spawns.into_iter().collect();
        self.stagger = plan.stagger;
        self.stagger_remaining = 0;
        self.state = DirectorState::Spawning;
        self.emit_spawns(out);
    }

    fn emit_spawns(&mut self, out: &mut Vec<Command>) {
        if self.stagger_remaining > 0 {
            self.stagger_remaining -= 1;
            return;
        }
        while let Some(spawn) = self.queue.pop_front() {
            out.push(spawn.command());
            if self.stagger > 0 {
                self.stagger_remaining = self.stagger - 1;
                break;
            }
        }
        if self.queue.is_empty() {
            self.state = DirectorState::Clearing;
        }
    }
}
