#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic tick driver and boundary surface of a Siegeline session.
//!
//! [`Simulation`] owns the authoritative world together with the pure systems
//! and runs them in a fixed order every tick. Adapters talk to it through the
//! request methods, [`Simulation::snapshot`] and the save helpers.

mod save;
mod snapshot;

pub use save::{SaveError, SaveRecord, SavedTower, SAVE_VERSION};
pub use snapshot::{EnemyFrame, GameSnapshot, TowerFrame};

use siegeline_core::{
    CellCoord, Command, Event, GamePhase, PlacementError, SellError, SimulationConfig, TowerId,
    TowerKind, TowerTarget, UpgradeError,
};
use siegeline_system_builder::{Builder, BuilderInput, PlacementPreview};
use siegeline_system_tower_combat::TowerCombat;
use siegeline_system_tower_targeting::TowerTargeting;
use siegeline_system_wave_director::{Config as DirectorConfig, DirectorState, WaveDirector};
use siegeline_world::{self as world, query, World};
use tracing::{info, warn};

/// Single-threaded session that advances the world one tick at a time.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    director: WaveDirector,
    targeting: TowerTargeting,
    combat: TowerCombat,
    builder: Builder,
    events: Vec<Event>,
    commands: Vec<Command>,
    targets: Vec<TowerTarget>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Simulation {
    /// Creates a session in the Setup phase.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let director = WaveDirector::new(DirectorConfig::from_simulation(&config));
        Self {
            world: World::with_config(config),
            director,
            targeting: TowerTargeting::new(),
            combat: TowerCombat::new(),
            builder: Builder::new(),
            events: Vec::new(),
            commands: Vec::new(),
            targets: Vec::new(),
        }
    }

    /// Read-only access to the authoritative world for `query` helpers.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Configuration the session was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        query::config(&self.world)
    }

    /// Current session phase.
    #[must_use]
    pub fn phase(&self) -> GamePhase {
        query::phase(&self.world)
    }

    /// State of the wave director.
    #[must_use]
    pub fn director_state(&self) -> DirectorState {
        self.director.state()
    }

    /// Events produced since the start of the last tick.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Runs one tick of the pipeline and returns the events it produced.
    ///
    /// Paused and finished sessions do not change. A tick that ends the
    /// session stops at the step that ended it.
    pub fn advance_tick(&mut self) -> &[Event] {
        self.events.clear();
        let phase = query::phase(&self.world);
        if !phase.is_advancing() {
            return &self.events;
        }

        world::apply(&mut self.world, Command::Tick, &mut self.events);

        self.commands.clear();
        self.director.handle(
            &self.events,
            phase,
            query::live_enemy_count(&self.world),
            &mut self.commands,
        );
        self.flush_commands();

        self.run(Command::AdvanceEnemies);
        self.run(Command::Reconcile);
        if self.has_ended() {
            return &self.events;
        }

        self.run(Command::AdvanceTowers);
        let towers = query::tower_view(&self.world);
        self.targeting.handle(
            query::phase(&self.world),
            &towers,
            &query::enemy_view(&self.world),
            &mut self.targets,
        );
        self.combat.handle(
            query::phase(&self.world),
            &towers,
            &self.targets,
            &mut self.commands,
        );
        self.flush_commands();
        self.run(Command::Reconcile);
        if self.has_ended() {
            return &self.events;
        }

        self.run(Command::AdvanceProjectiles);
        self.run(Command::Reconcile);

        &self.events
    }

    /// Forwards a raw command to the world and returns the events it produced.
    pub fn submit(&mut self, command: Command) -> &[Event] {
        let start = self.events.len();
        self.run(command);
        &self.events[start..]
    }

    /// Places a tower, spending its cost.
    ///
    /// # Errors
    ///
    /// Returns the [`PlacementError`] reported by the world when the placement is refused.
    pub fn request_placement(
        &mut self,
        kind: TowerKind,
        origin: CellCoord,
    ) -> Result<TowerId, PlacementError> {
        self.submit(Command::PlaceTower { kind, origin })
            .iter()
            .find_map(|event| match event {
                Event::TowerPlaced { tower, .. } => Some(Ok(*tower)),
                Event::TowerPlacementRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(PlacementError::InvalidPhase))
    }

    /// Starts a prepaid upgrade and returns the level it will reach.
    ///
    /// # Errors
    ///
    /// Returns the [`UpgradeError`] reported by the world when the upgrade is refused.
    pub fn request_upgrade(&mut self, tower: TowerId) -> Result<u8, UpgradeError> {
        self.submit(Command::UpgradeTower { tower })
            .iter()
            .find_map(|event| match event {
                Event::TowerUpgradeStarted { target_level, .. } => Some(Ok(*target_level)),
                Event::TowerUpgradeRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(UpgradeError::MissingTower))
    }

    /// Sells a tower and returns the refund credited to the ledger.
    ///
    /// # Errors
    ///
    /// Returns the [`SellError`] reported by the world when the sale is refused.
    pub fn request_sell(&mut self, tower: TowerId) -> Result<u32, SellError> {
        self.submit(Command::SellTower { tower })
            .iter()
            .find_map(|event| match event {
                Event::TowerSold { refund, .. } => Some(Ok(*refund)),
                Event::TowerSaleRejected { reason, .. } => Some(Err(*reason)),
                _ => None,
            })
            .unwrap_or(Err(SellError::MissingTower))
    }

    /// Reports whether the footprint is legal for hover feedback, ignoring funds.
    #[must_use]
    pub fn can_place(&self, kind: TowerKind, origin: CellCoord) -> bool {
        query::can_place(&self.world, kind, origin).is_ok()
    }

    /// Builds a hover preview for the provided tower kind and origin.
    #[must_use]
    pub fn preview(&self, kind: TowerKind, origin: CellCoord) -> PlacementPreview {
        PlacementPreview::from_check(kind, origin, query::can_place(&self.world, kind, origin))
    }

    /// Translates one frame of player input into tower commands and applies them.
    ///
    /// `selected` is the tower kind a confirm action would build at the cursor.
    pub fn handle_input(&mut self, selected: TowerKind, input: BuilderInput) -> &[Event] {
        let preview = input
            .cursor_cell
            .map(|cell| self.preview(selected, cell));
        let start = self.events.len();
        self.commands.clear();
        let world = &self.world;
        self.builder.handle(
            query::phase(world),
            preview,
            input,
            |cell| query::tower_at(world, cell),
            &mut self.commands,
        );
        self.flush_commands();
        &self.events[start..]
    }

    /// Leaves Setup and lets the wave director begin its countdown.
    pub fn start(&mut self) {
        if self.phase() == GamePhase::Setup {
            self.run(Command::SetPhase {
                phase: GamePhase::Running,
            });
        }
    }

    /// Freezes a running session.
    pub fn pause(&mut self) {
        self.run(Command::SetPhase {
            phase: GamePhase::Paused,
        });
    }

    /// Continues a paused session.
    pub fn resume(&mut self) {
        if self.phase() == GamePhase::Paused {
            self.run(Command::SetPhase {
                phase: GamePhase::Running,
            });
        }
    }

    /// Rebuilds the session from its configuration.
    pub fn reset(&mut self) {
        let config = self.config().clone();
        info!(seed = config.seed, "session reset");
        self.director = WaveDirector::new(DirectorConfig::from_simulation(&config));
        self.targeting = TowerTargeting::new();
        self.combat = TowerCombat::new();
        self.events.clear();
        self.run(Command::Reset { config });
    }

    /// Skips the remaining countdown, starting the session first if needed.
    pub fn call_next_wave(&mut self) {
        self.start();
        self.director.call_next_wave();
    }

    /// Captures everything adapters need to present the session.
    #[must_use]
    pub fn snapshot(&self) -> GameSnapshot {
        let ledger = query::ledger(&self.world);
        let phase = query::phase(&self.world);
        let next_wave_in = match self.director.state() {
            DirectorState::Countdown { remaining } => Some(remaining),
            _ => None,
        };
        GameSnapshot {
            enemies: query::enemy_view(&self.world)
                .iter()
                .map(EnemyFrame::from)
                .collect(),
            towers: query::tower_view(&self.world)
                .iter()
                .map(TowerFrame::from)
                .collect(),
            projectiles: query::projectiles(&self.world),
            currency: ledger.currency(),
            score: ledger.score(),
            base_health: ledger.base_health(),
            wave: query::wave(&self.world),
            next_wave_in,
            phase,
            game_over: phase == GamePhase::Lost,
            won: phase == GamePhase::Won,
            tick: query::tick_index(&self.world),
        }
    }

    /// Captures the persistent part of the session.
    #[must_use]
    pub fn save(&self) -> SaveRecord {
        let ledger = query::ledger(&self.world);
        SaveRecord {
            version: SAVE_VERSION,
            currency: ledger.currency(),
            score: ledger.score(),
            base_health: ledger.base_health(),
            wave: query::wave(&self.world),
            difficulty: self.config().difficulty,
            towers: query::tower_view(&self.world)
                .iter()
                .map(|tower| SavedTower {
                    kind: tower.kind,
                    origin: tower.region.origin(),
                    level: tower.level,
                    invested: tower.invested,
                })
                .collect(),
            occupancy: query::grid(&self.world).to_rows(),
        }
    }

    /// Serializes [`Simulation::save`] as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Json`] if serialization fails.
    pub fn save_string(&self) -> Result<String, SaveError> {
        self.save().encode()
    }

    /// Replaces the session with a saved one, resuming Paused with an empty battlefield.
    ///
    /// A save taken after defeat or victory loads in that final phase and
    /// never runs again. The live session is untouched when loading fails.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError`] when the payload is malformed, carries another
    /// version, or does not fit the configured grid.
    pub fn load(&mut self, payload: &str) -> Result<(), SaveError> {
        let record = match SaveRecord::decode(payload) {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "rejected save");
                return Err(error);
            }
        };

        let config = SimulationConfig {
            difficulty: record.difficulty,
            ..self.config().clone()
        };
        let wave = record.wave;
        let restored = World::restore(config.clone(), record.into_restored())?;

        let director_config = DirectorConfig::from_simulation(&config);
        self.director = if query::phase(&restored).is_terminal() {
            WaveDirector::concluded(director_config, wave)
        } else {
            WaveDirector::resumed(director_config, wave)
        };
        self.world = restored;
        self.targeting = TowerTargeting::new();
        self.combat = TowerCombat::new();
        self.events.clear();
        info!(
            wave,
            phase = ?query::phase(&self.world),
            currency = query::ledger(&self.world).currency(),
            "save loaded"
        );
        Ok(())
    }

    fn has_ended(&self) -> bool {
        query::phase(&self.world).is_terminal()
    }

    fn run(&mut self, command: Command) {
        world::apply(&mut self.world, command, &mut self.events);
    }

    fn flush_commands(&mut self) {
        for command in self.commands.drain(..) {
            world::apply(&mut self.world, command, &mut self.events);
        }
    }
}
