#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Siegeline.
//!
//! The world owns the grid, every live entity and the ledger. It mutates only
//! in response to [`Command`] values passed to [`apply`], reports what happened
//! through [`Event`] values, and exposes read-only state through [`query`].

mod enemies;
mod grid;
mod ledger;
mod navigation;
mod projectiles;
mod towers;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use siegeline_core::{
    refund_for, BossTrait, CellCoord, CellPoint, CellRect, Command, Direction, EnemyId,
    EnemyKind, Event, FireMode, GamePhase, Opening, PlacementError, ProjectileId,
    ProjectilePayload, Route, SellError, SimulationConfig, TowerId, TowerKind, UpgradeError,
    MAX_TOWER_LEVEL,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use enemies::{Enemy, EnemyState, Step};
use projectiles::{Flight, Projectile};
use towers::{footprint_for, TowerRegistry};

pub use grid::{CellState, Grid};
pub use ledger::Ledger;
pub use navigation::{find_path, is_reachable, route_distance, Path, Pathfinder};

/// Probability that a dying spawner's children emerge beyond a wall.
const CRACK_CHANCE: f64 = 0.3;

/// Ray order used when searching for a crack.
const CRACK_RAYS: [Direction; 4] = [
    Direction::South,
    Direction::East,
    Direction::North,
    Direction::West,
];

/// Offsets scattering children around their parent's death position.
const CHILD_SCATTER: [(f32, f32); 3] = [(-0.2, -0.2), (0.2, 0.0), (-0.2, 0.2)];

/// Slack tolerated when re-validating a target's range at fire time.
const RANGE_EPSILON: f32 = 1e-4;

/// Represents the authoritative Siegeline world state.
#[derive(Clone, Debug)]
pub struct World {
    config: SimulationConfig,
    phase: GamePhase,
    grid: Grid,
    pathfinder: Pathfinder,
    enemies: Vec<Enemy>,
    towers: TowerRegistry,
    projectiles: Vec<Projectile>,
    ledger: Ledger,
    wave: u32,
    tick_index: u64,
    next_enemy_id: u32,
    next_projectile_id: u32,
    rng: ChaCha8Rng,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SimulationConfig::default())
    }

    /// Creates a world in the setup phase from the provided configuration.
    #[must_use]
    pub fn with_config(config: SimulationConfig) -> Self {
        Self {
            phase: GamePhase::Setup,
            grid: Grid::bordered(config.columns, config.rows),
            pathfinder: Pathfinder::default(),
            enemies: Vec::new(),
            towers: TowerRegistry::new(),
            projectiles: Vec::new(),
            ledger: Ledger::new(config.starting_currency, config.base_health),
            wave: 0,
            tick_index: 0,
            next_enemy_id: 0,
            next_projectile_id: 0,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
        }
    }

    /// Rebuilds a world from persisted state with an empty battlefield.
    ///
    /// The world comes back Paused unless the state describes a finished
    /// session: no base health left restores Lost, and a wave at or past the
    /// configured final wave restores Won.
    ///
    /// # Errors
    ///
    /// Returns [`RestoreError`] when the stored occupancy does not match the
    /// configured grid or a stored tower does not sit on blocked interior cells.
    pub fn restore(config: SimulationConfig, state: RestoredState) -> Result<Self, RestoreError> {
        let grid = Grid::from_rows(config.columns, config.rows, &state.occupancy).ok_or(
            RestoreError::Occupancy {
                columns: config.columns,
                rows: config.rows,
            },
        )?;

        let mut world = Self::with_config(config);
        world.grid = grid;
        world.phase = if state.base_health == 0 {
            GamePhase::Lost
        } else if state.wave >= world.config.final_wave {
            GamePhase::Won
        } else {
            GamePhase::Paused
        };
        world.wave = state.wave;
        world.ledger = Ledger::restored(state.currency, state.score, state.base_health);

        for tower in state.towers {
            let region = footprint_for(tower.kind, tower.origin);
            let sits_on_walls = world.grid.is_interior(&region)
                && region.cells().all(|cell| !world.grid.is_open(cell));
            let overlaps = world
                .towers
                .iter()
                .any(|existing| region.cells().any(|cell| existing.region.contains(cell)));
            if !sits_on_walls || overlaps || tower.level == 0 || tower.level > MAX_TOWER_LEVEL {
                return Err(RestoreError::Tower {
                    kind: tower.kind,
                    origin: tower.origin,
                });
            }
            let _ = world
                .towers
                .insert(tower.kind, region, tower.level, tower.invested);
        }

        info!(
            wave = world.wave,
            phase = ?world.phase,
            towers = world.towers.iter().count(),
            "world restored"
        );
        Ok(world)
    }

    fn route(&self, opening: Opening) -> Route {
        opening.route(self.config.columns, self.config.rows)
    }

    fn enemy_index(&self, id: EnemyId) -> Option<usize> {
        self.enemies
            .binary_search_by_key(&id, |enemy| enemy.id())
            .ok()
    }

    fn allocate_enemy_id(&mut self) -> EnemyId {
        let id = EnemyId::new(self.next_enemy_id);
        self.next_enemy_id = self.next_enemy_id.saturating_add(1);
        id
    }

    fn set_phase(&mut self, requested: GamePhase, out_events: &mut Vec<Event>) {
        let allowed = matches!(
            (self.phase, requested),
            (GamePhase::Setup, GamePhase::Running)
                | (GamePhase::Running, GamePhase::Paused)
                | (GamePhase::Paused, GamePhase::Running)
        );
        if !allowed {
            debug!(from = ?self.phase, to = ?requested, "ignoring phase transition");
            return;
        }
        self.phase = requested;
        out_events.push(Event::PhaseChanged { phase: requested });
    }

    fn end_session(&mut self, phase: GamePhase, out_events: &mut Vec<Event>) {
        if self.phase.is_terminal() {
            return;
        }
        self.phase = phase;
        out_events.push(Event::PhaseChanged { phase });
        if phase == GamePhase::Lost {
            info!(wave = self.wave, "base destroyed");
            out_events.push(Event::GameOver { wave: self.wave });
        } else {
            info!(wave = self.wave, "final wave cleared");
            out_events.push(Event::Victory { wave: self.wave });
        }
    }

    fn spawn_enemy(
        &mut self,
        kind: EnemyKind,
        opening: Opening,
        boss: Option<BossTrait>,
        out_events: &mut Vec<Event>,
    ) {
        if self.phase.is_terminal() {
            return;
        }
        let route = self.route(opening);
        let profile = match boss {
            Some(boss_trait) => kind.boss_profile(self.wave, boss_trait),
            None => kind.profile(),
        };
        let path = if profile.traits.flying {
            Path::default()
        } else {
            self.pathfinder.find(&self.grid, route.entry, route.goal)
        };
        let id = self.allocate_enemy_id();
        self.enemies.push(Enemy::spawn(
            id,
            kind,
            profile,
            route,
            route.entry.center(),
            path,
            boss.is_some(),
        ));
        out_events.push(Event::EnemySpawned {
            enemy: id,
            kind,
            opening,
            boss: boss.is_some(),
        });
    }

    fn advance_enemies(&mut self, out_events: &mut Vec<Event>) {
        let mut leaks: Vec<(EnemyId, u32)> = Vec::new();
        for enemy in &mut self.enemies {
            if enemy.advance() == Step::Leaked {
                leaks.push((enemy.id(), enemy.profile().leak_damage));
            }
        }

        for (enemy, damage) in leaks {
            let base_health = self.ledger.lose_health(damage);
            out_events.push(Event::EnemyLeaked {
                enemy,
                damage,
                base_health,
            });
            if base_health == 0 {
                self.end_session(GamePhase::Lost, out_events);
            }
        }
    }

    fn advance_towers(&mut self, out_events: &mut Vec<Event>) {
        for tower in self.towers.iter_mut() {
            if let Some(level) = tower.advance_timers() {
                debug!(tower = tower.id.get(), level, "upgrade complete");
                out_events.push(Event::TowerUpgraded {
                    tower: tower.id,
                    level,
                });
            }
        }
    }

    fn fire_tower(&mut self, id: TowerId, targets: &[EnemyId], out_events: &mut Vec<Event>) {
        if !self.phase.is_advancing() {
            return;
        }
        let Some(tower) = self.towers.get_mut(id) else {
            return;
        };
        if !tower.is_ready() {
            return;
        }

        let kind = tower.kind;
        let level = tower.level;
        let origin = tower.center();
        let range = kind.range(level) + RANGE_EPSILON;
        let filter = kind.target_filter();
        let mut victims: Vec<usize> = Vec::with_capacity(targets.len());
        for target in targets {
            let Ok(index) = self
                .enemies
                .binary_search_by_key(target, |enemy| enemy.id())
            else {
                continue;
            };
            let enemy = &self.enemies[index];
            if enemy.is_alive()
                && filter.admits(enemy.is_flying())
                && enemy.position().distance(origin) <= range
                && !victims.contains(&index)
            {
                victims.push(index);
            }
        }
        if victims.is_empty() {
            return;
        }

        tower.cooldown = kind.fire_interval(level);
        let damage = kind.damage(level);
        match kind.fire_mode(level) {
            FireMode::Melee {
                stun_chance,
                stun_ticks,
            } => {
                let mut stunned = 0;
                for index in &victims {
                    let enemy = &mut self.enemies[*index];
                    let _ = enemy.take_damage(damage);
                    if enemy.is_alive() && self.rng.gen_bool(stun_chance) {
                        enemy.apply_stun(stun_ticks);
                        stunned += 1;
                    }
                }
                out_events.push(Event::TowerStruck {
                    tower: id,
                    hits: u32::try_from(victims.len()).unwrap_or(u32::MAX),
                    stunned,
                });
            }
            mode => {
                let payload = mode.payload().unwrap_or(ProjectilePayload::Plain);
                for index in victims {
                    let target = self.enemies[index].id();
                    let projectile = ProjectileId::new(self.next_projectile_id);
                    self.next_projectile_id = self.next_projectile_id.saturating_add(1);
                    self.projectiles.push(Projectile::launch(
                        projectile, kind, origin, target, damage, payload,
                    ));
                    out_events.push(Event::ProjectileLaunched {
                        projectile,
                        tower: id,
                        target,
                    });
                }
            }
        }
    }

    fn advance_projectiles(&mut self, out_events: &mut Vec<Event>) {
        for index in 0..self.projectiles.len() {
            let target = self.projectiles[index].target;
            let target_index = self
                .enemy_index(target)
                .filter(|found| self.enemies[*found].is_alive());
            let position = target_index.map(|found| self.enemies[found].position());

            let projectile = &mut self.projectiles[index];
            match projectile.steer(position) {
                Flight::Homing => {}
                Flight::Lost => {
                    out_events.push(Event::ProjectileDiscarded {
                        projectile: projectile.id,
                    });
                }
                Flight::Arrived => {
                    let Some(target_index) = target_index else {
                        continue;
                    };
                    let (id, damage, payload) =
                        (projectile.id, projectile.damage, projectile.payload);
                    let splashed = self.resolve_impact(target_index, damage, payload);
                    out_events.push(Event::ProjectileImpacted {
                        projectile: id,
                        target,
                        splashed,
                    });
                }
            }
        }
    }

    fn resolve_impact(&mut self, target: usize, damage: u32, payload: ProjectilePayload) -> u32 {
        let center = self.enemies[target].position();
        let _ = self.enemies[target].take_damage(damage);
        match payload {
            ProjectilePayload::Plain => 0,
            ProjectilePayload::Slow { factor, duration } => {
                let _ = self.enemies[target].apply_slow(factor, duration);
                0
            }
            ProjectilePayload::Splash { radius } => {
                let splash = damage / 2;
                let mut splashed = 0;
                for (index, enemy) in self.enemies.iter_mut().enumerate() {
                    if index == target || !enemy.is_alive() {
                        continue;
                    }
                    if enemy.position().distance(center) <= radius {
                        let _ = enemy.take_damage(splash);
                        splashed += 1;
                    }
                }
                splashed
            }
        }
    }

    fn reconcile(&mut self, out_events: &mut Vec<Event>) {
        let mut broods: Vec<(CellPoint, Route, u32)> = Vec::new();
        let settles = !self.phase.is_terminal();
        for enemy in &self.enemies {
            if !settles || enemy.state() != EnemyState::Killed {
                continue;
            }
            let reward = enemy.profile().reward;
            self.ledger.earn(reward.currency);
            self.ledger.add_score(reward.score);
            out_events.push(Event::EnemyKilled {
                enemy: enemy.id(),
                kind: enemy.kind(),
                position: enemy.position(),
                currency: reward.currency,
                score: reward.score,
            });
            let children = enemy.profile().traits.children;
            if children > 0 {
                broods.push((enemy.position(), enemy.route(), children));
            }
        }

        self.enemies.retain(Enemy::is_alive);
        self.projectiles.retain(|projectile| !projectile.is_spent());

        for (position, route, children) in broods {
            self.spawn_children(position, route, children, out_events);
        }
    }

    fn spawn_children(
        &mut self,
        position: CellPoint,
        route: Route,
        count: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(origin) = position.cell() else {
            return;
        };
        let kind = EnemyKind::Broodling;
        for child in 0..count {
            let scatter = CHILD_SCATTER[child as usize % CHILD_SCATTER.len()];
            let mut start = CellPoint::new(position.column() + scatter.0, position.row() + scatter.1);
            let mut path = self.pathfinder.find(&self.grid, origin, route.goal);

            if self.rng.gen_bool(CRACK_CHANCE) {
                if let Some((cell, beyond)) = self.find_crack(origin, route.goal) {
                    debug!(column = cell.column(), row = cell.row(), "brood cracked a wall");
                    start = cell.center();
                    path = beyond;
                }
            }

            let id = self.allocate_enemy_id();
            self.enemies.push(
                Enemy::spawn(id, kind, kind.profile(), route, start, path, false).with_grace(),
            );
            out_events.push(Event::EnemySpawned {
                enemy: id,
                kind,
                opening: route.opening,
                boss: false,
            });
        }
    }

    /// First open cell past a wall along the rays from `origin` that still reaches `goal`.
    fn find_crack(&mut self, origin: CellCoord, goal: CellCoord) -> Option<(CellCoord, Path)> {
        for direction in CRACK_RAYS {
            let mut cell = origin;
            let mut crossed_wall = false;
            while let Some(next) = cell.step(direction, self.grid.columns(), self.grid.rows()) {
                cell = next;
                if !self.grid.is_open(cell) {
                    crossed_wall = true;
                    continue;
                }
                if crossed_wall {
                    let path = self.pathfinder.find(&self.grid, cell, goal);
                    if !path.is_empty() {
                        return Some((cell, path));
                    }
                    break;
                }
            }
        }
        None
    }

    fn check_placement(&self, kind: TowerKind, origin: CellCoord) -> Result<CellRect, PlacementError> {
        if self.phase.is_terminal() {
            return Err(PlacementError::InvalidPhase);
        }
        let region = footprint_for(kind, origin);
        if !self.grid.is_interior(&region) {
            return Err(PlacementError::OutOfBounds);
        }
        let cost = kind.cost();
        if self.ledger.currency() < cost {
            return Err(PlacementError::InsufficientFunds {
                needed: cost,
                available: self.ledger.currency(),
            });
        }
        self.check_footprint(region)?;
        Ok(region)
    }

    /// Occupancy, enemy and route checks shared by placement and hover previews.
    fn check_footprint(&self, region: CellRect) -> Result<(), PlacementError> {
        if region.cells().any(|cell| !self.grid.is_open(cell)) {
            return Err(PlacementError::Occupied);
        }
        let trapped = self.enemies.iter().any(|enemy| {
            enemy.is_alive()
                && !enemy.is_flying()
                && enemy
                    .current_cell()
                    .is_some_and(|cell| region.contains(cell))
        });
        if trapped {
            return Err(PlacementError::EnemyInFootprint);
        }
        for opening in Opening::ALL {
            let route = self.route(opening);
            if !is_reachable(&self.grid, route.entry, route.goal, |cell| {
                region.contains(cell)
            }) {
                return Err(PlacementError::BlocksRoute(opening));
            }
        }
        Ok(())
    }

    fn place_tower(&mut self, kind: TowerKind, origin: CellCoord, out_events: &mut Vec<Event>) {
        let region = match self.check_placement(kind, origin) {
            Ok(region) => region,
            Err(reason) => {
                debug!(?kind, ?origin, %reason, "placement rejected");
                out_events.push(Event::TowerPlacementRejected {
                    kind,
                    origin,
                    reason,
                });
                return;
            }
        };

        let cost = kind.cost();
        if !self.ledger.try_spend(cost) {
            return;
        }
        self.grid.block_region(&region);
        let tower = self.towers.insert(kind, region, 1, cost);
        out_events.push(Event::TowerPlaced {
            tower,
            kind,
            region,
            cost,
        });
        self.repath(out_events, |enemy| enemy.remaining_path_crosses(&region));
    }

    fn upgrade_tower(&mut self, id: TowerId, out_events: &mut Vec<Event>) {
        match self.try_upgrade(id) {
            Ok((target_level, cost, ticks)) => out_events.push(Event::TowerUpgradeStarted {
                tower: id,
                target_level,
                cost,
                ticks,
            }),
            Err(reason) => {
                debug!(tower = id.get(), %reason, "upgrade rejected");
                out_events.push(Event::TowerUpgradeRejected { tower: id, reason });
            }
        }
    }

    fn try_upgrade(&mut self, id: TowerId) -> Result<(u8, u32, u32), UpgradeError> {
        if self.phase.is_terminal() {
            return Err(UpgradeError::InvalidPhase);
        }
        let tower = self.towers.get_mut(id).ok_or(UpgradeError::MissingTower)?;
        if tower.is_upgrading() {
            return Err(UpgradeError::AlreadyUpgrading);
        }
        let cost = tower
            .kind
            .upgrade_cost(tower.level)
            .ok_or(UpgradeError::MaxLevel)?;
        if !self.ledger.try_spend(cost) {
            return Err(UpgradeError::InsufficientFunds {
                needed: cost,
                available: self.ledger.currency(),
            });
        }
        let (target_level, ticks) = tower.begin_upgrade(cost);
        Ok((target_level, cost, ticks))
    }

    fn sell_tower(&mut self, id: TowerId, out_events: &mut Vec<Event>) {
        let reason = if self.phase.is_terminal() {
            Some(SellError::InvalidPhase)
        } else if self.towers.get(id).is_none() {
            Some(SellError::MissingTower)
        } else {
            None
        };
        if let Some(reason) = reason {
            debug!(tower = id.get(), %reason, "sale rejected");
            out_events.push(Event::TowerSaleRejected { tower: id, reason });
            return;
        }
        let Some(tower) = self.towers.remove(id) else {
            return;
        };

        let refund = refund_for(tower.invested, self.phase);
        self.ledger.earn(refund);
        self.grid.open_region(&tower.region);
        out_events.push(Event::TowerSold {
            tower: id,
            region: tower.region,
            refund,
        });
        self.repath(out_events, Enemy::is_stranded);
    }

    /// Recomputes paths for live ground enemies selected by `needs_path`.
    fn repath<F>(&mut self, out_events: &mut Vec<Event>, needs_path: F)
    where
        F: Fn(&Enemy) -> bool,
    {
        let mut count = 0_u32;
        for enemy in &mut self.enemies {
            if !enemy.is_alive() || enemy.is_flying() || !needs_path(enemy) {
                continue;
            }
            let Some(cell) = enemy.current_cell() else {
                continue;
            };
            let path = self.pathfinder.find(&self.grid, cell, enemy.route().goal);
            if path.is_empty() {
                warn!(enemy = enemy.id().get(), "enemy has no route to its goal");
            }
            enemy.assign_path(path);
            count += 1;
        }
        if count > 0 {
            out_events.push(Event::EnemiesRepathed { count });
        }
    }
}

/// Persisted tower used when restoring a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestoredTower {
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Upper-left cell of the footprint.
    pub origin: CellCoord,
    /// Level in effect.
    pub level: u8,
    /// Currency invested, which drives the refund.
    pub invested: u32,
}

/// Persisted session state used to rebuild a world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestoredState {
    /// Currency held.
    pub currency: u32,
    /// Score accumulated.
    pub score: u64,
    /// Base health remaining.
    pub base_health: u32,
    /// Last announced wave.
    pub wave: u32,
    /// Grid occupancy as rows of `'#'` and `'.'`.
    pub occupancy: Vec<String>,
    /// Towers to register on the restored grid.
    pub towers: Vec<RestoredTower>,
}

/// Reasons a persisted state cannot be turned back into a world.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RestoreError {
    /// Occupancy rows do not describe a grid of the configured size.
    #[error("occupancy does not describe a {columns}x{rows} grid")]
    Occupancy {
        /// Expected column count.
        columns: u32,
        /// Expected row count.
        rows: u32,
    },
    /// A tower does not fit the stored occupancy.
    #[error("{kind:?} tower at {origin:?} does not fit the stored grid")]
    Tower {
        /// Kind of the offending tower.
        kind: TowerKind,
        /// Origin of the offending tower.
        origin: CellCoord,
    },
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Reset { config } => {
            *world = World::with_config(config);
            out_events.push(Event::PhaseChanged {
                phase: GamePhase::Setup,
            });
        }
        Command::Tick => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced {
                tick: world.tick_index,
            });
        }
        Command::SetPhase { phase } => world.set_phase(phase, out_events),
        Command::AnnounceWave { wave } => {
            if world.phase.is_terminal() {
                return;
            }
            world.wave = wave;
            info!(wave, "wave started");
            out_events.push(Event::WaveStarted { wave });
        }
        Command::DeclareVictory => world.end_session(GamePhase::Won, out_events),
        Command::SpawnEnemy {
            kind,
            opening,
            boss,
        } => world.spawn_enemy(kind, opening, boss, out_events),
        Command::AdvanceEnemies => world.advance_enemies(out_events),
        Command::AdvanceTowers => world.advance_towers(out_events),
        Command::FireTower { tower, targets } => world.fire_tower(tower, &targets, out_events),
        Command::AdvanceProjectiles => world.advance_projectiles(out_events),
        Command::Reconcile => world.reconcile(out_events),
        Command::PlaceTower { kind, origin } => world.place_tower(kind, origin, out_events),
        Command::UpgradeTower { tower } => world.upgrade_tower(tower, out_events),
        Command::SellTower { tower } => world.sell_tower(tower, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use siegeline_core::{
        CellCoord, CellRect, EnemyView, GamePhase, Opening, ProjectileSnapshot, Route,
        SimulationConfig, TowerId, TowerKind, TowerSnapshot, TowerView,
    };

    use super::{footprint_for, Grid, Ledger, PlacementError, World};

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(world: &World) -> GamePhase {
        world.phase
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Provides read-only access to the occupancy grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Provides read-only access to currency, score and base health.
    #[must_use]
    pub fn ledger(world: &World) -> &Ledger {
        &world.ledger
    }

    /// Last announced wave, zero before the first.
    #[must_use]
    pub fn wave(world: &World) -> u32 {
        world.wave
    }

    /// Number of ticks processed since the world was built.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Both routes in their canonical order.
    #[must_use]
    pub fn routes(world: &World) -> [Route; 2] {
        Opening::ALL.map(|opening| world.route(opening))
    }

    /// Captures a read-only view of the live enemies.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .iter()
                .filter(|enemy| enemy.is_alive())
                .map(|enemy| enemy.snapshot())
                .collect(),
        )
    }

    /// Number of enemies still travelling.
    #[must_use]
    pub fn live_enemy_count(world: &World) -> usize {
        world.enemies.iter().filter(|enemy| enemy.is_alive()).count()
    }

    /// Captures a read-only view of every tower.
    #[must_use]
    pub fn tower_view(world: &World) -> TowerView {
        TowerView::from_snapshots(world.towers.iter().map(|tower| tower.snapshot()).collect())
    }

    /// Snapshot of a single tower.
    #[must_use]
    pub fn tower(world: &World, id: TowerId) -> Option<TowerSnapshot> {
        world.towers.get(id).map(|tower| tower.snapshot())
    }

    /// Tower whose footprint covers the provided cell.
    #[must_use]
    pub fn tower_at(world: &World, cell: CellCoord) -> Option<TowerId> {
        world.towers.tower_at(cell)
    }

    /// Snapshots of the projectiles still in flight.
    #[must_use]
    pub fn projectiles(world: &World) -> Vec<ProjectileSnapshot> {
        world
            .projectiles
            .iter()
            .filter(|projectile| !projectile.is_spent())
            .map(|projectile| projectile.snapshot())
            .collect()
    }

    /// Reports whether a tower could stand at `origin`, ignoring phase and funds.
    ///
    /// # Errors
    ///
    /// Returns the first failing footprint check.
    pub fn can_place(
        world: &World,
        kind: TowerKind,
        origin: CellCoord,
    ) -> Result<CellRect, PlacementError> {
        let region = footprint_for(kind, origin);
        if !world.grid.is_interior(&region) {
            return Err(PlacementError::OutOfBounds);
        }
        world.check_footprint(region)?;
        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siegeline_core::BossTrait;

    fn running_world() -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Running,
            },
            &mut events,
        );
        world
    }

    fn spawn(world: &mut World, kind: EnemyKind, opening: Opening) -> EnemyId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnEnemy {
                kind,
                opening,
                boss: None,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::EnemySpawned { enemy, .. }] => *enemy,
            other => panic!("unexpected events {other:?}"),
        }
    }

    fn place(world: &mut World, kind: TowerKind, column: u32, row: u32) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            world,
            Command::PlaceTower {
                kind,
                origin: CellCoord::new(column, row),
            },
            &mut events,
        );
        events
    }

    #[test]
    fn phase_transitions_follow_the_lifecycle() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Paused,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::phase(&world), GamePhase::Setup);

        for phase in [GamePhase::Running, GamePhase::Paused, GamePhase::Running] {
            apply(&mut world, Command::SetPhase { phase }, &mut events);
            assert_eq!(query::phase(&world), phase);
        }
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn placement_spends_blocks_and_registers() {
        let mut world = World::new();
        let events = place(&mut world, TowerKind::Arrow, 4, 4);
        assert!(matches!(
            events.as_slice(),
            [Event::TowerPlaced { cost: 50, .. }]
        ));
        assert_eq!(query::ledger(&world).currency(), 950);
        assert!(!query::grid(&world).is_open(CellCoord::new(5, 5)));
        assert_eq!(query::grid(&world).version(), 1);
        assert!(query::tower_at(&world, CellCoord::new(4, 5)).is_some());
    }

    #[test]
    fn placement_checks_run_in_order() {
        let mut world = World::new();
        let border = place(&mut world, TowerKind::Arrow, 0, 3);
        assert!(matches!(
            border.as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::OutOfBounds,
                ..
            }]
        ));

        let _ = place(&mut world, TowerKind::Arrow, 4, 4);
        let overlap = place(&mut world, TowerKind::Cannon, 5, 5);
        assert!(matches!(
            overlap.as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::Occupied,
                ..
            }]
        ));
        assert_eq!(query::ledger(&world).currency(), 950);
    }

    #[test]
    fn insufficient_funds_leave_state_untouched() {
        let config = SimulationConfig {
            starting_currency: 40,
            ..SimulationConfig::default()
        };
        let mut world = World::with_config(config);
        let events = place(&mut world, TowerKind::Arrow, 4, 4);
        assert!(matches!(
            events.as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::InsufficientFunds {
                    needed: 50,
                    available: 40
                },
                ..
            }]
        ));
        assert_eq!(query::grid(&world).version(), 0);
        assert_eq!(query::ledger(&world).currency(), 40);
    }

    #[test]
    fn sealing_a_route_is_rejected_without_side_effects() {
        let mut world = World::new();
        // Rows 5 and 6 walled except columns 17 and 18.
        for column in [1, 3, 5, 7, 9, 11, 13, 15] {
            let events = place(&mut world, TowerKind::Arrow, column, 5);
            assert!(matches!(events.as_slice(), [Event::TowerPlaced { .. }]));
        }
        let before = query::ledger(&world).currency();
        let version = query::grid(&world).version();

        let events = place(&mut world, TowerKind::Arrow, 17, 5);
        assert!(matches!(
            events.as_slice(),
            [Event::TowerPlacementRejected {
                reason: PlacementError::BlocksRoute(Opening::Top),
                ..
            }]
        ));
        assert_eq!(query::ledger(&world).currency(), before);
        assert_eq!(query::grid(&world).version(), version);
        assert!(query::grid(&world).is_open(CellCoord::new(17, 5)));
    }

    #[test]
    fn ground_enemy_inside_footprint_blocks_placement() {
        let mut world = running_world();
        let _ = spawn(&mut world, EnemyKind::Grunt, Opening::Top);
        let mut events = Vec::new();
        for _ in 0..60 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        let cell = query::enemy_view(&world)
            .iter()
            .next()
            .and_then(|enemy| enemy.position.cell())
            .expect("enemy on grid");
        let outcome = query::can_place(&world, TowerKind::Arrow, cell);
        assert_eq!(outcome, Err(PlacementError::EnemyInFootprint));
    }

    #[test]
    fn placement_repaths_enemies_whose_route_crosses_the_footprint() {
        let mut world = running_world();
        let _ = spawn(&mut world, EnemyKind::Grunt, Opening::Top);
        let events = place(&mut world, TowerKind::Arrow, 9, 7);
        assert!(events.contains(&Event::EnemiesRepathed { count: 1 }));

        let elsewhere = place(&mut world, TowerKind::Arrow, 2, 2);
        assert!(!elsewhere
            .iter()
            .any(|event| matches!(event, Event::EnemiesRepathed { .. })));
    }

    #[test]
    fn kills_pay_out_exactly_once_at_reconciliation() {
        let mut world = running_world();
        let enemy = spawn(&mut world, EnemyKind::Swarmling, Opening::Top);
        let index = world.enemy_index(enemy).expect("enemy");
        let _ = world.enemies[index].take_damage(100);
        let _ = world.enemies[index].take_damage(100);
        assert_eq!(query::ledger(&world).currency(), 1000);

        let mut events = Vec::new();
        apply(&mut world, Command::Reconcile, &mut events);
        apply(&mut world, Command::Reconcile, &mut events);
        let kills = events
            .iter()
            .filter(|event| matches!(event, Event::EnemyKilled { .. }))
            .count();
        assert_eq!(kills, 1);
        assert_eq!(query::ledger(&world).currency(), 1001);
        assert_eq!(query::ledger(&world).score(), 3);
        assert_eq!(query::live_enemy_count(&world), 0);
    }

    #[test]
    fn splash_hits_every_enemy_in_radius_and_nothing_beyond() {
        let mut world = running_world();
        let mut ids: Vec<EnemyId> = (0..3)
            .map(|_| spawn(&mut world, EnemyKind::Grunt, Opening::Top))
            .collect();
        ids.push(spawn(&mut world, EnemyKind::Grunt, Opening::Left));
        let mut events = Vec::new();
        for _ in 0..20 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        let view = query::enemy_view(&world);
        let positions: Vec<CellPoint> = view.iter().map(|enemy| enemy.position).collect();
        assert!(positions[0].distance(positions[1]) <= 1.25);
        assert!(positions[0].distance(positions[3]) > 1.25);

        let splashed = world.resolve_impact(
            0,
            20,
            ProjectilePayload::Splash { radius: 1.25 },
        );
        assert_eq!(splashed, 2);
        let view = query::enemy_view(&world);
        let health: Vec<u32> = view.iter().map(|enemy| enemy.health).collect();
        assert_eq!(health, vec![30, 40, 40, 50]);
        assert_eq!(view.iter().map(|enemy| enemy.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn spawner_death_adds_children_with_grace() {
        let mut world = running_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Brood,
                opening: Opening::Left,
                boss: None,
            },
            &mut events,
        );
        for _ in 0..100 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        let _ = world.enemies[0].take_damage(1_000);
        events.clear();
        apply(&mut world, Command::Reconcile, &mut events);

        let children: Vec<_> = events
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    Event::EnemySpawned {
                        kind: EnemyKind::Broodling,
                        ..
                    }
                )
            })
            .collect();
        assert_eq!(children.len(), 3);
        assert_eq!(query::live_enemy_count(&world), 3);

        let before: Vec<CellPoint> = query::enemy_view(&world)
            .iter()
            .map(|enemy| enemy.position)
            .collect();
        apply(&mut world, Command::AdvanceEnemies, &mut events);
        let after: Vec<CellPoint> = query::enemy_view(&world)
            .iter()
            .map(|enemy| enemy.position)
            .collect();
        assert_eq!(before, after, "children sit out their first update");
    }

    #[test]
    fn leaks_drain_health_and_end_the_session() {
        let config = SimulationConfig {
            base_health: 1,
            ..SimulationConfig::default()
        };
        let mut world = World::with_config(config);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Running,
            },
            &mut events,
        );
        let _ = spawn(&mut world, EnemyKind::Runner, Opening::Left);
        for _ in 0..1_000 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
            apply(&mut world, Command::Reconcile, &mut events);
        }
        assert_eq!(query::phase(&world), GamePhase::Lost);
        assert_eq!(query::ledger(&world).base_health(), 0);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::GameOver { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn mixed_kills_in_one_tick_are_each_paid_once() {
        let mut world = running_world();
        let ids: Vec<EnemyId> = (0..4)
            .map(|_| spawn(&mut world, EnemyKind::Grunt, Opening::Top))
            .collect();
        let bystander = spawn(&mut world, EnemyKind::Grunt, Opening::Left);
        let _ = place(&mut world, TowerKind::Spike, 11, 2);
        let tower = TowerId::new(0);
        let mut events = Vec::new();
        for _ in 0..2 {
            apply(&mut world, Command::UpgradeTower { tower }, &mut events);
            for _ in 0..181 {
                apply(&mut world, Command::AdvanceTowers, &mut events);
            }
        }
        for _ in 0..100 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        for id in &ids[..2] {
            let index = world.enemy_index(*id).expect("enemy");
            let _ = world.enemies[index].take_damage(30);
        }
        assert_eq!(query::live_enemy_count(&world), 5);
        let currency = query::ledger(&world).currency();
        let score = query::ledger(&world).score();

        events.clear();
        apply(
            &mut world,
            Command::FireTower {
                tower,
                targets: ids.clone(),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::TowerStruck { hits: 4, .. }]
        ));
        assert_eq!(query::live_enemy_count(&world), 3);

        let third = world.enemy_index(ids[2]).expect("enemy");
        let _ = world.resolve_impact(third, 30, ProjectilePayload::Splash { radius: 1.25 });
        let fourth = world.enemy_index(ids[3]).expect("enemy");
        let _ = world.resolve_impact(fourth, 30, ProjectilePayload::Plain);
        // Overkill on a melee casualty changes nothing.
        let first = world.enemy_index(ids[0]).expect("enemy");
        let _ = world.resolve_impact(first, 30, ProjectilePayload::Plain);
        assert_eq!(query::live_enemy_count(&world), 1);
        assert_eq!(world.enemies.len(), 5);

        events.clear();
        apply(&mut world, Command::Reconcile, &mut events);
        let mut paid: Vec<EnemyId> = events
            .iter()
            .filter_map(|event| match event {
                Event::EnemyKilled { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        paid.sort();
        assert_eq!(paid, ids);
        assert_eq!(world.enemies.len(), 1);
        assert_eq!(world.enemies[0].id(), bystander);
        assert_eq!(query::ledger(&world).currency(), currency + 4 * 5);
        assert_eq!(query::ledger(&world).score(), score + 4 * 10);

        events.clear();
        apply(&mut world, Command::Reconcile, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn kills_after_the_session_ends_pay_nothing() {
        let mut world = running_world();
        let enemy = spawn(&mut world, EnemyKind::Brood, Opening::Top);
        let index = world.enemy_index(enemy).expect("enemy");
        let _ = world.enemies[index].take_damage(1_000);

        let mut events = Vec::new();
        world.end_session(GamePhase::Lost, &mut events);
        events.clear();
        apply(&mut world, Command::Reconcile, &mut events);

        assert!(events.is_empty());
        assert_eq!(query::ledger(&world).currency(), 1000);
        assert_eq!(query::ledger(&world).score(), 0);
        assert_eq!(query::live_enemy_count(&world), 0);
        assert!(query::enemy_view(&world).iter().next().is_none());
    }

    #[test]
    fn upgrades_are_prepaid_and_capped() {
        let mut world = World::new();
        let _ = place(&mut world, TowerKind::Arrow, 4, 4);
        let tower = TowerId::new(0);
        let mut events = Vec::new();
        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        assert!(matches!(
            events.as_slice(),
            [
                Event::TowerUpgradeStarted {
                    target_level: 2,
                    cost: 50,
                    ticks: 120,
                    ..
                },
                Event::TowerUpgradeRejected {
                    reason: UpgradeError::AlreadyUpgrading,
                    ..
                }
            ]
        ));
        assert_eq!(query::ledger(&world).currency(), 900);

        for _ in 0..120 {
            apply(&mut world, Command::AdvanceTowers, &mut events);
        }
        assert_eq!(query::tower(&world, tower).map(|t| t.level), Some(2));

        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        for _ in 0..180 {
            apply(&mut world, Command::AdvanceTowers, &mut events);
        }
        events.clear();
        apply(&mut world, Command::UpgradeTower { tower }, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::TowerUpgradeRejected {
                reason: UpgradeError::MaxLevel,
                ..
            }]
        ));
    }

    #[test]
    fn setup_sales_refund_in_full_and_later_sales_partially() {
        let mut world = World::new();
        let _ = place(&mut world, TowerKind::Cannon, 4, 4);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SellTower {
                tower: TowerId::new(0),
            },
            &mut events,
        );
        assert_eq!(query::ledger(&world).currency(), 1000);
        assert!(query::grid(&world).is_open(CellCoord::new(4, 4)));

        apply(
            &mut world,
            Command::SetPhase {
                phase: GamePhase::Running,
            },
            &mut events,
        );
        let _ = place(&mut world, TowerKind::Cannon, 4, 4);
        apply(
            &mut world,
            Command::SellTower {
                tower: TowerId::new(1),
            },
            &mut events,
        );
        assert_eq!(query::ledger(&world).currency(), 960);

        events.clear();
        apply(
            &mut world,
            Command::SellTower {
                tower: TowerId::new(1),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::TowerSaleRejected {
                reason: SellError::MissingTower,
                ..
            }]
        ));
    }

    #[test]
    fn melee_towers_strike_without_projectiles() {
        let mut world = running_world();
        let enemy = spawn(&mut world, EnemyKind::Grunt, Opening::Top);
        let _ = place(&mut world, TowerKind::Spike, 11, 2);
        let tower = TowerId::new(0);
        let mut events = Vec::new();
        for _ in 0..2 {
            apply(&mut world, Command::UpgradeTower { tower }, &mut events);
            for _ in 0..181 {
                apply(&mut world, Command::AdvanceTowers, &mut events);
            }
        }
        assert_eq!(query::tower(&world, tower).map(|t| t.level), Some(3));
        for _ in 0..100 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        events.clear();
        apply(
            &mut world,
            Command::FireTower {
                tower,
                targets: vec![enemy],
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::TowerStruck { hits: 1, .. }]
        ));
        assert!(query::projectiles(&world).is_empty());
        let health = query::enemy_view(&world)
            .iter()
            .next()
            .map(|snapshot| snapshot.health);
        assert_eq!(health, Some(24));
        assert_eq!(
            query::tower(&world, tower).map(|t| t.cooldown),
            Some(TowerKind::Spike.fire_interval(3))
        );
    }

    #[test]
    fn projectiles_lose_vanished_targets() {
        let mut world = running_world();
        let enemy = spawn(&mut world, EnemyKind::Grunt, Opening::Top);
        let _ = place(&mut world, TowerKind::Arrow, 11, 1);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::FireTower {
                tower: TowerId::new(0),
                targets: vec![enemy],
            },
            &mut events,
        );
        assert_eq!(query::projectiles(&world).len(), 1);

        let index = world.enemy_index(enemy).expect("enemy");
        let _ = world.enemies[index].take_damage(1_000);
        apply(&mut world, Command::Reconcile, &mut events);
        events.clear();
        apply(&mut world, Command::AdvanceProjectiles, &mut events);
        assert!(matches!(
            events.as_slice(),
            [Event::ProjectileDiscarded { .. }]
        ));
        apply(&mut world, Command::Reconcile, &mut events);
        assert!(query::projectiles(&world).is_empty());
    }

    #[test]
    fn restore_rebuilds_grid_and_towers_paused() {
        let mut world = World::new();
        let _ = place(&mut world, TowerKind::Frost, 6, 6);
        let state = RestoredState {
            currency: 321,
            score: 77,
            base_health: 9,
            wave: 4,
            occupancy: query::grid(&world).to_rows(),
            towers: vec![RestoredTower {
                kind: TowerKind::Frost,
                origin: CellCoord::new(6, 6),
                level: 2,
                invested: 120,
            }],
        };
        let restored = World::restore(SimulationConfig::default(), state).expect("restore");
        assert_eq!(query::phase(&restored), GamePhase::Paused);
        assert_eq!(query::wave(&restored), 4);
        assert_eq!(query::ledger(&restored).currency(), 321);
        assert_eq!(query::live_enemy_count(&restored), 0);
        let tower = query::tower(&restored, TowerId::new(0)).expect("tower");
        assert_eq!(tower.level, 2);
        assert_eq!(tower.invested, 120);
    }

    #[test]
    fn finished_sessions_restore_into_their_final_phase() {
        let state = |base_health, wave| RestoredState {
            currency: 10,
            score: 5,
            base_health,
            wave,
            occupancy: Grid::bordered(20, 15).to_rows(),
            towers: Vec::new(),
        };
        let config = SimulationConfig {
            final_wave: 3,
            ..SimulationConfig::default()
        };
        let phase_of = |state| {
            World::restore(config.clone(), state)
                .map(|world| query::phase(&world))
                .expect("restore")
        };

        assert_eq!(phase_of(state(0, 2)), GamePhase::Lost);
        assert_eq!(phase_of(state(0, 3)), GamePhase::Lost);
        assert_eq!(phase_of(state(4, 3)), GamePhase::Won);
        assert_eq!(phase_of(state(4, 2)), GamePhase::Paused);

        let mut lost = World::restore(config, state(0, 2)).expect("restore");
        let mut events = Vec::new();
        apply(
            &mut lost,
            Command::SetPhase {
                phase: GamePhase::Running,
            },
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(query::phase(&lost), GamePhase::Lost);
    }

    #[test]
    fn restore_rejects_towers_on_open_cells() {
        let state = RestoredState {
            currency: 0,
            score: 0,
            base_health: 1,
            wave: 0,
            occupancy: Grid::bordered(20, 15).to_rows(),
            towers: vec![RestoredTower {
                kind: TowerKind::Arrow,
                origin: CellCoord::new(3, 3),
                level: 1,
                invested: 50,
            }],
        };
        assert!(matches!(
            World::restore(SimulationConfig::default(), state),
            Err(RestoreError::Tower { .. })
        ));
    }

    #[test]
    fn flying_boss_ignores_the_maze() {
        let mut world = running_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnEnemy {
                kind: EnemyKind::Grunt,
                opening: Opening::Top,
                boss: Some(BossTrait::Flying),
            },
            &mut events,
        );
        for _ in 0..200 {
            apply(&mut world, Command::AdvanceEnemies, &mut events);
        }
        let view = query::enemy_view(&world);
        let boss = view.iter().next().expect("boss");
        assert!(boss.flying);
        assert!(boss.boss);
        assert_eq!(boss.max_health, 500);
        let cell = boss.position.cell().expect("boss on grid");
        assert!(query::can_place(&world, TowerKind::Arrow, cell).is_ok());
    }
}
