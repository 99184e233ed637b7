#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Siegeline engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

mod config;
mod stats;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use config::{Difficulty, SimulationConfig};
pub use stats::{
    apply_armor, refund_for, BossTrait, EnemyKind, EnemyProfile, EnemyTraits, FireMode,
    ProjectilePayload, Reward, TargetFilter, TowerKind, MAX_TOWER_LEVEL, SELL_REFUND_PERCENT,
};

/// Lifecycle phase of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamePhase {
    /// The first wave has not been called yet; sales refund in full.
    Setup,
    /// Waves are active and the tick pipeline runs.
    Running,
    /// All tick advancement is frozen without discarding state.
    Paused,
    /// Base health reached zero.
    Lost,
    /// The final wave was cleared.
    Won,
}

impl GamePhase {
    /// Reports whether the tick driver should advance the simulation.
    #[must_use]
    pub const fn is_advancing(self) -> bool {
        matches!(self, Self::Setup | Self::Running)
    }

    /// Reports whether the session reached an end state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Lost | Self::Won)
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Discards all entity state and rebuilds the grid from the configuration.
    Reset {
        /// Configuration used to rebuild the world.
        config: SimulationConfig,
    },
    /// Advances the world's tick counter.
    Tick,
    /// Requests a phase transition such as start, pause or resume.
    SetPhase {
        /// Phase the world should enter.
        phase: GamePhase,
    },
    /// Records that a new wave began.
    AnnounceWave {
        /// One-based index of the wave.
        wave: u32,
    },
    /// Records that the final wave was cleared.
    DeclareVictory,
    /// Requests that an enemy enter the grid at an opening.
    SpawnEnemy {
        /// Kind selecting the enemy's base stats.
        kind: EnemyKind,
        /// Opening whose entry the enemy starts from.
        opening: Opening,
        /// Boss trait applied on top of the base stats, if this is a boss.
        boss: Option<BossTrait>,
    },
    /// Runs the enemy phase: status decay, movement and leaks.
    AdvanceEnemies,
    /// Runs tower timers: upgrade completion and cooldown decay.
    AdvanceTowers,
    /// Requests that a ready tower fire at the provided targets.
    FireTower {
        /// Tower that fires.
        tower: TowerId,
        /// Enemies selected by targeting, nearest first.
        targets: Vec<EnemyId>,
    },
    /// Runs the projectile phase: homing, impact and discard.
    AdvanceProjectiles,
    /// Drains pending deaths and compacts live collections.
    Reconcile,
    /// Requests placement of a tower anchored at the provided origin cell.
    PlaceTower {
        /// Type of tower to construct at the origin.
        kind: TowerKind,
        /// Upper-left cell that defines the tower's footprint.
        origin: CellCoord,
    },
    /// Requests a pre-paid, timed upgrade of an existing tower.
    UpgradeTower {
        /// Identifier of the tower to upgrade.
        tower: TowerId,
    },
    /// Requests that a tower be sold and its footprint reopened.
    SellTower {
        /// Identifier of the tower targeted for sale.
        tower: TowerId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Index of the tick that just began.
        tick: u64,
    },
    /// Announces that the world entered a new phase.
    PhaseChanged {
        /// Phase that became active.
        phase: GamePhase,
    },
    /// Announces the start of a wave.
    WaveStarted {
        /// One-based index of the wave.
        wave: u32,
    },
    /// Confirms that an enemy entered the grid.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Kind of the enemy.
        kind: EnemyKind,
        /// Opening the enemy is traversing.
        opening: Opening,
        /// Indicates whether the enemy is a boss.
        boss: bool,
    },
    /// Reports that an enemy reached its goal and damaged the base.
    EnemyLeaked {
        /// Identifier of the leaked enemy.
        enemy: EnemyId,
        /// Base health lost.
        damage: u32,
        /// Base health remaining after the leak.
        base_health: u32,
    },
    /// Reports a reconciled kill together with the granted reward.
    EnemyKilled {
        /// Identifier of the destroyed enemy.
        enemy: EnemyId,
        /// Kind of the destroyed enemy.
        kind: EnemyKind,
        /// Position at the time of death, for floating feedback.
        position: CellPoint,
        /// Currency granted.
        currency: u32,
        /// Score granted.
        score: u32,
    },
    /// Reports that enemies were given fresh paths after a topology change.
    EnemiesRepathed {
        /// Number of enemies whose path was recomputed.
        count: u32,
    },
    /// Confirms that a tower was placed into the world.
    TowerPlaced {
        /// Identifier assigned to the tower by the world.
        tower: TowerId,
        /// Type of tower that was placed.
        kind: TowerKind,
        /// Region of cells occupied by the tower.
        region: CellRect,
        /// Currency spent on the placement.
        cost: u32,
    },
    /// Reports that a tower placement request was rejected.
    TowerPlacementRejected {
        /// Type of tower requested for placement.
        kind: TowerKind,
        /// Origin cell provided in the placement request.
        origin: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Confirms that a pre-paid upgrade began.
    TowerUpgradeStarted {
        /// Tower being upgraded.
        tower: TowerId,
        /// Level the tower reaches once the upgrade completes.
        target_level: u8,
        /// Currency spent up front.
        cost: u32,
        /// Ticks until the upgrade completes.
        ticks: u32,
    },
    /// Confirms that an upgrade completed and the new level's stats apply.
    TowerUpgraded {
        /// Tower that finished upgrading.
        tower: TowerId,
        /// Level now in effect.
        level: u8,
    },
    /// Reports that an upgrade request was rejected.
    TowerUpgradeRejected {
        /// Tower targeted by the request.
        tower: TowerId,
        /// Specific reason the upgrade failed.
        reason: UpgradeError,
    },
    /// Confirms that a tower was sold.
    TowerSold {
        /// Identifier of the sold tower.
        tower: TowerId,
        /// Region of cells previously occupied by the tower.
        region: CellRect,
        /// Currency refunded.
        refund: u32,
    },
    /// Reports that a sale request was rejected.
    TowerSaleRejected {
        /// Tower targeted by the request.
        tower: TowerId,
        /// Specific reason the sale failed.
        reason: SellError,
    },
    /// Reports that a melee tower struck every target in range.
    TowerStruck {
        /// Tower that attacked.
        tower: TowerId,
        /// Number of enemies hit.
        hits: u32,
        /// Number of enemies stunned by the strike.
        stunned: u32,
    },
    /// Confirms that a projectile left a tower.
    ProjectileLaunched {
        /// Identifier assigned to the projectile.
        projectile: ProjectileId,
        /// Tower that fired.
        tower: TowerId,
        /// Enemy captured as the projectile's target.
        target: EnemyId,
    },
    /// Reports a projectile impact.
    ProjectileImpacted {
        /// Projectile that arrived.
        projectile: ProjectileId,
        /// Enemy struck by the primary damage.
        target: EnemyId,
        /// Number of additional enemies struck by splash damage.
        splashed: u32,
    },
    /// Reports that a projectile was discarded because its target vanished.
    ProjectileDiscarded {
        /// Projectile that was discarded.
        projectile: ProjectileId,
    },
    /// Announces that base health reached zero.
    GameOver {
        /// Wave during which the base fell.
        wave: u32,
    },
    /// Announces that the final wave was cleared.
    Victory {
        /// Wave that completed the session.
        wave: u32,
    },
}

/// Cardinal directions on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Column and row deltas of a single step in this direction.
    #[must_use]
    pub const fn offset(self) -> (i64, i64) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// One of the two fixed traversal routes across the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opening {
    /// Entry centred on the top edge, goal centred on the bottom edge.
    Top,
    /// Entry centred on the left edge, goal centred on the right edge.
    Left,
}

impl Opening {
    /// Both openings in their canonical order.
    pub const ALL: [Opening; 2] = [Opening::Top, Opening::Left];

    /// Resolves the entry and goal cells for a grid of the provided size.
    #[must_use]
    pub const fn route(self, columns: u32, rows: u32) -> Route {
        let (entry, goal) = match self {
            Self::Top => (
                CellCoord::new(columns / 2, 0),
                CellCoord::new(columns / 2, rows.saturating_sub(1)),
            ),
            Self::Left => (
                CellCoord::new(0, rows / 2),
                CellCoord::new(columns.saturating_sub(1), rows / 2),
            ),
        };
        Route {
            opening: self,
            entry,
            goal,
        }
    }
}

impl fmt::Display for Opening {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Left => write!(f, "left"),
        }
    }
}

/// Entry and goal cells paired by an [`Opening`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    /// Opening that names the route.
    pub opening: Opening,
    /// Cell where enemies enter.
    pub entry: CellCoord,
    /// Cell enemies attempt to reach.
    pub goal: CellCoord,
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TowerId(u32);

impl TowerId {
    /// Creates a new tower identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the tower identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a projectile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(u32);

impl ProjectileId {
    /// Creates a new projectile identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Continuous point at the centre of the cell.
    #[must_use]
    pub fn center(self) -> CellPoint {
        CellPoint::new(self.column as f32 + 0.5, self.row as f32 + 0.5)
    }

    /// Neighbouring cell in the provided direction, if it lies within the bounds.
    #[must_use]
    pub fn step(self, direction: Direction, columns: u32, rows: u32) -> Option<CellCoord> {
        let (dx, dy) = direction.offset();
        let column = i64::from(self.column) + dx;
        let row = i64::from(self.row) + dy;
        if column < 0 || row < 0 || column >= i64::from(columns) || row >= i64::from(rows) {
            return None;
        }
        Some(CellCoord::new(
            u32::try_from(column).ok()?,
            u32::try_from(row).ok()?,
        ))
    }
}

/// Continuous position measured in cell units.
///
/// The centre of cell `(c, r)` is `(c + 0.5, r + 0.5)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CellPoint {
    column: f32,
    row: f32,
}

impl CellPoint {
    /// Creates a new point from fractional column and row coordinates.
    #[must_use]
    pub const fn new(column: f32, row: f32) -> Self {
        Self { column, row }
    }

    /// Fractional column coordinate.
    #[must_use]
    pub const fn column(&self) -> f32 {
        self.column
    }

    /// Fractional row coordinate.
    #[must_use]
    pub const fn row(&self) -> f32 {
        self.row
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: CellPoint) -> f32 {
        let dx = other.column - self.column;
        let dy = other.row - self.row;
        (dx * dx + dy * dy).sqrt()
    }

    /// Cell containing the point, or `None` when it lies left of or above the grid.
    #[must_use]
    pub fn cell(self) -> Option<CellCoord> {
        if self.column < 0.0 || self.row < 0.0 {
            return None;
        }
        Some(CellCoord::new(self.column as u32, self.row as u32))
    }
}

/// Axis-aligned rectangle expressed in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRect {
    origin: CellCoord,
    size: CellRectSize,
}

impl CellRect {
    /// Constructs a rectangle from an origin cell and size.
    #[must_use]
    pub const fn from_origin_and_size(origin: CellCoord, size: CellRectSize) -> Self {
        Self { origin, size }
    }

    /// Upper-left cell that anchors the rectangle.
    #[must_use]
    pub const fn origin(&self) -> CellCoord {
        self.origin
    }

    /// Dimensions of the rectangle measured in whole cells.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        self.size
    }

    /// Reports whether the rectangle covers the provided cell.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let column = cell.column();
        let row = cell.row();
        column >= self.origin.column()
            && row >= self.origin.row()
            && u64::from(column) < u64::from(self.origin.column()) + u64::from(self.size.width())
            && u64::from(row) < u64::from(self.origin.row()) + u64::from(self.size.height())
    }

    /// Iterates every covered cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let origin = self.origin;
        let size = self.size;
        (0..size.height()).flat_map(move |dy| {
            (0..size.width())
                .map(move |dx| CellCoord::new(origin.column() + dx, origin.row() + dy))
        })
    }

    /// Continuous centre of the rectangle.
    #[must_use]
    pub fn center(&self) -> CellPoint {
        CellPoint::new(
            self.origin.column() as f32 + self.size.width() as f32 / 2.0,
            self.origin.row() as f32 + self.size.height() as f32 / 2.0,
        )
    }
}

/// Size of a [`CellRect`] measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRectSize {
    width: u32,
    height: u32,
}

impl CellRectSize {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width of the rectangle in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height of the rectangle in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }
}

/// Reasons a tower placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum PlacementError {
    /// The session has ended, so placement is disabled.
    #[error("placement is disabled once the session has ended")]
    InvalidPhase,
    /// The requested region extends beyond the buildable interior.
    #[error("footprint extends beyond the buildable interior")]
    OutOfBounds,
    /// The ledger cannot cover the tower's cost.
    #[error("insufficient funds: {needed} needed, {available} available")]
    InsufficientFunds {
        /// Cost of the tower.
        needed: u32,
        /// Currency currently held.
        available: u32,
    },
    /// The requested footprint overlaps a blocked cell.
    #[error("footprint overlaps a blocked cell")]
    Occupied,
    /// A ground enemy currently stands inside the footprint.
    #[error("an enemy is standing inside the footprint")]
    EnemyInFootprint,
    /// The footprint would disconnect an opening from its goal.
    #[error("placement would seal the {0} route")]
    BlocksRoute(Opening),
}

/// Reasons an upgrade request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum UpgradeError {
    /// The session has ended, so upgrades are disabled.
    #[error("upgrades are disabled once the session has ended")]
    InvalidPhase,
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
    /// The tower already has an upgrade in progress.
    #[error("an upgrade is already in progress")]
    AlreadyUpgrading,
    /// The tower is at its maximum level.
    #[error("tower is already at the maximum level")]
    MaxLevel,
    /// The ledger cannot cover the upgrade cost.
    #[error("insufficient funds: {needed} needed, {available} available")]
    InsufficientFunds {
        /// Cost of the upgrade.
        needed: u32,
        /// Currency currently held.
        available: u32,
    },
}

/// Reasons a sale request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum SellError {
    /// The session has ended, so sales are disabled.
    #[error("sales are disabled once the session has ended")]
    InvalidPhase,
    /// No tower with the provided identifier exists.
    #[error("no such tower")]
    MissingTower,
}

/// Immutable representation of a single live enemy used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Unique identifier assigned to the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Current continuous position.
    pub position: CellPoint,
    /// Remaining health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Flat damage reduction applied to every hit.
    pub armor: u32,
    /// Indicates whether the enemy flies over the grid.
    pub flying: bool,
    /// Indicates whether a slow effect is active.
    pub slowed: bool,
    /// Indicates whether the enemy is stunned.
    pub stunned: bool,
    /// Indicates whether the enemy is a boss.
    pub boss: bool,
}

impl EnemySnapshot {
    /// Remaining health as a fraction of maximum health.
    #[must_use]
    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }
}

/// Read-only snapshot describing all live enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured enemy snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single tower's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier allocated to the tower by the world.
    pub id: TowerId,
    /// Kind of tower that was constructed.
    pub kind: TowerKind,
    /// Region of cells occupied by the tower.
    pub region: CellRect,
    /// Level currently in effect.
    pub level: u8,
    /// Ticks remaining before the tower may fire again.
    pub cooldown: u32,
    /// Fire interval at the current level.
    pub fire_interval: u32,
    /// Ticks remaining on an in-progress upgrade.
    pub upgrade_remaining: Option<u32>,
    /// Total currency invested, which determines the sale refund.
    pub invested: u32,
}

impl TowerSnapshot {
    /// Reports whether the tower may fire this tick.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.cooldown == 0 && self.upgrade_remaining.is_none()
    }

    /// Remaining cooldown as a fraction of the fire interval.
    #[must_use]
    pub fn cooldown_fraction(&self) -> f32 {
        if self.fire_interval == 0 {
            return 0.0;
        }
        self.cooldown as f32 / self.fire_interval as f32
    }
}

/// Read-only snapshot describing all towers placed on the grid.
#[derive(Clone, Debug, Default)]
pub struct TowerView {
    snapshots: Vec<TowerSnapshot>,
}

impl TowerView {
    /// Creates a new tower view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TowerSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tower snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &TowerSnapshot> {
        self.snapshots.iter()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TowerSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier allocated to the projectile.
    pub id: ProjectileId,
    /// Kind of tower that fired the projectile.
    pub kind: TowerKind,
    /// Enemy captured as the target.
    pub target: EnemyId,
    /// Current continuous position.
    pub position: CellPoint,
}

/// Targets selected for a single tower during one tower phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TowerTarget {
    /// Tower that will fire.
    pub tower: TowerId,
    /// Selected enemies, nearest first.
    pub enemies: Vec<EnemyId>,
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, CellPoint, CellRect, CellRectSize, Direction, Opening, PlacementError,
        SellError, TowerId, TowerKind, UpgradeError,
    };
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn identifiers_and_kinds_round_trip_through_bincode() {
        assert_round_trip(&TowerId::new(42));
        assert_round_trip(&TowerKind::Cannon);
        assert_round_trip(&Opening::Left);
    }

    #[test]
    fn rejection_reasons_round_trip_through_bincode() {
        assert_round_trip(&PlacementError::BlocksRoute(Opening::Top));
        assert_round_trip(&PlacementError::InsufficientFunds {
            needed: 50,
            available: 10,
        });
        assert_round_trip(&UpgradeError::MaxLevel);
        assert_round_trip(&SellError::MissingTower);
    }

    #[test]
    fn cell_rect_round_trips_through_bincode() {
        let origin = CellCoord::new(5, 7);
        let size = CellRectSize::new(2, 3);
        let rect = CellRect::from_origin_and_size(origin, size);
        assert_round_trip(&rect);
    }

    #[test]
    fn cell_rect_enumerates_and_contains_cells() {
        let rect = CellRect::from_origin_and_size(CellCoord::new(3, 4), CellRectSize::new(2, 2));
        let cells: Vec<_> = rect.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(3, 4),
                CellCoord::new(4, 4),
                CellCoord::new(3, 5),
                CellCoord::new(4, 5),
            ]
        );
        assert!(rect.contains(CellCoord::new(4, 5)));
        assert!(!rect.contains(CellCoord::new(5, 5)));
        assert_eq!(rect.center(), CellPoint::new(4.0, 5.0));
    }

    #[test]
    fn routes_follow_grid_centre_lines() {
        let top = Opening::Top.route(20, 15);
        assert_eq!(top.entry, CellCoord::new(10, 0));
        assert_eq!(top.goal, CellCoord::new(10, 14));

        let left = Opening::Left.route(20, 15);
        assert_eq!(left.entry, CellCoord::new(0, 7));
        assert_eq!(left.goal, CellCoord::new(19, 7));
    }

    #[test]
    fn step_stays_within_bounds() {
        let corner = CellCoord::new(0, 0);
        assert_eq!(corner.step(Direction::North, 4, 4), None);
        assert_eq!(corner.step(Direction::West, 4, 4), None);
        assert_eq!(
            corner.step(Direction::East, 4, 4),
            Some(CellCoord::new(1, 0))
        );
        assert_eq!(CellCoord::new(3, 3).step(Direction::South, 4, 4), None);
    }

    #[test]
    fn point_maps_back_to_its_cell() {
        assert_eq!(
            CellCoord::new(6, 2).center().cell(),
            Some(CellCoord::new(6, 2))
        );
        assert_eq!(CellPoint::new(-0.2, 1.0).cell(), None);
    }

    #[test]
    fn placement_error_messages_name_the_route() {
        let message = PlacementError::BlocksRoute(Opening::Top).to_string();
        assert_eq!(message, "placement would seal the top route");
    }
}
