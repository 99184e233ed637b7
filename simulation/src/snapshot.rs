//! Read-only frame handed to presentation adapters.

use siegeline_core::{
    CellCoord, CellPoint, EnemyId, EnemyKind, EnemySnapshot, GamePhase, ProjectileSnapshot,
    TowerId, TowerKind, TowerSnapshot,
};

/// Enemy as presented to adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyFrame {
    /// Identifier of the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Continuous position.
    pub position: CellPoint,
    /// Remaining health in `0..=1`.
    pub health_fraction: f32,
    /// A slow effect is active.
    pub slowed: bool,
    /// The enemy is stunned.
    pub stunned: bool,
    /// The enemy flies over the grid.
    pub flying: bool,
    /// The enemy is a boss.
    pub boss: bool,
}

impl From<&EnemySnapshot> for EnemyFrame {
    fn from(snapshot: &EnemySnapshot) -> Self {
        Self {
            id: snapshot.id,
            kind: snapshot.kind,
            position: snapshot.position,
            health_fraction: snapshot.health_fraction(),
            slowed: snapshot.slowed,
            stunned: snapshot.stunned,
            flying: snapshot.flying,
            boss: snapshot.boss,
        }
    }
}

/// Tower as presented to adapters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerFrame {
    /// Identifier of the tower.
    pub id: TowerId,
    /// Kind of the tower.
    pub kind: TowerKind,
    /// Upper-left cell of the footprint.
    pub origin: CellCoord,
    /// Level in effect.
    pub level: u8,
    /// Remaining cooldown as a fraction of the fire interval.
    pub cooldown_fraction: f32,
    /// Completion of a pending upgrade in `0..1`.
    pub upgrade_progress: Option<f32>,
}

impl From<&TowerSnapshot> for TowerFrame {
    fn from(snapshot: &TowerSnapshot) -> Self {
        let upgrade_progress = snapshot.upgrade_remaining.map(|remaining| {
            let total = snapshot.kind.upgrade_ticks(snapshot.level + 1).max(1);
            1.0 - remaining as f32 / total as f32
        });
        Self {
            id: snapshot.id,
            kind: snapshot.kind,
            origin: snapshot.region.origin(),
            level: snapshot.level,
            cooldown_fraction: snapshot.cooldown_fraction(),
            upgrade_progress,
        }
    }
}

/// Complete read-only view of a session at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct GameSnapshot {
    /// Live enemies in identifier order.
    pub enemies: Vec<EnemyFrame>,
    /// Towers in identifier order.
    pub towers: Vec<TowerFrame>,
    /// Projectiles in flight.
    pub projectiles: Vec<ProjectileSnapshot>,
    /// Currency held.
    pub currency: u32,
    /// Score accumulated.
    pub score: u64,
    /// Base health remaining.
    pub base_health: u32,
    /// Last announced wave.
    pub wave: u32,
    /// Ticks until the next wave begins, when counting down.
    pub next_wave_in: Option<u32>,
    /// Session phase.
    pub phase: GamePhase,
    /// The base was destroyed.
    pub game_over: bool,
    /// The final wave was cleared.
    pub won: bool,
    /// Ticks elapsed since the session was created.
    pub tick: u64,
}
