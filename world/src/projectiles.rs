//! Homing projectiles fired by ranged towers.

use glam::Vec2;
use siegeline_core::{
    CellPoint, EnemyId, ProjectileId, ProjectilePayload, ProjectileSnapshot, TowerKind,
};

use crate::enemies::{to_point, to_vec};

/// Outcome of a single projectile update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Flight {
    /// The target vanished; the projectile is dropped without effect.
    Lost,
    /// Still travelling toward the target.
    Homing,
    /// Reached the target this tick.
    Arrived,
}

#[derive(Clone, Debug)]
pub(crate) struct Projectile {
    pub(crate) id: ProjectileId,
    pub(crate) kind: TowerKind,
    pub(crate) target: EnemyId,
    pub(crate) damage: u32,
    pub(crate) payload: ProjectilePayload,
    position: Vec2,
    speed: f32,
    spent: bool,
}

impl Projectile {
    pub(crate) fn launch(
        id: ProjectileId,
        kind: TowerKind,
        origin: CellPoint,
        target: EnemyId,
        damage: u32,
        payload: ProjectilePayload,
    ) -> Self {
        Self {
            id,
            kind,
            target,
            damage,
            payload,
            position: to_vec(origin),
            speed: kind.projectile_speed(),
            spent: false,
        }
    }

    pub(crate) const fn is_spent(&self) -> bool {
        self.spent
    }

    /// Steers toward the target's current position, if it is still alive.
    pub(crate) fn steer(&mut self, target: Option<CellPoint>) -> Flight {
        let Some(target) = target.map(to_vec) else {
            self.spent = true;
            return Flight::Lost;
        };
        if self.position.distance(target) <= self.speed {
            self.position = target;
            self.spent = true;
            return Flight::Arrived;
        }
        self.position += (target - self.position).normalize_or_zero() * self.speed;
        Flight::Homing
    }

    pub(crate) fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            kind: self.kind,
            target: self.target,
            position: to_point(self.position),
        }
    }
}
