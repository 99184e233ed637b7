//! Enemy state machine: status effects, movement, damage and leaks.

use glam::Vec2;
use siegeline_core::{
    apply_armor, CellCoord, CellPoint, CellRect, EnemyId, EnemyKind, EnemyProfile,
    EnemySnapshot, Route,
};

use crate::navigation::Path;

pub(crate) fn to_vec(point: CellPoint) -> Vec2 {
    Vec2::new(point.column(), point.row())
}

pub(crate) fn to_point(vector: Vec2) -> CellPoint {
    CellPoint::new(vector.x, vector.y)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EnemyState {
    Traveling,
    Leaked,
    Killed,
}

#[derive(Clone, Debug)]
enum Movement {
    Ground { path: Path, cursor: usize },
    Flying,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct SlowEffect {
    factor: f32,
    remaining: u32,
}

/// Result of a single enemy update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Held,
    Moved,
    Leaked,
}

#[derive(Clone, Debug)]
pub(crate) struct Enemy {
    id: EnemyId,
    kind: EnemyKind,
    profile: EnemyProfile,
    route: Route,
    position: Vec2,
    speed: f32,
    health: u32,
    movement: Movement,
    slow: Option<SlowEffect>,
    stun: u32,
    state: EnemyState,
    grace: bool,
    boss: bool,
}

impl Enemy {
    pub(crate) fn spawn(
        id: EnemyId,
        kind: EnemyKind,
        profile: EnemyProfile,
        route: Route,
        position: CellPoint,
        path: Path,
        boss: bool,
    ) -> Self {
        let movement = if profile.traits.flying {
            Movement::Flying
        } else {
            Movement::Ground { path, cursor: 0 }
        };
        Self {
            id,
            kind,
            profile,
            route,
            position: to_vec(position),
            speed: profile.speed,
            health: profile.max_health,
            movement,
            slow: None,
            stun: 0,
            state: EnemyState::Traveling,
            grace: false,
            boss,
        }
    }

    /// Skips the enemy's next update, used for children spawned mid-tick.
    pub(crate) fn with_grace(mut self) -> Self {
        self.grace = true;
        self
    }

    pub(crate) const fn id(&self) -> EnemyId {
        self.id
    }

    pub(crate) const fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub(crate) const fn profile(&self) -> &EnemyProfile {
        &self.profile
    }

    pub(crate) const fn route(&self) -> Route {
        self.route
    }

    pub(crate) const fn state(&self) -> EnemyState {
        self.state
    }

    pub(crate) fn position(&self) -> CellPoint {
        to_point(self.position)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state == EnemyState::Traveling
    }

    pub(crate) const fn is_flying(&self) -> bool {
        matches!(self.movement, Movement::Flying)
    }

    pub(crate) fn current_cell(&self) -> Option<CellCoord> {
        self.position().cell()
    }

    /// Reports whether a ground enemy has no route to follow.
    pub(crate) fn is_stranded(&self) -> bool {
        matches!(&self.movement, Movement::Ground { path, .. } if path.is_empty())
    }

    /// Reports whether any not-yet-visited waypoint lies inside the region.
    pub(crate) fn remaining_path_crosses(&self, region: &CellRect) -> bool {
        match &self.movement {
            Movement::Ground { path, cursor } => path
                .cells()
                .iter()
                .skip(*cursor)
                .any(|cell| region.contains(*cell)),
            Movement::Flying => false,
        }
    }

    pub(crate) fn assign_path(&mut self, path: Path) {
        if let Movement::Ground { .. } = self.movement {
            self.movement = Movement::Ground { path, cursor: 0 };
        }
    }

    /// Runs one tick of status decay and movement.
    pub(crate) fn advance(&mut self) -> Step {
        if !self.is_alive() {
            return Step::Held;
        }
        if self.grace {
            self.grace = false;
            return Step::Held;
        }
        if self.stun > 0 {
            self.stun -= 1;
            return Step::Held;
        }
        self.decay_slow();

        let goal = to_vec(self.route.goal.center());
        let speed = self.speed;
        let step = match &mut self.movement {
            Movement::Flying => {
                if self.position.distance(goal) <= speed {
                    self.position = goal;
                    Step::Leaked
                } else {
                    self.position += (goal - self.position).normalize_or_zero() * speed;
                    Step::Moved
                }
            }
            Movement::Ground { path, cursor } => {
                if path.is_empty() {
                    Step::Held
                } else if let Some(waypoint) = path.cells().get(*cursor) {
                    let target = to_vec(waypoint.center());
                    if self.position.distance(target) <= speed {
                        self.position = target;
                        *cursor += 1;
                    } else {
                        self.position += (target - self.position).normalize_or_zero() * speed;
                    }
                    Step::Moved
                } else if self.position.distance(goal) <= speed {
                    Step::Leaked
                } else {
                    Step::Held
                }
            }
        };

        if step == Step::Leaked {
            self.state = EnemyState::Leaked;
        }
        step
    }

    /// Applies armor-adjusted damage and returns the amount dealt.
    pub(crate) fn take_damage(&mut self, raw: u32) -> u32 {
        if !self.is_alive() {
            return 0;
        }
        let dealt = apply_armor(raw, self.profile.armor);
        self.health = self.health.saturating_sub(dealt);
        if self.health == 0 {
            self.state = EnemyState::Killed;
        }
        dealt
    }

    /// Merges a slow with any active one, keeping the strongest factor and longest timer.
    pub(crate) fn apply_slow(&mut self, factor: f32, duration: u32) -> bool {
        if !self.is_alive() || self.profile.traits.slow_immune {
            return false;
        }
        let merged = match self.slow {
            Some(active) => SlowEffect {
                factor: active.factor.max(factor),
                remaining: active.remaining.max(duration),
            },
            None => SlowEffect {
                factor,
                remaining: duration,
            },
        };
        self.slow = Some(merged);
        self.refresh_speed();
        true
    }

    pub(crate) fn apply_stun(&mut self, ticks: u32) {
        if self.is_alive() {
            self.stun = self.stun.max(ticks);
        }
    }

    pub(crate) fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.position(),
            health: self.health,
            max_health: self.profile.max_health,
            armor: self.profile.armor,
            flying: self.is_flying(),
            slowed: self.slow.is_some(),
            stunned: self.stun > 0,
            boss: self.boss,
        }
    }

    fn decay_slow(&mut self) {
        if let Some(slow) = &mut self.slow {
            slow.remaining = slow.remaining.saturating_sub(1);
            if slow.remaining == 0 {
                self.slow = None;
            }
        }
        self.refresh_speed();
    }

    fn refresh_speed(&mut self) {
        self.speed = match self.slow {
            Some(slow) => self.profile.speed * (1.0 - slow.factor),
            None => self.profile.speed,
        };
    }
}
