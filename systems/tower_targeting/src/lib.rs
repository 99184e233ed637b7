#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that computes deterministic tower targets from world snapshots.

use siegeline_core::{
    CellPoint, EnemyId, EnemyView, FireMode, GamePhase, TowerId, TowerTarget, TowerView,
};

/// Tower targeting system that reuses scratch buffers to avoid repeated allocations.
#[derive(Debug, Default)]
pub struct TowerTargeting {
    tower_workspace: Vec<TowerWorkspace>,
    enemy_workspace: Vec<EnemyCandidate>,
    candidates: Vec<RankedCandidate>,
}

impl TowerTargeting {
    /// Creates a new tower targeting system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes targets for every ready tower in the provided snapshot.
    ///
    /// The output buffer is cleared before populating it with the latest
    /// assignments. Towers with nothing in range are omitted.
    pub fn handle(
        &mut self,
        phase: GamePhase,
        towers: &TowerView,
        enemies: &EnemyView,
        out: &mut Vec<TowerTarget>,
    ) {
        out.clear();

        if !phase.is_advancing() || enemies.is_empty() {
            return;
        }

        self.prepare_tower_workspace(towers);
        if self.tower_workspace.is_empty() {
            return;
        }
        self.prepare_enemy_workspace(enemies);

        for tower in &self.tower_workspace {
            let max_distance_sq = tower.range * tower.range;
            self.candidates.clear();

            for candidate in &self.enemy_workspace {
                if !tower.admits_flying(candidate.flying) {
                    continue;
                }
                let distance_sq = distance_sq(tower.center, candidate.position);
                if distance_sq > max_distance_sq {
                    continue;
                }
                self.candidates.push(RankedCandidate {
                    distance_sq,
                    enemy: candidate.id,
                });
            }

            if self.candidates.is_empty() {
                continue;
            }

            self.candidates.sort_by(RankedCandidate::ordering);
            let limit = tower.limit.min(self.candidates.len());
            out.push(TowerTarget {
                tower: tower.id,
                enemies: self.candidates[..limit]
                    .iter()
                    .map(|candidate| candidate.enemy)
                    .collect(),
            });
        }
    }

    fn prepare_tower_workspace(&mut self, towers: &TowerView) {
        self.tower_workspace.clear();
        for snapshot in towers.iter().filter(|snapshot| snapshot.is_ready()) {
            let kind = snapshot.kind;
            let limit = match kind.fire_mode(snapshot.level) {
                FireMode::Multi { max_targets } => max_targets,
                FireMode::Melee { .. } => usize::MAX,
                FireMode::Single | FireMode::Splash { .. } | FireMode::Slow { .. } => 1,
            };
            self.tower_workspace.push(TowerWorkspace {
                id: snapshot.id,
                center: snapshot.region.center(),
                range: kind.range(snapshot.level),
                filter: kind.target_filter(),
                limit,
            });
        }
    }

    fn prepare_enemy_workspace(&mut self, enemies: &EnemyView) {
        self.enemy_workspace.clear();
        self.enemy_workspace.reserve(enemies.len());
        for snapshot in enemies.iter() {
            self.enemy_workspace.push(EnemyCandidate {
                id: snapshot.id,
                position: snapshot.position,
                flying: snapshot.flying,
            });
        }
    }
}

fn distance_sq(from: CellPoint, to: CellPoint) -> f32 {
    let dx = to.column() - from.column();
    let dy = to.row() - from.row();
    dx * dx + dy * dy
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct TowerWorkspace {
    id: TowerId,
    center: CellPoint,
    range: f32,
    filter: siegeline_core::TargetFilter,
    limit: usize,
}

impl TowerWorkspace {
    fn admits_flying(&self, flying: bool) -> bool {
        self.filter.admits(flying)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct EnemyCandidate {
    id: EnemyId,
    position: CellPoint,
    flying: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct RankedCandidate {
    distance_sq: f32,
    enemy: EnemyId,
}

impl RankedCandidate {
    fn ordering(&self, other: &Self) -> std::cmp::Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.enemy.cmp(&other.enemy))
    }
}

#[cfg(test)]
mod tests {
    use super::{TowerTarget, TowerTargeting};
    use siegeline_core::{
        CellCoord, CellPoint, CellRect, CellRectSize, EnemyId, EnemyKind, EnemySnapshot,
        EnemyView, GamePhase, TowerId, TowerKind, TowerSnapshot, TowerView,
    };

    fn tower(id: u32, kind: TowerKind, origin: (u32, u32)) -> TowerSnapshot {
        TowerSnapshot {
            id: TowerId::new(id),
            kind,
            region: CellRect::from_origin_and_size(
                CellCoord::new(origin.0, origin.1),
                CellRectSize::new(2, 2),
            ),
            level: 1,
            cooldown: 0,
            fire_interval: kind.fire_interval(1),
            upgrade_remaining: None,
            invested: kind.cost(),
        }
    }

    fn enemy(id: u32, position: (f32, f32), flying: bool) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            kind: EnemyKind::Grunt,
            position: CellPoint::new(position.0, position.1),
            health: 50,
            max_health: 50,
            armor: 0,
            flying,
            slowed: false,
            stunned: false,
            boss: false,
        }
    }

    fn run(towers: Vec<TowerSnapshot>, enemies: Vec<EnemySnapshot>) -> Vec<TowerTarget> {
        let mut system = TowerTargeting::new();
        let mut out = Vec::new();
        system.handle(
            GamePhase::Running,
            &TowerView::from_snapshots(towers),
            &EnemyView::from_snapshots(enemies),
            &mut out,
        );
        out
    }

    #[test]
    fn single_target_picks_the_nearest() {
        let out = run(
            vec![tower(1, TowerKind::Arrow, (4, 4))],
            vec![enemy(2, (7.0, 5.0), false), enemy(3, (5.0, 6.0), false)],
        );
        assert_eq!(
            out,
            vec![TowerTarget {
                tower: TowerId::new(1),
                enemies: vec![EnemyId::new(3)],
            }]
        );
    }

    #[test]
    fn smaller_enemy_id_breaks_distance_ties() {
        let out = run(
            vec![tower(1, TowerKind::Arrow, (2, 2))],
            vec![enemy(20, (4.0, 3.0), false), enemy(10, (2.0, 3.0), false)],
        );
        assert_eq!(out[0].enemies, vec![EnemyId::new(10)]);
    }

    #[test]
    fn enemies_outside_range_are_ignored() {
        let out = run(
            vec![tower(1, TowerKind::Arrow, (0, 0))],
            vec![enemy(2, (15.0, 15.0), false)],
        );
        assert!(out.is_empty());
    }

    #[test]
    fn volley_takes_up_to_three_nearest() {
        let out = run(
            vec![tower(1, TowerKind::Volley, (4, 4))],
            vec![
                enemy(1, (5.0, 7.0), false),
                enemy(2, (5.0, 5.5), false),
                enemy(3, (6.0, 5.0), false),
                enemy(4, (5.0, 6.0), false),
            ],
        );
        assert_eq!(
            out[0].enemies,
            vec![EnemyId::new(2), EnemyId::new(3), EnemyId::new(4)]
        );
    }

    #[test]
    fn melee_takes_everything_in_range() {
        let out = run(
            vec![tower(1, TowerKind::Spike, (4, 4))],
            vec![
                enemy(1, (5.0, 6.0), false),
                enemy(2, (6.0, 5.0), false),
                enemy(3, (9.0, 9.0), false),
            ],
        );
        assert_eq!(out[0].enemies, vec![EnemyId::new(1), EnemyId::new(2)]);
    }

    #[test]
    fn filters_respect_flying() {
        let enemies = vec![enemy(1, (5.0, 6.0), true), enemy(2, (6.0, 6.0), false)];
        let cannon = run(vec![tower(1, TowerKind::Cannon, (4, 4))], enemies.clone());
        assert_eq!(cannon[0].enemies, vec![EnemyId::new(2)]);
        let flak = run(vec![tower(1, TowerKind::Flak, (4, 4))], enemies);
        assert_eq!(flak[0].enemies, vec![EnemyId::new(1)]);
    }

    #[test]
    fn cooling_and_upgrading_towers_are_skipped() {
        let mut cooling = tower(1, TowerKind::Arrow, (4, 4));
        cooling.cooldown = 3;
        let mut upgrading = tower(2, TowerKind::Arrow, (4, 4));
        upgrading.upgrade_remaining = Some(10);
        let out = run(vec![cooling, upgrading], vec![enemy(1, (5.0, 5.0), false)]);
        assert!(out.is_empty());
    }

    #[test]
    fn paused_or_finished_sessions_clear_output() {
        let mut system = TowerTargeting::new();
        let towers = TowerView::from_snapshots(vec![tower(1, TowerKind::Arrow, (0, 0))]);
        let enemies = EnemyView::from_snapshots(vec![enemy(1, (1.0, 1.0), false)]);
        let mut out = vec![TowerTarget {
            tower: TowerId::new(99),
            enemies: vec![EnemyId::new(99)],
        }];
        for phase in [GamePhase::Paused, GamePhase::Lost, GamePhase::Won] {
            system.handle(phase, &towers, &enemies, &mut out);
            assert!(out.is_empty());
        }
    }
}
