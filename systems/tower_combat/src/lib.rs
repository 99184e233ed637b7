#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that emits firing commands from targeting data.

use siegeline_core::{Command, GamePhase, TowerId, TowerSnapshot, TowerTarget, TowerView};

/// Tower combat system that queues firing commands for ready towers.
#[derive(Debug, Default)]
pub struct TowerCombat {
    scratch: Vec<Command>,
}

impl TowerCombat {
    /// Creates a new tower combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::FireTower` entries for towers ready to fire.
    ///
    /// Targets naming unknown towers, towers still cooling down or upgrading,
    /// and empty target lists are dropped.
    pub fn handle(
        &mut self,
        phase: GamePhase,
        towers: &TowerView,
        tower_targets: &[TowerTarget],
        out: &mut Vec<Command>,
    ) {
        if !phase.is_advancing() || tower_targets.is_empty() {
            return;
        }

        let snapshots: Vec<&TowerSnapshot> = towers.iter().collect();
        if snapshots.is_empty() {
            return;
        }

        self.scratch.clear();

        for target in tower_targets {
            if target.enemies.is_empty() {
                continue;
            }
            if let Some(snapshot) = find_tower(&snapshots, target.tower) {
                if snapshot.is_ready() {
                    self.scratch.push(Command::FireTower {
                        tower: target.tower,
                        targets: target.enemies.clone(),
                    });
                }
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}

fn find_tower<'a>(snapshots: &[&'a TowerSnapshot], tower: TowerId) -> Option<&'a TowerSnapshot> {
    snapshots
        .binary_search_by_key(&tower, |snapshot| snapshot.id)
        .ok()
        .map(|index| snapshots[index])
}
