//! Authoritative tower state management utilities.

use std::collections::BTreeMap;

use siegeline_core::{CellCoord, CellPoint, CellRect, TowerId, TowerKind, TowerSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingUpgrade {
    target_level: u8,
    remaining: u32,
}

/// Tower stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct TowerState {
    /// Identifier allocated by the world for the tower.
    pub(crate) id: TowerId,
    /// Kind of tower that was constructed.
    pub(crate) kind: TowerKind,
    /// Region of cells occupied by the tower.
    pub(crate) region: CellRect,
    /// Level whose stats are in effect.
    pub(crate) level: u8,
    /// Ticks until the tower may fire again.
    pub(crate) cooldown: u32,
    /// Currency spent on construction and upgrades.
    pub(crate) invested: u32,
    upgrade: Option<PendingUpgrade>,
}

impl TowerState {
    pub(crate) fn center(&self) -> CellPoint {
        self.region.center()
    }

    /// Ready once the cooldown elapsed and no upgrade is pending.
    pub(crate) const fn is_ready(&self) -> bool {
        self.cooldown == 0 && self.upgrade.is_none()
    }

    pub(crate) const fn is_upgrading(&self) -> bool {
        self.upgrade.is_some()
    }

    pub(crate) fn begin_upgrade(&mut self, cost: u32) -> (u8, u32) {
        let target_level = self.level + 1;
        let ticks = self.kind.upgrade_ticks(target_level);
        self.invested = self.invested.saturating_add(cost);
        self.upgrade = Some(PendingUpgrade {
            target_level,
            remaining: ticks,
        });
        (target_level, ticks)
    }

    /// Counts down a pending upgrade, or the cooldown when idle, returning the new level on completion.
    ///
    /// A tower never fires on the tick its upgrade completes.
    pub(crate) fn advance_timers(&mut self) -> Option<u8> {
        let Some(pending) = self.upgrade.as_mut() else {
            self.cooldown = self.cooldown.saturating_sub(1);
            return None;
        };
        pending.remaining = pending.remaining.saturating_sub(1);
        if pending.remaining > 0 {
            return None;
        }
        self.level = pending.target_level;
        self.upgrade = None;
        self.cooldown = self.cooldown.max(1);
        Some(self.level)
    }

    pub(crate) fn snapshot(&self) -> TowerSnapshot {
        TowerSnapshot {
            id: self.id,
            kind: self.kind,
            region: self.region,
            level: self.level,
            cooldown: self.cooldown,
            fire_interval: self.kind.fire_interval(self.level),
            upgrade_remaining: self.upgrade.map(|pending| pending.remaining),
            invested: self.invested,
        }
    }
}

/// Registry that stores towers and manages identifier allocation.
#[derive(Clone, Debug)]
pub(crate) struct TowerRegistry {
    entries: BTreeMap<TowerId, TowerState>,
    next_tower_id: TowerId,
}

impl TowerRegistry {
    /// Creates an empty tower registry with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_tower_id: TowerId::new(0),
        }
    }

    /// Registers a freshly built tower at level one.
    pub(crate) fn insert(
        &mut self,
        kind: TowerKind,
        region: CellRect,
        level: u8,
        invested: u32,
    ) -> TowerId {
        let id = self.next_tower_id;
        self.next_tower_id = TowerId::new(id.get().saturating_add(1));
        let state = TowerState {
            id,
            kind,
            region,
            level,
            cooldown: 0,
            invested,
            upgrade: None,
        };
        let _ = self.entries.insert(id, state);
        id
    }

    pub(crate) fn get(&self, id: TowerId) -> Option<&TowerState> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TowerId) -> Option<&mut TowerState> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: TowerId) -> Option<TowerState> {
        self.entries.remove(&id)
    }

    /// Towers in ascending identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &TowerState> {
        self.entries.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TowerState> {
        self.entries.values_mut()
    }

    pub(crate) fn tower_at(&self, cell: CellCoord) -> Option<TowerId> {
        self.entries
            .values()
            .find(|tower| tower.region.contains(cell))
            .map(|tower| tower.id)
    }
}

/// Region a tower of the provided kind would occupy when anchored at `origin`.
pub(crate) fn footprint_for(kind: TowerKind, origin: CellCoord) -> CellRect {
    CellRect::from_origin_and_size(origin, kind.footprint())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_footprint_is_two_by_two() {
        for kind in TowerKind::ALL {
            let region = footprint_for(kind, CellCoord::new(3, 4));
            assert_eq!(region.size().width(), 2);
            assert_eq!(region.size().height(), 2);
            assert_eq!(region.origin(), CellCoord::new(3, 4));
        }
    }

    #[test]
    fn identifiers_increase_monotonically() {
        let mut registry = TowerRegistry::new();
        let region = footprint_for(TowerKind::Arrow, CellCoord::new(1, 1));
        let first = registry.insert(TowerKind::Arrow, region, 1, 50);
        let second = registry.insert(TowerKind::Frost, region, 1, 70);
        assert_eq!(first, TowerId::new(0));
        assert_eq!(second, TowerId::new(1));
        let _ = registry.remove(first);
        let third = registry.insert(TowerKind::Cannon, region, 1, 100);
        assert_eq!(third, TowerId::new(2));
    }

    #[test]
    fn tower_lookup_by_cell_covers_the_footprint() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(
            TowerKind::Spike,
            footprint_for(TowerKind::Spike, CellCoord::new(4, 4)),
            1,
            90,
        );
        assert_eq!(registry.tower_at(CellCoord::new(5, 5)), Some(id));
        assert_eq!(registry.tower_at(CellCoord::new(6, 5)), None);
    }

    #[test]
    fn upgrade_blocks_firing_until_complete() {
        let mut registry = TowerRegistry::new();
        let id = registry.insert(
            TowerKind::Arrow,
            footprint_for(TowerKind::Arrow, CellCoord::new(2, 2)),
            1,
            50,
        );
        let tower = registry.get_mut(id).expect("tower");
        let (target, ticks) = tower.begin_upgrade(50);
        assert_eq!((target, ticks), (2, 120));
        assert_eq!(tower.invested, 100);
        assert!(!tower.is_ready());

        for _ in 0..119 {
            assert_eq!(tower.advance_timers(), None);
        }
        assert_eq!(tower.level, 1);
        assert_eq!(tower.advance_timers(), Some(2));
        assert_eq!(tower.level, 2);
        assert!(!tower.is_ready());
        assert_eq!(tower.advance_timers(), None);
        assert!(tower.is_ready());
        assert_eq!(tower.snapshot().fire_interval, TowerKind::Arrow.fire_interval(2));
    }
}
