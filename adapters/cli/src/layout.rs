//! Scripted tower layouts read from TOML.

use serde::Deserialize;
use siegeline_core::{CellCoord, Event, PlacementError, TowerKind, UpgradeError};
use siegeline_simulation::Simulation;
use siegeline_system_builder::BuilderInput;

/// Towers to build before the session starts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Layout {
    /// Entries applied in file order.
    #[serde(default)]
    pub towers: Vec<LayoutTower>,
}

/// One scripted tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub(crate) struct LayoutTower {
    /// Kind to build.
    pub kind: TowerKind,
    /// Column of the footprint's upper-left cell.
    pub column: u32,
    /// Row of the footprint's upper-left cell.
    pub row: u32,
    /// Upgrades to purchase right after placement.
    #[serde(default)]
    pub upgrades: u8,
}

impl LayoutTower {
    fn origin(&self) -> CellCoord {
        CellCoord::new(self.column, self.row)
    }
}

/// Outcome of applying a layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct LayoutReport {
    /// Towers built.
    pub placed: usize,
    /// Upgrades started.
    pub upgrades: usize,
    /// Entries the world refused to build.
    pub rejected: Vec<(LayoutTower, PlacementError)>,
    /// Upgrades the world refused.
    pub refused_upgrades: Vec<(LayoutTower, UpgradeError)>,
}

impl Layout {
    pub(crate) fn parse(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Feeds every entry through the builder as if a player clicked it.
    pub(crate) fn apply(&self, simulation: &mut Simulation) -> LayoutReport {
        let mut report = LayoutReport::default();
        for entry in &self.towers {
            if let Some(reason) = simulation.preview(entry.kind, entry.origin()).rejection {
                report.rejected.push((*entry, reason));
                continue;
            }
            let cursor_cell = Some(entry.origin());
            let events = simulation.handle_input(
                entry.kind,
                BuilderInput {
                    confirm_action: true,
                    cursor_cell,
                    ..BuilderInput::default()
                },
            );
            if let Some(reason) = events.iter().find_map(|event| match event {
                Event::TowerPlacementRejected { reason, .. } => Some(*reason),
                _ => None,
            }) {
                report.rejected.push((*entry, reason));
                continue;
            }
            report.placed += 1;

            for _ in 0..entry.upgrades {
                let events = simulation.handle_input(
                    entry.kind,
                    BuilderInput {
                        upgrade_action: true,
                        cursor_cell,
                        ..BuilderInput::default()
                    },
                );
                let refusal = events.iter().find_map(|event| match event {
                    Event::TowerUpgradeRejected { reason, .. } => Some(*reason),
                    _ => None,
                });
                match refusal {
                    Some(reason) => {
                        report.refused_upgrades.push((*entry, reason));
                        break;
                    }
                    None => report.upgrades += 1,
                }
            }
        }
        report
    }
}
