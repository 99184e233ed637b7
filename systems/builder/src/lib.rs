#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system responsible for turning player input into placement, upgrade and sale commands.

use siegeline_core::{
    CellCoord, CellRect, Command, GamePhase, PlacementError, TowerId, TowerKind,
};

/// Declarative placement preview describing a potential tower construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacementPreview {
    /// Kind of tower proposed for placement.
    pub kind: TowerKind,
    /// Origin cell anchoring the proposed tower footprint.
    pub origin: CellCoord,
    /// Region of cells that would be occupied by the tower if placed.
    pub region: CellRect,
    /// Reason the placement would be refused, if any.
    pub rejection: Option<PlacementError>,
}

impl PlacementPreview {
    /// Creates a preview from the outcome of a legality check.
    ///
    /// Refused previews still cover the footprint anchored at `origin` so
    /// adapters can highlight it.
    #[must_use]
    pub fn from_check(
        kind: TowerKind,
        origin: CellCoord,
        check: Result<CellRect, PlacementError>,
    ) -> Self {
        match check {
            Ok(region) => Self {
                kind,
                origin,
                region,
                rejection: None,
            },
            Err(reason) => Self {
                kind,
                origin,
                region: CellRect::from_origin_and_size(origin, kind.footprint()),
                rejection: Some(reason),
            },
        }
    }

    /// Reports whether the preview represents a valid placement location.
    #[must_use]
    pub const fn placeable(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderInput {
    /// The player confirmed a placement on this frame.
    pub confirm_action: bool,
    /// The player requested an upgrade of the hovered tower.
    pub upgrade_action: bool,
    /// The player requested the sale of the hovered tower.
    pub sell_action: bool,
    /// Cell currently hovered by the cursor.
    pub cursor_cell: Option<CellCoord>,
}

/// Builder system that translates preview + input into tower commands.
#[derive(Debug, Clone, Default)]
pub struct Builder;

impl Builder {
    /// Creates a new builder system instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Consumes the current phase and adapter-derived input to emit builder commands.
    ///
    /// The `tower_at` closure should mirror the semantics of the world's
    /// `query::tower_at` helper so the system can identify the hovered tower.
    /// Nothing is emitted once the session has ended.
    pub fn handle<F>(
        &mut self,
        phase: GamePhase,
        preview: Option<PlacementPreview>,
        input: BuilderInput,
        mut tower_at: F,
        out: &mut Vec<Command>,
    ) where
        F: FnMut(CellCoord) -> Option<TowerId>,
    {
        if phase.is_terminal() {
            return;
        }

        if input.confirm_action {
            if let Some(preview) = preview.filter(PlacementPreview::placeable) {
                out.push(Command::PlaceTower {
                    kind: preview.kind,
                    origin: preview.origin,
                });
            }
        }

        if !(input.upgrade_action || input.sell_action) {
            return;
        }

        let Some(tower) = input.cursor_cell.and_then(&mut tower_at) else {
            return;
        };
        if input.upgrade_action {
            out.push(Command::UpgradeTower { tower });
        }
        if input.sell_action {
            out.push(Command::SellTower { tower });
        }
    }
}
