//! Dense occupancy grid with a topology version counter.

use siegeline_core::{CellCoord, CellRect, Opening};

/// Occupancy state of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Traversable and buildable.
    Open,
    /// Wall or tower footprint.
    Blocked,
}

/// Row-major matrix of open and blocked cells.
///
/// Every mutation that changes at least one cell bumps [`Grid::version`], which
/// invalidates cached paths computed against the previous layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    columns: u32,
    rows: u32,
    cells: Vec<CellState>,
    version: u64,
}

impl Grid {
    /// Creates a fully open grid.
    #[must_use]
    pub fn open(columns: u32, rows: u32) -> Self {
        let capacity_u64 = u64::from(columns) * u64::from(rows);
        let capacity = usize::try_from(capacity_u64).unwrap_or(0);
        Self {
            columns,
            rows,
            cells: vec![CellState::Open; capacity],
            version: 0,
        }
    }

    /// Creates a grid whose outer ring is walled except for the route openings.
    #[must_use]
    pub fn bordered(columns: u32, rows: u32) -> Self {
        let mut grid = Self::open(columns, rows);
        let gaps: Vec<CellCoord> = Opening::ALL
            .iter()
            .flat_map(|opening| {
                let route = opening.route(columns, rows);
                [route.entry, route.goal]
            })
            .collect();

        for row in 0..rows {
            for column in 0..columns {
                let on_border =
                    row == 0 || column == 0 || row + 1 == rows || column + 1 == columns;
                let cell = CellCoord::new(column, row);
                if on_border && !gaps.contains(&cell) {
                    let _ = grid.set(cell, CellState::Blocked);
                }
            }
        }
        grid
    }

    /// Rebuilds a grid from rows of `'#'` (blocked) and `'.'` (open) characters.
    ///
    /// Returns `None` when the rows do not describe a rectangle of the expected size
    /// or contain other characters.
    #[must_use]
    pub fn from_rows(columns: u32, rows: u32, lines: &[String]) -> Option<Self> {
        if u32::try_from(lines.len()).ok()? != rows {
            return None;
        }
        let mut grid = Self::open(columns, rows);
        for (row, line) in lines.iter().enumerate() {
            if u32::try_from(line.chars().count()).ok()? != columns {
                return None;
            }
            let row = u32::try_from(row).ok()?;
            for (column, symbol) in line.chars().enumerate() {
                let state = match symbol {
                    '#' => CellState::Blocked,
                    '.' => CellState::Open,
                    _ => return None,
                };
                let _ = grid.set(CellCoord::new(u32::try_from(column).ok()?, row), state);
            }
        }
        Some(grid)
    }

    /// Renders the occupancy as rows of `'#'` and `'.'` characters.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.columns)
                    .map(|column| match self.state(CellCoord::new(column, row)) {
                        Some(CellState::Open) => '.',
                        _ => '#',
                    })
                    .collect()
            })
            .collect()
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Topology version, incremented on every layout change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Number of cells in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// State of the provided cell, or `None` when it lies outside the grid.
    #[must_use]
    pub fn state(&self, cell: CellCoord) -> Option<CellState> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Reports whether the cell lies inside the grid and is open.
    #[must_use]
    pub fn is_open(&self, cell: CellCoord) -> bool {
        self.state(cell) == Some(CellState::Open)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Reports whether the region lies entirely inside the wall ring.
    #[must_use]
    pub fn is_interior(&self, region: &CellRect) -> bool {
        let origin = region.origin();
        let size = region.size();
        if size.width() == 0 || size.height() == 0 {
            return false;
        }
        let right = u64::from(origin.column()) + u64::from(size.width());
        let bottom = u64::from(origin.row()) + u64::from(size.height());
        origin.column() >= 1
            && origin.row() >= 1
            && right < u64::from(self.columns)
            && bottom < u64::from(self.rows)
    }

    /// Blocks every cell of the region, bumping the version if anything changed.
    pub(crate) fn block_region(&mut self, region: &CellRect) {
        self.fill_region(region, CellState::Blocked);
    }

    /// Opens every cell of the region, bumping the version if anything changed.
    pub(crate) fn open_region(&mut self, region: &CellRect) {
        self.fill_region(region, CellState::Open);
    }

    /// Row-major offset of the cell.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }

    fn fill_region(&mut self, region: &CellRect, state: CellState) {
        let mut changed = false;
        for cell in region.cells() {
            changed |= self.set(cell, state);
        }
        if changed {
            self.version = self.version.wrapping_add(1);
        }
    }

    fn set(&mut self, cell: CellCoord, state: CellState) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        match self.cells.get_mut(index) {
            Some(slot) if *slot != state => {
                *slot = state;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siegeline_core::CellRectSize;

    #[test]
    fn border_leaves_only_route_openings() {
        let grid = Grid::bordered(20, 15);
        assert!(grid.is_open(CellCoord::new(10, 0)));
        assert!(grid.is_open(CellCoord::new(10, 14)));
        assert!(grid.is_open(CellCoord::new(0, 7)));
        assert!(grid.is_open(CellCoord::new(19, 7)));
        assert!(!grid.is_open(CellCoord::new(9, 0)));
        assert!(!grid.is_open(CellCoord::new(0, 0)));
        assert!(grid.is_open(CellCoord::new(5, 5)));

        let open_border = (0..20)
            .flat_map(|column| (0..15).map(move |row| CellCoord::new(column, row)))
            .filter(|cell| {
                cell.row() == 0 || cell.column() == 0 || cell.row() == 14 || cell.column() == 19
            })
            .filter(|cell| grid.is_open(*cell))
            .count();
        assert_eq!(open_border, 4);
    }

    #[test]
    fn version_bumps_only_on_real_changes() {
        let mut grid = Grid::bordered(8, 8);
        let region = CellRect::from_origin_and_size(CellCoord::new(2, 2), CellRectSize::new(2, 2));
        assert_eq!(grid.version(), 0);

        grid.block_region(&region);
        assert_eq!(grid.version(), 1);
        grid.block_region(&region);
        assert_eq!(grid.version(), 1, "re-blocking changes nothing");

        grid.open_region(&region);
        assert_eq!(grid.version(), 2);
        assert!(region.cells().all(|cell| grid.is_open(cell)));
    }

    #[test]
    fn interior_excludes_the_wall_ring() {
        let grid = Grid::bordered(10, 10);
        let size = CellRectSize::new(2, 2);
        let inside = CellRect::from_origin_and_size(CellCoord::new(1, 1), size);
        let corner = CellRect::from_origin_and_size(CellCoord::new(8, 8), size);
        let edge = CellRect::from_origin_and_size(CellCoord::new(0, 4), size);
        assert!(grid.is_interior(&inside));
        assert!(grid.is_interior(&CellRect::from_origin_and_size(CellCoord::new(7, 7), size)));
        assert!(!grid.is_interior(&corner));
        assert!(!grid.is_interior(&edge));
    }

    #[test]
    fn rows_render_and_parse_back() {
        let mut grid = Grid::bordered(6, 5);
        grid.block_region(&CellRect::from_origin_and_size(
            CellCoord::new(2, 1),
            CellRectSize::new(1, 2),
        ));
        let rows = grid.to_rows();
        assert_eq!(rows[0], "###.##");
        let parsed = Grid::from_rows(6, 5, &rows).expect("rows parse");
        assert_eq!(parsed.to_rows(), rows);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        let rows = vec!["..".to_owned(), ".x".to_owned()];
        assert!(Grid::from_rows(2, 2, &rows).is_none());
        assert!(Grid::from_rows(3, 2, &["...".to_owned()]).is_none());
    }
}
