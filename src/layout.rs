use crate::error::{Result, SimError};

/// Rows used when neither rows nor a pixel count are configured.
pub const DEFAULT_ROWS: usize = 10;

/// Orientation toggles applied when mapping a strip index onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayoutFlags {
    /// Odd rows run in the opposite direction.
    pub snake: bool,
    /// Mirror horizontally.
    pub mirror: bool,
    /// Flip vertically.
    pub flip: bool,
    /// Transpose along the diagonal, applied last.
    pub tilt: bool,
}

impl LayoutFlags {
    /// Rotates the layout right by a quarter turn.
    pub fn rotate_right(&mut self) {
        if self.tilt {
            self.tilt = false;
            self.flip = !self.flip;
        } else {
            self.tilt = true;
            self.mirror = !self.mirror;
        }
    }

    /// Rotates the layout left by a quarter turn.
    pub fn rotate_left(&mut self) {
        if self.tilt {
            self.tilt = false;
            self.mirror = !self.mirror;
        } else {
            self.tilt = true;
            self.flip = !self.flip;
        }
    }

    /// Applies `quarter_turns` rotations, positive to the right.
    ///
    /// Left and right rotations cancel and four of either are the identity,
    /// so any sequence of them collapses to `turns mod 4` right rotations.
    pub fn rotate(&mut self, quarter_turns: i64) {
        for _ in 0..quarter_turns.rem_euclid(4) {
            self.rotate_right();
        }
    }
}

/// A cell position on the simulated grid, before any screen scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

/// Grid geometry and orientation, fixed for the run apart from rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    columns: usize,
    rows: usize,
    pixel_count: usize,
    pub flags: LayoutFlags,
}

impl LayoutConfig {
    /// Derives the full geometry from whatever the user supplied.
    ///
    /// * rows given: the pixel count defaults to `columns * rows`
    /// * pixel count given: rows become `ceil(pixel_count / columns)`
    /// * neither: rows default to [`DEFAULT_ROWS`]
    ///
    /// When both are given the pixel count is clamped to the grid.
    pub fn resolve(
        columns: usize,
        rows: Option<usize>,
        pixel_count: Option<usize>,
        flags: LayoutFlags,
    ) -> Result<Self> {
        if columns == 0 {
            return Err(SimError::invalid_geometry("columns must be at least 1"));
        }
        if rows == Some(0) {
            return Err(SimError::invalid_geometry("rows must be at least 1"));
        }
        if pixel_count == Some(0) {
            return Err(SimError::invalid_geometry("pixel count must be at least 1"));
        }

        let cells = |rows: usize| {
            columns
                .checked_mul(rows)
                .ok_or_else(|| SimError::invalid_geometry("grid too large"))
        };
        let (rows, pixel_count) = match (rows, pixel_count) {
            (Some(rows), Some(count)) => (rows, count.min(cells(rows)?)),
            (Some(rows), None) => (rows, cells(rows)?),
            (None, Some(count)) => (count.div_ceil(columns), count),
            (None, None) => (DEFAULT_ROWS, cells(DEFAULT_ROWS)?),
        };
        // Three bytes per pixel must stay addressable.
        if pixel_count.checked_mul(3).is_none() {
            return Err(SimError::invalid_geometry("pixel count too large"));
        }

        Ok(Self {
            columns,
            rows,
            pixel_count,
            flags,
        })
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Width and height of the drawn grid; swapped when tilted.
    pub fn grid_extent(&self) -> (usize, usize) {
        if self.flags.tilt {
            (self.rows, self.columns)
        } else {
            (self.columns, self.rows)
        }
    }

    /// Maps strip index `index` to its grid cell.
    pub fn map(&self, index: usize) -> Cell {
        let LayoutFlags {
            snake,
            mirror,
            flip,
            tilt,
        } = self.flags;

        let mut x = index % self.columns;
        let mut y = index / self.columns;

        // Snake and mirror cancel each other on odd rows.
        let invert_x = if snake { (y % 2 == 1) != mirror } else { mirror };
        if invert_x {
            x = self.columns - 1 - x;
        }
        if flip {
            y = self.rows - 1 - y;
        }
        if tilt {
            std::mem::swap(&mut x, &mut y);
        }

        Cell { x, y }
    }

    /// Cells for every configured pixel, in strip order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, Cell)> + '_ {
        (0..self.pixel_count).map(|i| (i, self.map(i)))
    }
}
