// partition.rs - Chunk geometry and per-chunk result buffers
//
// The grid is tiled row-major into `columns × rows` regions, one per worker.
// Workers compute into their region's buffer and the coordinator pastes the
// buffers back using the very same `Partition`, so compute and merge always
// agree on geometry.

use crate::error::{EngineError, Result};
use crate::grid::Grid;
use crate::rule;

/// A fixed rectangular sub-region of the grid assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub index: usize,
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    size: usize,
    columns: usize,
    rows: usize,
    regions: Vec<Region>,
}

impl Partition {
    /// Tiles a `size`×`size` grid into exactly `chunks` regions.
    ///
    /// `chunks` is factored as `columns × rows` with `columns` the smallest
    /// divisor not below its square root. Bands are as even as possible, with
    /// the leading bands absorbing the remainder. Four chunks on an even grid
    /// give four equal quadrants.
    pub fn new(size: usize, chunks: usize) -> Result<Self> {
        if size == 0 || chunks == 0 {
            return Err(EngineError::Partition { size, workers: chunks });
        }
        let columns = (1..=chunks)
            .find(|&d| chunks % d == 0 && d * d >= chunks)
            .unwrap_or(chunks);
        let rows = chunks / columns;
        if columns > size || rows > size {
            return Err(EngineError::Partition { size, workers: chunks });
        }

        let col_bands = bands(size, columns);
        let row_bands = bands(size, rows);
        let mut regions = Vec::with_capacity(chunks);
        for &(y, height) in &row_bands {
            for &(x, width) in &col_bands {
                regions.push(Region {
                    index: regions.len(),
                    x,
                    y,
                    width,
                    height,
                });
            }
        }

        Ok(Self { size, columns, rows, regions })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    /// Pastes one buffer per region into a fresh grid.
    ///
    /// Buffers are placed by their own region, which must belong to this partition.
    pub fn merge<'a>(&self, buffers: impl IntoIterator<Item = &'a ChunkBuffer>) -> Grid {
        let mut merged = Grid::new(self.size);
        for buffer in buffers {
            debug_assert_eq!(self.regions.get(buffer.region.index), Some(&buffer.region));
            buffer.paste_into(&mut merged);
        }
        merged
    }

    /// Sequential chunked generation: compute every region, then merge.
    pub fn advance(&self, grid: &Grid) -> Result<Grid> {
        let buffers = self
            .regions
            .iter()
            .map(|region| ChunkBuffer::compute(grid, *region))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.merge(&buffers))
    }
}

/// Splits `total` into `count` contiguous (start, len) bands.
fn bands(total: usize, count: usize) -> Vec<(usize, usize)> {
    let base = total / count;
    let extra = total % count;
    let mut start = 0;
    (0..count)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let band = (start, len);
            start += len;
            band
        })
        .collect()
}

/// One worker's computed next state for its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkBuffer {
    region: Region,
    cells: Vec<bool>,
}

impl ChunkBuffer {
    /// Empty buffer with room for the whole region, filled row by row.
    pub(crate) fn allocate(region: Region) -> Result<Self> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(region.area())
            .map_err(|_| EngineError::ChunkAllocation {
                chunk: region.index,
                cells: region.area(),
            })?;
        Ok(Self { region, cells })
    }

    /// Appends the next state of local row `row` of the region.
    pub(crate) fn compute_row(&mut self, grid: &Grid, row: usize) {
        let y = (self.region.y + row) as i64;
        for x in self.region.x..self.region.x + self.region.width {
            self.cells.push(rule::next_cell(grid, x as i64, y));
        }
    }

    pub fn compute(grid: &Grid, region: Region) -> Result<Self> {
        let mut buffer = Self::allocate(region)?;
        for row in 0..region.height {
            buffer.compute_row(grid, row);
        }
        Ok(buffer)
    }

    /// Copies the region's current cells unchanged: the last-known-good stand-in
    /// for a chunk whose worker faulted or stalled.
    pub fn capture(grid: &Grid, region: Region) -> Self {
        let mut cells = Vec::with_capacity(region.area());
        for y in region.y..region.y + region.height {
            cells.extend_from_slice(&grid.row(y)[region.x..region.x + region.width]);
        }
        Self { region, cells }
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn is_complete(&self) -> bool {
        self.cells.len() == self.region.area()
    }

    /// Cell at region-local coordinates.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.region.width
            && y < self.region.height
            && self.cells.get(y * self.region.width + x).copied().unwrap_or(false)
    }

    pub fn paste_into(&self, grid: &mut Grid) {
        let Region { x, y, width, .. } = self.region;
        for (row, line) in self.cells.chunks(width).enumerate() {
            grid.row_mut(y + row)[x..x + line.len()].copy_from_slice(line);
        }
    }
}
