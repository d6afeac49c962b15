//! Fixed-resolution bucket grids over source and target space
//!
//! Each cell holds the indices of patches whose bounding box overlaps the cell.
//! Queries collect candidates from the covered cells (broad phase) and then run an
//! exact test on the survivors (narrow phase): the separating-axis test on rotated
//! corners in source space, an interval test in target space.

use std::collections::BTreeSet;
use std::fmt;

use log::debug;

use crate::io::configuration::PLACEMENT_TOLERANCE_MM;
use crate::io::error::{Result, invalid_parameter};
use crate::math::geometry::{Rect, RotationSet, polygons_intersect};
use crate::spatial::patch::Patch;

/// Which of the two images a footprint lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Space {
    /// The material the patches are cut from
    Source,
    /// The image the patches reproduce
    Target,
}

impl Space {
    /// Both spaces, source first
    pub const BOTH: [Self; 2] = [Self::Source, Self::Target];
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Clamped, half-open range of grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRegion {
    /// First covered row
    pub row_start: usize,
    /// One past the last covered row
    pub row_end: usize,
    /// First covered column
    pub col_start: usize,
    /// One past the last covered column
    pub col_end: usize,
}

impl CellRegion {
    /// Whether the cell at (row, col) is part of the region
    pub const fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }

    /// Whether two regions share at least one cell
    pub const fn intersects(&self, other: &Self) -> bool {
        self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }

    /// Smallest region containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            row_start: self.row_start.min(other.row_start),
            row_end: self.row_end.max(other.row_end),
            col_start: self.col_start.min(other.col_start),
            col_end: self.col_end.max(other.col_end),
        }
    }

    /// Every (row, col) in the region, row-major
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + use<> {
        let (cols, col_end) = (self.col_start, self.col_end);
        (self.row_start..self.row_end).flat_map(move |row| (cols..col_end).map(move |col| (row, col)))
    }
}

/// Lookup of patch values and leaf status by index, for narrow-phase queries
pub trait PatchLookup {
    /// Patch stored at an index
    fn patch_at(&self, index: usize) -> Option<&Patch>;
    /// Whether the index names a live leaf
    fn is_leaf_index(&self, index: usize) -> bool;
    /// Rotations used to place source footprints
    fn rotations(&self) -> &RotationSet;
}

#[derive(Debug, Clone, PartialEq)]
struct SpaceGrid {
    extent: Rect,
    cells: Vec<BTreeSet<usize>>,
}

impl SpaceGrid {
    fn new(extent: Rect, cell_count: usize) -> Self {
        Self {
            extent,
            cells: vec![BTreeSet::new(); cell_count],
        }
    }

    fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }
}

/// Source and target bucket grids of identical resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialGridIndex {
    rows: usize,
    cols: usize,
    source: SpaceGrid,
    target: SpaceGrid,
}

impl SpatialGridIndex {
    /// Create empty grids of `rows x cols` cells spanning each space's extent (mm)
    ///
    /// # Errors
    ///
    /// Returns an error if the resolution is zero or an extent is empty
    pub fn new(rows: usize, cols: usize, source_extent: Rect, target_extent: Rect) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(invalid_parameter(
                "grid_resolution",
                &format!("{rows}x{cols}"),
                &"grid needs at least one row and one column",
            ));
        }
        for extent in [source_extent, target_extent] {
            if !extent.size().is_positive() {
                return Err(invalid_parameter(
                    "grid_extent",
                    &format!("{}x{}", extent.width(), extent.height()),
                    &"grid extent must have positive area",
                ));
            }
        }
        Ok(Self {
            rows,
            cols,
            source: SpaceGrid::new(source_extent, rows * cols),
            target: SpaceGrid::new(target_extent, rows * cols),
        })
    }

    /// Number of cell rows
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of cell columns
    pub const fn cols(&self) -> usize {
        self.cols
    }

    const fn grid(&self, space: Space) -> &SpaceGrid {
        match space {
            Space::Source => &self.source,
            Space::Target => &self.target,
        }
    }

    const fn grid_mut(&mut self, space: Space) -> &mut SpaceGrid {
        match space {
            Space::Source => &mut self.source,
            Space::Target => &mut self.target,
        }
    }

    /// Extent covered by a space's grid, in millimetres
    pub const fn extent(&self, space: Space) -> Rect {
        self.grid(space).extent
    }

    /// Rectangle of one cell in millimetres
    pub fn cell_rect(&self, space: Space, row: usize, col: usize) -> Rect {
        let extent = self.extent(space);
        let cell_w = extent.width() / self.cols as f64;
        let cell_h = extent.height() / self.rows as f64;
        Rect::new(
            extent.min_x + col as f64 * cell_w,
            extent.min_y + row as f64 * cell_h,
            extent.min_x + (col + 1) as f64 * cell_w,
            extent.min_y + (row + 1) as f64 * cell_h,
        )
    }

    /// Indices stored in one cell
    pub fn cell(&self, space: Space, row: usize, col: usize) -> Option<&BTreeSet<usize>> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.grid(space).cells.get(row * self.cols + col)
    }

    /// Empty one space's grid
    pub fn clear(&mut self, space: Space) {
        self.grid_mut(space).clear();
    }

    /// Empty one space's grid and re-span it over a new extent
    ///
    /// # Errors
    ///
    /// Returns an error if the extent is empty
    pub fn reset(&mut self, space: Space, extent: Rect) -> Result<()> {
        if !extent.size().is_positive() {
            return Err(invalid_parameter(
                "grid_extent",
                &format!("{}x{}", extent.width(), extent.height()),
                &"grid extent must have positive area",
            ));
        }
        let grid = self.grid_mut(space);
        grid.clear();
        grid.extent = extent;
        Ok(())
    }

    /// Cells overlapped by a bounding box, clamped to the grid
    ///
    /// Cells and boxes are treated as half-open, so a box ending exactly on a cell
    /// boundary does not reach into the next cell. Returns `None` when the box lies
    /// entirely outside the grid or has no area.
    pub fn region(&self, bounds: &Rect, space: Space) -> Option<CellRegion> {
        let extent = self.extent(space);
        let cell_w = extent.width() / self.cols as f64;
        let cell_h = extent.height() / self.rows as f64;

        let col_start = ((bounds.min_x - extent.min_x) / cell_w).floor();
        let col_end = ((bounds.max_x - extent.min_x) / cell_w).ceil();
        let row_start = ((bounds.min_y - extent.min_y) / cell_h).floor();
        let row_end = ((bounds.max_y - extent.min_y) / cell_h).ceil();
        if ![col_start, col_end, row_start, row_end]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let clamp = |v: f64, hi: usize| v.clamp(0.0, hi as f64) as usize;
        let region = CellRegion {
            row_start: clamp(row_start, self.rows),
            row_end: clamp(row_end, self.rows),
            col_start: clamp(col_start, self.cols),
            col_end: clamp(col_end, self.cols),
        };
        (region.row_start < region.row_end && region.col_start < region.col_end).then_some(region)
    }

    /// Add an index to every cell of a region
    ///
    /// An outside region is a no-op; it occurs legitimately while a patch is in
    /// transit and is only logged.
    pub fn insert(&mut self, index: usize, region: Option<CellRegion>, space: Space) {
        let Some(region) = region else {
            debug!("patch {index} lies outside the {space} grid; insert skipped");
            return;
        };
        let cols = self.cols;
        let grid = self.grid_mut(space);
        for (row, col) in region.cells() {
            if let Some(cell) = grid.cells.get_mut(row * cols + col) {
                cell.insert(index);
            }
        }
    }

    /// Remove an index from every cell of a region
    pub fn erase(&mut self, index: usize, region: Option<CellRegion>, space: Space) {
        let Some(region) = region else {
            debug!("patch {index} lies outside the {space} grid; erase skipped");
            return;
        };
        let cols = self.cols;
        let grid = self.grid_mut(space);
        for (row, col) in region.cells() {
            if let Some(cell) = grid.cells.get_mut(row * cols + col) {
                cell.remove(&index);
            }
        }
    }

    /// Move an index from the cells of `old_bounds` to those of `new_bounds`
    ///
    /// Overlapping regions are swapped cell by cell so shared cells are untouched;
    /// disjoint regions, or an index not yet filed under its old region, are
    /// erased and inserted wholesale.
    pub fn update(&mut self, index: usize, old_bounds: &Rect, new_bounds: &Rect, space: Space) {
        let old_region = self.region(old_bounds, space);
        let new_region = self.region(new_bounds, space);

        match (old_region, new_region) {
            (Some(old), Some(new)) if old.intersects(&new) && self.holds(index, &old, space) => {
                if old == new {
                    return;
                }
                let cols = self.cols;
                let grid = self.grid_mut(space);
                for (row, col) in old.union(&new).cells() {
                    let (was, is) = (old.contains(row, col), new.contains(row, col));
                    if was == is {
                        continue;
                    }
                    if let Some(cell) = grid.cells.get_mut(row * cols + col) {
                        if is {
                            cell.insert(index);
                        } else {
                            cell.remove(&index);
                        }
                    }
                }
            }
            _ => {
                self.erase(index, old_region, space);
                self.insert(index, new_region, space);
            }
        }
    }

    /// Whether every cell of a region lists `index`
    pub fn holds(&self, index: usize, region: &CellRegion, space: Space) -> bool {
        let grid = self.grid(space);
        region.cells().all(|(row, col)| {
            grid.cells
                .get(row * self.cols + col)
                .is_some_and(|cell| cell.contains(&index))
        })
    }

    /// Union of the indices stored in a region's cells
    pub fn candidates(&self, region: Option<CellRegion>, space: Space) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        let Some(region) = region else {
            return found;
        };
        let grid = self.grid(space);
        for (row, col) in region.cells() {
            if let Some(cell) = grid.cells.get(row * self.cols + col) {
                found.extend(cell.iter().copied());
            }
        }
        found
    }

    /// Every (row, col) whose cell currently stores `index`
    pub fn cells_containing(&self, index: usize, space: Space) -> Vec<(usize, usize)> {
        self.grid(space)
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.contains(&index))
            .map(|(i, _)| (i / self.cols, i % self.cols))
            .collect()
    }

    /// Indices sharing at least one cell with the patch at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the patch is unknown or malformed
    pub fn neighbours(
        &self,
        index: usize,
        space: Space,
        leaves_only: bool,
        lookup: &impl PatchLookup,
    ) -> Result<BTreeSet<usize>> {
        let patch = lookup.patch_at(index).ok_or_else(|| {
            invalid_parameter("patch_index", &index, &"no patch stored at this index")
        })?;
        let bounds = patch.bounds(space, lookup.rotations())?;
        let mut found = self.candidates(self.region(&bounds, space), space);
        found.remove(&index);
        if leaves_only {
            found.retain(|&i| lookup.is_leaf_index(i));
        }
        Ok(found)
    }

    /// Indices whose footprint truly overlaps `patch` in `space`
    ///
    /// Shared edges are not overlaps. Indices in `ignore` are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `patch` or a stored candidate is malformed
    pub fn overlaps(
        &self,
        patch: &Patch,
        space: Space,
        leaves_only: bool,
        ignore: &[usize],
        lookup: &impl PatchLookup,
    ) -> Result<Vec<usize>> {
        let rotations = lookup.rotations();
        let bounds = patch.bounds(space, rotations)?;
        let candidates = self.candidates(self.region(&bounds, space), space);

        let corners = match space {
            Space::Source => Some(patch.source_corners(rotations)?),
            Space::Target => None,
        };

        let mut hits = Vec::new();
        for index in candidates {
            if ignore.contains(&index) || (leaves_only && !lookup.is_leaf_index(index)) {
                continue;
            }
            let Some(other) = lookup.patch_at(index) else {
                continue;
            };
            let overlapping = match corners {
                Some(ref corners) => polygons_intersect(
                    corners,
                    &other.source_corners(rotations)?,
                    PLACEMENT_TOLERANCE_MM,
                )?,
                None => bounds.overlaps(&other.target_bounds(), PLACEMENT_TOLERANCE_MM),
            };
            if overlapping {
                hits.push(index);
            }
        }
        Ok(hits)
    }
}
