//! Uniform grid over 2D bounding boxes.
//!
//! [`SpatialIndex`] buckets boxes by the grid cells they cover so overlap
//! checks only deep-test pairs that share a cell. It is built once and then
//! only read, so it can be shared by reference across threads.
//!
//! Cells grow past the requested size when a box would otherwise span more
//! than [`MAX_CELLS_PER_AXIS`] cells on one axis, which bounds memory for
//! very large boxes.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PatternError, Result};
use crate::geometry::BoundingBox2;

/// Default cell size in millimeters.
pub const DEFAULT_CELL_SIZE_MM: f64 = 100.0;

/// Most cells a single box may cover along one axis.
pub const MAX_CELLS_PER_AXIS: f64 = 64.0;

/// Immutable uniform grid of bounding boxes.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
    len: usize,
}

impl SpatialIndex {
    /// Index `boxes` with square cells of at least `cell_size` millimeters.
    ///
    /// Box `i` is stored under index `i`.
    ///
    /// # Errors
    ///
    /// - [`PatternError::InvalidParameter`] if `cell_size` is not finite and
    ///   positive
    /// - [`PatternError::NumericalInstability`] if a box has non-finite bounds
    pub fn build(boxes: &[BoundingBox2], cell_size: f64) -> Result<Self> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(PatternError::invalid_param(
                "cell_size",
                cell_size,
                "must be finite and positive",
            ));
        }

        let mut widest: f64 = 0.0;
        for (i, bbox) in boxes.iter().enumerate() {
            let corners = [bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y];
            if corners.iter().any(|c| !c.is_finite()) {
                return Err(PatternError::NumericalInstability(format!(
                    "box {} has non-finite bounds",
                    i
                )));
            }
            widest = widest.max(bbox.width()).max(bbox.height());
        }
        let cell_size = cell_size.max(widest / MAX_CELLS_PER_AXIS);
        if !cell_size.is_finite() {
            return Err(PatternError::NumericalInstability(format!(
                "box extent {} overflows the grid",
                widest
            )));
        }

        let mut index = Self {
            cell_size,
            cells: HashMap::new(),
            len: boxes.len(),
        };
        for (i, bbox) in boxes.iter().enumerate() {
            let (x0, y0, x1, y1) = index.cell_range(bbox);
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    index.cells.entry((cx, cy)).or_default().push(i);
                }
            }
        }
        Ok(index)
    }

    /// Cell edge length in millimeters.
    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed boxes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no boxes are indexed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied cells.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Every stored index sharing at least one cell with `bbox`, except
    /// `excluding`.
    pub fn candidates(&self, bbox: &BoundingBox2, excluding: Option<usize>) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        let (x0, y0, x1, y1) = self.cell_range(bbox);
        let mut add = |entries: &Vec<usize>| {
            out.extend(entries.iter().copied().filter(|&i| Some(i) != excluding));
        };

        let span = (x1 as i128 - x0 as i128 + 1) * (y1 as i128 - y0 as i128 + 1);
        if span > self.cells.len() as i128 {
            // Query covers more cells than are occupied.
            for (&(cx, cy), entries) in &self.cells {
                if (x0..=x1).contains(&cx) && (y0..=y1).contains(&cy) {
                    add(entries);
                }
            }
        } else {
            for cx in x0..=x1 {
                for cy in y0..=y1 {
                    if let Some(entries) = self.cells.get(&(cx, cy)) {
                        add(entries);
                    }
                }
            }
        }
        out
    }

    // Saturates for out-of-range queries.
    fn cell_of(&self, v: f64) -> i64 {
        (v / self.cell_size).floor() as i64
    }

    fn cell_range(&self, bbox: &BoundingBox2) -> (i64, i64, i64, i64) {
        (
            self.cell_of(bbox.min.x),
            self.cell_of(bbox.min.y),
            self.cell_of(bbox.max.x),
            self.cell_of(bbox.max.y),
        )
    }
}
