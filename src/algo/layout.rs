//! Greedy shelf packing of flattened panels.
//!
//! Panels are sorted tallest first and placed left to right along a shelf of
//! the given width; a panel that does not fit starts a new shelf on top of
//! the previous one. The same packing drives both [`arrange_panels`] and the
//! fabric utilization estimate.

use crate::algo::parameterize::FlattenedPanel;
use crate::error::{PatternError, Result};

/// Placement computed by [`shelf_pack`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ShelfPacking {
    /// Lower-left corner for each input rectangle, in input order.
    pub positions: Vec<(f64, f64)>,
    /// Number of shelves used.
    pub rows: usize,
    /// Sum of shelf heights plus the gaps between shelves.
    pub length: f64,
    /// Inputs wider than the shelf. They get a shelf of their own.
    pub oversized: usize,
}

/// Pack `(width, height)` rectangles onto shelves of `shelf_width`.
pub(crate) fn shelf_pack(sizes: &[(f64, f64)], shelf_width: f64, gap: f64) -> ShelfPacking {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.total_cmp(&sizes[a].1).then(a.cmp(&b)));

    let mut positions = vec![(0.0, 0.0); sizes.len()];
    let mut rows = 0;
    let mut oversized = 0;
    let mut row_y = 0.0;
    let mut row_height = 0.0;
    let mut cursor_x = 0.0;

    for i in order {
        let (w, h) = sizes[i];
        if w > shelf_width {
            oversized += 1;
        }
        let fits = cursor_x == 0.0 || cursor_x + w <= shelf_width;
        if rows == 0 || !fits {
            if rows > 0 {
                row_y += row_height + gap;
            }
            rows += 1;
            row_height = 0.0;
            cursor_x = 0.0;
        }
        positions[i] = (cursor_x, row_y);
        cursor_x += w + gap;
        row_height = f64::max(row_height, h);
    }

    let length = if rows == 0 { 0.0 } else { row_y + row_height };
    ShelfPacking {
        positions,
        rows,
        length,
        oversized,
    }
}

/// Translate copies of `panels` into disjoint shelf positions.
///
/// The output keeps the input order. Each panel's bounding box is moved so
/// its lower-left corner lands on its shelf slot, with `gap_mm` between
/// neighbouring boxes.
///
/// # Errors
///
/// Returns [`PatternError::InvalidParameter`] if `width_mm` is not positive
/// or `gap_mm` is negative.
pub fn arrange_panels(panels: &[FlattenedPanel], width_mm: f64, gap_mm: f64) -> Result<Vec<FlattenedPanel>> {
    if !(width_mm > 0.0) || !width_mm.is_finite() {
        return Err(PatternError::invalid_param("width_mm", width_mm, "must be positive"));
    }
    if !(gap_mm >= 0.0) || !gap_mm.is_finite() {
        return Err(PatternError::invalid_param("gap_mm", gap_mm, "must be non-negative"));
    }

    let sizes: Vec<(f64, f64)> = panels.iter().map(|p| (p.width(), p.height())).collect();
    let packing = shelf_pack(&sizes, width_mm, gap_mm);

    Ok(panels
        .iter()
        .zip(&packing.positions)
        .map(|(panel, &(x, y))| {
            let min = panel.bounds().min;
            panel.translated(x - min.x, y - min.y)
        })
        .collect())
}
