//! Set-level checks: overlaps, fabric width and orientation.

use log::debug;
use rayon::prelude::*;

use crate::algo::parameterize::FlattenedPanel;
use crate::algo::spatial::SpatialIndex;
use crate::error::Result;
use crate::geometry::{polygons_overlap, BoundingBox2};

use super::fabric::fabric_compatibility;
use super::issues::{IssueCategory, PatternSetValidationResult, Severity, ValidationIssue};
use super::panel::validate_panel;
use super::ValidationOptions;

/// Panels whose long side is less than this much longer than the short side
/// have no meaningful orientation.
const ORIENTATION_MIN_ASPECT: f64 = 1.1;

/// Validate every panel and the set as a whole.
///
/// # Errors
///
/// Returns [`PatternError::InvalidParameter`](crate::error::PatternError)
/// if `options` are invalid.
pub fn validate_panel_set(
    panels: &[FlattenedPanel],
    options: &ValidationOptions,
) -> Result<PatternSetValidationResult> {
    options.validate()?;

    let panel_results: Vec<_> = panels.par_iter().map(|p| validate_panel(p, options)).collect();

    let mut layout_issues = Vec::new();
    for (i, j) in find_overlaps(panels, options.grid_cell_size_mm)? {
        let (a, b) = (panels[i].panel_id(), panels[j].panel_id());
        layout_issues.push(
            ValidationIssue::new(
                IssueCategory::Overlap,
                Severity::Critical,
                format!("{} overlaps {}", a, b),
            )
            .with_panel(a)
            .with_panel(b),
        );
    }

    let fabric = fabric_compatibility(panels, &options.fabric_widths_mm);
    if let Some(fit) = fabric.as_ref().filter(|f| f.requires_custom_width) {
        layout_issues.push(ValidationIssue::new(
            IssueCategory::FabricWidth,
            Severity::Warning,
            format!(
                "widest panel ({:.1} mm) exceeds every available fabric width",
                fit.max_panel_width_mm
            ),
        ));
    }

    if let Some(issue) = check_orientation(panels) {
        layout_issues.push(issue);
    }

    let is_valid = panel_results.iter().all(|r| r.is_valid)
        && !layout_issues.iter().any(ValidationIssue::is_blocking);
    let total_area_mm2 = panels.iter().map(FlattenedPanel::area).sum();

    debug!(
        "validated {} panels: {} layout issues, valid = {}",
        panels.len(),
        layout_issues.len(),
        is_valid
    );

    Ok(PatternSetValidationResult {
        is_valid,
        panel_results,
        layout_issues,
        recommended_fabric_width_mm: fabric.as_ref().map(|f| f.recommended_width_mm),
        fabric_compatibility: fabric,
        total_area_mm2,
        timestamp: chrono::Utc::now(),
    })
}

/// Overlapping panel pairs `(i, j)` with `i < j`, sorted.
///
/// Only pairs sharing a grid cell are tested geometrically.
pub fn find_overlaps(panels: &[FlattenedPanel], cell_size_mm: f64) -> Result<Vec<(usize, usize)>> {
    let boxes: Vec<BoundingBox2> = panels.iter().map(|p| *p.bounds()).collect();
    let index = SpatialIndex::build(&boxes, cell_size_mm)?;
    let outlines: Vec<_> = panels.iter().map(FlattenedPanel::outline).collect();
    let (index, boxes, outlines) = (&index, &boxes, &outlines);

    let mut pairs: Vec<(usize, usize)> = (0..panels.len())
        .into_par_iter()
        .flat_map_iter(move |i| {
            index
                .candidates(&boxes[i], Some(i))
                .into_iter()
                .filter(move |&j| j > i && polygons_overlap(&outlines[i], &outlines[j]))
                .map(move |j| (i, j))
        })
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    Ok(pairs)
}

/// All-pairs overlap check. Same output as [`find_overlaps`].
pub fn find_overlaps_brute_force(panels: &[FlattenedPanel]) -> Vec<(usize, usize)> {
    let outlines: Vec<_> = panels.iter().map(FlattenedPanel::outline).collect();
    let mut pairs = Vec::new();
    for i in 0..panels.len() {
        for j in i + 1..panels.len() {
            if polygons_overlap(&outlines[i], &outlines[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Warn when elongated panels do not share a long-axis direction.
fn check_orientation(panels: &[FlattenedPanel]) -> Option<ValidationIssue> {
    let mut horizontal = 0;
    let mut vertical = 0;
    for panel in panels {
        let (w, h) = (panel.width(), panel.height());
        if w.max(h) < ORIENTATION_MIN_ASPECT * w.min(h) {
            continue;
        }
        if w >= h {
            horizontal += 1;
        } else {
            vertical += 1;
        }
    }
    if horizontal > 0 && vertical > 0 {
        Some(ValidationIssue::new(
            IssueCategory::Orientation,
            Severity::Warning,
            format!(
                "inconsistent grain: {} panels run horizontally, {} vertically",
                horizontal, vertical
            ),
        ))
    } else {
        None
    }
}
