//! Fabric width fit and utilization estimates.

use crate::algo::layout::shelf_pack;
use crate::algo::parameterize::FlattenedPanel;
use crate::error::{PatternError, Result};

use super::issues::FabricCompatibility;
use super::ValidationOptions;

/// Check which of `widths_mm` every panel fits on.
///
/// A width is compatible iff every panel's bounding-box width is at most that
/// width. The narrowest compatible width is recommended; when none fits, the
/// widest panel's own width is recommended and `requires_custom_width` is set.
/// Returns `None` for an empty panel list.
pub fn fabric_compatibility(panels: &[FlattenedPanel], widths_mm: &[f64]) -> Option<FabricCompatibility> {
    let max_panel_width_mm = panels.iter().map(FlattenedPanel::width).reduce(f64::max)?;

    let mut compatible_widths_mm: Vec<f64> = widths_mm
        .iter()
        .copied()
        .filter(|&w| max_panel_width_mm <= w)
        .collect();
    compatible_widths_mm.sort_by(f64::total_cmp);

    let (recommended_width_mm, requires_custom_width) = match compatible_widths_mm.first() {
        Some(&w) => (w, false),
        None => (max_panel_width_mm, true),
    };

    Some(FabricCompatibility {
        max_panel_width_mm,
        compatible_widths_mm,
        recommended_width_mm,
        requires_custom_width,
    })
}

/// Estimated fabric consumption for a panel set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FabricUtilization {
    /// Fabric width the estimate is for (mm).
    pub fabric_width_mm: f64,

    /// Estimated fabric length including the handling margin (mm).
    pub estimated_length_mm: f64,

    /// Sum of panel areas (mm²).
    pub total_panel_area_mm2: f64,

    /// Panel area over consumed fabric area, in `[0, 1]` for sane inputs.
    pub efficiency: f64,

    /// Efficiency is at or above the configured minimum.
    pub is_efficient: bool,

    /// Number of shelves the packing used.
    pub rows: usize,

    /// Panels wider than the fabric.
    pub oversized_panels: usize,
}

/// Estimate the fabric length needed to cut `panels` from a bolt of
/// `fabric_width_mm`.
///
/// Panels are shelf-packed tallest first, row heights are summed and the
/// handling margin is added on top.
///
/// # Errors
///
/// Returns [`PatternError::InvalidParameter`] if `fabric_width_mm` is not
/// positive or the options are invalid.
pub fn estimate_fabric_utilization(
    panels: &[FlattenedPanel],
    fabric_width_mm: f64,
    options: &ValidationOptions,
) -> Result<FabricUtilization> {
    if !(fabric_width_mm > 0.0) || !fabric_width_mm.is_finite() {
        return Err(PatternError::invalid_param(
            "fabric_width_mm",
            fabric_width_mm,
            "must be positive",
        ));
    }
    options.validate()?;

    let sizes: Vec<(f64, f64)> = panels.iter().map(|p| (p.width(), p.height())).collect();
    let packing = shelf_pack(&sizes, fabric_width_mm, 0.0);

    let estimated_length_mm = packing.length * (1.0 + options.handling_margin);
    let total_panel_area_mm2: f64 = panels.iter().map(FlattenedPanel::area).sum();
    let fabric_area = estimated_length_mm * fabric_width_mm;
    let efficiency = if fabric_area > 0.0 {
        total_panel_area_mm2 / fabric_area
    } else {
        0.0
    };

    Ok(FabricUtilization {
        fabric_width_mm,
        estimated_length_mm,
        total_panel_area_mm2,
        efficiency,
        is_efficient: efficiency >= options.min_fabric_efficiency,
        rows: packing.rows,
        oversized_panels: packing.oversized,
    })
}
