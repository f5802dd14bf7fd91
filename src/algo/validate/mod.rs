//! Pattern validation.
//!
//! Findings are data, not errors: every check produces a
//! [`ValidationIssue`] (blocking when its severity is error or critical) or a
//! [`ValidationWarning`], and the caller decides what to keep.
//!
//! - [`validate_panel`]: geometry, seam allowance, size, distortion and
//!   self-intersection checks on one panel
//! - [`validate_panel_set`]: per-panel checks plus overlap, fabric width and
//!   orientation checks across the set
//! - [`estimate_fabric_utilization`]: shelf-packing estimate of the fabric
//!   length a set needs
//!
//! # Example
//!
//! ```
//! use flatpattern::prelude::*;
//! use nalgebra::Point2;
//!
//! let outline = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(200.0, 0.0),
//!     Point2::new(200.0, 100.0),
//!     Point2::new(0.0, 100.0),
//! ];
//! let panel = FlattenedPanel::from_outline(PanelId(0), outline, 5.0);
//!
//! let result = validate_panel(&panel, &ValidationOptions::default());
//! assert!(result.is_valid);
//! ```

mod fabric;
mod issues;
mod panel;
mod set;

pub use fabric::{estimate_fabric_utilization, fabric_compatibility, FabricUtilization};
pub use issues::{
    FabricCompatibility, IssueCategory, PatternSetValidationResult, PatternValidationResult, Severity,
    ValidationIssue, ValidationWarning,
};
pub use panel::validate_panel;
pub use set::{find_overlaps, find_overlaps_brute_force, validate_panel_set};

use crate::algo::spatial::DEFAULT_CELL_SIZE_MM;
use crate::error::{PatternError, Result};

/// Standard fabric bolt widths in millimeters (36", 45", 54", 60").
pub const STANDARD_FABRIC_WIDTHS_MM: [f64; 4] = [914.4, 1143.0, 1371.6, 1524.0];

/// Thresholds used by the validators.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ValidationOptions {
    /// Available fabric widths (mm).
    pub fabric_widths_mm: Vec<f64>,

    /// Narrowest acceptable seam allowance (mm). Below is an error.
    pub min_seam_allowance_mm: f64,

    /// Widest acceptable seam allowance (mm). Above is a warning.
    pub max_seam_allowance_mm: f64,

    /// Nominal seam allowance (mm). Widths spreading more than half of this
    /// across one panel are flagged.
    pub standard_seam_allowance_mm: f64,

    /// Smallest acceptable panel area (mm²).
    pub min_panel_area_mm2: f64,

    /// Largest acceptable long-to-short side ratio.
    pub max_aspect_ratio: f64,

    /// Shortest acceptable cut-line edge (mm).
    pub min_edge_length_mm: f64,

    /// Acceptable flattened/original length ratio range for cut lines.
    pub distortion_range: (f64, f64),

    /// Cell size of the overlap grid (mm).
    pub grid_cell_size_mm: f64,

    /// Fabric efficiency below which a layout is flagged as wasteful.
    pub min_fabric_efficiency: f64,

    /// Extra fabric length added for handling, as a fraction.
    pub handling_margin: f64,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            fabric_widths_mm: STANDARD_FABRIC_WIDTHS_MM.to_vec(),
            min_seam_allowance_mm: 3.0,
            max_seam_allowance_mm: 15.0,
            standard_seam_allowance_mm: 5.0,
            min_panel_area_mm2: 100.0,
            max_aspect_ratio: 20.0,
            min_edge_length_mm: 10.0,
            distortion_range: (0.5, 2.0),
            grid_cell_size_mm: DEFAULT_CELL_SIZE_MM,
            min_fabric_efficiency: 0.65,
            handling_margin: 0.10,
        }
    }
}

impl ValidationOptions {
    /// Set the available fabric widths.
    pub fn with_fabric_widths(mut self, widths_mm: Vec<f64>) -> Self {
        self.fabric_widths_mm = widths_mm;
        self
    }

    /// Set the seam allowance bounds.
    pub fn with_seam_allowance_range(mut self, min_mm: f64, max_mm: f64) -> Self {
        self.min_seam_allowance_mm = min_mm;
        self.max_seam_allowance_mm = max_mm;
        self
    }

    /// Set the acceptable distortion range.
    pub fn with_distortion_range(mut self, low: f64, high: f64) -> Self {
        self.distortion_range = (low, high);
        self
    }

    /// Set the overlap grid cell size.
    pub fn with_grid_cell_size(mut self, cell_mm: f64) -> Self {
        self.grid_cell_size_mm = cell_mm;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if let Some(&w) = self.fabric_widths_mm.iter().find(|&&w| !(w > 0.0) || !w.is_finite()) {
            return Err(PatternError::invalid_param("fabric_widths_mm", w, "must be positive"));
        }
        if !(self.min_seam_allowance_mm >= 0.0) {
            return Err(PatternError::invalid_param(
                "min_seam_allowance_mm",
                self.min_seam_allowance_mm,
                "must be non-negative",
            ));
        }
        if !(self.max_seam_allowance_mm >= self.min_seam_allowance_mm) {
            return Err(PatternError::invalid_param(
                "max_seam_allowance_mm",
                self.max_seam_allowance_mm,
                "must be at least min_seam_allowance_mm",
            ));
        }
        let (low, high) = self.distortion_range;
        if !(low > 0.0 && high >= low) {
            return Err(PatternError::invalid_param(
                "distortion_range",
                format!("({low}, {high})"),
                "must satisfy 0 < low <= high",
            ));
        }
        if !(self.max_aspect_ratio >= 1.0) {
            return Err(PatternError::invalid_param(
                "max_aspect_ratio",
                self.max_aspect_ratio,
                "must be at least 1",
            ));
        }
        if !(self.grid_cell_size_mm > 0.0) || !self.grid_cell_size_mm.is_finite() {
            return Err(PatternError::invalid_param(
                "grid_cell_size_mm",
                self.grid_cell_size_mm,
                "must be finite and positive",
            ));
        }
        if !(self.handling_margin >= 0.0) {
            return Err(PatternError::invalid_param(
                "handling_margin",
                self.handling_margin,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_valid() {
        let options = ValidationOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.fabric_widths_mm.len(), 4);
        assert_eq!(options.min_seam_allowance_mm, 3.0);
        assert_eq!(options.max_seam_allowance_mm, 15.0);
    }

    #[test]
    fn test_invalid_options() {
        let options = ValidationOptions::default().with_fabric_widths(vec![1000.0, 0.0]);
        assert!(options.validate().is_err());

        let options = ValidationOptions::default().with_seam_allowance_range(10.0, 5.0);
        assert!(options.validate().is_err());

        let options = ValidationOptions::default().with_distortion_range(0.0, 2.0);
        assert!(options.validate().is_err());

        let options = ValidationOptions::default().with_grid_cell_size(-1.0);
        assert!(options.validate().is_err());
    }
}
