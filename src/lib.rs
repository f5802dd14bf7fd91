//! # Flatpattern
//!
//! Turns a triangulated 3D surface into flat 2D sewing-pattern pieces.
//!
//! A request segments the mesh into panels, flattens every panel with a
//! cotangent-weighted LSCM solve, arranges the pieces on the fabric and
//! validates them for manufacturability.
//!
//! ## Features
//!
//! - **Segmentation**: deterministic region growing into connected panels
//! - **Flattening**: boundary pinned to a circle, conjugate gradient solve,
//!   rescaled so cut lines keep their 3D length in millimeters
//! - **Validation**: seam allowance, size, distortion and self-intersection
//!   checks per panel; grid-accelerated overlap and fabric width checks per set
//! - **Parallel**: one task per panel via rayon, cooperative cancellation
//!
//! ## Quick Start
//!
//! ```
//! use flatpattern::prelude::*;
//! use nalgebra::Point3;
//!
//! // A 20 cm square, in meters.
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.2, 0.0, 0.0),
//!     Point3::new(0.2, 0.2, 0.0),
//!     Point3::new(0.0, 0.2, 0.0),
//! ];
//! let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! let generator = PatternGenerator::new(GeneratorOptions::new(4));
//! let pattern = generator.generate(&mesh, &CancelToken::new()).unwrap();
//!
//! for panel in pattern.accepted_panels() {
//!     println!("{}: {:.0} mm²", panel.panel_id(), panel.area());
//! }
//! ```
//!
//! ## Step by Step
//!
//! ```
//! use flatpattern::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(0.2, 0.0, 0.0),
//! #     Point3::new(0.2, 0.2, 0.0),
//! #     Point3::new(0.0, 0.2, 0.0),
//! # ];
//! # let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//! let panels = segment(&mesh, 1, &SegmentOptions::default()).unwrap();
//! let flat = flatten(&panels[0], &mesh, &FlattenOptions::default()).unwrap();
//!
//! let report = validate_panel(&flat, &ValidationOptions::default());
//! assert!(report.is_valid);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod geometry;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// ```
/// use flatpattern::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::cancel::CancelToken;
    pub use crate::algo::layout::arrange_panels;
    pub use crate::algo::parameterize::{
        flatten, flatten_with_cancel, EdgeKind, FlattenOptions, FlattenedPanel, PatternEdge,
        SolverOptions,
    };
    pub use crate::algo::pipeline::{GeneratedPattern, GeneratorOptions, PanelFailure, PatternGenerator};
    pub use crate::algo::progress::{GenerationStage, Progress};
    pub use crate::algo::segment::{segment, SegmentOptions};
    pub use crate::algo::validate::{
        estimate_fabric_utilization, validate_panel, validate_panel_set, PatternSetValidationResult,
        PatternValidationResult, Severity, ValidationIssue, ValidationOptions,
    };
    pub use crate::error::{ErrorKind, PatternError, Result};
    pub use crate::mesh::{Mesh, Panel, PanelColor, PanelId};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_cube_faces_flatten_isometrically() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.2, 0.0, 0.0),
            Point3::new(0.2, 0.2, 0.0),
            Point3::new(0.0, 0.2, 0.0),
            Point3::new(0.0, 0.0, 0.2),
            Point3::new(0.2, 0.0, 0.2),
            Point3::new(0.2, 0.2, 0.2),
            Point3::new(0.0, 0.2, 0.2),
        ];
        let quads = [
            [0, 3, 2, 1],
            [4, 5, 6, 7],
            [0, 1, 5, 4],
            [2, 3, 7, 6],
            [1, 2, 6, 5],
            [3, 0, 4, 7],
        ];
        let faces: Vec<[usize; 3]> = quads
            .iter()
            .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
            .collect();
        let mesh = Mesh::from_triangles(&vertices, &faces).unwrap();

        let mut flattened = Vec::new();
        for (i, pair) in faces.chunks(2).enumerate() {
            let panel = Panel::from_triangles(PanelId(i), pair.to_vec(), PanelColor::from_palette(i));
            flattened.push(flatten(&panel, &mesh, &FlattenOptions::default()).unwrap());
        }

        for flat in &flattened {
            for edge in flat.cut_lines() {
                let ratio = edge.flattened_length(flat.points()) / edge.original_length_mm;
                assert!((0.98..=1.02).contains(&ratio), "ratio {}", ratio);
            }
        }

        // Every face lands on the origin; arranged, the set is clean.
        let arranged = arrange_panels(&flattened, 1524.0, 10.0).unwrap();
        let report = validate_panel_set(&arranged, &ValidationOptions::default()).unwrap();
        assert!(report.is_valid, "{}", report.summary());
        assert!((report.total_area_mm2 - 6.0 * 40_000.0).abs() < 1e-3);
    }
}
