//! Panel flattening.
//!
//! This module turns a [`Panel`](crate::mesh::Panel) into a
//! [`FlattenedPanel`]: a 2D pattern piece in millimeters whose cut lines carry
//! their true 3D lengths for distortion auditing.
//!
//! # Algorithm
//!
//! - [`flatten`]: cotangent-weighted Laplace solve with the boundary loop
//!   pinned to a circle, rescaled to physical units
//! - [`conjugate_gradient`]: the sparse solver behind it
//!
//! # Requirements
//!
//! Panels must be a single connected component with exactly one boundary
//! loop (disk topology). Anything else is rejected with a structured error.
//!
//! # Example
//!
//! ```
//! use flatpattern::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.2, 0.0, 0.0),
//!     Point3::new(0.1, 0.2, 0.0),
//! ];
//! let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
//! let panel = Panel::from_triangles(PanelId(0), vec![[0, 1, 2]], PanelColor::default());
//!
//! let flat = flatten(&panel, &mesh, &FlattenOptions::default()).unwrap();
//! for edge in flat.cut_lines() {
//!     println!("{} -> {}: {:.1} mm", edge.start, edge.end, edge.original_length_mm);
//! }
//! ```

mod flattened;
mod lscm;
pub mod sparse;

pub use flattened::{EdgeKind, FlattenedPanel, PatternEdge};
pub use lscm::{flatten, flatten_with_cancel, FlattenOptions};
pub use sparse::{conjugate_gradient, solve, CsrMatrix, Solution, SolverOptions};
