//! Core mesh data structures.
//!
//! This module provides the immutable scanned [`Mesh`], the [`Panel`] subsets
//! produced by segmentation and the per-panel [`MeshConnectivity`] graph used
//! to validate panel topology before flattening.
//!
//! # Overview
//!
//! A [`Mesh`] is a flat vertex list plus a flat triangle-index list, exactly as
//! the capture collaborator hands it over. A [`Panel`] references a subset of
//! the mesh by global vertex and triangle indices. Flattening works on a
//! [`LocalPanel`], which re-indexes the panel to `0..k` in the panel's own
//! vertex order.
//!
//! # Construction
//!
//! ```
//! use flatpattern::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = Mesh::new(vertices, vec![0, 1, 2]).unwrap();
//! assert_eq!(mesh.num_triangles(), 1);
//! ```

mod connectivity;
mod panel;

pub use connectivity::MeshConnectivity;
pub use panel::{LocalPanel, Panel, PanelColor, PanelId};

use nalgebra::Point3;

use crate::error::{PatternError, Result};

/// A triangulated surface in meters.
///
/// Immutable once constructed: the index contract (every index in bounds,
/// index count divisible by three) is checked by [`Mesh::new`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    vertices: Vec<Point3<f64>>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Create a mesh from vertex positions and a flat triangle-index list.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidMesh`] if the index count is not a
    /// multiple of three or an index is out of bounds.
    pub fn new(vertices: Vec<Point3<f64>>, indices: Vec<u32>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(PatternError::InvalidMesh(format!(
                "triangle index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some((pos, &index)) = indices
            .iter()
            .enumerate()
            .find(|(_, &i)| i as usize >= vertices.len())
        {
            return Err(PatternError::InvalidMesh(format!(
                "triangle {} references vertex {} but mesh has {} vertices",
                pos / 3,
                index,
                vertices.len()
            )));
        }
        Ok(Self { vertices, indices })
    }

    /// Create a mesh from vertex positions and triangle triples.
    pub fn from_triangles(vertices: &[Point3<f64>], triangles: &[[usize; 3]]) -> Result<Self> {
        let mut indices = Vec::with_capacity(triangles.len() * 3);
        for tri in triangles {
            for &v in tri {
                let v = u32::try_from(v).map_err(|_| {
                    PatternError::InvalidMesh(format!("vertex index {} exceeds u32", v))
                })?;
                indices.push(v);
            }
        }
        Self::new(vertices.to_vec(), indices)
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the mesh has no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Vertex positions.
    #[inline]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.vertices[v]
    }

    /// The flat triangle-index list.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex indices of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let base = t * 3;
        [
            self.indices[base] as usize,
            self.indices[base + 1] as usize,
            self.indices[base + 2] as usize,
        ]
    }

    /// Iterate over all triangles as vertex-index triples.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|c| [c[0] as usize, c[1] as usize, c[2] as usize])
    }
}
