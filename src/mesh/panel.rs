//! Panels: connected subsets of a mesh destined to become pattern pieces.

use std::collections::{HashMap, HashSet};
use std::fmt;

use nalgebra::Point3;

use super::Mesh;
use crate::error::{PatternError, Result};

/// Identifier of a panel within one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelId(pub usize);

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}

/// Opaque display colour attached to a panel. Never interpreted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelColor(pub u32);

impl PanelColor {
    const PALETTE: [u32; 8] = [
        0xE6194B, 0x3CB44B, 0x4363D8, 0xF58231, 0x911EB4, 0x42D4F4, 0xF032E6, 0xBFEF45,
    ];

    /// Deterministic palette colour for the `n`-th panel.
    pub fn from_palette(n: usize) -> Self {
        Self(Self::PALETTE[n % Self::PALETTE.len()])
    }
}

impl Default for PanelColor {
    fn default() -> Self {
        Self(0x808080)
    }
}

/// A subset of a mesh: global vertex indices plus global triangles.
///
/// Every triangle vertex is a member of the vertex set. The vertex order is
/// preserved and defines the local indexing used by flattening, so flattened
/// points can be mapped back to mesh vertices.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Panel {
    id: PanelId,
    vertices: Vec<usize>,
    triangles: Vec<[usize; 3]>,
    color: PanelColor,
}

impl Panel {
    /// Create a panel from an explicit vertex set and triangle list.
    ///
    /// Duplicate vertices are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidParameter`] if a triangle uses a vertex
    /// outside the vertex set.
    pub fn new(
        id: PanelId,
        vertices: Vec<usize>,
        triangles: Vec<[usize; 3]>,
        color: PanelColor,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(vertices.len());
        let mut unique = Vec::with_capacity(vertices.len());
        for v in vertices {
            if seen.insert(v) {
                unique.push(v);
            }
        }
        for tri in &triangles {
            if let Some(&v) = tri.iter().find(|v| !seen.contains(v)) {
                return Err(PatternError::invalid_param(
                    "panel.triangles",
                    v,
                    "triangle vertex is not a member of the panel vertex set",
                ));
            }
        }
        Ok(Self {
            id,
            vertices: unique,
            triangles,
            color,
        })
    }

    /// Create a panel from triangles, deriving the vertex set in order of
    /// first appearance.
    pub fn from_triangles(id: PanelId, triangles: Vec<[usize; 3]>, color: PanelColor) -> Self {
        let mut seen = HashSet::new();
        let mut vertices = Vec::new();
        for &v in triangles.iter().flatten() {
            if seen.insert(v) {
                vertices.push(v);
            }
        }
        Self {
            id,
            vertices,
            triangles,
            color,
        }
    }

    /// The panel identifier.
    #[inline]
    pub fn id(&self) -> PanelId {
        self.id
    }

    /// Global vertex indices in panel order.
    #[inline]
    pub fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Global triangles.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The flat global triangle-index list.
    pub fn triangle_indices(&self) -> Vec<usize> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Display colour.
    #[inline]
    pub fn color(&self) -> PanelColor {
        self.color
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Extract the panel's positions and re-index its triangles to `0..k`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidMesh`] if a panel vertex is not in `mesh`.
    pub fn localize(&self, mesh: &Mesh) -> Result<LocalPanel> {
        let mut global_to_local = HashMap::with_capacity(self.vertices.len());
        let mut positions = Vec::with_capacity(self.vertices.len());
        for (local, &global) in self.vertices.iter().enumerate() {
            if global >= mesh.num_vertices() {
                return Err(PatternError::InvalidMesh(format!(
                    "{} references vertex {} but mesh has {} vertices",
                    self.id,
                    global,
                    mesh.num_vertices()
                )));
            }
            global_to_local.insert(global, local);
            positions.push(*mesh.position(global));
        }

        // Membership was checked at construction.
        let triangles = self
            .triangles
            .iter()
            .map(|tri| {
                [
                    global_to_local[&tri[0]],
                    global_to_local[&tri[1]],
                    global_to_local[&tri[2]],
                ]
            })
            .collect();

        Ok(LocalPanel {
            positions,
            triangles,
        })
    }
}

/// A panel re-indexed to local vertex indices `0..k`.
#[derive(Debug, Clone)]
pub struct LocalPanel {
    /// Vertex positions, index-aligned with [`Panel::vertices`].
    pub positions: Vec<Point3<f64>>,
    /// Triangles in local indices.
    pub triangles: Vec<[usize; 3]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_strip_mesh() -> Mesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        Mesh::from_triangles(&vertices, &[[0, 1, 3], [0, 3, 2], [1, 4, 3]]).unwrap()
    }

    #[test]
    fn test_from_triangles_preserves_first_appearance_order() {
        let panel = Panel::from_triangles(PanelId(0), vec![[3, 1, 4], [3, 4, 0]], PanelColor::default());
        assert_eq!(panel.vertices(), &[3, 1, 4, 0]);
        assert_eq!(panel.triangle_indices(), vec![3, 1, 4, 3, 4, 0]);
    }

    #[test]
    fn test_new_rejects_foreign_vertex() {
        let result = Panel::new(PanelId(1), vec![0, 1], vec![[0, 1, 2]], PanelColor::default());
        assert!(matches!(result, Err(PatternError::InvalidParameter { .. })));
    }

    #[test]
    fn test_new_dedups_vertices() {
        let panel = Panel::new(PanelId(1), vec![2, 0, 2, 1], vec![[0, 1, 2]], PanelColor::default()).unwrap();
        assert_eq!(panel.vertices(), &[2, 0, 1]);
    }

    #[test]
    fn test_localize() {
        let mesh = create_strip_mesh();
        let panel = Panel::from_triangles(PanelId(0), vec![[1, 4, 3]], PanelColor::default());
        let local = panel.localize(&mesh).unwrap();
        assert_eq!(local.triangles, vec![[0, 1, 2]]);
        assert_eq!(local.positions[1], Point3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_localize_rejects_foreign_mesh() {
        let mesh = create_strip_mesh();
        let panel = Panel::from_triangles(PanelId(0), vec![[1, 4, 9]], PanelColor::default());
        assert!(matches!(panel.localize(&mesh), Err(PatternError::InvalidMesh(_))));
    }

    #[test]
    fn test_palette_is_cyclic() {
        assert_eq!(PanelColor::from_palette(1), PanelColor::from_palette(9));
        assert_ne!(PanelColor::from_palette(0), PanelColor::from_palette(1));
    }
}
