//! Flattened panel storage.
//!
//! This module provides [`FlattenedPanel`], the 2D pattern piece produced by
//! flattening one panel. Points are in millimeters and index-aligned with the
//! source panel's vertex order. Values are never mutated after creation;
//! transforms such as [`FlattenedPanel::translated`] return new values.

use nalgebra::{Point2, Vector2};

use crate::geometry::{polygon_signed_area, BoundingBox2};
use crate::mesh::{PanelColor, PanelId};

/// Role of a pattern edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// A boundary edge of the panel outline.
    CutLine,
    /// Seam allowance metadata attached to a boundary edge.
    SeamAllowance,
}

/// An edge of a flattened panel.
///
/// For [`EdgeKind::CutLine`] edges `original_length_mm` is the true 3D length
/// of the edge. For [`EdgeKind::SeamAllowance`] edges it carries the allowance
/// width; no offset geometry is computed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternEdge {
    /// Start point index.
    pub start: usize,
    /// End point index.
    pub end: usize,
    /// Edge role.
    pub kind: EdgeKind,
    /// Original 3D length (cut lines) or allowance width (seams), in mm.
    pub original_length_mm: f64,
}

impl PatternEdge {
    /// Create a cut-line edge.
    pub fn cut_line(start: usize, end: usize, original_length_mm: f64) -> Self {
        Self {
            start,
            end,
            kind: EdgeKind::CutLine,
            original_length_mm,
        }
    }

    /// Create a seam-allowance edge of the given width.
    pub fn seam_allowance(start: usize, end: usize, width_mm: f64) -> Self {
        Self {
            start,
            end,
            kind: EdgeKind::SeamAllowance,
            original_length_mm: width_mm,
        }
    }

    /// Whether this is a cut line.
    #[inline]
    pub fn is_cut_line(&self) -> bool {
        self.kind == EdgeKind::CutLine
    }

    /// Length of the edge in the pattern plane.
    #[inline]
    pub fn flattened_length(&self, points: &[Point2<f64>]) -> f64 {
        (points[self.end] - points[self.start]).norm()
    }
}

/// A 2D pattern piece in millimeters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlattenedPanel {
    panel_id: PanelId,
    points: Vec<Point2<f64>>,
    edges: Vec<PatternEdge>,
    bounds: BoundingBox2,
    triangles: Vec<[usize; 3]>,
    boundary: Vec<usize>,
    source_vertices: Vec<usize>,
    color: PanelColor,
}

impl FlattenedPanel {
    /// Assemble a flattened panel.
    ///
    /// `boundary` is the ordered outline as point indices, `source_vertices`
    /// maps each point back to its global mesh vertex.
    pub fn new(
        panel_id: PanelId,
        points: Vec<Point2<f64>>,
        triangles: Vec<[usize; 3]>,
        boundary: Vec<usize>,
        edges: Vec<PatternEdge>,
        source_vertices: Vec<usize>,
        color: PanelColor,
    ) -> Self {
        let bounds = BoundingBox2::from_points(&points)
            .unwrap_or_else(|| BoundingBox2::new(Point2::origin(), Point2::origin()));
        Self {
            panel_id,
            points,
            edges,
            bounds,
            triangles,
            boundary,
            source_vertices,
            color,
        }
    }

    /// Build a panel directly from an outline polygon.
    ///
    /// Cut lines take their flattened length as the original length (no
    /// distortion) and every boundary edge gets a seam allowance of
    /// `seam_allowance_mm`. Useful for hand-made pieces and fixtures.
    pub fn from_outline(panel_id: PanelId, outline: Vec<Point2<f64>>, seam_allowance_mm: f64) -> Self {
        let n = outline.len();
        let boundary: Vec<usize> = (0..n).collect();
        let mut edges = Vec::with_capacity(2 * n);
        for i in 0..n {
            let j = (i + 1) % n;
            edges.push(PatternEdge::cut_line(i, j, (outline[j] - outline[i]).norm()));
        }
        for i in 0..n {
            edges.push(PatternEdge::seam_allowance(i, (i + 1) % n, seam_allowance_mm));
        }
        Self::new(
            panel_id,
            outline,
            Vec::new(),
            boundary,
            edges,
            Vec::new(),
            PanelColor::default(),
        )
    }

    /// Source panel identifier.
    #[inline]
    pub fn panel_id(&self) -> PanelId {
        self.panel_id
    }

    /// Points in millimeters.
    #[inline]
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the panel has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All edges.
    #[inline]
    pub fn edges(&self) -> &[PatternEdge] {
        &self.edges
    }

    /// Cut-line edges in outline order.
    pub fn cut_lines(&self) -> impl Iterator<Item = &PatternEdge> + '_ {
        self.edges.iter().filter(|e| e.kind == EdgeKind::CutLine)
    }

    /// Seam-allowance edges.
    pub fn seam_allowances(&self) -> impl Iterator<Item = &PatternEdge> + '_ {
        self.edges.iter().filter(|e| e.kind == EdgeKind::SeamAllowance)
    }

    /// Axis-aligned bounds.
    #[inline]
    pub fn bounds(&self) -> &BoundingBox2 {
        &self.bounds
    }

    /// Bounding-box width.
    #[inline]
    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    /// Bounding-box height.
    #[inline]
    pub fn height(&self) -> f64 {
        self.bounds.height()
    }

    /// Triangles in point indices (empty for outline-only panels).
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Ordered outline as point indices.
    #[inline]
    pub fn boundary(&self) -> &[usize] {
        &self.boundary
    }

    /// Global mesh vertex for each point.
    #[inline]
    pub fn source_vertices(&self) -> &[usize] {
        &self.source_vertices
    }

    /// Display colour of the source panel.
    #[inline]
    pub fn color(&self) -> PanelColor {
        self.color
    }

    /// Outline polygon.
    pub fn outline(&self) -> Vec<Point2<f64>> {
        self.boundary.iter().map(|&i| self.points[i]).collect()
    }

    /// Enclosed area in mm².
    pub fn area(&self) -> f64 {
        polygon_signed_area(&self.outline()).abs()
    }

    /// A copy shifted by `(dx, dy)` millimeters.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let offset = Vector2::new(dx, dy);
        Self {
            points: self.points.iter().map(|p| p + offset).collect(),
            bounds: self.bounds.translated(dx, dy),
            ..self.clone()
        }
    }
}
