//! Least Squares Conformal Maps (LSCM) flattening of a single panel.
//!
//! The panel's boundary loop is pinned to the unit circle (the Dirichlet
//! condition) and every interior vertex solves the discrete Laplace equation
//! with cotangent weights. Both coordinates share one coefficient matrix and
//! are solved independently with conjugate gradient. The result is rescaled
//! so that edge lengths match the 3D surface on average and converted from
//! meters to millimeters.
//!
//! # References
//!
//! - Lévy, B., Petitjean, S., Ray, N., & Maillot, J. (2002). "Least squares
//!   conformal maps for automatic texture atlas generation." ACM SIGGRAPH.
//! - Pinkall, U., & Polthier, K. (1993). "Computing discrete minimal surfaces
//!   and their conjugates." Experimental Mathematics.

use std::f64::consts::TAU;

use log::debug;
use nalgebra::{DVector, Point2, Point3};

use crate::algo::CancelToken;
use crate::error::{PatternError, Result};
use crate::mesh::{Mesh, MeshConnectivity, Panel};

use super::flattened::{FlattenedPanel, PatternEdge};
use super::sparse::{conjugate_gradient, CsrMatrix, Solution, SolverOptions};

/// Meters to millimeters.
const MM_PER_M: f64 = 1000.0;

/// Flattened edges shorter than this are skipped when computing the scale.
const MIN_SCALE_EDGE: f64 = 1e-12;

/// Options for panel flattening.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlattenOptions {
    /// Conjugate gradient settings for the U and V solves.
    pub solver: SolverOptions,

    /// Lower bound for cotangent weights. Keeps the Laplacian positive
    /// definite on obtuse or degenerate triangles.
    pub cotangent_floor: f64,

    /// Seam allowance width recorded on every boundary edge (mm).
    pub seam_allowance_mm: f64,

    /// Whether the U and V systems are solved concurrently.
    pub parallel: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            solver: SolverOptions::default(),
            cotangent_floor: 1e-6,
            seam_allowance_mm: 5.0,
            parallel: true,
        }
    }
}

impl FlattenOptions {
    /// Set the solver options.
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    /// Set the cotangent weight floor.
    pub fn with_cotangent_floor(mut self, floor: f64) -> Self {
        self.cotangent_floor = floor;
        self
    }

    /// Set the seam allowance width.
    pub fn with_seam_allowance(mut self, width_mm: f64) -> Self {
        self.seam_allowance_mm = width_mm;
        self
    }

    /// Solve U and V one after the other.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        self.solver.validate()?;
        if !(self.cotangent_floor > 0.0) {
            return Err(PatternError::invalid_param(
                "cotangent_floor",
                self.cotangent_floor,
                "must be positive",
            ));
        }
        if !(self.seam_allowance_mm >= 0.0) {
            return Err(PatternError::invalid_param(
                "seam_allowance_mm",
                self.seam_allowance_mm,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Flatten a panel of `mesh` into a 2D pattern piece.
///
/// # Errors
///
/// - [`PatternError::DisconnectedGeometry`] if the panel is not one component
/// - [`PatternError::DegenerateGeometry`] if the panel has no single simple
///   boundary loop of at least 3 vertices, or only triangles that repeat a
///   vertex
/// - [`PatternError::NonManifoldEdge`] for edges with more than two triangles
/// - [`PatternError::NumericalInstability`] for non-finite coordinates or an
///   unusable scale, and the solver errors of [`conjugate_gradient`]
///
/// # Example
///
/// ```
/// use flatpattern::prelude::*;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(0.1, 0.0, 0.0),
///     Point3::new(0.1, 0.1, 0.0),
///     Point3::new(0.0, 0.1, 0.0),
/// ];
/// let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
/// let panel = Panel::from_triangles(PanelId(0), vec![[0, 1, 2], [0, 2, 3]], PanelColor::default());
///
/// let flat = flatten(&panel, &mesh, &FlattenOptions::default()).unwrap();
/// assert_eq!(flat.len(), 4);
/// ```
pub fn flatten(panel: &Panel, mesh: &Mesh, options: &FlattenOptions) -> Result<FlattenedPanel> {
    flatten_with_cancel(panel, mesh, options, None)
}

/// [`flatten`] with a cancel token checked between solver iterations.
pub fn flatten_with_cancel(
    panel: &Panel,
    mesh: &Mesh,
    options: &FlattenOptions,
    cancel: Option<&CancelToken>,
) -> Result<FlattenedPanel> {
    options.validate()?;

    let mut local = panel.localize(mesh)?;
    let n = local.positions.len();
    let before = local.triangles.len();
    local.triangles.retain(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2]);
    if local.triangles.len() < before {
        debug!(
            "{}: ignoring {} triangles with a repeated vertex",
            panel.id(),
            before - local.triangles.len()
        );
    }
    if local.triangles.is_empty() {
        return Err(PatternError::DegenerateGeometry(format!(
            "{} has no triangles",
            panel.id()
        )));
    }

    let connectivity = MeshConnectivity::build(n, &local.triangles)?;
    connectivity.check_manifold()?;
    connectivity.check_connected()?;
    let boundary = connectivity.single_boundary_loop()?;

    let mut uv = pin_boundary_to_circle(&boundary, n);

    let mut is_boundary = vec![false; n];
    for &v in &boundary {
        is_boundary[v] = true;
    }
    let interior: Vec<usize> = (0..n).filter(|&v| !is_boundary[v]).collect();

    if interior.is_empty() {
        debug!("{}: no interior vertices, using boundary pinning", panel.id());
    } else {
        let system = LaplacianSystem::assemble(
            &local.positions,
            &local.triangles,
            &connectivity,
            &interior,
            &is_boundary,
            &uv,
            options.cotangent_floor,
        );
        let (u, v) = system.solve(&options.solver, options.parallel, cancel)?;
        debug!(
            "{}: solved {} interior vertices in {}/{} iterations",
            panel.id(),
            interior.len(),
            u.iterations,
            v.iterations
        );
        for (k, &vertex) in interior.iter().enumerate() {
            uv[vertex] = Point2::new(u.values[k], v.values[k]);
        }
    }

    if let Some(bad) = uv.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(PatternError::NumericalInstability(format!(
            "{} vertex {} has non-finite coordinates",
            panel.id(),
            bad
        )));
    }

    let scale = compute_scale(&local.positions, &uv, &connectivity)?;
    let factor = scale * MM_PER_M;
    let points: Vec<Point2<f64>> = uv.iter().map(|p| Point2::from(p.coords * factor)).collect();

    let edges = boundary_edges(&local.positions, &boundary, options.seam_allowance_mm);

    debug!(
        "{}: flattened {} vertices, {} boundary, scale {:.6}",
        panel.id(),
        n,
        boundary.len(),
        scale
    );

    Ok(FlattenedPanel::new(
        panel.id(),
        points,
        local.triangles,
        boundary,
        edges,
        panel.vertices().to_vec(),
        panel.color(),
    ))
}

/// Pin boundary vertex `i` of `N` to `(cos θ, sin θ)` with `θ = 2πi/N`.
/// Other vertices start at the origin.
fn pin_boundary_to_circle(boundary: &[usize], n_vertices: usize) -> Vec<Point2<f64>> {
    let mut uv = vec![Point2::origin(); n_vertices];
    let count = boundary.len() as f64;
    for (i, &v) in boundary.iter().enumerate() {
        let theta = TAU * i as f64 / count;
        uv[v] = Point2::new(theta.cos(), theta.sin());
    }
    uv
}

/// Cotangent weight of edge `(i, j)`: half the sum of the cotangents of the
/// angles opposite the edge, floored at `floor`.
fn cotangent_weight(
    positions: &[Point3<f64>],
    triangles: &[[usize; 3]],
    connectivity: &MeshConnectivity,
    i: usize,
    j: usize,
    floor: f64,
) -> f64 {
    let mut sum = 0.0;
    for &t in connectivity.edge_triangles(i, j) {
        let Some(&k) = triangles[t].iter().find(|&&v| v != i && v != j) else {
            continue;
        };
        let v1 = positions[i] - positions[k];
        let v2 = positions[j] - positions[k];
        let cross = v1.cross(&v2).norm();
        if cross > 1e-20 {
            sum += v1.dot(&v2) / cross;
        }
    }
    (0.5 * sum).max(floor)
}

/// The interior-vertex Laplacian with the pinned boundary moved to the
/// right-hand sides.
struct LaplacianSystem {
    matrix: CsrMatrix,
    rhs_u: DVector<f64>,
    rhs_v: DVector<f64>,
}

impl LaplacianSystem {
    fn assemble(
        positions: &[Point3<f64>],
        triangles: &[[usize; 3]],
        connectivity: &MeshConnectivity,
        interior: &[usize],
        is_boundary: &[bool],
        pinned: &[Point2<f64>],
        floor: f64,
    ) -> Self {
        let m = interior.len();
        let mut row_of = vec![usize::MAX; positions.len()];
        for (row, &v) in interior.iter().enumerate() {
            row_of[v] = row;
        }

        let mut triplets = Vec::with_capacity(m * 7);
        let mut rhs_u = DVector::zeros(m);
        let mut rhs_v = DVector::zeros(m);

        for (row, &i) in interior.iter().enumerate() {
            let mut diagonal = 0.0;
            for &j in connectivity.neighbors(i) {
                let w = cotangent_weight(positions, triangles, connectivity, i, j, floor);
                diagonal += w;
                if is_boundary[j] {
                    rhs_u[row] += w * pinned[j].x;
                    rhs_v[row] += w * pinned[j].y;
                } else {
                    triplets.push((row, row_of[j], -w));
                }
            }
            triplets.push((row, row, diagonal));
        }

        Self {
            matrix: CsrMatrix::from_triplets(m, m, &triplets),
            rhs_u,
            rhs_v,
        }
    }

    /// Solve both coordinates against the shared matrix.
    fn solve(
        &self,
        options: &SolverOptions,
        parallel: bool,
        cancel: Option<&CancelToken>,
    ) -> Result<(Solution, Solution)> {
        let solve_u = || conjugate_gradient(&self.matrix, &self.rhs_u, options, cancel);
        let solve_v = || conjugate_gradient(&self.matrix, &self.rhs_v, options, cancel);
        let (u, v) = if parallel {
            rayon::join(solve_u, solve_v)
        } else {
            (solve_u(), solve_v())
        };
        Ok((u?, v?))
    }
}

/// Average ratio of 3D to flattened edge length over all panel edges.
fn compute_scale(
    positions: &[Point3<f64>],
    uv: &[Point2<f64>],
    connectivity: &MeshConnectivity,
) -> Result<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for ((a, b), _) in connectivity.edges() {
        let flat = (uv[a] - uv[b]).norm();
        if flat > MIN_SCALE_EDGE {
            sum += (positions[a] - positions[b]).norm() / flat;
            count += 1;
        }
    }
    if count == 0 {
        return Err(PatternError::NumericalInstability(
            "no edge with non-zero flattened length to derive a scale".into(),
        ));
    }
    let scale = sum / count as f64;
    if !scale.is_finite() || scale <= 0.0 {
        return Err(PatternError::NumericalInstability(format!(
            "unusable scale factor {}",
            scale
        )));
    }
    Ok(scale)
}

/// Cut lines along the boundary loop with their true 3D length, followed by
/// one seam allowance per boundary edge.
fn boundary_edges(
    positions: &[Point3<f64>],
    boundary: &[usize],
    seam_allowance_mm: f64,
) -> Vec<PatternEdge> {
    let n = boundary.len();
    let mut edges = Vec::with_capacity(2 * n);
    for i in 0..n {
        let a = boundary[i];
        let b = boundary[(i + 1) % n];
        let length = (positions[b] - positions[a]).norm() * MM_PER_M;
        edges.push(PatternEdge::cut_line(a, b, length));
    }
    for i in 0..n {
        edges.push(PatternEdge::seam_allowance(
            boundary[i],
            boundary[(i + 1) % n],
            seam_allowance_mm,
        ));
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::triangle_signed_area;
    use crate::mesh::{PanelColor, PanelId};

    fn panel_of(triangles: Vec<[usize; 3]>) -> Panel {
        Panel::from_triangles(PanelId(0), triangles, PanelColor::default())
    }

    fn create_quad_mesh() -> Mesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    fn create_disk_mesh() -> Mesh {
        // Center vertex + 6 boundary vertices, 10 cm radius.
        let mut vertices = vec![Point3::new(0.0, 0.0, 0.0)];
        for i in 0..6 {
            let a = TAU * i as f64 / 6.0;
            vertices.push(Point3::new(0.1 * a.cos(), 0.1 * a.sin(), 0.0));
        }
        let faces: Vec<[usize; 3]> = (0..6).map(|i| [0, 1 + i, 1 + (i + 1) % 6]).collect();
        Mesh::from_triangles(&vertices, &faces).unwrap()
    }

    fn create_grid(n: usize, spacing: f64) -> (Mesh, Vec<[usize; 3]>) {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
            }
        }
        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = v00 + 1;
                let v01 = v00 + (n + 1);
                let v11 = v01 + 1;
                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }
        (Mesh::from_triangles(&vertices, &faces).unwrap(), faces)
    }

    /// Cube of side `s` split into six single-quad panels.
    fn create_cube(s: f64) -> (Mesh, Vec<Vec<[usize; 3]>>) {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(s, 0.0, 0.0),
            Point3::new(s, s, 0.0),
            Point3::new(0.0, s, 0.0),
            Point3::new(0.0, 0.0, s),
            Point3::new(s, 0.0, s),
            Point3::new(s, s, s),
            Point3::new(0.0, s, s),
        ];
        let quads = [
            [0, 3, 2, 1], // bottom
            [4, 5, 6, 7], // top
            [0, 1, 5, 4], // front
            [2, 3, 7, 6], // back
            [1, 2, 6, 5], // right
            [3, 0, 4, 7], // left
        ];
        let faces: Vec<Vec<[usize; 3]>> = quads
            .iter()
            .map(|q| vec![[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
            .collect();
        let all: Vec<[usize; 3]> = faces.iter().flatten().copied().collect();
        (Mesh::from_triangles(&vertices, &all).unwrap(), faces)
    }

    #[test]
    fn test_single_quad_is_exact_circle_pinning() {
        let mesh = create_quad_mesh();
        let flat = flatten(&panel_of(vec![[0, 1, 2], [0, 2, 3]]), &mesh, &FlattenOptions::default())
            .unwrap();

        // Every edge ratio is 1/√2, so the scale is exact.
        let factor = std::f64::consts::FRAC_1_SQRT_2 * MM_PER_M;
        let expected = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];
        for (p, (x, y)) in flat.points().iter().zip(expected) {
            assert!((p.x - x * factor).abs() < 1e-9, "{:?}", p);
            assert!((p.y - y * factor).abs() < 1e-9, "{:?}", p);
        }
        assert_eq!(flat.boundary(), &[0, 1, 2, 3]);
        assert_eq!(flat.cut_lines().count(), 4);
        assert_eq!(flat.seam_allowances().count(), 4);
    }

    #[test]
    fn test_cube_faces_are_isometric() {
        let (mesh, faces) = create_cube(0.2);
        for (i, tris) in faces.into_iter().enumerate() {
            let panel = Panel::from_triangles(PanelId(i), tris, PanelColor::default());
            let flat = flatten(&panel, &mesh, &FlattenOptions::default()).unwrap();
            for edge in flat.cut_lines() {
                let ratio = edge.flattened_length(flat.points()) / edge.original_length_mm;
                assert!((0.98..=1.02).contains(&ratio), "face {} ratio {}", i, ratio);
                assert!((edge.original_length_mm - 200.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_disconnected_triangles_fail() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let result = flatten(&panel_of(vec![[0, 1, 2], [3, 4, 5]]), &mesh, &FlattenOptions::default());
        assert!(matches!(result, Err(PatternError::DisconnectedGeometry { .. })));
    }

    #[test]
    fn test_disk_center_solves_to_origin() {
        let mesh = create_disk_mesh();
        let faces: Vec<[usize; 3]> = mesh.triangles().collect();
        let flat = flatten(&panel_of(faces), &mesh, &FlattenOptions::default()).unwrap();

        // Local vertex 0 is the center (first appearance order).
        let center = flat.points()[0];
        assert!(center.coords.norm() < 1e-6, "center at {:?}", center);
        assert_eq!(flat.boundary().len(), 6);
    }

    #[test]
    fn test_grid_has_no_flipped_triangles() {
        let (mesh, faces) = create_grid(4, 0.05);
        let flat = flatten(&panel_of(faces), &mesh, &FlattenOptions::default()).unwrap();
        assert_eq!(flat.len(), 25);

        let points = flat.points();
        for tri in flat.triangles() {
            let area = triangle_signed_area(&points[tri[0]], &points[tri[1]], &points[tri[2]]);
            assert!(area > 0.0, "flipped triangle {:?}", tri);
        }
    }

    #[test]
    fn test_sequential_matches_parallel() {
        let (mesh, faces) = create_grid(3, 0.1);
        let panel = panel_of(faces);
        let a = flatten(&panel, &mesh, &FlattenOptions::default()).unwrap();
        let b = flatten(&panel, &mesh, &FlattenOptions::default().sequential()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_closed_panel_fails() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        let mesh = Mesh::from_triangles(&vertices, &faces).unwrap();
        let result = flatten(&panel_of(faces.to_vec()), &mesh, &FlattenOptions::default());
        assert!(matches!(result, Err(PatternError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_pinched_panel_fails() {
        // Square 0-1-2-5 with triangle 2-3-4 hanging off corner 2.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(2.0, 2.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = [[0, 1, 2], [0, 2, 5], [2, 3, 4]];
        let mesh = Mesh::from_triangles(&vertices, &faces).unwrap();
        let panel = Panel::new(PanelId(0), vec![0, 1, 2, 3, 4, 5], faces.to_vec(), PanelColor::default()).unwrap();
        let result = flatten(&panel, &mesh, &FlattenOptions::default());
        assert!(matches!(result, Err(PatternError::DegenerateGeometry(_))), "{:?}", result);
    }

    #[test]
    fn test_repeated_vertex_triangle_is_ignored() {
        let mesh = {
            let vertices = vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ];
            Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3], [0, 0, 1]]).unwrap()
        };
        let flat = flatten(&panel_of(vec![[0, 1, 2], [0, 2, 3], [0, 0, 1]]), &mesh, &FlattenOptions::default()).unwrap();
        let clean = flatten(&panel_of(vec![[0, 1, 2], [0, 2, 3]]), &create_quad_mesh(), &FlattenOptions::default()).unwrap();
        assert_eq!(flat.len(), 4);
        assert_eq!(flat.triangles().len(), 2);
        assert_eq!(flat.points(), clean.points());

        let only_degenerate = flatten(&panel_of(vec![[0, 0, 1]]), &mesh, &FlattenOptions::default());
        assert!(matches!(only_degenerate, Err(PatternError::DegenerateGeometry(_))));
    }

    #[test]
    fn test_zero_area_panel_fails_scale() {
        let vertices = vec![Point3::origin(); 3];
        let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        let result = flatten(&panel_of(vec![[0, 1, 2]]), &mesh, &FlattenOptions::default());
        assert!(matches!(result, Err(PatternError::NumericalInstability(_))));
    }

    #[test]
    fn test_seam_allowance_metadata() {
        let mesh = create_quad_mesh();
        let options = FlattenOptions::default().with_seam_allowance(8.0);
        let flat = flatten(&panel_of(vec![[0, 1, 2], [0, 2, 3]]), &mesh, &options).unwrap();
        assert!(flat.seam_allowances().all(|e| e.original_length_mm == 8.0));
    }

    #[test]
    fn test_cotangent_weight_right_isoceles() {
        // Edge (0, 2) of the unit quad is opposite two right angles: cot = 0,
        // so the weight falls to the floor.
        let mesh = create_quad_mesh();
        let tris = vec![[0, 1, 2], [0, 2, 3]];
        let conn = MeshConnectivity::build(4, &tris).unwrap();
        let w = cotangent_weight(mesh.vertices(), &tris, &conn, 0, 2, 1e-6);
        assert!((w - 1e-6).abs() < 1e-12);

        // Edge (0, 1) is opposite a 45° angle: cot = 1, halved.
        let w = cotangent_weight(mesh.vertices(), &tris, &conn, 0, 1, 1e-6);
        assert!((w - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_options() {
        let mesh = create_quad_mesh();
        let options = FlattenOptions::default().with_cotangent_floor(0.0);
        let result = flatten(&panel_of(vec![[0, 1, 2], [0, 2, 3]]), &mesh, &options);
        assert!(matches!(result, Err(PatternError::InvalidParameter { .. })));
    }
}
