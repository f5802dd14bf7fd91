//! Mesh segmentation into flattenable panels.
//!
//! [`segment`] partitions every triangle of a mesh into at most
//! `target_panel_count` panels. Each panel is grown over edge-adjacent
//! triangles, so it is a single connected piece of surface.
//!
//! # Algorithm
//!
//! 1. Split the mesh into edge-connected components and share the panel
//!    budget between them in proportion to their triangle counts.
//! 2. Within a component, pick seeds by farthest-point sampling over
//!    triangle centroids.
//! 3. Grow all seeds at once, best-first, where stepping onto a triangle costs
//!    the centroid distance scaled up by its normal deviation from the seed.
//!    Panels therefore prefer flat, compact regions.
//! 4. Repair: split anything that fails the connectivity check, absorb
//!    islands that would punch a hole into their only neighbour, and merge
//!    the smallest panels until the budget holds.
//! 5. Triangles that repeat a vertex take no part in growth. Each joins the
//!    first panel that holds all of its vertices.
//!
//! Everything is deterministic: ties are broken by triangle index.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use log::{debug, warn};
use nalgebra::{Point3, Vector3};

use crate::error::{PatternError, Result};
use crate::mesh::{Mesh, MeshConnectivity, Panel, PanelColor, PanelId};

/// Options for mesh segmentation.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SegmentOptions {
    /// How strongly normal deviation from the seed penalises growth.
    /// Zero grows purely by distance.
    pub normal_weight: f64,

    /// Whether islands enclosed by a single panel are merged into it.
    pub merge_enclosed: bool,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            normal_weight: 4.0,
            merge_enclosed: true,
        }
    }
}

impl SegmentOptions {
    /// Set the normal deviation weight.
    pub fn with_normal_weight(mut self, weight: f64) -> Self {
        self.normal_weight = weight;
        self
    }

    /// Keep enclosed islands as separate panels.
    pub fn keep_enclosed(mut self) -> Self {
        self.merge_enclosed = false;
        self
    }

    /// Check that all values are usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.normal_weight >= 0.0) || !self.normal_weight.is_finite() {
            return Err(PatternError::invalid_param(
                "normal_weight",
                self.normal_weight,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Partition `mesh` into at most `target_panel_count` connected panels.
///
/// Every triangle ends up in exactly one panel. If the mesh has more
/// connected components than `target_panel_count`, each component becomes
/// its own panel and a warning is logged. A triangle that repeats a vertex
/// joins the first panel containing all of its vertices, and is dropped with
/// a warning when no panel does.
///
/// # Errors
///
/// - [`PatternError::InvalidParameter`] if `target_panel_count` is zero
/// - [`PatternError::EmptyMesh`] if the mesh has no triangles
/// - [`PatternError::InvalidMesh`] if every triangle repeats a vertex
///
/// # Example
///
/// ```
/// use flatpattern::prelude::*;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
///
/// let panels = segment(&mesh, 2, &SegmentOptions::default()).unwrap();
/// assert_eq!(panels.iter().map(|p| p.num_triangles()).sum::<usize>(), 2);
/// ```
pub fn segment(mesh: &Mesh, target_panel_count: usize, options: &SegmentOptions) -> Result<Vec<Panel>> {
    if target_panel_count == 0 {
        return Err(PatternError::invalid_param(
            "target_panel_count",
            target_panel_count,
            "must be at least 1",
        ));
    }
    if mesh.is_empty() {
        return Err(PatternError::EmptyMesh);
    }
    options.validate()?;

    let adjacency = TriangleAdjacency::from_mesh(mesh);
    let geometry = TriangleGeometry::from_mesh(mesh);
    let components = adjacency.components();
    if components.is_empty() {
        return Err(PatternError::InvalidMesh(format!(
            "all {} triangles repeat a vertex",
            mesh.num_triangles()
        )));
    }
    let budgets = allocate_budgets(&components, &adjacency, target_panel_count);

    let mut labels = vec![usize::MAX; mesh.num_triangles()];
    let mut next_label = 0;
    for (component, &budget) in components.iter().zip(&budgets) {
        if budget <= 1 {
            for &t in component {
                labels[t] = next_label;
            }
            next_label += 1;
            continue;
        }
        let seeds = farthest_point_seeds(component, &geometry, budget);
        grow_regions(&seeds, next_label, &adjacency, &geometry, options.normal_weight, &mut labels);
        next_label += seeds.len();
    }

    let mut regions = collect_regions(&labels);
    regions = split_disconnected(mesh, &adjacency, regions)?;
    if options.merge_enclosed {
        regions = merge_enclosed(mesh, &adjacency, regions)?;
    }
    regions = enforce_budget(&adjacency, regions, target_panel_count);
    regions.sort_by_key(|r| r[0]);
    attach_degenerate(mesh, &adjacency, &mut regions);

    let panels: Vec<Panel> = regions
        .into_iter()
        .enumerate()
        .map(|(i, region)| {
            let triangles = region.iter().map(|&t| mesh.triangle(t)).collect();
            Panel::from_triangles(PanelId(i), triangles, PanelColor::from_palette(i))
        })
        .collect();

    debug!(
        "segmented {} triangles into {} panels (target {})",
        mesh.num_triangles(),
        panels.len(),
        target_panel_count
    );
    Ok(panels)
}

/// Edge adjacency between triangles.
#[derive(Debug, Clone)]
struct TriangleAdjacency {
    /// Undirected edge -> incident triangles.
    edges: BTreeMap<(usize, usize), Vec<usize>>,
    /// Triangles sharing a manifold edge with each triangle.
    neighbors: Vec<Vec<usize>>,
    /// Triangles that repeat a vertex, ascending.
    degenerate: Vec<usize>,
}

impl TriangleAdjacency {
    fn from_mesh(mesh: &Mesh) -> Self {
        let mut edges: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        let mut degenerate = Vec::new();
        for (t, tri) in mesh.triangles().enumerate() {
            if repeats_vertex(&tri) {
                degenerate.push(t);
                continue;
            }
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                edges.entry(key).or_default().push(t);
            }
        }

        let mut neighbors = vec![Vec::new(); mesh.num_triangles()];
        for tris in edges.values() {
            // Non-manifold edges do not join triangles.
            if let [t0, t1] = tris.as_slice() {
                if t0 != t1 {
                    neighbors[*t0].push(*t1);
                    neighbors[*t1].push(*t0);
                }
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            edges,
            neighbors,
            degenerate,
        }
    }

    fn neighbors(&self, t: usize) -> &[usize] {
        &self.neighbors[t]
    }

    /// Edge-connected components of the non-degenerate triangles, each
    /// sorted, ordered by first triangle.
    fn components(&self) -> Vec<Vec<usize>> {
        let growable: Vec<usize> = (0..self.neighbors.len())
            .filter(|t| self.degenerate.binary_search(t).is_err())
            .collect();
        self.components_within(&growable)
    }

    /// Edge-connected components of a triangle subset.
    fn components_within(&self, subset: &[usize]) -> Vec<Vec<usize>> {
        let mut member: BTreeMap<usize, bool> = subset.iter().map(|&t| (t, false)).collect();
        let mut components = Vec::new();
        for &seed in subset {
            if member.get(&seed) != Some(&false) {
                continue;
            }
            member.insert(seed, true);
            let mut stack = vec![seed];
            let mut component = Vec::new();
            while let Some(t) = stack.pop() {
                component.push(t);
                for &n in self.neighbors(t) {
                    if let Some(visited) = member.get_mut(&n) {
                        if !*visited {
                            *visited = true;
                            stack.push(n);
                        }
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components.sort_by_key(|c| c[0]);
        components
    }

    /// Per-region count of open (mesh boundary) edges and shared edge counts
    /// with neighbouring regions.
    fn region_borders(&self, labels: &[usize], n_regions: usize) -> (Vec<usize>, Vec<BTreeMap<usize, usize>>) {
        let mut open = vec![0usize; n_regions];
        let mut shared = vec![BTreeMap::new(); n_regions];
        for tris in self.edges.values() {
            match tris.as_slice() {
                [t] => open[labels[*t]] += 1,
                [t0, t1] => {
                    let (a, b) = (labels[*t0], labels[*t1]);
                    if a != b {
                        *shared[a].entry(b).or_insert(0) += 1;
                        *shared[b].entry(a).or_insert(0) += 1;
                    }
                }
                _ => {}
            }
        }
        (open, shared)
    }
}

/// Triangle centroids and unit normals.
struct TriangleGeometry {
    centroids: Vec<Point3<f64>>,
    normals: Vec<Vector3<f64>>,
}

impl TriangleGeometry {
    fn from_mesh(mesh: &Mesh) -> Self {
        let mut centroids = Vec::with_capacity(mesh.num_triangles());
        let mut normals = Vec::with_capacity(mesh.num_triangles());
        for [a, b, c] in mesh.triangles() {
            let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
            centroids.push(Point3::from((pa.coords + pb.coords + pc.coords) / 3.0));
            normals.push(
                (pb - pa)
                    .cross(&(pc - pa))
                    .try_normalize(f64::EPSILON)
                    .unwrap_or_else(Vector3::zeros),
            );
        }
        Self { centroids, normals }
    }
}

/// Share `target` panels between components by triangle count.
///
/// Every component gets one panel, closed components get a second one when
/// the budget allows (they have no boundary otherwise), and the rest goes out
/// by highest triangles-per-panel.
fn allocate_budgets(components: &[Vec<usize>], adjacency: &TriangleAdjacency, target: usize) -> Vec<usize> {
    if components.len() >= target {
        if components.len() > target {
            warn!(
                "mesh has {} components but only {} panels were requested; using one panel per component",
                components.len(),
                target
            );
        }
        return vec![1; components.len()];
    }

    let mut component_of = vec![0usize; adjacency.neighbors.len()];
    for (c, component) in components.iter().enumerate() {
        for &t in component {
            component_of[t] = c;
        }
    }
    let mut open = vec![false; components.len()];
    for tris in adjacency.edges.values() {
        if let [t] = tris.as_slice() {
            open[component_of[*t]] = true;
        }
    }

    let mut budgets = vec![1usize; components.len()];
    let mut remaining = target - components.len();
    for (c, component) in components.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if !open[c] && component.len() >= 2 {
            budgets[c] = 2;
            remaining -= 1;
        }
    }

    while remaining > 0 {
        let mut best: Option<(usize, f64)> = None;
        for (c, component) in components.iter().enumerate() {
            if budgets[c] >= component.len() {
                continue;
            }
            let share = component.len() as f64 / budgets[c] as f64;
            if best.map_or(true, |(_, s)| share > s) {
                best = Some((c, share));
            }
        }
        match best {
            Some((c, _)) => {
                budgets[c] += 1;
                remaining -= 1;
            }
            None => break,
        }
    }
    budgets
}

/// Up to `k` seeds: the triangle farthest from the component's mean
/// centroid, then repeatedly the triangle farthest from all chosen seeds.
fn farthest_point_seeds(component: &[usize], geometry: &TriangleGeometry, k: usize) -> Vec<usize> {
    let k = k.min(component.len());
    let mean = component
        .iter()
        .fold(Vector3::zeros(), |acc, &t| acc + geometry.centroids[t].coords)
        / component.len() as f64;
    let mean = Point3::from(mean);

    let mut chosen = vec![false; component.len()];
    let mut min_dist: Vec<f64> = component
        .iter()
        .map(|&t| (geometry.centroids[t] - mean).norm())
        .collect();
    let mut seeds = Vec::with_capacity(k);

    while seeds.len() < k {
        let mut best: Option<usize> = None;
        for i in 0..component.len() {
            if chosen[i] {
                continue;
            }
            if best.map_or(true, |b| min_dist[i] > min_dist[b]) {
                best = Some(i);
            }
        }
        let Some(i) = best else { break };
        chosen[i] = true;
        let seed = component[i];
        seeds.push(seed);

        // After the first pick, distances are to the nearest seed.
        let first = seeds.len() == 1;
        for (j, &t) in component.iter().enumerate() {
            let d = (geometry.centroids[t] - geometry.centroids[seed]).norm();
            min_dist[j] = if first { d } else { min_dist[j].min(d) };
        }
    }
    seeds
}

/// Entry of the growth frontier.
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    cost: f64,
    triangle: usize,
    region: usize,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour.
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.triangle.cmp(&self.triangle))
            .then_with(|| other.region.cmp(&self.region))
    }
}

/// Multi-source best-first growth. Seed `i` labels its region
/// `first_label + i`.
fn grow_regions(
    seeds: &[usize],
    first_label: usize,
    adjacency: &TriangleAdjacency,
    geometry: &TriangleGeometry,
    normal_weight: f64,
    labels: &mut [usize],
) {
    let mut heap = BinaryHeap::new();
    for (i, &seed) in seeds.iter().enumerate() {
        heap.push(FrontierEntry {
            cost: 0.0,
            triangle: seed,
            region: i,
        });
    }

    while let Some(FrontierEntry { cost, triangle, region }) = heap.pop() {
        if labels[triangle] != usize::MAX {
            continue;
        }
        labels[triangle] = first_label + region;

        let seed_normal = geometry.normals[seeds[region]];
        for &n in adjacency.neighbors(triangle) {
            if labels[n] != usize::MAX {
                continue;
            }
            let distance = (geometry.centroids[n] - geometry.centroids[triangle]).norm();
            let deviation = 1.0 - seed_normal.dot(&geometry.normals[n]);
            heap.push(FrontierEntry {
                cost: cost + distance * (1.0 + normal_weight * deviation),
                triangle: n,
                region,
            });
        }
    }
}

fn repeats_vertex(tri: &[usize; 3]) -> bool {
    tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2]
}

/// Group labelled triangles by label, in label order.
fn collect_regions(labels: &[usize]) -> Vec<Vec<usize>> {
    let mut by_label: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (t, &label) in labels.iter().enumerate() {
        if label == usize::MAX {
            continue;
        }
        by_label.entry(label).or_default().push(t);
    }
    by_label.into_values().filter(|r| !r.is_empty()).collect()
}

fn labels_of(regions: &[Vec<usize>], n_triangles: usize) -> Vec<usize> {
    let mut labels = vec![0; n_triangles];
    for (r, region) in regions.iter().enumerate() {
        for &t in region {
            labels[t] = r;
        }
    }
    labels
}

fn region_panel(mesh: &Mesh, region: &[usize]) -> Panel {
    let triangles = region.iter().map(|&t| mesh.triangle(t)).collect();
    Panel::from_triangles(PanelId(0), triangles, PanelColor::default())
}

fn region_connectivity(mesh: &Mesh, panel: &Panel) -> Result<MeshConnectivity> {
    let local = panel.localize(mesh)?;
    MeshConnectivity::build(local.positions.len(), &local.triangles)
}

/// Split every region that fails the single-component check.
fn split_disconnected(
    mesh: &Mesh,
    adjacency: &TriangleAdjacency,
    regions: Vec<Vec<usize>>,
) -> Result<Vec<Vec<usize>>> {
    let mut out = Vec::with_capacity(regions.len());
    for region in regions {
        let connectivity = region_connectivity(mesh, &region_panel(mesh, &region))?;
        if connectivity.check_connected().is_ok() {
            out.push(region);
        } else {
            let parts = adjacency.components_within(&region);
            debug!("splitting disconnected region into {} parts", parts.len());
            out.extend(parts);
        }
    }
    Ok(out)
}

/// Merge regions that touch exactly one other region and no mesh boundary
/// into that region, when the neighbour has a hole because of them.
fn merge_enclosed(
    mesh: &Mesh,
    adjacency: &TriangleAdjacency,
    mut regions: Vec<Vec<usize>>,
) -> Result<Vec<Vec<usize>>> {
    loop {
        let labels = labels_of(&regions, mesh.num_triangles());
        let (open, shared) = adjacency.region_borders(&labels, regions.len());

        let mut merge = None;
        for r in 0..regions.len() {
            if open[r] != 0 || shared[r].len() != 1 {
                continue;
            }
            let Some(&host) = shared[r].keys().next() else {
                continue;
            };
            let host_loops = region_connectivity(mesh, &region_panel(mesh, &regions[host]))?
                .boundary_loops()
                .len();
            if host_loops > 1 {
                merge = Some((r, host));
                break;
            }
        }

        let Some((island, host)) = merge else {
            return Ok(regions);
        };
        debug!("merging enclosed region {} into {}", island, host);
        let absorbed = std::mem::take(&mut regions[island]);
        regions[host].extend(absorbed);
        regions[host].sort_unstable();
        regions.remove(island);
    }
}

/// Add each degenerate triangle to the first region holding all of its
/// vertices. Triangles no region holds are dropped.
fn attach_degenerate(mesh: &Mesh, adjacency: &TriangleAdjacency, regions: &mut [Vec<usize>]) {
    if adjacency.degenerate.is_empty() {
        return;
    }
    let vertex_sets: Vec<BTreeSet<usize>> = regions
        .iter()
        .map(|region| region.iter().flat_map(|&t| mesh.triangle(t)).collect())
        .collect();

    for &t in &adjacency.degenerate {
        let tri = mesh.triangle(t);
        match vertex_sets.iter().position(|set| tri.iter().all(|v| set.contains(v))) {
            Some(r) => {
                debug!("triangle {} repeats a vertex; attached to region {}", t, r);
                regions[r].push(t);
                regions[r].sort_unstable();
            }
            None => warn!("triangle {} {:?} repeats a vertex and touches no single panel; dropped", t, tri),
        }
    }
}

/// Merge the smallest region into its most-shared neighbour until at most
/// `target` regions remain or no region has a neighbour.
fn enforce_budget(adjacency: &TriangleAdjacency, mut regions: Vec<Vec<usize>>, target: usize) -> Vec<Vec<usize>> {
    let n_triangles = adjacency.neighbors.len();
    while regions.len() > target {
        let labels = labels_of(&regions, n_triangles);
        let (_, shared) = adjacency.region_borders(&labels, regions.len());

        let smallest = (0..regions.len())
            .filter(|&r| !shared[r].is_empty())
            .min_by_key(|&r| (regions[r].len(), regions[r][0]));
        let Some(small) = smallest else {
            break;
        };
        let mut host = None;
        for (&other, &count) in &shared[small] {
            if host.map_or(true, |(_, c)| count > c) {
                host = Some((other, count));
            }
        }
        let Some((host, _)) = host else {
            break;
        };

        let absorbed = std::mem::take(&mut regions[small]);
        regions[host].extend(absorbed);
        regions[host].sort_unstable();
        regions.remove(small);
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_grid(n: usize) -> Mesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64 * 0.1, j as f64 * 0.1, 0.0));
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
        Mesh::from_triangles(&vertices, &faces).unwrap()
    }

    fn create_cube() -> Mesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
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
        Mesh::from_triangles(&vertices, &faces).unwrap()
    }

    fn assert_partition(mesh: &Mesh, panels: &[Panel]) {
        let mut count = vec![0usize; mesh.num_triangles()];
        let lookup: BTreeMap<[usize; 3], usize> =
            mesh.triangles().enumerate().map(|(t, tri)| (tri, t)).collect();
        for panel in panels {
            for tri in panel.triangles() {
                count[lookup[tri]] += 1;
            }
            region_connectivity(mesh, panel).unwrap().check_connected().unwrap();
        }
        assert!(count.iter().all(|&c| c == 1), "coverage {:?}", count);
    }

    #[test]
    fn test_rejects_zero_target() {
        let mesh = create_grid(2);
        let result = segment(&mesh, 0, &SegmentOptions::default());
        assert!(matches!(result, Err(PatternError::InvalidParameter { .. })));
    }

    #[test]
    fn test_rejects_empty_mesh() {
        let mesh = Mesh::new(Vec::new(), Vec::new()).unwrap();
        let result = segment(&mesh, 3, &SegmentOptions::default());
        assert_eq!(result.unwrap_err(), PatternError::EmptyMesh);
    }

    #[test]
    fn test_single_panel_is_whole_mesh() {
        let mesh = create_grid(3);
        let panels = segment(&mesh, 1, &SegmentOptions::default()).unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].num_triangles(), 18);
        assert_eq!(panels[0].id(), PanelId(0));
    }

    #[test]
    fn test_grid_partition() {
        let mesh = create_grid(6);
        let panels = segment(&mesh, 4, &SegmentOptions::default()).unwrap();
        assert!(!panels.is_empty() && panels.len() <= 4);
        assert_partition(&mesh, &panels);
    }

    #[test]
    fn test_closed_cube_partition() {
        let mesh = create_cube();
        let panels = segment(&mesh, 6, &SegmentOptions::default()).unwrap();
        assert!(panels.len() >= 2 && panels.len() <= 6);
        assert_partition(&mesh, &panels);
    }

    #[test]
    fn test_deterministic() {
        let mesh = create_grid(8);
        let a = segment(&mesh, 5, &SegmentOptions::default()).unwrap();
        let b = segment(&mesh, 5, &SegmentOptions::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_more_components_than_target() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();
        let panels = segment(&mesh, 1, &SegmentOptions::default()).unwrap();
        assert_eq!(panels.len(), 2);
        assert_partition(&mesh, &panels);
    }

    fn create_quad_with_repeated_vertex() -> Mesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        Mesh::from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3], [0, 0, 1]]).unwrap()
    }

    #[test]
    fn test_repeated_vertex_triangle_joins_panel() {
        let mesh = create_quad_with_repeated_vertex();
        for target in 1..=4 {
            let panels = segment(&mesh, target, &SegmentOptions::default()).unwrap();
            assert!(!panels.is_empty() && panels.len() <= target.min(2), "target {}", target);
            assert_partition(&mesh, &panels);

            let holder = panels
                .iter()
                .find(|p| p.triangles().contains(&[0, 0, 1]))
                .expect("degenerate triangle kept");
            assert!(holder.triangles().contains(&[0, 1, 2]));
        }
    }

    #[test]
    fn test_unattachable_repeated_vertex_triangle_is_dropped() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 5.0, 0.0),
        ];
        let mesh = Mesh::from_triangles(&vertices, &[[0, 1, 2], [3, 3, 3]]).unwrap();
        let panels = segment(&mesh, 2, &SegmentOptions::default()).unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(panels[0].triangles(), &[[0, 1, 2]]);
    }

    #[test]
    fn test_all_repeated_vertex_triangles_rejected() {
        let vertices = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
        let mesh = Mesh::from_triangles(&vertices, &[[0, 0, 1], [1, 1, 0]]).unwrap();
        let result = segment(&mesh, 2, &SegmentOptions::default());
        assert!(matches!(result, Err(PatternError::InvalidMesh(_))));
    }

    #[test]
    fn test_allocate_budgets_proportional() {
        let mesh = create_grid(4);
        let adjacency = TriangleAdjacency::from_mesh(&mesh);
        let components = adjacency.components();
        assert_eq!(components.len(), 1);
        assert_eq!(allocate_budgets(&components, &adjacency, 3), vec![3]);
    }

    #[test]
    fn test_enclosed_island_is_merged() {
        // Grid 5x5 with the center cell's two triangles as their own region.
        let mesh = create_grid(5);
        let adjacency = TriangleAdjacency::from_mesh(&mesh);
        let center_cell = 2 * 5 + 2;
        let island = vec![2 * center_cell, 2 * center_cell + 1];
        let rest: Vec<usize> = (0..mesh.num_triangles())
            .filter(|t| !island.contains(t))
            .collect();

        let merged = merge_enclosed(&mesh, &adjacency, vec![rest, island]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 50);
    }

    #[test]
    fn test_enforce_budget_merges_smallest() {
        let mesh = create_grid(2);
        let adjacency = TriangleAdjacency::from_mesh(&mesh);
        let regions = vec![vec![0, 1, 2, 3, 4], vec![5, 6], vec![7]];
        let merged = enforce_budget(&adjacency, regions, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.iter().map(Vec::len).sum::<usize>(), 8);
    }
}
