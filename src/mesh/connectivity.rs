//! Per-panel connectivity graph.
//!
//! [`MeshConnectivity`] is built from a panel's local triangles in a single
//! pass and answers the topology questions flattening depends on: vertex
//! neighbours, edge-to-triangle membership, boundary edges, single-component
//! connectivity and boundary-loop extraction.
//!
//! The graph uses dense index arrays and ordered maps so every traversal is
//! deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{PatternError, Result};

/// Adjacency and edge membership for a locally indexed triangle set.
#[derive(Debug, Clone)]
pub struct MeshConnectivity {
    /// Neighbouring vertices of each vertex.
    adjacency: Vec<BTreeSet<usize>>,
    /// Undirected edge `(min, max)` -> incident triangle indices.
    edge_triangles: BTreeMap<(usize, usize), Vec<usize>>,
    /// Directed boundary edges as they appear in their triangle's winding.
    boundary_directed: BTreeSet<(usize, usize)>,
    /// Triangles with a repeated vertex index.
    degenerate_triangles: Vec<usize>,
}

impl MeshConnectivity {
    /// Build connectivity for `num_vertices` vertices and local triangles.
    ///
    /// Runs in O(triangles · log). Triangles that repeat a vertex are
    /// recorded as degenerate and contribute no edges.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::InvalidMesh`] if a triangle index is out of
    /// bounds.
    pub fn build(num_vertices: usize, triangles: &[[usize; 3]]) -> Result<Self> {
        let mut adjacency = vec![BTreeSet::new(); num_vertices];
        let mut edge_triangles: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        let mut degenerate_triangles = Vec::new();

        for (ti, tri) in triangles.iter().enumerate() {
            if let Some(&v) = tri.iter().find(|&&v| v >= num_vertices) {
                return Err(PatternError::InvalidMesh(format!(
                    "triangle {} references local vertex {} of {}",
                    ti, v, num_vertices
                )));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                degenerate_triangles.push(ti);
                continue;
            }
            for i in 0..3 {
                let a = tri[i];
                let b = tri[(i + 1) % 3];
                adjacency[a].insert(b);
                adjacency[b].insert(a);
                edge_triangles.entry(edge_key(a, b)).or_default().push(ti);
            }
        }

        let mut boundary_directed = BTreeSet::new();
        for (&(a, b), tris) in &edge_triangles {
            if tris.len() == 1 {
                let tri = triangles[tris[0]];
                let forward = (0..3).any(|i| tri[i] == a && tri[(i + 1) % 3] == b);
                boundary_directed.insert(if forward { (a, b) } else { (b, a) });
            }
        }

        Ok(Self {
            adjacency,
            edge_triangles,
            boundary_directed,
            degenerate_triangles,
        })
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edge_triangles.len()
    }

    /// Neighbours of vertex `v`, in ascending order.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &BTreeSet<usize> {
        &self.adjacency[v]
    }

    /// Triangles incident to the edge `(a, b)`; empty if it is not an edge.
    pub fn edge_triangles(&self, a: usize, b: usize) -> &[usize] {
        self.edge_triangles
            .get(&edge_key(a, b))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All edges as `(min, max)` pairs with their incident triangles, in order.
    pub fn edges(&self) -> impl Iterator<Item = ((usize, usize), &[usize])> + '_ {
        self.edge_triangles.iter().map(|(&e, t)| (e, t.as_slice()))
    }

    /// Edges with exactly one incident triangle, as `(min, max)` pairs.
    pub fn boundary_edges(&self) -> Vec<(usize, usize)> {
        self.edge_triangles
            .iter()
            .filter(|(_, t)| t.len() == 1)
            .map(|(&e, _)| e)
            .collect()
    }

    /// Number of boundary edges.
    pub fn num_boundary_edges(&self) -> usize {
        self.boundary_directed.len()
    }

    /// Whether `(a, b)` is a boundary edge.
    pub fn is_boundary_edge(&self, a: usize, b: usize) -> bool {
        self.edge_triangles(a, b).len() == 1
    }

    /// Vertices touching at least one boundary edge.
    pub fn boundary_vertices(&self) -> BTreeSet<usize> {
        self.boundary_directed
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect()
    }

    /// Edges with more than two incident triangles.
    pub fn non_manifold_edges(&self) -> Vec<((usize, usize), usize)> {
        self.edge_triangles
            .iter()
            .filter(|(_, t)| t.len() > 2)
            .map(|(&e, t)| (e, t.len()))
            .collect()
    }

    /// Triangles that were skipped because they repeat a vertex.
    #[inline]
    pub fn degenerate_triangles(&self) -> &[usize] {
        &self.degenerate_triangles
    }

    /// Reject non-manifold edges.
    pub fn check_manifold(&self) -> Result<()> {
        match self.non_manifold_edges().first() {
            Some(&((v0, v1), triangles)) => Err(PatternError::NonManifoldEdge { v0, v1, triangles }),
            None => Ok(()),
        }
    }

    /// Number of vertices reachable from `start` along edges.
    pub fn reachable_from(&self, start: usize) -> usize {
        let mut visited = vec![false; self.num_vertices()];
        let mut stack = vec![start];
        visited[start] = true;
        let mut count = 0;
        while let Some(v) = stack.pop() {
            count += 1;
            for &n in &self.adjacency[v] {
                if !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            }
        }
        count
    }

    /// Require that every vertex is reachable from vertex 0.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::DisconnectedGeometry`] otherwise.
    pub fn check_connected(&self) -> Result<()> {
        let total = self.num_vertices();
        if total == 0 {
            return Err(PatternError::DegenerateGeometry("panel has no vertices".into()));
        }
        let reachable = self.reachable_from(0);
        if reachable != total {
            return Err(PatternError::DisconnectedGeometry { reachable, total });
        }
        Ok(())
    }

    /// Vertex components, each sorted, ordered by smallest member.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut label = vec![usize::MAX; self.num_vertices()];
        let mut components = Vec::new();
        for seed in 0..self.num_vertices() {
            if label[seed] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            let mut stack = vec![seed];
            label[seed] = id;
            while let Some(v) = stack.pop() {
                members.push(v);
                for &n in &self.adjacency[v] {
                    if label[n] == usize::MAX {
                        label[n] = id;
                        stack.push(n);
                    }
                }
            }
            members.sort_unstable();
            components.push(members);
        }
        components
    }

    /// Extract the boundary loop starting at the lowest boundary vertex.
    ///
    /// The first step follows the triangle winding, so the loop runs
    /// counter-clockwise when the triangles are counter-clockwise.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::DegenerateGeometry`] if there is no boundary,
    /// the walk cannot close, or the loop has fewer than 3 vertices.
    pub fn boundary_loop(&self) -> Result<Vec<usize>> {
        let start = self
            .boundary_directed
            .iter()
            .map(|&(a, _)| a)
            .min()
            .ok_or_else(|| PatternError::DegenerateGeometry("panel has no boundary".into()))?;
        let mut visited = BTreeSet::new();
        self.walk_loop(start, &mut visited)
    }

    /// Enumerate every boundary loop. Loops that fail to close are skipped.
    pub fn boundary_loops(&self) -> Vec<Vec<usize>> {
        let mut visited: BTreeSet<(usize, usize)> = BTreeSet::new();
        let mut loops = Vec::new();
        for &(a, b) in &self.boundary_directed {
            if visited.contains(&edge_key(a, b)) {
                continue;
            }
            if let Ok(lp) = self.walk_loop(a, &mut visited) {
                loops.push(lp);
            }
        }
        loops
    }

    /// Require a single boundary loop covering every boundary edge.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::DegenerateGeometry`] for closed panels,
    /// panels with holes and pinched boundaries.
    pub fn single_boundary_loop(&self) -> Result<Vec<usize>> {
        let lp = self.boundary_loop()?;
        let boundary_edges = self.num_boundary_edges();
        if lp.len() != boundary_edges {
            return Err(PatternError::DegenerateGeometry(format!(
                "boundary loop covers {} of {} boundary edges",
                lp.len(),
                boundary_edges
            )));
        }
        // A loop through a pinch vertex revisits it.
        let distinct = lp.iter().collect::<BTreeSet<_>>().len();
        if distinct != lp.len() {
            return Err(PatternError::DegenerateGeometry(format!(
                "boundary loop is pinched: {} steps over {} distinct vertices",
                lp.len(),
                distinct
            )));
        }
        Ok(lp)
    }

    fn walk_loop(&self, start: usize, visited: &mut BTreeSet<(usize, usize)>) -> Result<Vec<usize>> {
        let mut lp = vec![start];
        let mut current = start;
        loop {
            let next = self.next_boundary_vertex(current, visited).ok_or_else(|| {
                PatternError::DegenerateGeometry(format!(
                    "boundary walk from vertex {} does not close",
                    start
                ))
            })?;
            visited.insert(edge_key(current, next));
            if next == start {
                break;
            }
            lp.push(next);
            current = next;
        }
        if lp.len() < 3 {
            return Err(PatternError::DegenerateGeometry(format!(
                "boundary loop has {} vertices, need at least 3",
                lp.len()
            )));
        }
        Ok(lp)
    }

    /// Pick an unvisited boundary edge leaving `v`, preferring the winding
    /// direction and then the lowest neighbour.
    fn next_boundary_vertex(&self, v: usize, visited: &BTreeSet<(usize, usize)>) -> Option<usize> {
        let candidates = self.adjacency[v]
            .iter()
            .copied()
            .filter(|&n| self.is_boundary_edge(v, n) && !visited.contains(&edge_key(v, n)));
        let mut fallback = None;
        for n in candidates {
            if self.boundary_directed.contains(&(v, n)) {
                return Some(n);
            }
            fallback.get_or_insert(n);
        }
        fallback
    }
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
