//! Core mesh data structure the hiding operations work on.
//!
//! `EditMesh` is an indexed polygon list with per-element selection flags and
//! per-face hidden flags, plus the selection granularity the user is working
//! in. Edges are derived from face boundaries and kept in first-seen order.

use bevy::mesh::{Indices, PrimitiveTopology, VertexAttributeValues};
use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

/// Index of a vertex in the mesh.
pub type VertexIndex = usize;
/// Index of an edge in the mesh.
pub type EdgeIndex = usize;
/// Index of a polygon face in the mesh.
pub type FaceIndex = usize;

/// Canonical edge representation (lower vertex index first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge(pub u32, pub u32);

impl Edge {
    /// Create a canonical edge with the lower index first.
    pub fn new(a: u32, b: u32) -> Self {
        if a <= b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Element granularity the user selects with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionMode {
    Vertex,
    Edge,
    #[default]
    Face,
}

impl SelectionMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            SelectionMode::Vertex => "Vertex",
            SelectionMode::Edge => "Edge",
            SelectionMode::Face => "Face",
        }
    }
}

/// Number of vertices, edges and faces, used to detect leftover geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ElementCounts {
    pub vertices: usize,
    pub edges: usize,
    pub faces: usize,
}

/// Indexed polygon mesh with selection and visibility state.
#[derive(Debug, Clone, Default)]
pub struct EditMesh {
    pub positions: Vec<Vec3>,
    faces: Vec<Vec<u32>>,
    edges: Vec<Edge>,
    edge_lookup: HashMap<Edge, EdgeIndex>,
    vertex_selected: Vec<bool>,
    edge_selected: Vec<bool>,
    face_selected: Vec<bool>,
    face_hidden: Vec<bool>,
    select_mode: SelectionMode,
}

impl EditMesh {
    /// Build a mesh from vertex positions and polygon loops.
    ///
    /// Faces referencing a missing vertex or with fewer than three corners
    /// are dropped with a warning.
    pub fn new(positions: Vec<Vec3>, faces: Vec<Vec<u32>>) -> Self {
        let vertex_count = positions.len();
        let faces: Vec<Vec<u32>> = faces
            .into_iter()
            .filter(|face| {
                let valid = face.len() >= 3 && face.iter().all(|&v| (v as usize) < vertex_count);
                if !valid {
                    warn!("Dropping malformed face {:?}", face);
                }
                valid
            })
            .collect();

        let mut mesh = EditMesh {
            vertex_selected: vec![false; vertex_count],
            face_selected: vec![false; faces.len()],
            face_hidden: vec![false; faces.len()],
            positions,
            faces,
            ..Default::default()
        };
        mesh.rebuild_edges(&HashSet::new());
        mesh
    }

    /// Axis-aligned box centred on the origin with one quad per side.
    ///
    /// Face order is +X, -X, +Y, -Y, +Z, -Z, all wound counter-clockwise when
    /// seen from outside.
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let positions = vec![
            Vec3::new(-h.x, -h.y, -h.z), // 0
            Vec3::new(h.x, -h.y, -h.z),  // 1
            Vec3::new(h.x, h.y, -h.z),   // 2
            Vec3::new(-h.x, h.y, -h.z),  // 3
            Vec3::new(-h.x, -h.y, h.z),  // 4
            Vec3::new(h.x, -h.y, h.z),   // 5
            Vec3::new(h.x, h.y, h.z),    // 6
            Vec3::new(-h.x, h.y, h.z),   // 7
        ];
        let faces = vec![
            vec![1, 2, 6, 5],
            vec![0, 4, 7, 3],
            vec![3, 7, 6, 2],
            vec![0, 1, 5, 4],
            vec![4, 5, 6, 7],
            vec![0, 3, 2, 1],
        ];
        EditMesh::new(positions, faces)
    }

    /// Build an `EditMesh` from a Bevy `Mesh`, one face per triangle.
    ///
    /// Returns `None` if the mesh lacks positions or uses a non-triangle topology.
    pub fn from_bevy_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions: Vec<Vec3> = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(v) => v.iter().map(|p| Vec3::from(*p)).collect(),
            _ => return None,
        };

        let faces: Vec<Vec<u32>> = match mesh.indices() {
            Some(Indices::U32(indices)) => indices
                .chunks_exact(3)
                .map(|c| c.to_vec())
                .collect(),
            Some(Indices::U16(indices)) => indices
                .chunks_exact(3)
                .map(|c| c.iter().map(|&i| i as u32).collect())
                .collect(),
            None => (0..positions.len() as u32)
                .collect::<Vec<_>>()
                .chunks_exact(3)
                .map(|c| c.to_vec())
                .collect(),
        };

        Some(EditMesh::new(positions, faces))
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn counts(&self) -> ElementCounts {
        ElementCounts {
            vertices: self.vertex_count(),
            edges: self.edge_count(),
            faces: self.face_count(),
        }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn edge_index(&self, edge: Edge) -> Option<EdgeIndex> {
        self.edge_lookup.get(&edge).copied()
    }

    /// Unit face normal (Newell's method), zero for degenerate faces.
    pub fn face_normal(&self, face: FaceIndex) -> Vec3 {
        let corners = &self.faces[face];
        let mut normal = Vec3::ZERO;
        for (i, &a) in corners.iter().enumerate() {
            let cur = self.positions[a as usize];
            let next = self.positions[corners[(i + 1) % corners.len()] as usize];
            normal.x += (cur.y - next.y) * (cur.z + next.z);
            normal.y += (cur.z - next.z) * (cur.x + next.x);
            normal.z += (cur.x - next.x) * (cur.y + next.y);
        }
        normal.normalize_or_zero()
    }

    /// Compute the centroid of a face.
    pub fn face_center(&self, face: FaceIndex) -> Vec3 {
        let corners = &self.faces[face];
        let sum: Vec3 = corners.iter().map(|&v| self.positions[v as usize]).sum();
        sum / corners.len() as f32
    }

    /// Get the boundary edges of a face, in loop order.
    pub fn face_edges(&self, face: FaceIndex) -> Vec<Edge> {
        let corners = &self.faces[face];
        (0..corners.len())
            .map(|i| Edge::new(corners[i], corners[(i + 1) % corners.len()]))
            .collect()
    }

    /// Fan triangulation of a face, as vertex positions.
    pub fn face_triangles(&self, face: FaceIndex) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        let corners = &self.faces[face];
        (1..corners.len().saturating_sub(1)).map(move |i| {
            [
                self.positions[corners[0] as usize],
                self.positions[corners[i] as usize],
                self.positions[corners[i + 1] as usize],
            ]
        })
    }

    pub fn select_mode(&self) -> SelectionMode {
        self.select_mode
    }

    pub fn set_select_mode(&mut self, mode: SelectionMode) {
        self.select_mode = mode;
    }

    pub fn is_vertex_selected(&self, vertex: VertexIndex) -> bool {
        self.vertex_selected.get(vertex).copied().unwrap_or(false)
    }

    pub fn is_edge_selected(&self, edge: EdgeIndex) -> bool {
        self.edge_selected.get(edge).copied().unwrap_or(false)
    }

    pub fn is_face_selected(&self, face: FaceIndex) -> bool {
        self.face_selected.get(face).copied().unwrap_or(false)
    }

    pub fn is_face_hidden(&self, face: FaceIndex) -> bool {
        self.face_hidden.get(face).copied().unwrap_or(false)
    }

    /// Set a vertex's selection flag. Returns `false` if the index is out of range.
    pub fn set_vertex_selected(&mut self, vertex: VertexIndex, selected: bool) -> bool {
        set_flag(&mut self.vertex_selected, vertex, selected)
    }

    /// Set an edge's selection flag. Returns `false` if the index is out of range.
    pub fn set_edge_selected(&mut self, edge: EdgeIndex, selected: bool) -> bool {
        set_flag(&mut self.edge_selected, edge, selected)
    }

    /// Set a face's selection flag. Returns `false` if the index is out of range.
    pub fn set_face_selected(&mut self, face: FaceIndex, selected: bool) -> bool {
        set_flag(&mut self.face_selected, face, selected)
    }

    /// Set a face's hidden flag. Returns `false` if the index is out of range.
    pub fn set_face_hidden(&mut self, face: FaceIndex, hidden: bool) -> bool {
        set_flag(&mut self.face_hidden, face, hidden)
    }

    pub fn selected_vertices(&self) -> Vec<VertexIndex> {
        set_indices(&self.vertex_selected)
    }

    pub fn selected_edges(&self) -> Vec<EdgeIndex> {
        set_indices(&self.edge_selected)
    }

    pub fn selected_faces(&self) -> Vec<FaceIndex> {
        set_indices(&self.face_selected)
    }

    pub fn hidden_faces(&self) -> HashSet<FaceIndex> {
        set_indices(&self.face_hidden).into_iter().collect()
    }

    /// Unhide every face.
    pub fn reveal_all(&mut self) {
        self.face_hidden.fill(false);
    }

    /// Clear every selection flag.
    pub fn deselect_all(&mut self) {
        self.vertex_selected.fill(false);
        self.edge_selected.fill(false);
        self.face_selected.fill(false);
    }

    /// Append a quad with four new vertices. Returns the new face index.
    pub fn add_quad(&mut self, corners: [Vec3; 4]) -> FaceIndex {
        let base = self.positions.len() as u32;
        self.positions.extend(corners);
        self.vertex_selected.extend([false; 4]);

        let loop_ = vec![base, base + 1, base + 2, base + 3];
        let face = self.faces.len();
        self.faces.push(loop_);
        self.face_selected.push(false);
        self.face_hidden.push(false);
        self.register_face_edges(face);
        face
    }

    /// Delete faces along with the edges and vertices only they used.
    ///
    /// Remaining elements keep their relative order and their flags; indices
    /// after a removed element shift down.
    pub fn delete_faces(&mut self, doomed: &HashSet<FaceIndex>) {
        if doomed.is_empty() {
            return;
        }

        let mut doomed_vertices: HashSet<u32> = HashSet::new();
        for &fi in doomed {
            if let Some(face) = self.faces.get(fi) {
                doomed_vertices.extend(face.iter().copied());
            }
        }

        let mut kept_faces = Vec::with_capacity(self.faces.len());
        let mut kept_selected = Vec::with_capacity(self.faces.len());
        let mut kept_hidden = Vec::with_capacity(self.faces.len());
        for (fi, face) in self.faces.drain(..).enumerate() {
            if doomed.contains(&fi) {
                continue;
            }
            for v in &face {
                doomed_vertices.remove(v);
            }
            kept_faces.push(face);
            kept_selected.push(self.face_selected[fi]);
            kept_hidden.push(self.face_hidden[fi]);
        }

        // Old vertex index -> new vertex index.
        let mut remap: Vec<Option<u32>> = Vec::with_capacity(self.positions.len());
        let mut positions = Vec::with_capacity(self.positions.len());
        let mut vertex_selected = Vec::with_capacity(self.positions.len());
        for (vi, pos) in self.positions.iter().enumerate() {
            if doomed_vertices.contains(&(vi as u32)) {
                remap.push(None);
            } else {
                remap.push(Some(positions.len() as u32));
                positions.push(*pos);
                vertex_selected.push(self.vertex_selected[vi]);
            }
        }

        let previously_selected: HashSet<Edge> = self
            .edges
            .iter()
            .zip(&self.edge_selected)
            .filter(|(_, selected)| **selected)
            .filter_map(|(edge, _)| {
                let a = remap[edge.0 as usize]?;
                let b = remap[edge.1 as usize]?;
                Some(Edge::new(a, b))
            })
            .collect();

        self.faces = kept_faces
            .into_iter()
            .map(|face| face.iter().filter_map(|&v| remap[v as usize]).collect())
            .collect();
        self.face_selected = kept_selected;
        self.face_hidden = kept_hidden;
        self.positions = positions;
        self.vertex_selected = vertex_selected;
        self.rebuild_edges(&previously_selected);
    }

    fn rebuild_edges(&mut self, selected: &HashSet<Edge>) {
        self.edges.clear();
        self.edge_lookup.clear();
        self.edge_selected.clear();
        for fi in 0..self.faces.len() {
            self.register_face_edges(fi);
        }
        for (ei, edge) in self.edges.iter().enumerate() {
            self.edge_selected[ei] = selected.contains(edge);
        }
    }

    fn register_face_edges(&mut self, face: FaceIndex) {
        for edge in self.face_edges(face) {
            if !self.edge_lookup.contains_key(&edge) {
                self.edge_lookup.insert(edge, self.edges.len());
                self.edges.push(edge);
                self.edge_selected.push(false);
            }
        }
    }
}

fn set_flag(flags: &mut [bool], index: usize, value: bool) -> bool {
    match flags.get_mut(index) {
        Some(flag) => {
            *flag = value;
            true
        }
        None => false,
    }
}

fn set_indices(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_two_quads() -> EditMesh {
        // Two quads sharing edge (1,4):
        //   3--4--5
        //   |  |  |
        //   0--1--2
        EditMesh::new(
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(2.0, 1.0, 0.0),
            ],
            vec![vec![0, 1, 4, 3], vec![1, 2, 5, 4]],
        )
    }

    #[test]
    fn cuboid_topology_and_normals() {
        let cube = EditMesh::cuboid(Vec3::splat(0.5));
        assert_eq!(cube.vertex_count(), 8);
        assert_eq!(cube.edge_count(), 12);
        assert_eq!(cube.face_count(), 6);

        let expected = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (fi, normal) in expected.iter().enumerate() {
            assert!(
                cube.face_normal(fi).abs_diff_eq(*normal, 1e-6),
                "face {} normal {:?}",
                fi,
                cube.face_normal(fi)
            );
        }
    }

    #[test]
    fn shared_edges_are_deduplicated() {
        let mesh = make_two_quads();
        assert_eq!(mesh.edge_count(), 7);
        assert!(mesh.edge_index(Edge::new(4, 1)).is_some());
    }

    #[test]
    fn malformed_faces_are_dropped() {
        let mesh = EditMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![vec![0, 1, 2], vec![0, 1], vec![0, 1, 9]],
        );
        assert_eq!(mesh.face_count(), 1);
    }

    #[test]
    fn degenerate_face_has_zero_normal() {
        let mesh = EditMesh::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::X * 2.0],
            vec![vec![0, 1, 2]],
        );
        assert_eq!(mesh.face_normal(0), Vec3::ZERO);
    }

    #[test]
    fn add_then_delete_quad_restores_counts() {
        let mut mesh = make_two_quads();
        let before = mesh.counts();

        let face = mesh.add_quad([
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(-1.0, 1.0, 0.0),
        ]);
        assert_eq!(face, 2);
        assert_eq!(mesh.vertex_count(), before.vertices + 4);
        assert_eq!(mesh.edge_count(), before.edges + 4);

        mesh.delete_faces(&HashSet::from([face]));
        assert_eq!(mesh.counts(), before);
    }

    #[test]
    fn delete_keeps_shared_vertices_and_flags() {
        let mut mesh = make_two_quads();
        mesh.set_vertex_selected(3, true);
        let shared = mesh.edge_index(Edge::new(1, 4)).unwrap();
        mesh.set_edge_selected(shared, true);
        mesh.set_face_hidden(0, true);

        mesh.delete_faces(&HashSet::from([1]));

        // Vertices 2 and 5 belonged only to the deleted face; 3 shifts to 2.
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.edge_count(), 4);
        assert!(mesh.is_vertex_selected(2));
        assert!(!mesh.is_vertex_selected(3));
        assert!(mesh.is_face_hidden(0));
        let shared = mesh.edge_index(Edge::new(1, 3)).unwrap();
        assert!(mesh.is_edge_selected(shared));
    }

    #[test]
    fn out_of_range_flags_are_rejected() {
        let mut mesh = make_two_quads();
        assert!(!mesh.set_face_selected(10, true));
        assert!(!mesh.set_vertex_selected(10, true));
        assert!(!mesh.is_face_hidden(10));
    }

    #[test]
    fn from_bevy_cuboid() {
        let bevy_mesh = Mesh::from(Cuboid::new(1.0, 1.0, 1.0));
        let mesh = EditMesh::from_bevy_mesh(&bevy_mesh).unwrap();
        assert_eq!(mesh.face_count(), 12);
        for fi in 0..mesh.face_count() {
            assert!((mesh.face_normal(fi).length() - 1.0).abs() < 1e-5);
        }
    }
}
