//! Capture and restore of the user's selection around a hiding operation.

use bevy::prelude::*;

use super::edit_mesh::{EdgeIndex, EditMesh, FaceIndex, SelectionMode, VertexIndex};

/// Selection state recorded before an operation touches the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSnapshot {
    vertices: Vec<VertexIndex>,
    edges: Vec<EdgeIndex>,
    faces: Vec<FaceIndex>,
    mode: SelectionMode,
    /// Renderer "limit selection to visible" flag, when a renderer is involved.
    occlude_geometry: Option<bool>,
}

/// What `SelectionSnapshot::restore` could not put back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Stored indices that no longer exist in the mesh.
    pub ignored: usize,
}

impl RestoreOutcome {
    pub fn is_complete(&self) -> bool {
        self.ignored == 0
    }
}

impl SelectionSnapshot {
    /// Record selected vertices, edges, faces and the selection mode.
    pub fn capture(mesh: &EditMesh) -> Self {
        Self {
            vertices: mesh.selected_vertices(),
            edges: mesh.selected_edges(),
            faces: mesh.selected_faces(),
            mode: mesh.select_mode(),
            occlude_geometry: None,
        }
    }

    /// Also remember the renderer's occlusion flag.
    pub fn with_occlude_geometry(mut self, occlude: bool) -> Self {
        self.occlude_geometry = Some(occlude);
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn occlude_geometry(&self) -> Option<bool> {
        self.occlude_geometry
    }

    pub fn vertices(&self) -> &[VertexIndex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[EdgeIndex] {
        &self.edges
    }

    pub fn faces(&self) -> &[FaceIndex] {
        &self.faces
    }

    /// Make the mesh selection exactly what was captured.
    ///
    /// Every element not in the snapshot ends up deselected. Indices that are
    /// out of range are skipped and counted instead of failing the restore.
    pub fn restore(&self, mesh: &mut EditMesh) -> RestoreOutcome {
        mesh.deselect_all();
        mesh.set_select_mode(self.mode);

        let mut outcome = RestoreOutcome::default();
        for &vi in &self.vertices {
            if !mesh.set_vertex_selected(vi, true) {
                outcome.ignored += 1;
            }
        }
        for &ei in &self.edges {
            if !mesh.set_edge_selected(ei, true) {
                outcome.ignored += 1;
            }
        }
        for &fi in &self.faces {
            if !mesh.set_face_selected(fi, true) {
                outcome.ignored += 1;
            }
        }

        debug!(
            "Restored {} selection mode: {} vertices, {} edges, {} faces",
            self.mode.display_name(),
            self.vertices.len(),
            self.edges.len(),
            self.faces.len()
        );
        if !outcome.is_complete() {
            warn!(
                "Selection restore skipped {} stale indices (mesh now has {} vertices, {} edges, {} faces)",
                outcome.ignored,
                mesh.vertex_count(),
                mesh.edge_count(),
                mesh.face_count()
            );
        }
        outcome
    }
}
