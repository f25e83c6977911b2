//! Apply a keep-visible face set to the mesh's hidden flags.

use std::collections::HashSet;

use super::edit_mesh::{EditMesh, FaceIndex};

/// Hide every face not in `keep_visible` and reveal every face in it.
///
/// Indices in `keep_visible` beyond the face count are ignored. Returns the
/// number of hidden faces.
pub fn hide_complement(mesh: &mut EditMesh, keep_visible: &HashSet<FaceIndex>) -> usize {
    let mut hidden = 0;
    for fi in 0..mesh.face_count() {
        let hide = !keep_visible.contains(&fi);
        mesh.set_face_hidden(fi, hide);
        if hide {
            hidden += 1;
        }
    }
    hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::prelude::Vec3;

    #[test]
    fn hidden_matches_complement() {
        let mut mesh = EditMesh::cuboid(Vec3::ONE);
        mesh.set_face_hidden(4, true);
        let keep = HashSet::from([1, 4, 42]);

        let hidden = hide_complement(&mut mesh, &keep);

        assert_eq!(hidden, 4);
        for fi in 0..mesh.face_count() {
            assert_eq!(mesh.is_face_hidden(fi), !keep.contains(&fi));
        }
    }

    #[test]
    fn idempotent() {
        let mut mesh = EditMesh::cuboid(Vec3::ONE);
        let keep = HashSet::from([0, 2]);
        hide_complement(&mut mesh, &keep);
        let first = mesh.hidden_faces();
        hide_complement(&mut mesh, &keep);
        assert_eq!(mesh.hidden_faces(), first);
    }

    #[test]
    fn empty_mesh_hides_nothing() {
        let mut mesh = EditMesh::default();
        assert_eq!(hide_complement(&mut mesh, &HashSet::new()), 0);
    }
}
