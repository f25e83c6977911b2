//! Visible-face detection through a renderer's occlusion-aware selection.
//!
//! The probe does not do any depth testing itself. It drives a host query
//! through a fixed protocol: enable occlusion, select everything visible in
//! a rectangle covering the whole viewport, read the result, put the
//! occlusion flag back.

use bevy::prelude::*;
use std::collections::HashSet;

use super::edit_mesh::{EditMesh, FaceIndex};
use super::error::HideError;
use super::view::{ViewFrame, Viewport};

/// Host service answering "which faces can the viewer see in this rectangle".
pub trait OcclusionQuery {
    /// Pixel extent of the current view.
    fn viewport(&self) -> Viewport;

    /// Whether selection is limited to visible geometry.
    fn occlude_geometry(&self) -> bool;

    fn set_occlude_geometry(&mut self, enabled: bool);

    /// Faces selectable inside `rect`, honouring the occlusion flag.
    fn select_visible_in_rect(
        &mut self,
        mesh: &EditMesh,
        rect: URect,
    ) -> Result<Vec<FaceIndex>, String>;
}

/// Runs the full-viewport visibility query against a host.
#[derive(Debug, Default, Clone, Copy)]
pub struct OcclusionProbe;

impl OcclusionProbe {
    /// Faces of `mesh` visible from the host's current view.
    ///
    /// The host's occlusion flag is back to its prior value when this
    /// returns, whether or not the query succeeded.
    pub fn classify_visible(
        &self,
        mesh: &EditMesh,
        query: &mut dyn OcclusionQuery,
    ) -> Result<HashSet<FaceIndex>, HideError> {
        let viewport = query.viewport();
        if viewport.is_empty() {
            return Err(HideError::host_query(format!(
                "viewport has no area ({}x{})",
                viewport.width, viewport.height
            )));
        }

        let prior = query.occlude_geometry();
        query.set_occlude_geometry(true);
        let result = query.select_visible_in_rect(mesh, viewport.full_rect());
        query.set_occlude_geometry(prior);

        let faces = result.map_err(HideError::HostQueryFailure)?;
        let face_count = mesh.face_count();
        let mut visible = HashSet::with_capacity(faces.len());
        let mut dropped = 0;
        for fi in faces {
            if fi < face_count {
                visible.insert(fi);
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "Visibility query returned {} face indices outside the mesh ({} faces)",
                dropped, face_count
            );
        }
        Ok(visible)
    }
}

/// Result of a ray pick against a face.
#[derive(Debug, Clone, Copy)]
pub struct FaceHit {
    pub face: FaceIndex,
    pub distance: f32,
}

/// Moller-Trumbore ray-triangle intersection.
///
/// Returns the distance along the ray if the ray hits the triangle.
fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray_dir.cross(edge2);
    let a = edge1.dot(h);

    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray_origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray_dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    if t > EPSILON { Some(t) } else { None }
}

/// Pick the closest face hit by a ray against the mesh (in local space).
///
/// Both sides of every face are pickable; hidden faces are skipped.
pub fn pick_face(mesh: &EditMesh, ray_origin: Vec3, ray_dir: Vec3) -> Option<FaceHit> {
    let mut closest: Option<FaceHit> = None;

    for fi in 0..mesh.face_count() {
        if mesh.is_face_hidden(fi) {
            continue;
        }
        for [v0, v1, v2] in mesh.face_triangles(fi) {
            if let Some(t) = ray_triangle_intersection(ray_origin, ray_dir, v0, v1, v2) {
                if closest.is_none_or(|c| t < c.distance) {
                    closest = Some(FaceHit {
                        face: fi,
                        distance: t,
                    });
                }
            }
        }
    }

    closest
}

/// In-process stand-in for a renderer's occlusion test.
///
/// Casts one ray per face at its centroid, from the eye for a perspective
/// frame or along the view direction for an orthographic one, and reports
/// the faces that are hit first. With occlusion off every face counts.
#[derive(Debug, Clone)]
pub struct RaycastOcclusion {
    pub view: ViewFrame,
    pub viewport: Viewport,
    occlude_geometry: bool,
}

impl RaycastOcclusion {
    /// Tolerance when comparing a hit distance against the centroid distance.
    const DEPTH_EPSILON: f32 = 1e-4;

    pub fn new(view: ViewFrame, viewport: Viewport) -> Self {
        Self {
            view,
            viewport,
            occlude_geometry: false,
        }
    }

    fn is_face_visible(&self, mesh: &EditMesh, face: FaceIndex, standoff: f32) -> bool {
        let target = mesh.face_center(face);
        let (origin, dir) = match self.view.eye() {
            Some(eye) => match (target - eye).try_normalize() {
                Some(dir) => (eye, dir),
                None => return false,
            },
            None => {
                let dir = self.view.forward();
                (target - dir * standoff, dir)
            }
        };
        let target_distance = (target - origin).length();

        match pick_face(mesh, origin, dir) {
            Some(hit) => {
                hit.face == face || (hit.distance - target_distance).abs() < Self::DEPTH_EPSILON
            }
            None => false,
        }
    }
}

impl OcclusionQuery for RaycastOcclusion {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn occlude_geometry(&self) -> bool {
        self.occlude_geometry
    }

    fn set_occlude_geometry(&mut self, enabled: bool) {
        self.occlude_geometry = enabled;
    }

    fn select_visible_in_rect(
        &mut self,
        mesh: &EditMesh,
        rect: URect,
    ) -> Result<Vec<FaceIndex>, String> {
        if rect.is_empty() {
            return Err(format!("empty selection rectangle {:?}", rect));
        }

        let candidates = (0..mesh.face_count()).filter(|&fi| !mesh.is_face_hidden(fi));
        if !self.occlude_geometry {
            return Ok(candidates.collect());
        }

        // Orthographic rays start outside the mesh's bounds.
        let standoff = mesh
            .positions
            .iter()
            .map(|p| p.length())
            .fold(0.0_f32, f32::max)
            * 2.0
            + 1.0;
        Ok(candidates
            .filter(|&fi| self.is_face_visible(mesh, fi, standoff))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POS_Z: FaceIndex = 4;
    const NEG_Z: FaceIndex = 5;

    /// Host double that records the occlusion flag it saw during the query.
    struct ScriptedQuery {
        viewport: Viewport,
        occlude: bool,
        occlude_during_query: Option<bool>,
        answer: Result<Vec<FaceIndex>, String>,
    }

    impl ScriptedQuery {
        fn new(answer: Result<Vec<FaceIndex>, String>) -> Self {
            Self {
                viewport: Viewport::new(640, 480),
                occlude: false,
                occlude_during_query: None,
                answer,
            }
        }
    }

    impl OcclusionQuery for ScriptedQuery {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        fn occlude_geometry(&self) -> bool {
            self.occlude
        }

        fn set_occlude_geometry(&mut self, enabled: bool) {
            self.occlude = enabled;
        }

        fn select_visible_in_rect(
            &mut self,
            _mesh: &EditMesh,
            rect: URect,
        ) -> Result<Vec<FaceIndex>, String> {
            assert_eq!(rect, self.viewport.full_rect());
            self.occlude_during_query = Some(self.occlude);
            self.answer.clone()
        }
    }

    #[test]
    fn probe_enables_occlusion_then_restores_flag() {
        let mesh = EditMesh::cuboid(Vec3::ONE);
        let mut query = ScriptedQuery::new(Ok(vec![0, 4, 99]));

        let visible = OcclusionProbe.classify_visible(&mesh, &mut query).unwrap();

        assert_eq!(visible, HashSet::from([0, 4]));
        assert_eq!(query.occlude_during_query, Some(true));
        assert!(!query.occlude);
    }

    #[test]
    fn probe_restores_flag_on_failure() {
        let mesh = EditMesh::cuboid(Vec3::ONE);
        let mut query = ScriptedQuery::new(Err("renderer busy".into()));
        query.occlude = true;

        let err = OcclusionProbe.classify_visible(&mesh, &mut query).unwrap_err();

        assert_eq!(err, HideError::HostQueryFailure("renderer busy".into()));
        assert!(query.occlude);
    }

    #[test]
    fn empty_viewport_is_a_query_failure() {
        let mesh = EditMesh::cuboid(Vec3::ONE);
        let mut query = ScriptedQuery::new(Ok(vec![]));
        query.viewport = Viewport::new(0, 0);

        let err = OcclusionProbe.classify_visible(&mesh, &mut query).unwrap_err();
        assert!(matches!(err, HideError::HostQueryFailure(_)));
        assert_eq!(query.occlude_during_query, None);
    }

    #[test]
    fn pick_face_hits_front_of_cube() {
        let mesh = EditMesh::cuboid(Vec3::splat(0.5));
        let hit = pick_face(&mesh, Vec3::new(0.1, 0.2, 5.0), Vec3::NEG_Z).unwrap();
        assert_eq!(hit.face, POS_Z);
        assert!((hit.distance - 4.5).abs() < 1e-5);
    }

    #[test]
    fn raycast_hides_far_side_of_cube() {
        let mesh = EditMesh::cuboid(Vec3::splat(0.5));
        for view in [
            ViewFrame::IDENTITY,
            ViewFrame::from_view_matrix(Mat4::from_translation(Vec3::new(0.0, 0.0, -4.0))),
        ] {
            let mut query = RaycastOcclusion::new(view, Viewport::new(320, 240));
            let visible = OcclusionProbe.classify_visible(&mesh, &mut query).unwrap();
            assert!(visible.contains(&POS_Z), "{:?}", view);
            assert!(!visible.contains(&NEG_Z), "{:?}", view);
            assert!(!query.occlude_geometry());
        }
    }

    #[test]
    fn raycast_treats_singular_view_as_identity() {
        let mesh = EditMesh::cuboid(Vec3::splat(0.5));
        let translation = Some(Vec3::new(0.0, 0.0, -4.0));
        let mut visible_sets = Vec::new();
        for rotation in [Mat3::IDENTITY, Mat3::ZERO] {
            let view = ViewFrame {
                rotation,
                translation,
            };
            let mut query = RaycastOcclusion::new(view, Viewport::new(320, 240));
            visible_sets.push(OcclusionProbe.classify_visible(&mesh, &mut query).unwrap());
        }
        assert!(visible_sets[0].contains(&POS_Z));
        assert!(!visible_sets[0].contains(&NEG_Z));
        assert_eq!(visible_sets[0], visible_sets[1]);
    }

    #[test]
    fn raycast_without_occlusion_reports_everything() {
        let mesh = EditMesh::cuboid(Vec3::splat(0.5));
        let mut query = RaycastOcclusion::new(ViewFrame::IDENTITY, Viewport::new(320, 240));
        let all = query
            .select_visible_in_rect(&mesh, query.viewport.full_rect())
            .unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn raycast_sees_both_stacked_quads_only_when_unoccluded() {
        // Two quads facing the viewer, one behind the other.
        let mut mesh = EditMesh::default();
        for z in [0.0, -1.0] {
            mesh.add_quad([
                Vec3::new(-1.0, -1.0, z),
                Vec3::new(1.0, -1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(-1.0, 1.0, z),
            ]);
        }
        let mut query = RaycastOcclusion::new(ViewFrame::IDENTITY, Viewport::new(100, 100));
        let visible = OcclusionProbe.classify_visible(&mesh, &mut query).unwrap();
        assert_eq!(visible, HashSet::from([0]));
    }
}
