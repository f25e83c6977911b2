//! Viewer orientation used to classify geometry.
//!
//! A `ViewFrame` maps mesh-local space into view space. View space follows
//! the Bevy convention: the camera looks down -Z, so +Z points at the viewer.

use bevy::prelude::*;

/// Rotation plus optional translation from mesh-local space to view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrame {
    pub rotation: Mat3,
    /// `None` for an orthographic view where only the direction matters.
    pub translation: Option<Vec3>,
}

impl Default for ViewFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ViewFrame {
    /// Looking down -Z with no offset.
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        translation: None,
    };

    pub fn from_rotation(rotation: Mat3) -> Self {
        Self {
            rotation,
            translation: None,
        }
    }

    pub fn from_quat(rotation: Quat) -> Self {
        Self::from_rotation(Mat3::from_quat(rotation))
    }

    /// Build from a mesh-local to view matrix (a view matrix when the mesh
    /// sits at the world origin).
    ///
    /// Scale is discarded so the rotation stays orthonormal.
    pub fn from_view_matrix(view: Mat4) -> Self {
        let (_, rotation, translation) = view.to_scale_rotation_translation();
        Self {
            rotation: Mat3::from_quat(rotation),
            translation: Some(translation),
        }
    }

    /// Frame for a camera looking at a mesh placed at the world origin.
    pub fn from_camera(camera: &GlobalTransform) -> Self {
        Self::from_view_matrix(Mat4::from(camera.affine().inverse()))
    }

    /// Frame for a camera looking at a mesh owned by a transformed object.
    ///
    /// The object's rotation is folded in so classification happens in the
    /// mesh's own space.
    pub fn from_camera_and_object(camera: &GlobalTransform, object: &GlobalTransform) -> Self {
        let local_to_view = camera.affine().inverse() * object.affine();
        Self::from_view_matrix(Mat4::from(local_to_view))
    }

    /// Unit direction from the mesh toward the viewer, in mesh-local space.
    pub fn toward_viewer(&self) -> Vec3 {
        (self.effective_rotation().transpose() * Vec3::Z)
            .try_normalize()
            .unwrap_or(Vec3::Z)
    }

    /// Unit viewing direction in mesh-local space.
    pub fn forward(&self) -> Vec3 {
        -self.toward_viewer()
    }

    /// Eye position in mesh-local space, for perspective frames.
    pub fn eye(&self) -> Option<Vec3> {
        let translation = self.translation?;
        let eye = -(self.effective_rotation().transpose() * translation);
        eye.is_finite().then_some(eye)
    }

    /// The transposed rotation as a homogeneous matrix, used to carry points
    /// from view space back into mesh-local space.
    pub fn inverse_rotation_matrix(&self) -> Mat4 {
        Mat4::from_mat3(self.effective_rotation()).transpose()
    }

    /// The rotation, or identity when it is singular or not finite.
    fn effective_rotation(&self) -> Mat3 {
        if self.rotation.is_finite() && self.rotation.determinant().abs() > f32::EPSILON {
            self.rotation
        } else {
            Mat3::IDENTITY
        }
    }
}

/// Pixel extent of the view a renderer draws into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Rectangle covering the whole viewport.
    pub fn full_rect(&self) -> URect {
        URect::new(0, 0, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_faces_positive_z() {
        let view = ViewFrame::IDENTITY;
        assert_eq!(view.toward_viewer(), Vec3::Z);
        assert_eq!(view.forward(), Vec3::NEG_Z);
        assert_eq!(view.eye(), None);
    }

    #[test]
    fn degenerate_rotation_falls_back_to_identity() {
        assert_eq!(ViewFrame::from_rotation(Mat3::ZERO).toward_viewer(), Vec3::Z);
        let nan = Mat3::from_cols(Vec3::NAN, Vec3::NAN, Vec3::NAN);
        assert_eq!(ViewFrame::from_rotation(nan).toward_viewer(), Vec3::Z);
    }

    #[test]
    fn degenerate_rotation_keeps_identity_eye() {
        let translation = Some(Vec3::new(0.0, 0.0, -4.0));
        let identity = ViewFrame {
            rotation: Mat3::IDENTITY,
            translation,
        };
        let degenerate = ViewFrame {
            rotation: Mat3::ZERO,
            translation,
        };
        assert_eq!(identity.eye(), Some(Vec3::new(0.0, 0.0, 4.0)));
        assert_eq!(degenerate.eye(), identity.eye());
    }

    #[test]
    fn camera_on_positive_x_looks_toward_origin() {
        let camera = GlobalTransform::from(
            Transform::from_xyz(5.0, 0.0, 0.0).looking_at(Vec3::ZERO, Vec3::Y),
        );
        let view = ViewFrame::from_camera(&camera);
        assert!(view.toward_viewer().abs_diff_eq(Vec3::X, 1e-5));
        let eye = view.eye().unwrap();
        assert!(eye.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn object_rotation_is_folded_in() {
        let camera = GlobalTransform::from(
            Transform::from_xyz(0.0, 0.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
        );
        // Object turned 90 degrees about Y: its local -X axis now faces +Z.
        let object = GlobalTransform::from(Transform::from_rotation(Quat::from_rotation_y(FRAC_PI_2)));
        let view = ViewFrame::from_camera_and_object(&camera, &object);
        assert!(view.toward_viewer().abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn viewport_rect() {
        let viewport = Viewport::new(800, 600);
        assert_eq!(viewport.full_rect().size(), UVec2::new(800, 600));
        assert!(Viewport::new(0, 600).is_empty());
    }
}
