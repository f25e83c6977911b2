//! Backface classification: which faces point away from the viewer.
//!
//! Every face normal is compared against one reference normal that points
//! from the mesh toward the viewer. A face whose cosine similarity to the
//! reference reaches the threshold is *facing* and stays visible; every other
//! face is *backfacing*. This is a one-sided cosine test, not an occlusion
//! test: a front face hidden behind another front face still counts as facing.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::edit_mesh::{EditMesh, ElementCounts, FaceIndex, SelectionMode};
use super::error::HideError;
use super::view::ViewFrame;

/// Cosine similarity a face needs to count as facing the viewer.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;

/// Half size of the synthetic reference plane.
const REFERENCE_PLANE_EXTENT: f32 = 1.0;

/// How the toward-viewer reference normal is obtained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceStrategy {
    /// Rotate +Z by the inverse view rotation.
    #[default]
    Direct,
    /// Insert a temporary quad rotated to face the viewer, sample its normal,
    /// then delete it again.
    SyntheticPlane,
}

impl ReferenceStrategy {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReferenceStrategy::Direct => "Direct",
            ReferenceStrategy::SyntheticPlane => "Synthetic plane",
        }
    }
}

/// Result of a backface classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfaceClassification {
    /// Faces similar enough to the toward-viewer direction to stay visible.
    pub facing: HashSet<FaceIndex>,
    /// Everything else.
    pub backfacing: HashSet<FaceIndex>,
    /// Set when the reference plane could not be removed cleanly.
    pub warning: Option<HideError>,
}

/// Temporary quad whose normal stands in for the view direction.
///
/// Only lives between `insert` and `remove`.
#[derive(Debug)]
pub struct ReferencePlane {
    face: FaceIndex,
    counts_before: ElementCounts,
}

impl ReferencePlane {
    /// Append a quad to `mesh` turned to face the viewer.
    pub fn insert(mesh: &mut EditMesh, view: &ViewFrame) -> Self {
        let counts_before = mesh.counts();
        let to_local = view.inverse_rotation_matrix();
        let e = REFERENCE_PLANE_EXTENT;
        let corners = [
            Vec3::new(-e, -e, 0.0),
            Vec3::new(e, -e, 0.0),
            Vec3::new(e, e, 0.0),
            Vec3::new(-e, e, 0.0),
        ]
        .map(|corner| (to_local * corner.extend(1.0)).truncate());

        let face = mesh.add_quad(corners);
        Self {
            face,
            counts_before,
        }
    }

    pub fn face(&self) -> FaceIndex {
        self.face
    }

    pub fn normal(&self, mesh: &EditMesh) -> Vec3 {
        mesh.face_normal(self.face)
    }

    /// Delete the quad and its vertices, checking nothing is left behind.
    pub fn remove(self, mesh: &mut EditMesh) -> Result<(), HideError> {
        if self.face >= mesh.face_count() {
            return Err(HideError::inconsistent(format!(
                "reference face {} missing from mesh with {} faces",
                self.face,
                mesh.face_count()
            )));
        }
        mesh.delete_faces(&HashSet::from([self.face]));

        let after = mesh.counts();
        if after != self.counts_before {
            return Err(HideError::inconsistent(format!(
                "reference plane left geometry behind: {:?} before, {:?} after",
                self.counts_before, after
            )));
        }
        Ok(())
    }
}

/// Classifies faces by comparing their normals against the view direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackfaceClassifier {
    pub threshold: f32,
    pub strategy: ReferenceStrategy,
}

impl Default for BackfaceClassifier {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            strategy: ReferenceStrategy::default(),
        }
    }
}

impl BackfaceClassifier {
    pub fn new(threshold: f32, strategy: ReferenceStrategy) -> Self {
        Self {
            threshold,
            strategy,
        }
    }

    /// Reveal the mesh, switch to face selection and split its faces into
    /// facing and backfacing sets.
    ///
    /// Leaves the mesh revealed and fully deselected, with any transient
    /// geometry removed.
    pub fn classify(&self, mesh: &mut EditMesh, view: &ViewFrame) -> BackfaceClassification {
        mesh.reveal_all();
        mesh.set_select_mode(SelectionMode::Face);

        let classification = match self.strategy {
            ReferenceStrategy::Direct => {
                self.classify_against(mesh, view.toward_viewer(), None)
            }
            ReferenceStrategy::SyntheticPlane => {
                let plane = ReferencePlane::insert(mesh, view);
                self.classify_with_plane(mesh, plane)
            }
        };

        mesh.deselect_all();
        debug!(
            "Backface classification: {} facing, {} backfacing (threshold {})",
            classification.facing.len(),
            classification.backfacing.len(),
            self.threshold
        );
        classification
    }

    /// Classify against an inserted reference plane, then remove it.
    ///
    /// A failed removal does not discard the classification; it is carried
    /// in `warning` instead.
    fn classify_with_plane(
        &self,
        mesh: &mut EditMesh,
        plane: ReferencePlane,
    ) -> BackfaceClassification {
        let reference = plane.normal(mesh);
        debug!(
            "Reference plane face {} normal {:?}",
            plane.face(),
            reference
        );
        let mut classification = self.classify_against(mesh, reference, Some(plane.face()));
        if let Err(err) = plane.remove(mesh) {
            warn!("Keeping backface classification after failed cleanup: {}", err);
            classification.warning = Some(err);
        }
        classification
    }

    /// Split faces by cosine similarity to `reference`, skipping `pivot`.
    fn classify_against(
        &self,
        mesh: &EditMesh,
        reference: Vec3,
        pivot: Option<FaceIndex>,
    ) -> BackfaceClassification {
        let mut classification = BackfaceClassification::default();
        for fi in 0..mesh.face_count() {
            if Some(fi) == pivot {
                continue;
            }
            if self.is_facing(mesh.face_normal(fi), reference) {
                classification.facing.insert(fi);
            } else {
                classification.backfacing.insert(fi);
            }
        }
        classification
    }

    /// One-sided cosine test between a face normal and the reference normal.
    pub fn is_facing(&self, normal: Vec3, reference: Vec3) -> bool {
        normal.dot(reference) >= self.threshold
    }
}
