//! Non-destructive hiding of backfacing or occluded geometry in edit mode.
//!
//! Each operation captures the user's selection, reveals the whole mesh,
//! decides which faces stay visible, hides the rest and puts the selection
//! back exactly as it was.

pub mod backface;
pub mod edit_mesh;
pub mod error;
pub mod occlusion;
pub mod operation;
pub mod snapshot;
pub mod view;
pub mod visibility;

pub use backface::{BackfaceClassification, BackfaceClassifier, ReferencePlane, ReferenceStrategy};
pub use edit_mesh::{EditMesh, FaceIndex, SelectionMode};
pub use error::HideError;
pub use occlusion::{OcclusionProbe, OcclusionQuery, RaycastOcclusion};
pub use operation::{
    EditContext, EditTarget, HideReport, HideSession, HideStage, run_hide_backfacing,
    run_hide_non_visible,
};
pub use snapshot::SelectionSnapshot;
pub use view::{ViewFrame, Viewport};
pub use visibility::hide_complement;
