//! # Bevy Backface Hiding
//!
//! Temporarily hide geometry you don't want to see while editing a mesh:
//! either every face pointing away from the camera, or every face the
//! renderer reports as occluded. Selection, selection mode and the
//! renderer's occlusion setting are left exactly as they were.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bevy::prelude::*;
//! use bevy_backface_hiding::BackfaceHidingPlugin;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(BackfaceHidingPlugin::default())
//!         .run();
//! }
//! ```
//!
//! ## Running an operation
//!
//! Hosts hand the mesh and view to the session stored as a resource:
//!
//! ```ignore
//! fn hide_backfaces(mut session: ResMut<HideSession>, mut model: ResMut<MyModelState>) {
//!     let view = ViewFrame::from_camera(&model.camera_transform);
//!     let mut ctx = EditTarget::new(&mut model.edit_mesh, view);
//!     if let Err(err) = session.hide_backfacing(&mut ctx) {
//!         warn!("{err}");
//!     }
//! }
//! ```

pub mod hiding;
pub mod settings;

use bevy::prelude::*;

// Re-export the operation surface
pub use hiding::{
    EditContext, EditMesh, EditTarget, HideError, HideReport, HideSession, OcclusionQuery,
    RaycastOcclusion, ReferenceStrategy, SelectionMode, ViewFrame, Viewport, run_hide_backfacing,
    run_hide_non_visible,
};
pub use settings::HideSettings;

/// Installs a `HideSession` resource.
///
/// Settings are read from the user's config directory unless given
/// explicitly.
#[derive(Default)]
pub struct BackfaceHidingPlugin {
    pub settings: Option<HideSettings>,
}

impl BackfaceHidingPlugin {
    pub fn with_settings(settings: HideSettings) -> Self {
        Self {
            settings: Some(settings),
        }
    }
}

impl Plugin for BackfaceHidingPlugin {
    fn build(&self, app: &mut App) {
        let settings = self.settings.clone().unwrap_or_else(HideSettings::load);
        info!(
            "Backface hiding ready (threshold {}, {} reference)",
            settings.similarity_threshold,
            settings.reference.display_name()
        );
        app.insert_resource(HideSession::new(settings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_installs_session() {
        let settings = HideSettings {
            similarity_threshold: 0.25,
            reference: ReferenceStrategy::SyntheticPlane,
        };
        let mut app = App::new();
        app.add_plugins(BackfaceHidingPlugin::with_settings(settings.clone()));

        let session = app.world().resource::<HideSession>();
        assert_eq!(session.settings, settings);
        assert_eq!(session.stage(), hiding::HideStage::Idle);
    }

    #[test]
    fn session_resource_runs_operations() {
        let mut app = App::new();
        app.add_plugins(BackfaceHidingPlugin::with_settings(HideSettings::default()));

        let mut mesh = EditMesh::cuboid(Vec3::splat(1.0));
        let mut session = app.world_mut().resource_mut::<HideSession>();
        let report = session
            .hide_backfacing(&mut EditTarget::new(&mut mesh, ViewFrame::IDENTITY))
            .unwrap();
        assert_eq!(report.visible.len(), 1);
        assert_eq!(mesh.hidden_faces().len(), 5);
    }
}
