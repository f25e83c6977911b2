//! The two user-facing hide operations and the session that runs them.
//!
//! Both operations share one skeleton:
//!
//! ```text
//! Idle -> CaptureState -> Reveal -> Classify -> Hide -> Cleanup -> RestoreState -> Idle
//! ```
//!
//! and only differ in what runs during `Classify`. Once the selection has
//! been captured, `RestoreState` runs on every exit path.

use bevy::prelude::*;
use std::collections::HashSet;

use super::backface::BackfaceClassifier;
use super::edit_mesh::{EditMesh, FaceIndex, SelectionMode};
use super::error::HideError;
use super::occlusion::{OcclusionProbe, OcclusionQuery};
use super::snapshot::{RestoreOutcome, SelectionSnapshot};
use super::view::ViewFrame;
use super::visibility::hide_complement;
use crate::settings::HideSettings;

/// What the host editor hands to an operation.
pub trait EditContext {
    /// Orientation of the view the user is looking through.
    fn view_frame(&self) -> ViewFrame;

    /// The mesh currently in edit mode, if any.
    fn active_mesh(&mut self) -> Option<&mut EditMesh>;
}

/// Minimal `EditContext` over a borrowed mesh.
#[derive(Debug)]
pub struct EditTarget<'a> {
    pub mesh: Option<&'a mut EditMesh>,
    pub view: ViewFrame,
}

impl<'a> EditTarget<'a> {
    pub fn new(mesh: &'a mut EditMesh, view: ViewFrame) -> Self {
        Self {
            mesh: Some(mesh),
            view,
        }
    }

    /// A context with nothing in edit mode.
    pub fn empty(view: ViewFrame) -> Self {
        Self { mesh: None, view }
    }
}

impl EditContext for EditTarget<'_> {
    fn view_frame(&self) -> ViewFrame {
        self.view
    }

    fn active_mesh(&mut self) -> Option<&mut EditMesh> {
        self.mesh.as_deref_mut()
    }
}

/// Which hide operation ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideOperation {
    Backfacing,
    NonVisible,
}

impl HideOperation {
    pub fn display_name(&self) -> &'static str {
        match self {
            HideOperation::Backfacing => "Hide backfacing",
            HideOperation::NonVisible => "Hide non-visible",
        }
    }
}

/// Step of a running hide operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HideStage {
    #[default]
    Idle,
    CaptureState,
    Reveal,
    Classify,
    Hide,
    Cleanup,
    RestoreState,
}

/// Outcome of a completed hide operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideReport {
    /// Faces left visible.
    pub visible: HashSet<FaceIndex>,
    /// Faces hidden by the operation.
    pub hidden: HashSet<FaceIndex>,
    /// Inconsistencies met along the way that did not undo the hide.
    pub warnings: Vec<HideError>,
}

impl HideReport {
    /// Record a restore that skipped stale selection indices.
    fn note_restore(&mut self, restored: RestoreOutcome) {
        if !restored.is_complete() {
            self.warnings.push(HideError::inconsistent(format!(
                "{} selected elements could not be restored",
                restored.ignored
            )));
        }
    }
}

/// Owns the settings and stage of the hide operations.
///
/// Operations take `&mut self`, so one session never runs two at once.
#[derive(Resource, Debug, Clone, Default)]
pub struct HideSession {
    pub settings: HideSettings,
    stage: HideStage,
}

impl HideSession {
    pub fn new(settings: HideSettings) -> Self {
        Self {
            settings,
            stage: HideStage::Idle,
        }
    }

    pub fn stage(&self) -> HideStage {
        self.stage
    }

    /// Hide every face that does not face the viewer.
    pub fn hide_backfacing(&mut self, ctx: &mut dyn EditContext) -> Result<HideReport, HideError> {
        let classifier = BackfaceClassifier::new(
            self.settings.similarity_threshold,
            self.settings.reference,
        );
        let view = ctx.view_frame();
        let Some(mesh) = ctx.active_mesh() else {
            info!("{}: no active mesh", HideOperation::Backfacing.display_name());
            return Err(HideError::NoActiveTarget);
        };

        self.run(mesh, Classify::Backfacing { classifier, view })
    }

    /// Hide every face the renderer cannot see from the current view.
    pub fn hide_non_visible(
        &mut self,
        ctx: &mut dyn EditContext,
        query: &mut dyn OcclusionQuery,
    ) -> Result<HideReport, HideError> {
        let Some(mesh) = ctx.active_mesh() else {
            info!("{}: no active mesh", HideOperation::NonVisible.display_name());
            return Err(HideError::NoActiveTarget);
        };

        self.run(mesh, Classify::NonVisible { query })
    }

    fn advance(&mut self, operation: HideOperation, stage: HideStage) {
        debug!("{}: {:?} -> {:?}", operation.display_name(), self.stage, stage);
        self.stage = stage;
    }

    /// Shared capture / reveal / classify / hide / cleanup / restore skeleton.
    fn run(&mut self, mesh: &mut EditMesh, mut classify: Classify<'_>) -> Result<HideReport, HideError> {
        let operation = classify.operation();

        self.advance(operation, HideStage::CaptureState);
        let mut snapshot = SelectionSnapshot::capture(mesh);
        if let Classify::NonVisible { query } = &classify {
            snapshot = snapshot.with_occlude_geometry(query.occlude_geometry());
        }

        self.advance(operation, HideStage::Reveal);
        mesh.reveal_all();

        self.advance(operation, HideStage::Classify);
        let classified = classify.keep_visible(mesh);

        let result = match classified {
            Ok((keep_visible, warning)) => {
                self.advance(operation, HideStage::Hide);
                hide_complement(mesh, &keep_visible);
                Ok(HideReport {
                    hidden: mesh.hidden_faces(),
                    visible: keep_visible,
                    warnings: warning.into_iter().collect(),
                })
            }
            Err(err) => Err(err),
        };

        self.advance(operation, HideStage::Cleanup);
        mesh.deselect_all();

        self.advance(operation, HideStage::RestoreState);
        let restored = snapshot.restore(mesh);
        if let (Classify::NonVisible { query }, Some(occlude)) =
            (&mut classify, snapshot.occlude_geometry())
        {
            query.set_occlude_geometry(occlude);
        }
        self.advance(operation, HideStage::Idle);

        let result = result.map(|mut report| {
            report.note_restore(restored);
            report
        });

        match &result {
            Ok(report) => {
                info!(
                    "{}: {} faces visible, {} hidden",
                    operation.display_name(),
                    report.visible.len(),
                    report.hidden.len()
                );
                for warning in &report.warnings {
                    warn!("{}: {}", operation.display_name(), warning);
                }
            }
            Err(err) if err.is_warning() => {
                warn!("{}: {}", operation.display_name(), err)
            }
            Err(err) => error!("{}: {}", operation.display_name(), err),
        }
        result
    }
}

/// The step that differs between the two operations.
enum Classify<'q> {
    Backfacing {
        classifier: BackfaceClassifier,
        view: ViewFrame,
    },
    NonVisible {
        query: &'q mut dyn OcclusionQuery,
    },
}

impl Classify<'_> {
    fn operation(&self) -> HideOperation {
        match self {
            Classify::Backfacing { .. } => HideOperation::Backfacing,
            Classify::NonVisible { .. } => HideOperation::NonVisible,
        }
    }

    /// Faces to keep visible, plus any inconsistency that should not stop
    /// the hide. Leaves the mesh deselected.
    fn keep_visible(
        &mut self,
        mesh: &mut EditMesh,
    ) -> Result<(HashSet<FaceIndex>, Option<HideError>), HideError> {
        match self {
            Classify::Backfacing { classifier, view } => {
                let classification = classifier.classify(mesh, view);
                Ok((classification.facing, classification.warning))
            }
            Classify::NonVisible { query } => {
                mesh.set_select_mode(SelectionMode::Face);
                let visible = OcclusionProbe.classify_visible(mesh, &mut **query);
                mesh.deselect_all();
                visible.map(|faces| (faces, None))
            }
        }
    }
}

/// Hide backfacing geometry of the context's active mesh.
pub fn run_hide_backfacing(
    ctx: &mut dyn EditContext,
    settings: &HideSettings,
) -> Result<HideReport, HideError> {
    HideSession::new(settings.clone()).hide_backfacing(ctx)
}

/// Hide geometry the renderer reports as occluded.
pub fn run_hide_non_visible(
    ctx: &mut dyn EditContext,
    query: &mut dyn OcclusionQuery,
    settings: &HideSettings,
) -> Result<HideReport, HideError> {
    HideSession::new(settings.clone()).hide_non_visible(ctx, query)
}
