use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::catalog::{FilterChain, FilterId, chain_for};
use crate::error::EditError;
use crate::processing::RenderEngine;
use crate::stage::{AdjustmentStage, Mat4};

/// Seek bars run from 0 to 100 with 50 as the neutral position.
pub const PROGRESS_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Filter selection plus the three live slider values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Adjustments {
    pub filter: FilterId,
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            filter: FilterId::Original,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
        }
    }
}

impl Adjustments {
    /// The filter's base chain followed by brightness, contrast and
    /// saturation, always in that order.
    pub fn effective_stages(&self) -> FilterChain {
        let mut stages = chain_for(self.filter);
        stages.extend([
            AdjustmentStage::brightness(self.brightness),
            AdjustmentStage::contrast(self.contrast),
            AdjustmentStage::saturation(self.saturation),
        ]);
        stages
    }
}

pub fn brightness_from_progress(progress: i32) -> f32 {
    (progress.clamp(0, PROGRESS_MAX) - 50) as f32 / 50.0
}

pub fn factor_from_progress(progress: i32) -> f32 {
    progress.clamp(0, PROGRESS_MAX) as f32 / 50.0
}

/// A single user edit against the session.
#[derive(Debug, Clone)]
pub enum Edit {
    /// Re-render the current state, e.g. right after loading.
    Refresh,
    SelectFilter(FilterId),
    Brightness(i32),
    Contrast(i32),
    Saturation(i32),
    Rotate(f32),
    Flip(FlipAxis),
    Crop(DynamicImage),
}

/// How a finished render folds back into the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Commit {
    /// Keep the source, adopt new adjustments.
    Adjust(Adjustments),
    /// The rendered image becomes the new source.
    ReplaceSource,
    /// The job's input becomes the new source.
    InstallSource,
}

/// Everything needed to render off the session-owning thread.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: DynamicImage,
    pub stages: FilterChain,
    pub commit: Commit,
}

#[derive(Debug)]
pub struct JobOutput {
    pub source: DynamicImage,
    pub commit: Commit,
    pub result: Result<DynamicImage, EditError>,
}

impl RenderJob {
    pub fn execute(self, engine: &dyn RenderEngine) -> JobOutput {
        let result = engine.render(&self.source, &self.stages);
        JobOutput {
            source: self.source,
            commit: self.commit,
            result,
        }
    }
}

/// The image being edited plus the parameters it is rendered with.
#[derive(Debug, Default)]
pub struct RenderSession {
    source: Option<DynamicImage>,
    adjustments: Adjustments,
}

impl RenderSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(image: DynamicImage) -> Self {
        Self {
            source: Some(image),
            adjustments: Adjustments::default(),
        }
    }

    pub fn source(&self) -> Option<&DynamicImage> {
        self.source.as_ref()
    }

    pub fn adjustments(&self) -> Adjustments {
        self.adjustments
    }

    pub fn selected_filter(&self) -> FilterId {
        self.adjustments.filter
    }

    /// Replaces the source and resets filter and sliders to defaults.
    pub fn load_image(&mut self, image: DynamicImage) {
        self.source = Some(image);
        self.adjustments = Adjustments::default();
    }

    pub fn select_filter(&mut self, id: FilterId) {
        self.adjustments.filter = id;
    }

    pub fn set_brightness(&mut self, progress: i32) {
        self.adjustments.brightness = brightness_from_progress(progress);
    }

    pub fn set_contrast(&mut self, progress: i32) {
        self.adjustments.contrast = factor_from_progress(progress);
    }

    pub fn set_saturation(&mut self, progress: i32) {
        self.adjustments.saturation = factor_from_progress(progress);
    }

    pub fn effective_stages(&self) -> FilterChain {
        self.adjustments.effective_stages()
    }

    /// Renders the source with the selected filter and live adjustments.
    /// Always recomposes from the base chain; nothing accumulates.
    pub fn render(&self, engine: &dyn RenderEngine) -> Result<DynamicImage, EditError> {
        let source = self.source.as_ref().ok_or(EditError::NoSourceImage)?;
        engine.render(source, &self.effective_stages())
    }

    /// Rotates the source in place; later edits build on the rotated image.
    pub fn rotate(
        &mut self,
        degrees: f32,
        engine: &dyn RenderEngine,
    ) -> Result<DynamicImage, EditError> {
        self.run(Edit::Rotate(degrees), engine)
    }

    /// Mirrors the source in place.
    pub fn flip(
        &mut self,
        axis: FlipAxis,
        engine: &dyn RenderEngine,
    ) -> Result<DynamicImage, EditError> {
        self.run(Edit::Flip(axis), engine)
    }

    /// Installs a cropped image and re-renders it with the selected filter.
    /// Unlike `load_image` the filter selection survives.
    pub fn apply_crop_result(
        &mut self,
        image: DynamicImage,
        engine: &dyn RenderEngine,
    ) -> Result<DynamicImage, EditError> {
        self.run(Edit::Crop(image), engine)
    }

    /// Runs an edit synchronously against `engine`.
    pub fn run(&mut self, edit: Edit, engine: &dyn RenderEngine) -> Result<DynamicImage, EditError> {
        let job = self.prepare(edit)?;
        self.complete(job.execute(engine))
    }

    /// Builds the render job for `edit` without touching session state.
    pub fn prepare(&self, edit: Edit) -> Result<RenderJob, EditError> {
        let current = self.source.as_ref().ok_or(EditError::NoSourceImage)?;
        if let Edit::Crop(image) = edit {
            return Ok(RenderJob {
                source: image,
                stages: self.effective_stages(),
                commit: Commit::InstallSource,
            });
        }

        let source = current.clone();
        let mut next = self.adjustments;
        let job = match edit {
            Edit::Rotate(degrees) => geometric(source, Mat4::rotation_z(degrees)),
            Edit::Flip(FlipAxis::Horizontal) => geometric(source, Mat4::scale(-1.0, 1.0)),
            Edit::Flip(FlipAxis::Vertical) => geometric(source, Mat4::scale(1.0, -1.0)),
            adjust => {
                match adjust {
                    Edit::SelectFilter(id) => next.filter = id,
                    Edit::Brightness(p) => next.brightness = brightness_from_progress(p),
                    Edit::Contrast(p) => next.contrast = factor_from_progress(p),
                    Edit::Saturation(p) => next.saturation = factor_from_progress(p),
                    _ => {}
                }
                RenderJob {
                    source,
                    stages: next.effective_stages(),
                    commit: Commit::Adjust(next),
                }
            }
        };
        Ok(job)
    }

    /// Folds a finished job into the session. Failed jobs leave the
    /// session untouched.
    pub fn complete(&mut self, output: JobOutput) -> Result<DynamicImage, EditError> {
        let rendered = output.result?;
        match output.commit {
            Commit::Adjust(adjustments) => self.adjustments = adjustments,
            Commit::ReplaceSource => self.source = Some(rendered.clone()),
            Commit::InstallSource => self.source = Some(output.source),
        }
        Ok(rendered)
    }
}

fn geometric(source: DynamicImage, matrix: Mat4) -> RenderJob {
    RenderJob {
        source,
        stages: vec![AdjustmentStage::GeometricTransform { matrix }],
        commit: Commit::ReplaceSource,
    }
}
