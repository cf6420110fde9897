//! Reference CPU implementation of the render engine.
//!
//! Stages run one after another on an 8-bit RGBA buffer, so every stage
//! quantizes its output the way a chain of 8-bit render targets would.

pub mod color;
pub mod sharpness;
pub mod transform;
pub mod vignette;

use image::DynamicImage;

use crate::error::EditError;
use crate::stage::AdjustmentStage;

/// Turns a source image plus an ordered stage list into a rendered image.
///
/// Implementations must be deterministic and must not mutate the source.
pub trait RenderEngine: Send + Sync {
    fn render(
        &self,
        image: &DynamicImage,
        stages: &[AdjustmentStage],
    ) -> Result<DynamicImage, EditError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CpuEngine;

impl RenderEngine for CpuEngine {
    fn render(
        &self,
        image: &DynamicImage,
        stages: &[AdjustmentStage],
    ) -> Result<DynamicImage, EditError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(EditError::RenderFailure("source image is empty".into()));
        }
        for stage in stages {
            stage.validate()?;
        }

        let mut out = image.clone();
        for stage in stages.iter().filter(|s| !s.is_neutral()) {
            out = apply_stage(out, stage)?;
        }
        Ok(out)
    }
}

fn apply_stage(img: DynamicImage, stage: &AdjustmentStage) -> Result<DynamicImage, EditError> {
    let out = match *stage {
        AdjustmentStage::Identity => img,
        AdjustmentStage::Sharpen { strength } => sharpness::apply(img, strength),
        AdjustmentStage::Vignette {
            center,
            color,
            start,
            end,
        } => vignette::apply(img, center, color, start, end),
        AdjustmentStage::GeometricTransform { ref matrix } => transform::apply(img, matrix)?,
        _ => color::apply(img, stage),
    };
    Ok(out)
}
