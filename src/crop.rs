use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Result of the modal crop interaction.
#[derive(Debug, Clone)]
pub enum CropOutcome {
    Cropped(DynamicImage),
    Cancelled,
    Failed(String),
}

pub trait CropUi {
    fn crop(&mut self, image: &DynamicImage) -> CropOutcome;
}

/// Normalized rectangle in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Non-interactive crop UI that always cuts the same normalized rectangle.
/// Without a rectangle it behaves like a dismissed dialog.
#[derive(Debug, Clone, Default)]
pub struct RectCrop {
    rect: Option<CropRect>,
}

impl RectCrop {
    pub fn new(rect: CropRect) -> Self {
        Self { rect: Some(rect) }
    }

    pub fn dismissed() -> Self {
        Self { rect: None }
    }
}

impl CropUi for RectCrop {
    fn crop(&mut self, image: &DynamicImage) -> CropOutcome {
        let Some(rect) = self.rect else {
            return CropOutcome::Cancelled;
        };
        match crop_normalized(image, rect) {
            Ok(out) => CropOutcome::Cropped(out),
            Err(reason) => CropOutcome::Failed(reason),
        }
    }
}

pub fn crop_normalized(image: &DynamicImage, rect: CropRect) -> Result<DynamicImage, String> {
    let unit = |v: f32| (0.0..=1.0).contains(&v);
    if !unit(rect.x) || !unit(rect.y) || !unit(rect.width) || !unit(rect.height) {
        return Err(format!("crop rectangle {rect:?} is outside the image"));
    }

    let w = image.width() as f32;
    let h = image.height() as f32;
    let cx = (rect.x * w) as u32;
    let cy = (rect.y * h) as u32;
    let cw = (rect.width * w).min(w - cx as f32) as u32;
    let ch = (rect.height * h).min(h - cy as f32) as u32;
    if cw == 0 || ch == 0 {
        return Err("crop rectangle is empty".to_string());
    }
    Ok(image.crop_imm(cx, cy, cw, ch))
}
