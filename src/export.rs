use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;

use crate::error::EditError;

pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Persists a finished image and reports where it went.
pub trait ImageSink: Send + Sync {
    fn save(&self, image: &DynamicImage) -> Result<PathBuf, EditError>;
}

/// Writes `edited_image_<millis>.jpg` files into a directory.
#[derive(Debug, Clone)]
pub struct JpegSink {
    output_dir: PathBuf,
    quality: u8,
}

impl JpegSink {
    pub fn new(output_dir: impl Into<PathBuf>, quality: u8) -> Self {
        Self {
            output_dir: output_dir.into(),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write(&self, image: &DynamicImage) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let output_path = build_output_path(&self.output_dir, &format!("edited_image_{millis}"));

        let file = std::fs::File::create(&output_path)?;
        let writer = std::io::BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(writer, self.quality);
        // JPEG has no alpha channel.
        DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        Ok(output_path)
    }
}

impl ImageSink for JpegSink {
    fn save(&self, image: &DynamicImage) -> Result<PathBuf, EditError> {
        let path = self
            .write(image)
            .map_err(|err| EditError::SaveFailed(format!("{err:#}")))?;
        tracing::info!(path = %path.display(), quality = self.quality, "saved image");
        Ok(path)
    }
}

fn build_output_path(output_dir: &Path, stem: &str) -> PathBuf {
    let base = output_dir.join(format!("{stem}.jpg"));
    if !base.exists() {
        return base;
    }
    for n in 2..10000 {
        let candidate = output_dir.join(format!("{stem}-{n}.jpg"));
        if !candidate.exists() {
            return candidate;
        }
    }
    output_dir.join(format!("{stem}-final.jpg"))
}
