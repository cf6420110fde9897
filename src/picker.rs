use std::path::{Path, PathBuf};

use anyhow::Context;
use image::DynamicImage;

static RAW_EXTS: &[&str] = &["raf", "dng", "nef", "cr2", "arw"];
static SUPPORTED_IMAGE_EXTS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif", "raf", "dng", "nef", "cr2", "arw",
];

/// Source of the image a session starts from.
pub trait ImagePicker {
    /// Returns `Ok(None)` when the user backs out without choosing.
    fn pick_image(&mut self) -> anyhow::Result<Option<DynamicImage>>;
}

/// Picks a file chosen up front, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct FilePicker {
    path: Option<PathBuf>,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn cancelled() -> Self {
        Self { path: None }
    }
}

impl ImagePicker for FilePicker {
    fn pick_image(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        let Some(path) = self.path.as_deref() else {
            return Ok(None);
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "picked path does not exist");
            return Ok(None);
        }
        let img = open_image(path).with_context(|| format!("failed to open {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "picked image"
        );
        Ok(Some(img))
    }
}

fn has_extension(path: &Path, exts: &[&str]) -> bool {
    let Some(ext) = path.extension().map(|e| e.to_string_lossy()) else {
        return false;
    };
    exts.iter().any(|known| ext.eq_ignore_ascii_case(known))
}

pub fn is_raw_image(path: &Path) -> bool {
    has_extension(path, RAW_EXTS)
}

/// Returns `true` if the path has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_IMAGE_EXTS)
}

/// Open an image, falling back to raw decoding for RAW extensions.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    open_image_with_hooks(path, |p| Ok(image::open(p)?), develop_raw)
}

fn open_image_with_hooks<FStd, FRaw>(
    path: &Path,
    open_standard: FStd,
    open_raw: FRaw,
) -> anyhow::Result<DynamicImage>
where
    FStd: Fn(&Path) -> anyhow::Result<DynamicImage>,
    FRaw: Fn(&Path) -> anyhow::Result<DynamicImage>,
{
    match open_standard(path) {
        Ok(img) => Ok(img),
        Err(err) if !is_raw_image(path) => Err(err),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "standard decode failed, developing raw");
            open_raw(path)
        }
    }
}

fn develop_raw(path: &Path) -> anyhow::Result<DynamicImage> {
    let raw = rawler::decode_file(path)?;
    let develop = rawler::imgop::develop::RawDevelop::default();
    let intermediate = develop.develop_intermediate(&raw)?;
    intermediate
        .to_dynamic_image()
        .ok_or_else(|| anyhow::anyhow!("raw develop produced invalid image"))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::path::Path;

    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::{FilePicker, ImagePicker, is_raw_image, is_supported_image, open_image_with_hooks};

    fn img(px: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 1, Rgba(px)))
    }

    #[test]
    fn raw_falls_back_when_standard_decode_fails() {
        let raw_calls = Cell::new(0);
        let out = open_image_with_hooks(
            Path::new("/tmp/test.raf"),
            |_: &Path| anyhow::bail!("unsupported format"),
            |_: &Path| {
                raw_calls.set(raw_calls.get() + 1);
                Ok(img([4, 5, 6, 255]))
            },
        )
        .expect("raw develop should succeed");

        assert_eq!(raw_calls.get(), 1);
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0, [4, 5, 6, 255]);
    }

    #[test]
    fn standard_decode_wins_without_raw_develop() {
        let raw_calls = Cell::new(0);
        let out = open_image_with_hooks(
            Path::new("/tmp/test.dng"),
            |_: &Path| Ok(img([1, 2, 3, 255])),
            |_: &Path| {
                raw_calls.set(raw_calls.get() + 1);
                Ok(img([9, 9, 9, 255]))
            },
        )
        .expect("standard decode should succeed");

        assert_eq!(raw_calls.get(), 0);
        assert_eq!(out.to_rgba8().get_pixel(0, 0).0, [1, 2, 3, 255]);
    }

    #[test]
    fn non_raw_failure_is_reported_without_raw_attempt() {
        let raw_calls = Cell::new(0);
        let result = open_image_with_hooks(
            Path::new("/tmp/test.jpg"),
            |_: &Path| anyhow::bail!("truncated jpeg"),
            |_: &Path| {
                raw_calls.set(raw_calls.get() + 1);
                Ok(img([9, 9, 9, 255]))
            },
        );

        assert!(result.is_err());
        assert_eq!(raw_calls.get(), 0);
    }

    #[test]
    fn extension_checks_are_case_insensitive() {
        assert!(is_raw_image(Path::new("/tmp/a.RAF")));
        assert!(!is_raw_image(Path::new("/tmp/a.jpg")));
        assert!(is_supported_image(Path::new("/tmp/a.JPEG")));
        assert!(!is_supported_image(Path::new("/tmp/a.txt")));
    }

    #[test]
    fn cancelled_picker_yields_nothing() {
        assert!(FilePicker::cancelled().pick_image().unwrap().is_none());
    }

    #[test]
    fn missing_path_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let mut picker = FilePicker::new(dir.path().join("gone.png"));
        assert!(picker.pick_image().unwrap().is_none());
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(FilePicker::new(&path).pick_image().is_err());
    }

    #[test]
    fn file_picker_opens_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pick.png");
        img([10, 20, 30, 255]).save(&path).unwrap();

        let picked = FilePicker::new(&path).pick_image().unwrap().unwrap();
        assert_eq!(picked.to_rgba8().get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
