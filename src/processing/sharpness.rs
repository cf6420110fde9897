use image::DynamicImage;
use imageproc::filter::gaussian_blur_f32;

const SIGMA: f32 = 1.5;

/// Unsharp mask: pushes each pixel away from its blurred neighbourhood by
/// `strength`.
pub fn apply(img: DynamicImage, strength: f32) -> DynamicImage {
    if strength < 0.001 {
        return img;
    }

    let rgba = img.into_rgba8();
    let blurred = gaussian_blur_f32(&rgba, SIGMA);

    let mut out = rgba.clone();
    for (o, (s, b)) in out.pixels_mut().zip(rgba.pixels().zip(blurred.pixels())) {
        for c in 0..3 {
            let sharp = s[c] as f32 + strength * (s[c] as f32 - b[c] as f32);
            o[c] = sharp.round().clamp(0.0, 255.0) as u8;
        }
    }

    DynamicImage::ImageRgba8(out)
}
