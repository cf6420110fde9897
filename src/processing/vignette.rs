use image::DynamicImage;

use crate::stage::{Point, Rgb};

use super::color::to_u8;

/// Blends pixels toward `color` by their distance from `center`, with no
/// effect inside `start` and full effect beyond `end` (normalized radii).
pub fn apply(img: DynamicImage, center: Point, color: Rgb, start: f32, end: f32) -> DynamicImage {
    let mut rgba = img.into_rgba8();
    let w = rgba.width().max(1) as f32;
    let h = rgba.height().max(1) as f32;
    let tint = [color.r, color.g, color.b];

    for (y, row) in rgba.enumerate_rows_mut() {
        let v = (y as f32 + 0.5) / h;
        for (x, _, px) in row {
            let u = (x as f32 + 0.5) / w;
            let dist = ((u - center.x).powi(2) + (v - center.y).powi(2)).sqrt();
            let weight = smoothstep(start, end, dist);
            if weight <= 0.0 {
                continue;
            }
            for c in 0..3 {
                let value = px[c] as f32 / 255.0;
                px[c] = to_u8(value + (tint[c] - value) * weight);
            }
        }
    }

    DynamicImage::ImageRgba8(rgba)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 <= edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use crate::stage::{Point, Rgb};

    use super::{apply, smoothstep};

    #[test]
    fn corners_darken_while_center_is_kept() {
        let img = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(
            9,
            9,
            Rgba([200, 200, 200, 255]),
        ));
        let out = apply(img, Point::CENTER, Rgb::BLACK, 0.3, 0.75).to_rgba8();
        assert_eq!(out.get_pixel(4, 4)[0], 200);
        assert!(out.get_pixel(0, 0)[0] < 100);
        assert_eq!(out.get_pixel(0, 0)[3], 255);
    }

    #[test]
    fn degenerate_range_is_a_hard_edge() {
        assert_eq!(smoothstep(0.4, 0.4, 0.3), 0.0);
        assert_eq!(smoothstep(0.4, 0.4, 0.5), 1.0);
        assert!((smoothstep(0.0, 1.0, 0.5) - 0.5).abs() < 1e-6);
    }
}
