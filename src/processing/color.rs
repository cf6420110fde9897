use image::DynamicImage;

use crate::stage::{AdjustmentStage, Mat4};

const LUMA: [f32; 3] = [0.2125, 0.7154, 0.0721];

const SEPIA: [[f32; 3]; 3] = [
    [0.3588, 0.7044, 0.1368],
    [0.2990, 0.5870, 0.1140],
    [0.2392, 0.4696, 0.0912],
];

// YIQ conversion used for hue rotation
const RGB_TO_Y: [f32; 3] = [0.299, 0.587, 0.114];
const RGB_TO_I: [f32; 3] = [0.595716, -0.274453, -0.321263];
const RGB_TO_Q: [f32; 3] = [0.211456, -0.522591, 0.31135];
const YIQ_TO_R: [f32; 3] = [1.0, 0.9563, 0.6210];
const YIQ_TO_G: [f32; 3] = [1.0, -0.2721, -0.6474];
const YIQ_TO_B: [f32; 3] = [1.0, -1.1070, 1.7046];

/// Per-pixel colour operation derived from a stage.
#[derive(Debug, Clone, Copy)]
enum PixelOp {
    Grayscale,
    Sepia,
    Contrast(f32),
    Brightness(f32),
    Saturation(f32),
    Hue(f32),
    Scale([f32; 3]),
    Matrix { intensity: f32, matrix: Mat4 },
}

impl PixelOp {
    fn from_stage(stage: &AdjustmentStage) -> Option<Self> {
        let op = match *stage {
            AdjustmentStage::Grayscale => PixelOp::Grayscale,
            AdjustmentStage::SepiaTone => PixelOp::Sepia,
            AdjustmentStage::Contrast { factor } => PixelOp::Contrast(factor),
            AdjustmentStage::Brightness { delta } => PixelOp::Brightness(delta),
            AdjustmentStage::Saturation { factor } => PixelOp::Saturation(factor),
            AdjustmentStage::HueRotate { degrees } => {
                PixelOp::Hue(degrees.rem_euclid(360.0).to_radians())
            }
            AdjustmentStage::RgbScale { r, g, b } => PixelOp::Scale([r, g, b]),
            AdjustmentStage::ColorMatrix { intensity, matrix } => {
                PixelOp::Matrix { intensity, matrix }
            }
            _ => return None,
        };
        Some(op)
    }

    fn map(self, px: [f32; 4]) -> [f32; 4] {
        let [r, g, b, a] = px;
        match self {
            PixelOp::Grayscale => {
                let l = dot([r, g, b], LUMA);
                [l, l, l, a]
            }
            PixelOp::Sepia => {
                let rgb = [r, g, b];
                [dot(rgb, SEPIA[0]), dot(rgb, SEPIA[1]), dot(rgb, SEPIA[2]), a]
            }
            PixelOp::Contrast(f) => [
                (r - 0.5) * f + 0.5,
                (g - 0.5) * f + 0.5,
                (b - 0.5) * f + 0.5,
                a,
            ],
            PixelOp::Brightness(d) => [r + d, g + d, b + d, a],
            PixelOp::Saturation(s) => {
                let l = dot([r, g, b], LUMA);
                [mix(l, r, s), mix(l, g, s), mix(l, b, s), a]
            }
            PixelOp::Hue(radians) => {
                let rgb = [r, g, b];
                let y = dot(rgb, RGB_TO_Y);
                let i = dot(rgb, RGB_TO_I);
                let q = dot(rgb, RGB_TO_Q);
                let chroma = (i * i + q * q).sqrt();
                let hue = q.atan2(i) - radians;
                let yiq = [y, chroma * hue.cos(), chroma * hue.sin()];
                [dot(yiq, YIQ_TO_R), dot(yiq, YIQ_TO_G), dot(yiq, YIQ_TO_B), a]
            }
            PixelOp::Scale([sr, sg, sb]) => [r * sr, g * sg, b * sb, a],
            PixelOp::Matrix { intensity, matrix } => {
                let mut out = [0.0_f32; 4];
                for (c, slot) in out.iter_mut().enumerate() {
                    let row = matrix.0[c];
                    let transformed = row[0] * r + row[1] * g + row[2] * b + row[3] * a;
                    *slot = mix(px[c], transformed, intensity);
                }
                out
            }
        }
    }
}

/// Applies a pointwise colour stage. Stages that are not pointwise colour
/// operations return the image untouched.
pub fn apply(img: DynamicImage, stage: &AdjustmentStage) -> DynamicImage {
    let Some(op) = PixelOp::from_stage(stage) else {
        return img;
    };

    let mut rgba = img.into_rgba8();
    for px in rgba.pixels_mut() {
        let input = [
            px[0] as f32 / 255.0,
            px[1] as f32 / 255.0,
            px[2] as f32 / 255.0,
            px[3] as f32 / 255.0,
        ];
        let out = op.map(input);
        for c in 0..4 {
            px[c] = to_u8(out[c]);
        }
    }

    DynamicImage::ImageRgba8(rgba)
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn mix(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

pub(crate) fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, ImageBuffer, Rgba};

    use crate::stage::{AdjustmentStage, Mat4};

    use super::apply;

    fn one_pixel(rgba: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 1, Rgba(rgba)))
    }

    fn pixel(img: &DynamicImage) -> [u8; 4] {
        img.to_rgba8().get_pixel(0, 0).0
    }

    #[test]
    fn grayscale_equalizes_channels() {
        let out = apply(one_pixel([200, 40, 90, 255]), &AdjustmentStage::Grayscale);
        let [r, g, b, a] = pixel(&out);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 255);
    }

    #[test]
    fn sepia_warms_neutral_gray() {
        let out = apply(one_pixel([128, 128, 128, 255]), &AdjustmentStage::SepiaTone);
        let [r, g, b, _] = pixel(&out);
        assert!(r > g && g > b);
    }

    #[test]
    fn brightness_offsets_channels() {
        let out = apply(one_pixel([100, 100, 100, 255]), &AdjustmentStage::brightness(0.2));
        assert_eq!(pixel(&out)[0], 151);
        let out = apply(one_pixel([100, 100, 100, 255]), &AdjustmentStage::brightness(-1.0));
        assert_eq!(pixel(&out)[0], 0);
    }

    #[test]
    fn contrast_pivots_around_mid_gray() {
        let out = apply(one_pixel([200, 55, 128, 255]), &AdjustmentStage::contrast(1.5));
        let [r, g, _, _] = pixel(&out);
        assert!(r > 200);
        assert!(g < 55);

        let flat = apply(one_pixel([200, 55, 10, 255]), &AdjustmentStage::contrast(0.0));
        assert_eq!(pixel(&flat), [128, 128, 128, 255]);
    }

    #[test]
    fn zero_saturation_matches_grayscale() {
        let src = one_pixel([220, 30, 60, 255]);
        let desat = apply(src.clone(), &AdjustmentStage::saturation(0.0));
        let gray = apply(src, &AdjustmentStage::Grayscale);
        assert_eq!(pixel(&desat), pixel(&gray));
    }

    #[test]
    fn hue_rotation_moves_red_away_from_red() {
        let out = apply(
            one_pixel([255, 0, 0, 255]),
            &AdjustmentStage::HueRotate { degrees: 180.0 },
        );
        let [r, g, b, _] = pixel(&out);
        assert!(r < g.max(b));
    }

    #[test]
    fn rgb_scale_multiplies_each_channel() {
        let out = apply(
            one_pixel([100, 100, 100, 255]),
            &AdjustmentStage::rgb_scale(1.2, 1.0, 0.5),
        );
        assert_eq!(pixel(&out), [120, 100, 50, 255]);
    }

    #[test]
    fn color_matrix_rows_are_output_channels() {
        let mut m = Mat4::identity();
        m.0[0] = [0.0, 1.0, 0.0, 0.0];
        let out = apply(one_pixel([10, 200, 30, 255]), &AdjustmentStage::color_matrix(1.0, m));
        assert_eq!(pixel(&out), [200, 200, 30, 255]);
    }

    #[test]
    fn color_matrix_intensity_blends_with_input() {
        let mut m = Mat4::identity();
        m.0[0] = [0.0, 0.0, 0.0, 0.0];
        let out = apply(one_pixel([200, 0, 0, 255]), &AdjustmentStage::color_matrix(0.5, m));
        assert_eq!(pixel(&out)[0], 100);
    }

    #[test]
    fn alpha_survives_colour_stages() {
        let out = apply(one_pixel([80, 80, 80, 77]), &AdjustmentStage::contrast(1.4));
        assert_eq!(pixel(&out)[3], 77);
    }
}
