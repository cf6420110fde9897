use serde::{Deserialize, Serialize};

use crate::error::EditError;

const NEUTRAL_EPS: f32 = 1e-4;

/// Row-major 4×4 matrix. For colour matrices each row is one output channel
/// (R, G, B, A); for geometric transforms the upper-left 2×2 block is the
/// linear part and column 3 holds the translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Mat4(pub [[f32; 4]; 4]);

impl Mat4 {
    pub const fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// Rotation around the axis normal to the image plane. Positive angles
    /// turn clockwise on screen (image y grows downward).
    pub fn rotation_z(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut m = Self::identity();
        m.0[0] = [cos, -sin, 0.0, 0.0];
        m.0[1] = [sin, cos, 0.0, 0.0];
        m
    }

    pub fn scale(x: f32, y: f32) -> Self {
        let mut m = Self::identity();
        m.0[0][0] = x;
        m.0[1][1] = y;
        m
    }

    /// Matrix product `self · rhs` (apply `rhs` first).
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let mut out = [[0.0_f32; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.0[r][k] * rhs.0[k][c]).sum();
            }
        }
        Mat4(out)
    }

    pub fn approx_eq(&self, other: &Mat4, eps: f32) -> bool {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Mat4::identity(), NEUTRAL_EPS)
    }

    fn is_finite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite())
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
}

/// Point in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const CENTER: Point = Point { x: 0.5, y: 0.5 };
}

/// One parametrized pixel transform. Chains of stages apply left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentStage {
    Identity,
    Grayscale,
    SepiaTone,
    Contrast {
        factor: f32,
    },
    Brightness {
        delta: f32,
    },
    Saturation {
        factor: f32,
    },
    HueRotate {
        degrees: f32,
    },
    Sharpen {
        strength: f32,
    },
    Vignette {
        center: Point,
        color: Rgb,
        start: f32,
        end: f32,
    },
    RgbScale {
        r: f32,
        g: f32,
        b: f32,
    },
    ColorMatrix {
        intensity: f32,
        matrix: Mat4,
    },
    GeometricTransform {
        matrix: Mat4,
    },
}

impl AdjustmentStage {
    pub fn contrast(factor: f32) -> Self {
        Self::Contrast { factor }
    }

    pub fn brightness(delta: f32) -> Self {
        Self::Brightness { delta }
    }

    pub fn saturation(factor: f32) -> Self {
        Self::Saturation { factor }
    }

    pub fn rgb_scale(r: f32, g: f32, b: f32) -> Self {
        Self::RgbScale { r, g, b }
    }

    pub fn color_matrix(intensity: f32, matrix: Mat4) -> Self {
        Self::ColorMatrix { intensity, matrix }
    }

    /// Black radial vignette centred on the image.
    pub fn vignette(start: f32, end: f32) -> Self {
        Self::Vignette {
            center: Point::CENTER,
            color: Rgb::BLACK,
            start,
            end,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Grayscale => "grayscale",
            Self::SepiaTone => "sepia_tone",
            Self::Contrast { .. } => "contrast",
            Self::Brightness { .. } => "brightness",
            Self::Saturation { .. } => "saturation",
            Self::HueRotate { .. } => "hue_rotate",
            Self::Sharpen { .. } => "sharpen",
            Self::Vignette { .. } => "vignette",
            Self::RgbScale { .. } => "rgb_scale",
            Self::ColorMatrix { .. } => "color_matrix",
            Self::GeometricTransform { .. } => "geometric_transform",
        }
    }

    /// Checks every parameter against its documented domain.
    pub fn validate(&self) -> Result<(), EditError> {
        let fail = |what: &str| Err(EditError::InvalidStage(format!("{}: {}", self.name(), what)));
        match *self {
            Self::Identity | Self::Grayscale | Self::SepiaTone => Ok(()),
            Self::Contrast { factor } | Self::Saturation { factor } => {
                if !factor.is_finite() || factor < 0.0 {
                    return fail("factor must be finite and >= 0");
                }
                Ok(())
            }
            Self::Brightness { delta } => {
                if !(-1.0..=1.0).contains(&delta) {
                    return fail("delta must lie in [-1, 1]");
                }
                Ok(())
            }
            Self::HueRotate { degrees } => {
                if !degrees.is_finite() {
                    return fail("degrees must be finite");
                }
                Ok(())
            }
            Self::Sharpen { strength } => {
                if !strength.is_finite() || strength < 0.0 {
                    return fail("strength must be finite and >= 0");
                }
                Ok(())
            }
            Self::Vignette {
                center,
                color,
                start,
                end,
            } => {
                let unit = |v: f32| (0.0..=1.0).contains(&v);
                if !unit(center.x) || !unit(center.y) {
                    return fail("center must lie in [0, 1]²");
                }
                if !unit(color.r) || !unit(color.g) || !unit(color.b) {
                    return fail("color channels must lie in [0, 1]");
                }
                if !unit(start) || !unit(end) || start > end {
                    return fail("expected 0 <= start <= end <= 1");
                }
                Ok(())
            }
            Self::RgbScale { r, g, b } => {
                if [r, g, b].iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return fail("channel scales must be finite and >= 0");
                }
                Ok(())
            }
            Self::ColorMatrix { intensity, matrix } => {
                if !(0.0..=1.0).contains(&intensity) {
                    return fail("intensity must lie in [0, 1]");
                }
                if !matrix.is_finite() {
                    return fail("matrix entries must be finite");
                }
                Ok(())
            }
            Self::GeometricTransform { matrix } => {
                if !matrix.is_finite() {
                    return fail("matrix entries must be finite");
                }
                Ok(())
            }
        }
    }

    /// Whether the stage leaves every pixel unchanged.
    pub fn is_neutral(&self) -> bool {
        let near = |v: f32, target: f32| (v - target).abs() < NEUTRAL_EPS;
        match *self {
            Self::Identity => true,
            Self::Grayscale | Self::SepiaTone | Self::Vignette { .. } => false,
            Self::Contrast { factor } | Self::Saturation { factor } => near(factor, 1.0),
            Self::Brightness { delta } => near(delta, 0.0),
            Self::HueRotate { degrees } => near(degrees.rem_euclid(360.0), 0.0),
            Self::Sharpen { strength } => near(strength, 0.0),
            Self::RgbScale { r, g, b } => near(r, 1.0) && near(g, 1.0) && near(b, 1.0),
            Self::ColorMatrix { intensity, matrix } => near(intensity, 0.0) || matrix.is_identity(),
            Self::GeometricTransform { matrix } => matrix.is_identity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_quarter_turns_compose_to_a_half_turn() {
        let quarter = Mat4::rotation_z(90.0);
        let composed = quarter.mul(&quarter);
        assert!(composed.approx_eq(&Mat4::rotation_z(180.0), 1e-5));
        assert!(composed.approx_eq(&Mat4::scale(-1.0, -1.0), 1e-5));
    }

    #[test]
    fn flip_applied_twice_is_identity() {
        let flip = Mat4::scale(-1.0, 1.0);
        assert!(flip.mul(&flip).is_identity());
    }

    #[test]
    fn neutral_stages_are_detected() {
        assert!(AdjustmentStage::brightness(0.0).is_neutral());
        assert!(AdjustmentStage::contrast(1.0).is_neutral());
        assert!(AdjustmentStage::saturation(1.0).is_neutral());
        assert!(AdjustmentStage::HueRotate { degrees: 360.0 }.is_neutral());
        assert!(AdjustmentStage::color_matrix(0.0, Mat4::scale(2.0, 2.0)).is_neutral());
        assert!(!AdjustmentStage::contrast(1.5).is_neutral());
        assert!(!AdjustmentStage::Grayscale.is_neutral());
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        assert!(AdjustmentStage::brightness(1.5).validate().is_err());
        assert!(AdjustmentStage::contrast(-0.1).validate().is_err());
        assert!(AdjustmentStage::vignette(0.8, 0.2).validate().is_err());
        assert!(AdjustmentStage::color_matrix(1.2, Mat4::identity()).validate().is_err());
        assert!(AdjustmentStage::Sharpen { strength: f32::NAN }.validate().is_err());
    }

    #[test]
    fn validate_accepts_slider_extremes() {
        assert!(AdjustmentStage::contrast(0.0).validate().is_ok());
        assert!(AdjustmentStage::saturation(0.0).validate().is_ok());
        assert!(AdjustmentStage::brightness(-1.0).validate().is_ok());
        assert!(AdjustmentStage::brightness(1.0).validate().is_ok());
    }

    #[test]
    fn stages_serialize_with_kind_tag() {
        let json = serde_json::to_string(&AdjustmentStage::contrast(1.5)).unwrap();
        assert_eq!(json, r#"{"kind":"contrast","factor":1.5}"#);
        let back: AdjustmentStage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AdjustmentStage::contrast(1.5));
    }
}
