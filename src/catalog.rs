use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stage::{AdjustmentStage, Mat4};

/// Ordered stages; the first element is applied first.
pub type FilterChain = Vec<AdjustmentStage>;

/// The fixed set of preset filters offered in the filter strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterId {
    #[default]
    Original,
    BlackWhite,
    Sepia,
    Vintage,
    Vignette,
    Bright,
    Contrast,
    Saturation,
    Hue,
    Sharpen,
    Retro,
    Film,
    Dramatic,
    Golden,
    TealOrange,
}

impl FilterId {
    pub const ALL: [FilterId; 15] = [
        FilterId::Original,
        FilterId::BlackWhite,
        FilterId::Sepia,
        FilterId::Vintage,
        FilterId::Vignette,
        FilterId::Bright,
        FilterId::Contrast,
        FilterId::Saturation,
        FilterId::Hue,
        FilterId::Sharpen,
        FilterId::Retro,
        FilterId::Film,
        FilterId::Dramatic,
        FilterId::Golden,
        FilterId::TealOrange,
    ];

    /// Name shown under the preview thumbnail.
    pub fn label(self) -> &'static str {
        match self {
            FilterId::Original => "Original",
            FilterId::BlackWhite => "B&W",
            FilterId::Sepia => "Sepia",
            FilterId::Vintage => "Vintage",
            FilterId::Vignette => "Vignette",
            FilterId::Bright => "Bright",
            FilterId::Contrast => "Contrast",
            FilterId::Saturation => "Vibrant",
            FilterId::Hue => "Hue",
            FilterId::Sharpen => "Sharpen",
            FilterId::Retro => "Retro",
            FilterId::Film => "Film",
            FilterId::Dramatic => "Dramatic",
            FilterId::Golden => "Golden",
            FilterId::TealOrange => "Cinematic",
        }
    }

    /// Stable identifier used on the command line and in file names.
    pub fn key(self) -> &'static str {
        match self {
            FilterId::Original => "original",
            FilterId::BlackWhite => "black-white",
            FilterId::Sepia => "sepia",
            FilterId::Vintage => "vintage",
            FilterId::Vignette => "vignette",
            FilterId::Bright => "bright",
            FilterId::Contrast => "contrast",
            FilterId::Saturation => "saturation",
            FilterId::Hue => "hue",
            FilterId::Sharpen => "sharpen",
            FilterId::Retro => "retro",
            FilterId::Film => "film",
            FilterId::Dramatic => "dramatic",
            FilterId::Golden => "golden",
            FilterId::TealOrange => "teal-orange",
        }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let wanted = raw.trim().replace('_', "-");
        FilterId::ALL
            .into_iter()
            .find(|id| wanted.eq_ignore_ascii_case(id.key()) || wanted.eq_ignore_ascii_case(id.label()))
            .ok_or_else(|| format!("unknown filter '{}'", raw.trim()))
    }
}

/// Returns the stage chain behind a preset filter.
pub fn chain_for(id: FilterId) -> FilterChain {
    use AdjustmentStage as S;

    match id {
        FilterId::Original => vec![S::Identity],
        FilterId::BlackWhite => vec![S::Grayscale],
        FilterId::Sepia => vec![S::SepiaTone],
        FilterId::Vintage => vec![
            S::contrast(1.3),
            S::rgb_scale(1.0, 0.9, 0.7),
            S::color_matrix(0.9, vintage_matrix()),
        ],
        FilterId::Vignette => vec![S::vignette(0.3, 0.75)],
        FilterId::Bright => vec![S::brightness(0.5)],
        FilterId::Contrast => vec![S::contrast(1.5)],
        FilterId::Saturation => vec![S::saturation(1.5)],
        FilterId::Hue => vec![S::HueRotate { degrees: 90.0 }],
        FilterId::Sharpen => vec![S::Sharpen { strength: 2.0 }],
        FilterId::Retro => vec![
            S::contrast(1.1),
            S::rgb_scale(1.3, 1.1, 0.9),
            S::vignette(0.2, 0.8),
        ],
        FilterId::Film => vec![
            S::saturation(0.8),
            S::contrast(1.2),
            S::color_matrix(1.0, film_matrix()),
        ],
        FilterId::Dramatic => vec![S::contrast(1.4), S::brightness(-0.1), S::saturation(1.2)],
        FilterId::Golden => vec![
            S::rgb_scale(1.2, 1.0, 0.8),
            S::contrast(1.1),
            S::brightness(0.1),
        ],
        FilterId::TealOrange => vec![S::contrast(1.1), S::color_matrix(1.0, teal_orange_matrix())],
    }
}

// green output picks up some blue, blue output is dimmed
fn vintage_matrix() -> Mat4 {
    let mut m = Mat4::identity();
    m.0[1][2] = 0.2;
    m.0[2][2] = 0.8;
    m
}

fn film_matrix() -> Mat4 {
    let mut m = Mat4::identity();
    m.0[0][0] = 1.1;
    m.0[2][2] = 0.9;
    m
}

fn teal_orange_matrix() -> Mat4 {
    let mut m = Mat4::identity();
    m.0[0] = [1.2, -0.1, 0.0, 0.0];
    m.0[1] = [0.0, 1.0, 0.1, 0.0];
    m.0[2] = [-0.1, 0.1, 1.1, 0.0];
    m
}
