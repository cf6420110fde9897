use image::{DynamicImage, Rgba};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

use crate::error::EditError;
use crate::stage::Mat4;

const SNAP_EPS: f32 = 1e-4;
const FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Largest canvas a warp may allocate (about 1 GiB of RGBA).
const MAX_OUTPUT_PIXELS: u64 = 1 << 28;

/// Applies the 2D part of `matrix` around the image centre.
///
/// Quarter turns and axis flips are exact pixel permutations; any other
/// matrix is warped bilinearly onto the bounding box of the transformed
/// image. Translation (column 3) is measured in image widths/heights.
pub fn apply(img: DynamicImage, matrix: &Mat4) -> Result<DynamicImage, EditError> {
    let m = &matrix.0;
    let linear = [m[0][0], m[0][1], m[1][0], m[1][1]];
    let (tx, ty) = (m[0][3], m[1][3]);

    let det = linear[0] * linear[3] - linear[1] * linear[2];
    if det.abs() < 1e-6 {
        return Err(EditError::RenderFailure(
            "geometric transform is singular".into(),
        ));
    }

    if tx.abs() < SNAP_EPS && ty.abs() < SNAP_EPS {
        if let Some(out) = permute(&img, linear) {
            return Ok(out);
        }
    }

    warp_affine(img, linear, tx, ty)
}

fn snap(v: f32) -> Option<i8> {
    [-1_i8, 0, 1]
        .into_iter()
        .find(|t| (v - *t as f32).abs() < SNAP_EPS)
}

/// Maps a signed permutation matrix onto lossless image operations.
fn permute(img: &DynamicImage, linear: [f32; 4]) -> Option<DynamicImage> {
    let [Some(a), Some(b), Some(c), Some(d)] = linear.map(snap) else {
        return None;
    };
    let out = match (a, b, c, d) {
        (1, 0, 0, 1) => img.clone(),
        (0, -1, 1, 0) => img.rotate90(),
        (-1, 0, 0, -1) => img.rotate180(),
        (0, 1, -1, 0) => img.rotate270(),
        (-1, 0, 0, 1) => img.fliph(),
        (1, 0, 0, -1) => img.flipv(),
        (0, 1, 1, 0) => img.rotate90().fliph(),
        (0, -1, -1, 0) => img.rotate90().flipv(),
        _ => return None,
    };
    Some(out)
}

fn warp_affine(
    img: DynamicImage,
    linear: [f32; 4],
    tx: f32,
    ty: f32,
) -> Result<DynamicImage, EditError> {
    let [a, b, c, d] = linear;
    let rgba = img.into_rgba8();
    let (w, h) = (rgba.width() as f32, rgba.height() as f32);
    let (shift_x, shift_y) = (tx * w, ty * h);

    // Bounding box of the transformed corners, relative to the centre.
    let corners = [
        (-w / 2.0, -h / 2.0),
        (w / 2.0, -h / 2.0),
        (w / 2.0, h / 2.0),
        (-w / 2.0, h / 2.0),
    ];
    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for (x, y) in corners {
        let px = a * x + b * y + shift_x;
        let py = c * x + d * y + shift_y;
        min_x = min_x.min(px);
        max_x = max_x.max(px);
        min_y = min_y.min(py);
        max_y = max_y.max(py);
    }
    let span_w = (max_x - min_x - 1e-3).ceil().max(1.0);
    let span_h = (max_y - min_y - 1e-3).ceil().max(1.0);
    if span_w as f64 * span_h as f64 > MAX_OUTPUT_PIXELS as f64 {
        return Err(EditError::RenderFailure(format!(
            "geometric transform output {span_w}x{span_h} exceeds {MAX_OUTPUT_PIXELS} pixels"
        )));
    }
    let (out_w, out_h) = (span_w as u32, span_h as u32);

    // Pixel centres sit on integer coordinates; map source centre to the
    // output position of the transformed centre.
    let (src_cx, src_cy) = ((w - 1.0) / 2.0, (h - 1.0) / 2.0);
    let dst_cx = (out_w as f32 - 1.0) / 2.0 + (shift_x - (min_x + max_x) / 2.0);
    let dst_cy = (out_h as f32 - 1.0) / 2.0 + (shift_y - (min_y + max_y) / 2.0);
    let projection = Projection::from_matrix([
        a,
        b,
        dst_cx - a * src_cx - b * src_cy,
        c,
        d,
        dst_cy - c * src_cx - d * src_cy,
        0.0,
        0.0,
        1.0,
    ])
    .ok_or_else(|| EditError::RenderFailure("geometric transform is singular".into()))?;

    let mut out = image::RgbaImage::from_pixel(out_w, out_h, FILL);
    warp_into(&rgba, &projection, Interpolation::Bilinear, FILL, &mut out);
    Ok(DynamicImage::ImageRgba8(out))
}
