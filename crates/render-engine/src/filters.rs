//! Applies a compiled [`TransformDescriptor`] to a raster frame.
//!
//! Rotation happens first, then the filter chain in order. Color operations
//! use the CSS filter-effects matrices so exported frames match the preview.

use image::imageops::{self, overlay};
use image::{Rgba, RgbaImage};
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};

use clipforge_project_model::effects::{FilterOp, TransformDescriptor};

/// Rotate then filter `frame`. Returns a new image.
pub fn apply_transform(frame: &RgbaImage, descriptor: &TransformDescriptor) -> RgbaImage {
    let mut out = rotate(frame, descriptor.rotation_degrees);
    for op in &descriptor.ops {
        match *op {
            FilterOp::Blur(radius) => {
                if radius > 0.0 {
                    out = imageops::blur(&out, radius as f32);
                }
            }
            color_op => apply_color_op(&mut out, color_op),
        }
    }
    out
}

/// Rotate clockwise by `degrees`. Quarter turns are exact and swap
/// dimensions; other angles expand the canvas to hold the rotated frame.
pub fn rotate(frame: &RgbaImage, degrees: f64) -> RgbaImage {
    let degrees = degrees.rem_euclid(360.0);
    let quarter = (degrees / 90.0).round();
    if (degrees - quarter * 90.0).abs() < 1e-9 {
        return match quarter as u32 % 4 {
            1 => imageops::rotate90(frame),
            2 => imageops::rotate180(frame),
            3 => imageops::rotate270(frame),
            _ => frame.clone(),
        };
    }
    rotate_expanded(frame, degrees as f32)
}

fn rotate_expanded(image: &RgbaImage, rotation_deg: f32) -> RgbaImage {
    let angle = rotation_deg.to_radians();
    let (sin, cos) = angle.sin_cos();
    let src_w = image.width().max(1) as f32;
    let src_h = image.height().max(1) as f32;
    let new_w = (src_w * cos.abs() + src_h * sin.abs()).ceil().max(1.0) as u32;
    let new_h = (src_w * sin.abs() + src_h * cos.abs()).ceil().max(1.0) as u32;

    let mut expanded = RgbaImage::from_pixel(new_w, new_h, Rgba([0, 0, 0, 0]));
    let offset_x = ((new_w as f32 - src_w) * 0.5).round() as i64;
    let offset_y = ((new_h as f32 - src_h) * 0.5).round() as i64;
    overlay(&mut expanded, image, offset_x, offset_y);

    rotate_about_center(&expanded, angle, Interpolation::Bilinear, Rgba([0, 0, 0, 0]))
}

type Matrix = [[f64; 3]; 3];

fn apply_color_op(image: &mut RgbaImage, op: FilterOp) {
    match op {
        FilterOp::Brightness(a) => map_channels(image, |c| c * a),
        FilterOp::Contrast(a) => map_channels(image, |c| (c - 0.5) * a + 0.5),
        FilterOp::Invert(a) => {
            let a = a.clamp(0.0, 1.0);
            map_channels(image, |c| c * (1.0 - a) + (1.0 - c) * a)
        }
        FilterOp::Saturate(s) => apply_matrix(image, &saturate_matrix(s.max(0.0))),
        FilterOp::Grayscale(a) => apply_matrix(image, &grayscale_matrix(a.clamp(0.0, 1.0))),
        FilterOp::Sepia(a) => apply_matrix(image, &sepia_matrix(a.clamp(0.0, 1.0))),
        FilterOp::HueRotate(deg) => apply_matrix(image, &hue_rotate_matrix(deg)),
        FilterOp::Blur(_) => {}
    }
}

fn saturate_matrix(s: f64) -> Matrix {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}

fn grayscale_matrix(amount: f64) -> Matrix {
    let s = 1.0 - amount;
    [
        [0.2126 + 0.7874 * s, 0.7152 - 0.7152 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 + 0.2848 * s, 0.0722 - 0.0722 * s],
        [0.2126 - 0.2126 * s, 0.7152 - 0.7152 * s, 0.0722 + 0.9278 * s],
    ]
}

fn sepia_matrix(amount: f64) -> Matrix {
    let s = 1.0 - amount;
    [
        [0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s],
        [0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s],
        [0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s],
    ]
}

fn hue_rotate_matrix(degrees: f64) -> Matrix {
    let (sin, cos) = degrees.to_radians().sin_cos();
    [
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ]
}

fn map_channels(image: &mut RgbaImage, f: impl Fn(f64) -> f64) {
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut().take(3) {
            *channel = to_u8(f(*channel as f64 / 255.0));
        }
    }
}

fn apply_matrix(image: &mut RgbaImage, m: &Matrix) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let rgb = [r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0];
        let mut out = [0u8; 3];
        for (row, value) in m.iter().zip(out.iter_mut()) {
            *value = to_u8(row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);
        }
        pixel.0 = [out[0], out[1], out[2], a];
    }
}

fn to_u8(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}
