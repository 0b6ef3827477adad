//! Shared helpers for unit tests.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::png::PngEncoder, ColorType, ImageEncoder};

use crate::{
    hand::landmark::{HandLandmarks, LandmarkIdx},
    image::Image,
    landmark::Landmark,
};

/// Encodes `image` as a PNG file.
pub fn encode_png(image: &Image) -> Vec<u8> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .unwrap();
    buf
}

/// Encodes `image` as a `data:image/png;base64,...` URL, the way a browser canvas would.
pub fn png_data_url(image: &Image) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(encode_png(image)))
}

/// Builds a hand whose landmarks all sit at `(0.5, 0.5)`, except for the given overrides of Y
/// coordinates.
pub fn hand_with_heights(heights: &[(LandmarkIdx, f32)]) -> HandLandmarks {
    let mut points = [Landmark::new([0.5, 0.5, 0.0]); 21];
    for &(idx, y) in heights {
        points[idx as usize] = Landmark::new([0.5, y, 0.0]);
    }
    HandLandmarks::from_points(points)
}
