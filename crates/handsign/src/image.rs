//! Image decoding and sampling.
//!
//! Browsers send images as `data:` URLs (`data:image/jpeg;base64,<payload>`). [`decode_data_url`]
//! turns such a URL into an owned RGB [`Image`] that the neural networks can sample from.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgb, RgbImage};

use crate::{
    rect::{Rect, RotatedRect},
    resolution::Resolution,
};

/// Errors that can occur while decoding an image payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("data URL is missing the ',' between header and payload")]
    MissingSeparator,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image data: {0}")]
    Image(#[from] image::ImageError),
    #[error("decoded image has a width or height of 0")]
    Empty,
}

/// Decodes a `<header>,<base64 payload>` data URL into an [`Image`].
///
/// The header (eg. `data:image/png;base64`) is ignored; the image format is detected from the
/// decoded bytes. ASCII whitespace inside the payload is skipped.
pub fn decode_data_url(data_url: &str) -> Result<Image, DecodeError> {
    let (_header, encoded) = data_url
        .split_once(',')
        .ok_or(DecodeError::MissingSeparator)?;

    let encoded: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let data = STANDARD.decode(encoded)?;
    Image::decode(&data)
}

/// An owned 8-bit sRGB image without alpha channel.
///
/// Channels are stored in RGB order, which is what the palm detection and hand landmark networks
/// expect.
#[derive(Clone)]
pub struct Image {
    buf: RgbImage,
}

impl Image {
    /// Creates a black image of a specified size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: RgbImage::new(width, height),
        }
    }

    /// Decodes an encoded image (JPEG, PNG, GIF, BMP or WebP) from a byte slice.
    ///
    /// Images with an alpha channel are flattened by dropping it. Images of size 0 are rejected.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let buf = image::load_from_memory(data)?.to_rgb8();
        if buf.width() == 0 || buf.height() == 0 {
            return Err(DecodeError::Empty);
        }

        log::trace!("decoded {}x{} image", buf.width(), buf.height());
        Ok(Self { buf })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Returns the color at the given pixel, or [`None`] if it lies outside the image.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.buf.get_pixel_checked(x, y).map(|px| px.0)
    }

    /// Sets the color of a pixel. Writes outside of the image are ignored.
    pub fn set(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if let Some(px) = self.buf.get_pixel_mut_checked(x, y) {
            *px = Rgb(color);
        }
    }

    /// Samples the color at relative coordinates `(u, v)` inside of `region`.
    ///
    /// `u` and `v` range from 0.0 to 1.0 across the width and height of the (unrotated) region.
    /// Uses nearest neighbor interpolation. Points that fall outside of the image are black, which
    /// letterboxes regions that extend past the image borders.
    pub fn sample(&self, region: &RotatedRect, u: f32, v: f32) -> [u8; 3] {
        let rect = region.rect();
        let [x, y] = region.transform_out(u * rect.width(), v * rect.height());
        if x < 0.0 || y < 0.0 {
            return [0; 3];
        }

        self.get(x as u32, y as u32).unwrap_or([0; 3])
    }

    /// Returns the raw RGB bytes, row by row.
    pub fn as_raw(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use crate::test::{encode_png, png_data_url};

    use super::*;

    #[test]
    fn decodes_png_data_url() {
        let mut image = Image::new(4, 3);
        image.set(1, 2, [255, 0, 10]);

        let decoded = decode_data_url(&png_data_url(&image)).unwrap();
        assert_eq!(decoded.resolution(), Resolution::new(4, 3));
        assert_eq!(decoded.get(1, 2), Some([255, 0, 10]));
        assert_eq!(decoded.get(0, 0), Some([0, 0, 0]));
        assert_eq!(decoded.get(4, 0), None);
    }

    #[test]
    fn header_is_ignored() {
        let image = Image::new(2, 2);
        let payload = STANDARD.encode(encode_png(&image));
        let decoded = decode_data_url(&format!("whatever,{payload}")).unwrap();
        assert_eq!(decoded.resolution(), Resolution::new(2, 2));
    }

    #[test]
    fn payload_whitespace_is_skipped() {
        let image = Image::new(2, 2);
        let payload = STANDARD.encode(encode_png(&image));
        let (a, b) = payload.split_at(payload.len() / 2);
        let url = format!("data:image/png;base64,{a}\n {b}");
        assert!(decode_data_url(&url).is_ok());
    }

    #[test]
    fn missing_separator() {
        let err = decode_data_url("data:image/png;base64").unwrap_err();
        assert!(matches!(err, DecodeError::MissingSeparator), "{err:?}");
    }

    #[test]
    fn invalid_base64() {
        let err = decode_data_url("data:image/png;base64,@@@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)), "{err:?}");
    }

    #[test]
    fn not_an_image() {
        let payload = STANDARD.encode(b"definitely not a bitmap");
        let err = decode_data_url(&format!("data:image/png;base64,{payload}")).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)), "{err:?}");
    }

    #[test]
    fn sample_outside_is_black() {
        let mut image = Image::new(2, 2);
        for (x, y) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            image.set(x, y, [9, 9, 9]);
        }

        // Square region twice as wide as the image, centered on it.
        let region = RotatedRect::from(Rect::from_center(1.0, 1.0, 4.0, 4.0));
        assert_eq!(image.sample(&region, 0.5, 0.5), [9, 9, 9]);
        assert_eq!(image.sample(&region, 0.1, 0.1), [0, 0, 0]);
        assert_eq!(image.sample(&region, 0.9, 0.9), [0, 0, 0]);
    }

    #[test]
    fn sample_rotated() {
        let mut image = Image::new(4, 4);
        image.set(0, 0, [255, 255, 255]);

        // Rotating by 180 degrees makes the bottom right of the region land on the top left pixel.
        let region = RotatedRect::new(Rect::from_top_left(0.0, 0.0, 4.0, 4.0), PI);
        assert_eq!(image.sample(&region, 0.9, 0.9), [255, 255, 255]);
        assert_eq!(image.sample(&region, 0.1, 0.1), [0, 0, 0]);
    }
}
