//! Frame type shared by cameras, detectors and encoders.

use crate::error::VisionError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};

/// A single captured frame, 8-bit RGB, row-major.
pub type Frame = RgbImage;

/// Default quality for streamed and archived JPEGs.
pub const JPEG_QUALITY: u8 = 85;

/// Encode a frame as JPEG.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Bytes, VisionError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(VisionError::Encoding("Cannot encode an empty frame".to_string()));
    }

    let mut jpeg = Vec::with_capacity((frame.width() * frame.height()) as usize / 4);
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
    encoder.encode(frame.as_raw(), frame.width(), frame.height(), ColorType::Rgb8)?;

    Ok(Bytes::from(jpeg))
}
