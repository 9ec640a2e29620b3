//! Image decoding to the single-channel working layout

use contracts::{GrayImage, ImageMessage};
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use thiserror::Error;

use crate::buffer::Side;
use crate::error::IngestionError;

/// Image decoding failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unsupported image encoding `{encoding}`")]
    UnsupportedEncoding { encoding: String },

    #[error("row stride {step} is shorter than a {width}-pixel row of {row_bytes} bytes")]
    InvalidStride {
        step: u32,
        width: u32,
        row_bytes: usize,
    },

    #[error("image data holds {actual} bytes, {expected} expected")]
    Truncated { expected: usize, actual: usize },

    #[error("image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy)]
enum Layout {
    Mono8,
    Mono16,
    Rgb8,
    Bgr8,
    Rgba8,
    Bgra8,
}

impl Layout {
    fn from_encoding(encoding: &str) -> Option<Self> {
        match encoding {
            "mono8" | "8UC1" => Some(Self::Mono8),
            "mono16" | "16UC1" => Some(Self::Mono16),
            "rgb8" => Some(Self::Rgb8),
            "bgr8" => Some(Self::Bgr8),
            "rgba8" => Some(Self::Rgba8),
            "bgra8" => Some(Self::Bgra8),
            _ => None,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Mono8 => 1,
            Self::Mono16 => 2,
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// Whether `encoding` can be decoded at all
pub fn is_supported_encoding(encoding: &str) -> bool {
    Layout::from_encoding(encoding).is_some()
}

/// Decode an image message into an 8-bit grayscale image
///
/// `mono8`/`8UC1` pixels are copied through with row padding stripped;
/// color and 16-bit layouts are converted to luma.
pub fn decode_gray(msg: &ImageMessage) -> Result<GrayImage, DecodeError> {
    let layout =
        Layout::from_encoding(&msg.encoding).ok_or_else(|| DecodeError::UnsupportedEncoding {
            encoding: msg.encoding.clone(),
        })?;

    if msg.width == 0 || msg.height == 0 {
        return Err(DecodeError::Empty {
            width: msg.width,
            height: msg.height,
        });
    }

    let packed = packed_rows(msg, layout.bytes_per_pixel())?;
    let (width, height) = (msg.width, msg.height);

    let gray = match layout {
        Layout::Mono8 => GrayImage::from_raw(width, height, packed),
        Layout::Mono16 => {
            let samples: Vec<u16> = packed
                .chunks_exact(2)
                .map(|b| {
                    if msg.is_bigendian {
                        u16::from_be_bytes([b[0], b[1]])
                    } else {
                        u16::from_le_bytes([b[0], b[1]])
                    }
                })
                .collect();
            ImageBuffer::<Luma<u16>, _>::from_raw(width, height, samples)
                .map(|buf| DynamicImage::ImageLuma16(buf).to_luma8())
        }
        Layout::Rgb8 => ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, packed)
            .map(|buf| DynamicImage::ImageRgb8(buf).to_luma8()),
        Layout::Bgr8 => {
            let mut rgb = packed;
            rgb.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb)
                .map(|buf| DynamicImage::ImageRgb8(buf).to_luma8())
        }
        Layout::Rgba8 => ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, packed)
            .map(|buf| DynamicImage::ImageRgba8(buf).to_luma8()),
        Layout::Bgra8 => {
            let mut rgba = packed;
            rgba.chunks_exact_mut(4).for_each(|px| px.swap(0, 2));
            ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba)
                .map(|buf| DynamicImage::ImageRgba8(buf).to_luma8())
        }
    };

    // `packed_rows` already sized the buffer to width * height pixels.
    gray.ok_or(DecodeError::Truncated {
        expected: width as usize * height as usize * layout.bytes_per_pixel(),
        actual: msg.data.len(),
    })
}

/// Decode one side of a frame, tagging failures with the side
pub fn decode_frame(side: Side, msg: &ImageMessage) -> crate::Result<GrayImage> {
    decode_gray(msg).map_err(|source| IngestionError::Decode { side, source })
}

/// Copy the pixel bytes of every row, dropping stride padding
fn packed_rows(msg: &ImageMessage, bytes_per_pixel: usize) -> Result<Vec<u8>, DecodeError> {
    let row_bytes = msg.width as usize * bytes_per_pixel;
    let step = msg.step as usize;
    if step < row_bytes {
        return Err(DecodeError::InvalidStride {
            step: msg.step,
            width: msg.width,
            row_bytes,
        });
    }

    let height = msg.height as usize;
    let expected = step * (height - 1) + row_bytes;
    if msg.data.len() < expected {
        return Err(DecodeError::Truncated {
            expected,
            actual: msg.data.len(),
        });
    }

    if step == row_bytes {
        return Ok(msg.data[..row_bytes * height].to_vec());
    }

    let mut packed = Vec::with_capacity(row_bytes * height);
    for row in msg.data.chunks(step).take(height) {
        packed.extend_from_slice(&row[..row_bytes]);
    }
    Ok(packed)
}
