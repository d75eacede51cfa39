//! Preview images stored next to a save state.

use anyhow::{Result, bail};
use image::ExtendedColorType;
use image::codecs::webp::WebPEncoder;
use std::borrow::Cow;

/// Preview supplied by the caller when saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screenshot {
    /// Raw 8-bit RGBA pixels, row-major, `width * height * 4` bytes.
    Rgba {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// An already encoded WebP image, written verbatim.
    WebP(Vec<u8>),
}

impl Screenshot {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self::Rgba {
            width,
            height,
            pixels,
        }
    }

    /// Bytes to write to `screenshot.webp`.
    pub fn to_webp(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::WebP(bytes) => {
                if !is_webp(bytes) {
                    bail!("screenshot bytes are not a WebP image");
                }
                Ok(Cow::Borrowed(bytes))
            }
            Self::Rgba {
                width,
                height,
                pixels,
            } => encode_rgba(*width, *height, pixels).map(Cow::Owned),
        }
    }
}

fn encode_rgba(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        bail!("screenshot has empty dimensions {width}x{height}");
    }
    let Some(expected) = (width as usize)
        .checked_mul(height as usize)
        .and_then(|area| area.checked_mul(4))
    else {
        bail!("screenshot dimensions {width}x{height} are too large");
    };
    if pixels.len() != expected {
        bail!(
            "screenshot buffer is {} bytes, expected {} for {}x{} RGBA",
            pixels.len(),
            expected,
            width,
            height
        );
    }

    let mut out = Vec::new();
    WebPEncoder::new_lossless(&mut out).encode(pixels, width, height, ExtendedColorType::Rgba8)?;
    Ok(out)
}

fn is_webp(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_is_encoded_as_webp() {
        let shot = Screenshot::from_rgba(2, 2, vec![255; 16]);
        let encoded = shot.to_webp().unwrap();
        assert!(is_webp(&encoded));
    }

    #[test]
    fn rgba_with_wrong_length_is_rejected() {
        let shot = Screenshot::from_rgba(4, 4, vec![0; 10]);
        assert!(shot.to_webp().is_err());
        assert!(Screenshot::from_rgba(0, 4, Vec::new()).to_webp().is_err());
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        assert!(Screenshot::from_rgba(u32::MAX, u32::MAX, Vec::new()).to_webp().is_err());
        assert!(Screenshot::from_rgba(1 << 31, 1 << 31, Vec::new()).to_webp().is_err());
    }

    #[test]
    fn encoded_webp_passes_through() {
        let encoded = Screenshot::from_rgba(1, 1, vec![10, 20, 30, 255])
            .to_webp()
            .unwrap()
            .into_owned();
        let shot = Screenshot::WebP(encoded.clone());
        assert_eq!(shot.to_webp().unwrap().as_ref(), encoded.as_slice());
    }

    #[test]
    fn non_webp_bytes_are_rejected() {
        let shot = Screenshot::WebP(b"\x89PNG\r\n\x1a\n0000".to_vec());
        assert!(shot.to_webp().is_err());
    }
}
