//! Texture data and the uncompressed TGA loader.
//!
//! A TGA file is accepted only when its first 12 bytes equal
//! [`UNCOMPRESSED_TGA_HEADER`]. The next 6 bytes hold width and height
//! (little-endian u16), bits per pixel (24 or 32) and a descriptor byte
//! that is ignored. Pixels follow in BGR(A) order and are swapped to RGB(A).

use std::{fs, path::Path, path::PathBuf};

use thiserror::Error;

/// Header of an uncompressed true-color TGA.
pub const UNCOMPRESSED_TGA_HEADER: [u8; 12] = [0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0];
/// Header of an RLE-compressed true-color TGA.
pub const RLE_TGA_HEADER: [u8; 12] = [0, 0, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0];

const HEADER_LEN: usize = 12;
const INFO_LEN: usize = 6;

/// Texture data in CPU-friendly format before GPU upload.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgb8,
    Rgba8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8 => 4,
        }
    }
}

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("could not read texture file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("file is shorter than the TGA header")]
    TruncatedHeader,
    #[error("RLE compressed TGA files are not supported")]
    RleCompressed,
    #[error("unsupported image file format")]
    UnsupportedFormat,
    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("unsupported number of bits per pixel ({0})")]
    UnsupportedBitDepth(u8),
    #[error("image data is truncated: expected {expected} bytes, found {found}")]
    TruncatedPixels { expected: usize, found: usize },
    #[error("{len} bytes do not make a {width}x{height} {format:?} image")]
    SizeMismatch {
        width: u32,
        height: u32,
        format: TextureFormat,
        len: usize,
    },
}

impl TextureData {
    /// Wrap tightly packed pixels, checking the length against the size.
    pub fn new(
        width: u32,
        height: u32,
        format: TextureFormat,
        data: Vec<u8>,
    ) -> Result<Self, TextureError> {
        if byte_len(width, height, format) != Some(data.len()) {
            return Err(TextureError::SizeMismatch {
                width,
                height,
                format,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Load an uncompressed 24- or 32-bit TGA file.
    pub fn load_tga<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let path = path.as_ref();
        log::info!("Loading texture from {:?}", path);

        let bytes = fs::read(path).map_err(|source| TextureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let texture = decode_tga(&bytes)?;

        log::info!(
            "Loaded texture {}x{} ({:?}) with {} bytes",
            texture.width,
            texture.height,
            texture.format,
            texture.data.len()
        );
        Ok(texture)
    }

    /// Create a simple test texture (checkerboard pattern).
    pub fn create_test_texture(size: u32) -> Self {
        let side = size as usize;
        let mut data = Vec::with_capacity(side * side * 4);

        for y in 0..size {
            for x in 0..size {
                let checker = ((x / 8) + (y / 8)) % 2;
                if checker == 0 {
                    data.extend_from_slice(&[255, 255, 255, 255]);
                } else {
                    data.extend_from_slice(&[128, 128, 128, 255]);
                }
            }
        }

        Self {
            data,
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
        }
    }

    /// Get the number of bytes per pixel for the format.
    pub fn bytes_per_pixel(&self) -> u32 {
        self.format.bytes_per_pixel()
    }

    /// Check if the texture data is valid.
    pub fn is_valid(&self) -> bool {
        byte_len(self.width, self.height, self.format) == Some(self.data.len())
            && self.width > 0
            && self.height > 0
    }

    /// Widen to RGBA8 (opaque alpha for RGB sources), the layout GPUs upload.
    pub fn to_rgba8(&self) -> Result<TextureData, TextureError> {
        match self.format {
            TextureFormat::Rgba8 => Ok(self.clone()),
            TextureFormat::Rgb8 => {
                let rgb = image::RgbImage::from_raw(self.width, self.height, self.data.clone())
                    .ok_or(TextureError::SizeMismatch {
                        width: self.width,
                        height: self.height,
                        format: self.format,
                        len: self.data.len(),
                    })?;
                let rgba = image::DynamicImage::ImageRgb8(rgb).to_rgba8();
                TextureData::new(
                    self.width,
                    self.height,
                    TextureFormat::Rgba8,
                    rgba.into_raw(),
                )
            }
        }
    }
}

/// Size in bytes of tightly packed pixels, `None` if it overflows.
fn byte_len(width: u32, height: u32, format: TextureFormat) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(format.bytes_per_pixel() as usize)
}

/// Decode an in-memory uncompressed TGA image.
///
/// The header is checked before anything else; pixel data is never read
/// for an unsupported file.
pub fn decode_tga(bytes: &[u8]) -> Result<TextureData, TextureError> {
    let header = bytes.get(..HEADER_LEN).ok_or(TextureError::TruncatedHeader)?;
    if header == RLE_TGA_HEADER {
        return Err(TextureError::RleCompressed);
    } else if header != UNCOMPRESSED_TGA_HEADER {
        return Err(TextureError::UnsupportedFormat);
    }

    let info = bytes
        .get(HEADER_LEN..HEADER_LEN + INFO_LEN)
        .ok_or(TextureError::TruncatedHeader)?;
    let width = u16::from_le_bytes([info[0], info[1]]) as u32;
    let height = u16::from_le_bytes([info[2], info[3]]) as u32;
    if width == 0 || height == 0 {
        return Err(TextureError::InvalidDimensions { width, height });
    }
    let format = match info[4] {
        24 => TextureFormat::Rgb8,
        32 => TextureFormat::Rgba8,
        bpp => return Err(TextureError::UnsupportedBitDepth(bpp)),
    };
    log::debug!("TGA {}x{} {:?}", width, height, format);

    let bpp = format.bytes_per_pixel() as usize;
    let expected = width as usize * height as usize * bpp;
    let body = &bytes[HEADER_LEN + INFO_LEN..];
    let pixels = body.get(..expected).ok_or(TextureError::TruncatedPixels {
        expected,
        found: body.len(),
    })?;

    let mut data = pixels.to_vec();
    for px in data.chunks_exact_mut(bpp) {
        px.swap(0, 2);
    }
    TextureData::new(width, height, format, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tga(width: u16, height: u16, bpp: u8, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = UNCOMPRESSED_TGA_HEADER.to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.push(bpp);
        bytes.push(0);
        bytes.extend_from_slice(pixels);
        bytes
    }

    #[test]
    fn decodes_24_bit_and_swaps_to_rgb() {
        let bytes = tga(2, 1, 24, &[1, 2, 3, 4, 5, 6]);
        let tex = decode_tga(&bytes).unwrap();
        assert_eq!((tex.width, tex.height), (2, 1));
        assert_eq!(tex.format, TextureFormat::Rgb8);
        assert_eq!(tex.data, vec![3, 2, 1, 6, 5, 4]);
        assert!(tex.is_valid());
    }

    #[test]
    fn decodes_32_bit_and_keeps_alpha() {
        let bytes = tga(1, 2, 32, &[10, 20, 30, 40, 50, 60, 70, 80]);
        let tex = decode_tga(&bytes).unwrap();
        assert_eq!(tex.format, TextureFormat::Rgba8);
        assert_eq!(tex.data, vec![30, 20, 10, 40, 70, 60, 50, 80]);
    }

    #[test]
    fn width_and_height_are_little_endian() {
        let pixels = vec![0u8; 300 * 2 * 3];
        let tex = decode_tga(&tga(300, 2, 24, &pixels)).unwrap();
        assert_eq!((tex.width, tex.height), (300, 2));
    }

    #[test]
    fn rle_header_is_rejected_before_pixels() {
        let mut bytes = RLE_TGA_HEADER.to_vec();
        bytes.extend_from_slice(&[2, 0, 2, 0, 24, 0]);
        assert!(matches!(decode_tga(&bytes), Err(TextureError::RleCompressed)));
    }

    #[test]
    fn any_other_header_is_unsupported() {
        let mut colormapped = UNCOMPRESSED_TGA_HEADER;
        colormapped[2] = 1;
        let mut with_id = UNCOMPRESSED_TGA_HEADER;
        with_id[0] = 4;
        let mut png = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13];
        png.extend_from_slice(&[0; 16]);
        for header in [colormapped.to_vec(), with_id.to_vec(), png] {
            assert!(matches!(
                decode_tga(&header),
                Err(TextureError::UnsupportedFormat)
            ));
        }
    }

    #[test]
    fn short_files_are_rejected() {
        assert!(matches!(
            decode_tga(&[0, 0, 2]),
            Err(TextureError::TruncatedHeader)
        ));
        assert!(matches!(
            decode_tga(&UNCOMPRESSED_TGA_HEADER),
            Err(TextureError::TruncatedHeader)
        ));
        assert!(matches!(
            decode_tga(&tga(2, 2, 24, &[0; 5])),
            Err(TextureError::TruncatedPixels {
                expected: 12,
                found: 5
            })
        ));
    }

    #[test]
    fn unsupported_depth_and_empty_images() {
        assert!(matches!(
            decode_tga(&tga(1, 1, 16, &[0, 0])),
            Err(TextureError::UnsupportedBitDepth(16))
        ));
        assert!(matches!(
            decode_tga(&tga(0, 4, 24, &[])),
            Err(TextureError::InvalidDimensions {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn rgb_widens_to_opaque_rgba() {
        let tex = TextureData::new(2, 1, TextureFormat::Rgb8, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let rgba = tex.to_rgba8().unwrap();
        assert_eq!(rgba.format, TextureFormat::Rgba8);
        assert_eq!(rgba.data, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn test_texture_is_valid_checkerboard() {
        let tex = TextureData::create_test_texture(16);
        assert!(tex.is_valid());
        assert_eq!(&tex.data[..4], &[255, 255, 255, 255]);
        let second_block = 8 * 4;
        assert_eq!(&tex.data[second_block..second_block + 4], &[128, 128, 128, 255]);
    }

    #[test]
    fn validity_check_handles_huge_dimensions() {
        let bogus = TextureData {
            data: vec![0; 4],
            width: u32::MAX,
            height: u32::MAX,
            format: TextureFormat::Rgba8,
        };
        assert!(!bogus.is_valid());
        assert!(matches!(
            TextureData::new(u32::MAX, u32::MAX, TextureFormat::Rgba8, vec![0; 4]),
            Err(TextureError::SizeMismatch { len: 4, .. })
        ));
    }

    #[test]
    fn new_checks_length() {
        assert!(matches!(
            TextureData::new(2, 2, TextureFormat::Rgba8, vec![0; 15]),
            Err(TextureError::SizeMismatch { len: 15, .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            TextureData::load_tga("does/not/exist.tga"),
            Err(TextureError::Io { .. })
        ));
    }
}
