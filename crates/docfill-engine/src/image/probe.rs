/*
 * probe.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Binary inspection of image payloads: format sniffing and intrinsic
//! pixel sizes read straight from the headers.

/// A supported image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    /// MIME type for the content-type declaration.
    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Bmp => "image/bmp",
            ImageFormat::Tiff => "image/tiff",
        }
    }

    /// File extension for the media part name.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
        }
    }

    /// Match a MIME type hint (e.g. from a data URI).
    pub fn from_mime(mime: &str) -> Option<ImageFormat> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            "image/bmp" | "image/x-bmp" => Some(ImageFormat::Bmp),
            "image/tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }

    /// Match a file extension hint.
    pub fn from_extension(ext: &str) -> Option<ImageFormat> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "gif" => Some(ImageFormat::Gif),
            "bmp" => Some(ImageFormat::Bmp),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            _ => None,
        }
    }
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Sniff the format from magic bytes.
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageFormat::Gif)
    } else if bytes.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A]) {
        Some(ImageFormat::Tiff)
    } else {
        None
    }
}

/// Read the intrinsic pixel size from the header, where the format allows.
/// BMP and TIFF sizes are not inspected.
pub fn intrinsic_size(bytes: &[u8], format: ImageFormat) -> Option<ImageSize> {
    match format {
        ImageFormat::Png => png_size(bytes),
        ImageFormat::Gif => gif_size(bytes),
        ImageFormat::Jpeg => jpeg_size(bytes),
        ImageFormat::Bmp | ImageFormat::Tiff => None,
    }
}

/// PNG: width/height are big-endian u32 in the IHDR chunk, at offsets
/// 16 and 20 of the file.
fn png_size(bytes: &[u8]) -> Option<ImageSize> {
    if bytes.len() < 24 {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    size_of(width, height)
}

/// GIF: logical screen width/height are little-endian u16 at offsets 6–9.
fn gif_size(bytes: &[u8]) -> Option<ImageSize> {
    if bytes.len() < 10 {
        return None;
    }
    let width = u16::from_le_bytes([bytes[6], bytes[7]]) as u32;
    let height = u16::from_le_bytes([bytes[8], bytes[9]]) as u32;
    size_of(width, height)
}

/// JPEG: walk the segment chain from offset 2 looking for a start-of-frame
/// marker (`C0`–`CF` minus `C4`/`C8`/`CC`); its payload carries height and
/// width as big-endian u16.
fn jpeg_size(bytes: &[u8]) -> Option<ImageSize> {
    let mut i = 2usize;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        // Fill bytes before the marker.
        while i < bytes.len() && bytes[i] == 0xFF {
            i += 1;
        }
        if i >= bytes.len() {
            return None;
        }
        let marker = bytes[i];
        i += 1;

        // Standalone markers without a length field.
        if (0xD0..=0xD9).contains(&marker) || marker == 0x01 {
            continue;
        }
        if i + 1 >= bytes.len() {
            return None;
        }
        let length = u16::from_be_bytes([bytes[i], bytes[i + 1]]) as usize;
        if is_sof_marker(marker) {
            if i + 8 > bytes.len() {
                return None;
            }
            let height = u16::from_be_bytes([bytes[i + 3], bytes[i + 4]]) as u32;
            let width = u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32;
            return size_of(width, height);
        }
        if length < 2 {
            return None;
        }
        i += length;
    }
    None
}

fn is_sof_marker(marker: u8) -> bool {
    matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

fn size_of(width: u32, height: u32) -> Option<ImageSize> {
    if width > 0 && height > 0 {
        Some(ImageSize { width, height })
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod test_bytes {
    /// A syntactically plausible PNG header with the given dimensions.
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        // Bit depth, color type, compression, filter, interlace.
        bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
        bytes
    }

    /// A GIF89a header with the given logical screen size.
    pub fn gif(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);
        bytes
    }

    /// A minimal JPEG: SOI, an APP0 segment, then SOF0 with the dimensions.
    pub fn jpeg(width: u16, height: u16) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF];
        // APP0, length 16.
        bytes.push(0xE0);
        bytes.extend_from_slice(&16u16.to_be_bytes());
        bytes.extend_from_slice(&[0; 14]);
        // SOF0, length 17: precision, height, width, components.
        bytes.extend_from_slice(&[0xFF, 0xC0]);
        bytes.extend_from_slice(&17u16.to_be_bytes());
        bytes.push(8);
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&[3; 10]);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::test_bytes;
    use super::*;

    #[test]
    fn test_sniff_formats() {
        assert_eq!(sniff(&test_bytes::png(1, 1)), Some(ImageFormat::Png));
        assert_eq!(sniff(&test_bytes::gif(1, 1)), Some(ImageFormat::Gif));
        assert_eq!(sniff(&test_bytes::jpeg(1, 1)), Some(ImageFormat::Jpeg));
        assert_eq!(sniff(b"BM\x00\x00"), Some(ImageFormat::Bmp));
        assert_eq!(sniff(&[0x49, 0x49, 0x2A, 0x00]), Some(ImageFormat::Tiff));
        assert_eq!(sniff(&[0x4D, 0x4D, 0x00, 0x2A]), Some(ImageFormat::Tiff));
        assert_eq!(sniff(b"hello"), None);
        assert_eq!(sniff(&[]), None);
    }

    #[test]
    fn test_png_dimensions() {
        let size = intrinsic_size(&test_bytes::png(800, 600), ImageFormat::Png).unwrap();
        assert_eq!(size, ImageSize { width: 800, height: 600 });
        assert_eq!(intrinsic_size(&[0x89], ImageFormat::Png), None);
    }

    #[test]
    fn test_gif_dimensions() {
        let size = intrinsic_size(&test_bytes::gif(320, 200), ImageFormat::Gif).unwrap();
        assert_eq!(size, ImageSize { width: 320, height: 200 });
    }

    #[test]
    fn test_jpeg_dimensions() {
        let size = intrinsic_size(&test_bytes::jpeg(1024, 768), ImageFormat::Jpeg).unwrap();
        assert_eq!(size, ImageSize { width: 1024, height: 768 });
    }

    #[test]
    fn test_jpeg_truncated() {
        let mut bytes = test_bytes::jpeg(10, 10);
        bytes.truncate(8);
        assert_eq!(intrinsic_size(&bytes, ImageFormat::Jpeg), None);
    }

    #[test]
    fn test_bmp_tiff_not_inspected() {
        assert_eq!(intrinsic_size(b"BM\x00\x00\x00", ImageFormat::Bmp), None);
        assert_eq!(
            intrinsic_size(&[0x49, 0x49, 0x2A, 0x00, 1, 2], ImageFormat::Tiff),
            None
        );
    }

    #[test]
    fn test_mime_and_extension_hints() {
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("IMAGE/JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("text/plain"), None);
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension(".jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("svg"), None);
    }
}
