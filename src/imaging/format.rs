//! Input format detection.
//!
//! Only formats on this allow-list are ever handed to a backend parser.
//! Anything else, including formats the backend could technically decode,
//! is [`Format::Unknown`].
//!
//! | Format | Signature |
//! |---|---|
//! | JPEG | `FF D8 FF` |
//! | PNG | `89 50 4E 47 0D 0A 1A 0A` |
//! | GIF | `GIF87a` / `GIF89a` |
//! | WebP | `RIFF` + 4 length bytes + `WEBP` |

use serde::Serialize;
use std::fmt;

/// Largest WebP canvas side (14-bit dimension fields).
const WEBP_MAX_DIMENSION: u32 = 16383;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Unknown,
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl Format {
    /// Classify `blob` by its leading bytes.
    pub fn detect(blob: &[u8]) -> Format {
        if blob.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Format::Jpeg
        } else if blob.starts_with(PNG_SIGNATURE) {
            Format::Png
        } else if blob.starts_with(b"GIF87a") || blob.starts_with(b"GIF89a") {
            Format::Gif
        } else if blob.len() >= 12 && &blob[0..4] == b"RIFF" && &blob[8..12] == b"WEBP" {
            Format::Webp
        } else {
            Format::Unknown
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Format::Unknown => "application/octet-stream",
            Format::Jpeg => "image/jpeg",
            Format::Png => "image/png",
            Format::Gif => "image/gif",
            Format::Webp => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Unknown => "",
            Format::Jpeg => "jpg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Webp => "webp",
        }
    }

    /// Largest width or height this format can encode.
    pub fn max_dimension(self) -> u32 {
        match self {
            Format::Webp => WEBP_MAX_DIMENSION,
            _ => super::MAX_DIMENSION,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Unknown => "unknown",
            Format::Jpeg => "jpeg",
            Format::Png => "png",
            Format::Gif => "gif",
            Format::Webp => "webp",
        };
        f.write_str(name)
    }
}
