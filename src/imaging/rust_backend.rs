//! Image processing backend on the `image` crate, with libjpeg-turbo for JPEG decode.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Header parse | `image::ImageReader::into_dimensions` (no pixel decode) |
//! | Orientation tag | `kamadak-exif` (`Reader::read_from_container`) |
//! | Decode (JPEG) | `mozjpeg::Decompress` with DCT scaling (1/1, 1/2, 1/4, 1/8) |
//! | Decode (PNG, GIF, WebP) | `image::ImageReader::decode` under `image::Limits` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode | `JpegEncoder` with quality; PNG, GIF, lossless WebP via `write_to` |
//!
//! JPEG goes through libjpeg-turbo so the reduction happens inside the IDCT:
//! a 1/8 decode never holds the full-resolution buffer. The output buffer is
//! checked against the same allocation cap `image::Limits` enforces for the
//! other formats. Lanczos only ever sees the reduced image.
//!
//! Decoding and resampling run on the calling thread. Nothing is cached
//! between calls or per thread.

use super::backend::{BackendError, ImageBackend, ProcessedImage, SourceImage};
use super::calculations::{MAX_SHRINK_FACTOR, shrink_factor};
use super::{Format, MAX_DIMENSION, Orientation, Quality};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Limits, RgbImage};
use mozjpeg::Decompress;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use tracing::trace;

/// Default decoder allocation cap.
pub const DEFAULT_MAX_ALLOC: u64 = 512 * 1024 * 1024;

fn image_format(format: Format) -> Result<ImageFormat, BackendError> {
    match format {
        Format::Jpeg => Ok(ImageFormat::Jpeg),
        Format::Png => Ok(ImageFormat::Png),
        Format::Gif => Ok(ImageFormat::Gif),
        Format::Webp => Ok(ImageFormat::WebP),
        Format::Unknown => Err(BackendError::Unsupported("unknown format".into())),
    }
}

/// Read the EXIF Orientation tag. 0 when absent or invalid.
fn read_orientation_tag(blob: &[u8], format: Format) -> u16 {
    if format == Format::Gif {
        return 0;
    }
    let Ok(exif) = exif::Reader::new().read_from_container(&mut Cursor::new(blob)) else {
        return 0;
    };
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .and_then(|value| u16::try_from(value).ok())
        .filter(|tag| (1..=8).contains(tag))
        .unwrap_or(0)
}

/// Decode a JPEG at `1/factor` of its stored size.
///
/// libjpeg reports fatal errors by unwinding, so the decode runs under
/// `catch_unwind`.
fn decode_jpeg_scaled(
    blob: &[u8],
    factor: u32,
    max_alloc: u64,
) -> Result<DynamicImage, BackendError> {
    if !blob.windows(2).any(|pair| pair == [0xFF, 0xD9]) {
        return Err(BackendError::Decode("jpeg: missing EOI marker".into()));
    }
    // Scale is numerator / 8
    let numerator = u8::try_from(8 / factor.clamp(1, MAX_SHRINK_FACTOR)).unwrap_or(8);

    let decode = || -> Result<DynamicImage, BackendError> {
        let mut decompress = Decompress::new_mem(blob)
            .map_err(|e| BackendError::Decode(format!("jpeg: {e}")))?;
        decompress.scale(numerator);
        let mut started = decompress
            .rgb()
            .map_err(|e| BackendError::Decode(format!("jpeg: {e}")))?;

        let (width, height) = (started.width(), started.height());
        let needed = (width as u64)
            .saturating_mul(height as u64)
            .saturating_mul(3);
        if needed > max_alloc {
            return Err(BackendError::Decode(format!(
                "jpeg: {width}x{height} output needs {needed} bytes, cap is {max_alloc}"
            )));
        }
        let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(BackendError::Decode("jpeg: output too large".into())),
        };

        let pixels: Vec<[u8; 3]> = started
            .read_scanlines()
            .map_err(|e| BackendError::Decode(format!("jpeg: {e}")))?;
        RgbImage::from_raw(width, height, pixels.into_flattened())
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| BackendError::Decode("jpeg: short scanline data".into()))
    };

    let decoded = panic::catch_unwind(AssertUnwindSafe(decode));

    decoded.unwrap_or_else(|_| Err(BackendError::Decode("jpeg: decoder aborted".into())))
}

/// Backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    max_alloc: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            max_alloc: DEFAULT_MAX_ALLOC,
        }
    }

    /// Cap the bytes a single decode may allocate.
    pub fn with_max_alloc(max_alloc: u64) -> Self {
        Self { max_alloc }
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_DIMENSION);
        limits.max_image_height = Some(MAX_DIMENSION);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    type Image = RustImage;

    fn configure_concurrency(&mut self, threads: usize) -> Result<(), BackendError> {
        if threads != 1 {
            return Err(BackendError::Unsupported(format!(
                "concurrency {threads}: decoding runs on the calling thread only"
            )));
        }
        Ok(())
    }

    fn disable_result_cache(&mut self) {}

    fn load_bytes(&self, blob: &[u8], format: Format) -> Result<RustImage, BackendError> {
        let decoder_format = image_format(format)?;
        let (width, height) = ImageReader::with_format(Cursor::new(blob), decoder_format)
            .into_dimensions()
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(RustImage {
            format: decoder_format,
            width,
            height,
            orientation_tag: read_orientation_tag(blob, format),
            limits: self.limits(),
        })
    }

    fn flush_worker_local_state(&self) {}
}

/// Parsed header of an image; pixels are decoded by [`SourceImage::load_scaled`].
pub struct RustImage {
    format: ImageFormat,
    width: u32,
    height: u32,
    orientation_tag: u16,
    limits: Limits,
}

impl SourceImage for RustImage {
    type Output = RustResult;

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn orientation_tag(&self) -> u16 {
        self.orientation_tag
    }

    fn load_scaled(
        &self,
        blob: &[u8],
        width: u32,
        height: u32,
    ) -> Result<RustResult, BackendError> {
        if self.format == ImageFormat::Jpeg {
            let source = (self.width, self.height);
            let factor = shrink_factor(source, (width, height), MAX_SHRINK_FACTOR);
            trace!(factor, width, height, "jpeg shrink-on-load");
            let max_alloc = self.limits.max_alloc.unwrap_or(DEFAULT_MAX_ALLOC);
            let image = decode_jpeg_scaled(blob, factor, max_alloc)?;
            return Ok(RustResult { image });
        }

        let mut reader = ImageReader::with_format(Cursor::new(blob), self.format);
        reader.limits(self.limits.clone());
        let image = reader
            .decode()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(RustResult { image })
    }
}

/// Decoded pixels being worked on.
pub struct RustResult {
    image: DynamicImage,
}

impl ProcessedImage for RustResult {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn orient(&mut self, orientation: Orientation) -> Result<(), BackendError> {
        let image = &self.image;
        self.image = match orientation {
            Orientation::TopLeft => return Ok(()),
            Orientation::TopRight => image.fliph(),
            Orientation::BottomRight => image.rotate180(),
            Orientation::BottomLeft => image.flipv(),
            Orientation::LeftTop => image.rotate90().fliph(),
            Orientation::RightTop => image.rotate90(),
            Orientation::RightBottom => image.rotate270().fliph(),
            Orientation::LeftBottom => image.rotate270(),
        };
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "resize to {width}x{height}"
            )));
        }
        self.image = self.image.resize_exact(width, height, FilterType::Lanczos3);
        Ok(())
    }

    fn crop(&mut self, left: u32, top: u32, width: u32, height: u32) -> Result<(), BackendError> {
        let fits_x = left.checked_add(width).is_some_and(|r| r <= self.image.width());
        let fits_y = top.checked_add(height).is_some_and(|b| b <= self.image.height());
        if !fits_x || !fits_y || width == 0 || height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "crop {width}x{height}+{left}+{top} outside {}x{}",
                self.image.width(),
                self.image.height()
            )));
        }
        self.image = self.image.crop_imm(left, top, width, height);
        Ok(())
    }

    fn serialize(&self, format: Format, quality: Quality) -> Result<Vec<u8>, BackendError> {
        let mut buf = Vec::new();
        let written = match format {
            Format::Jpeg => {
                // Quality is clamped to 1-100 so it always fits
                let q = u8::try_from(quality.value()).unwrap_or(100);
                let rgb = DynamicImage::ImageRgb8(self.image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, q))
            }
            Format::Png => self
                .image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
            Format::Gif | Format::Webp => DynamicImage::ImageRgba8(self.image.to_rgba8())
                .write_to(&mut Cursor::new(&mut buf), image_format(format)?),
            Format::Unknown => {
                return Err(BackendError::Unsupported("encode unknown format".into()));
            }
        };
        written.map_err(|e| BackendError::Encode(format!("{format}: {e}")))?;
        Ok(buf)
    }
}
