//! Load-validate-render orchestration.
//!
//! [`Imager::load`] runs every security check before any pixel work:
//!
//! 1. The byte signature must be on the [`Format`] allow-list.
//! 2. The backend must parse the header.
//! 3. Stored dimensions must lie in `MIN_DIMENSION..=MAX_DIMENSION`.
//!
//! Only then is the orientation resolved and the upright size recorded. From
//! there one of [`Imager::thumbnail`] or [`Imager::crop`] consumes the value,
//! so a released image can never be touched again.
//!
//! Backend failures are collapsed into the closed [`Error`] set. Their text is
//! logged at debug level and never returned.

use crate::imaging::backend::{BackendError, SourceImage};
use crate::imaging::calculations::{cover, fit_within};
use crate::imaging::result::ResultHandle;
use crate::imaging::{
    Format, ImageBackend, MAX_DIMENSION, MIN_DIMENSION, Options, Orientation, Quality,
};
use tracing::debug;

/// Errors surfaced to callers.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    #[error("Unknown image format")]
    UnknownFormat,
    #[error("Image is too wide or tall")]
    TooBig,
    #[error("Image is too small")]
    TooSmall,
    #[error("Bad option specified")]
    BadOption,
    #[error("Image processing failed")]
    ProcessingFailed,
}

/// Log the backend detail, return the opaque error.
fn processing_failed(err: BackendError) -> Error {
    debug!(error = %err, "backend operation failed");
    Error::ProcessingFailed
}

/// A validated, loaded image.
///
/// `width` and `height` are upright (orientation already applied) and within
/// bounds for as long as the value exists.
pub struct Imager<'a, I: SourceImage> {
    blob: &'a [u8],
    image: I,
    width: u32,
    height: u32,
    orientation: Orientation,
    format: Format,
}

impl<'a, I: SourceImage> Imager<'a, I> {
    /// Detect, parse, and bounds-check `blob`.
    pub fn load<B>(backend: &B, blob: &'a [u8]) -> Result<Self, Error>
    where
        B: ImageBackend<Image = I>,
    {
        let format = Format::detect(blob);
        if format == Format::Unknown {
            debug!(len = blob.len(), "rejected unrecognized signature");
            return Err(Error::UnknownFormat);
        }

        let image = backend.load_bytes(blob, format).map_err(|err| {
            debug!(%format, error = %err, "backend could not parse header");
            Error::UnknownFormat
        })?;

        let (raw_w, raw_h) = (image.width(), image.height());
        if raw_w < MIN_DIMENSION || raw_h < MIN_DIMENSION {
            debug!(%format, raw_w, raw_h, "rejected undersized image");
            return Err(Error::TooSmall);
        }
        if raw_w > MAX_DIMENSION || raw_h > MAX_DIMENSION {
            debug!(%format, raw_w, raw_h, "rejected oversized image");
            return Err(Error::TooBig);
        }

        let orientation = Orientation::resolve(&image);
        let (width, height) = orientation.dimensions(raw_w, raw_h);

        Ok(Self {
            blob,
            image,
            width,
            height,
            orientation,
            format,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Aspect-preserving thumbnail that fits `options.width` x `options.height`.
    pub fn thumbnail(self, options: &Options, quality: Quality) -> Result<Vec<u8>, Error> {
        let out = self.render_fit(options, quality);
        self.close();
        out
    }

    /// Exact-size center crop of `options.width` x `options.height`.
    pub fn crop(self, options: &Options, quality: Quality) -> Result<Vec<u8>, Error> {
        let out = self.render_crop(options, quality);
        self.close();
        out
    }

    /// Release the backend image.
    pub fn close(self) {
        debug!(format = %self.format, "releasing image");
        drop(self.image);
    }

    fn render_fit(&self, options: &Options, quality: Quality) -> Result<Vec<u8>, Error> {
        options.check(self.format, self.width, self.height)?;

        let (width, height) = fit_within((self.width, self.height), (options.width, options.height));

        let mut result = self.new_result(width, height)?;
        if result.exceeds(width, height) {
            result.resize(width, height).map_err(processing_failed)?;
        }

        result
            .serialize(options.output_format(self.format), quality)
            .map_err(processing_failed)
    }

    fn render_crop(&self, options: &Options, quality: Quality) -> Result<Vec<u8>, Error> {
        options.check(self.format, self.width, self.height)?;

        // Never implies upscaling
        let (width, height) = options.crop_target(self.width, self.height);

        // Smallest source-shaped size that still contains the crop box
        let (iw, ih) = cover((self.width, self.height), (width, height));

        let mut result = self.new_result(iw, ih)?;
        if result.exceeds(iw, ih) {
            result.resize(iw, ih).map_err(processing_failed)?;
        }
        if result.exceeds(width, height) {
            result.crop(width, height).map_err(processing_failed)?;
        }

        result
            .serialize(options.output_format(self.format), quality)
            .map_err(processing_failed)
    }

    /// Decode toward the upright `width` x `height`, then turn upright.
    fn new_result(&self, width: u32, height: u32) -> Result<ResultHandle<I::Output>, Error> {
        let (raw_w, raw_h) = self.orientation.dimensions(width, height);
        let image = self
            .image
            .load_scaled(self.blob, raw_w, raw_h)
            .map_err(processing_failed)?;

        let mut result = ResultHandle::new(image);
        result.orient(self.orientation).map_err(processing_failed)?;
        Ok(result)
    }
}
