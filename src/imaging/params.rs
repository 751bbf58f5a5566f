//! Parameter types for thumbnail requests.
//!
//! These structs describe *what* the caller wants, not *how* to get there.
//! The [`Imager`](crate::imager::Imager) turns them into backend calls.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Options`]: Target box, crop flag, and backend passthrough knobs (quality, output format).

use super::calculations::fit_within;
use super::format::Format;
use super::{MAX_DIMENSION, MIN_DIMENSION};
use crate::imager::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// A thumbnail request.
///
/// With `crop == false` the output fits inside `width` x `height` and keeps
/// the source aspect ratio. With `crop == true` the output is exactly
/// `width` x `height` (or the largest box of that shape the source can fill).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub width: u32,
    pub height: u32,
    pub crop: bool,
    /// Encoder quality; `None` uses the context default.
    pub quality: Option<Quality>,
    /// Output format; `None` keeps the source format.
    pub format: Option<Format>,
}

impl Options {
    /// Aspect-preserving thumbnail inside `width` x `height`.
    pub fn fit(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: false,
            quality: None,
            format: None,
        }
    }

    /// Exact `width` x `height` center crop.
    pub fn cropped(width: u32, height: u32) -> Self {
        Self {
            crop: true,
            ..Self::fit(width, height)
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn output_format(&self, source: Format) -> Format {
        self.format.unwrap_or(source)
    }

    /// Validate against a loaded image's format and upright dimensions.
    pub fn check(&self, format: Format, width: u32, height: u32) -> Result<(), Error> {
        let bounds = MIN_DIMENSION..=MAX_DIMENSION;
        if !bounds.contains(&self.width) || !bounds.contains(&self.height) {
            return Err(Error::BadOption);
        }

        let output = self.output_format(format);
        if output == Format::Unknown {
            return Err(Error::BadOption);
        }

        let (out_w, out_h) = self.planned_size(width, height);
        if out_w.max(out_h) > output.max_dimension() {
            return Err(Error::BadOption);
        }

        Ok(())
    }

    /// Final output size for a `width` x `height` source.
    pub(crate) fn planned_size(&self, width: u32, height: u32) -> (u32, u32) {
        if self.crop {
            return self.crop_target(width, height);
        }
        let (w, h) = fit_within((width, height), (self.width, self.height));
        if w > width || h > height {
            // Never upscaled
            (width, height)
        } else {
            (w, h)
        }
    }

    /// Requested crop box, shrunk to the source when it would need upscaling.
    pub(crate) fn crop_target(&self, width: u32, height: u32) -> (u32, u32) {
        if self.width > width || self.height > height {
            fit_within((self.width, self.height), (width, height))
        } else {
            (self.width, self.height)
        }
    }
}
