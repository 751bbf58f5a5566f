//! Short-lived wrapper around a backend result image.
//!
//! A [`ResultHandle`] exists for the duration of one thumbnail or crop call.
//! It tracks the current size so the caller can decide whether another
//! backend operation is needed, and it releases the backend object when it
//! is dropped, on success and error alike.

use super::backend::{BackendError, ProcessedImage};
use super::calculations::center_crop_origin;
use super::format::Format;
use super::orientation::Orientation;
use super::params::Quality;

pub struct ResultHandle<R: ProcessedImage> {
    image: R,
    width: u32,
    height: u32,
}

impl<R: ProcessedImage> ResultHandle<R> {
    pub fn new(image: R) -> Self {
        let (width, height) = (image.width(), image.height());
        Self {
            image,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when either axis is larger than `width` x `height`.
    pub fn exceeds(&self, width: u32, height: u32) -> bool {
        self.width > width || self.height > height
    }

    pub fn orient(&mut self, orientation: Orientation) -> Result<(), BackendError> {
        if orientation == Orientation::TopLeft {
            return Ok(());
        }
        self.image.orient(orientation)?;
        self.sync();
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.image.resize(width, height)?;
        self.sync();
        Ok(())
    }

    /// Center-crop to `width` x `height`, clamped to the current size.
    pub fn crop(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        let width = width.min(self.width);
        let height = height.min(self.height);
        let (left, top) = center_crop_origin((self.width, self.height), (width, height));
        self.image.crop(left, top, width, height)?;
        self.sync();
        Ok(())
    }

    /// Encode and release.
    pub fn serialize(self, format: Format, quality: Quality) -> Result<Vec<u8>, BackendError> {
        self.image.serialize(format, quality)
    }

    fn sync(&mut self) {
        self.width = self.image.width();
        self.height = self.image.height();
    }
}
