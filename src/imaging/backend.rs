//! Image processing backend traits and shared types.
//!
//! A backend is split into three objects with distinct lifetimes:
//!
//! | Trait | Lives for | Operations |
//! |---|---|---|
//! | [`ImageBackend`] | the process | configure, `load_bytes`, flush worker state |
//! | [`SourceImage`] | one loaded image | dimensions, orientation tag, shrink-on-load |
//! | [`ProcessedImage`] | one thumbnail/crop call | orient, resize, crop, serialize |
//!
//! Release of backend resources is `Drop`: a [`SourceImage`] or
//! [`ProcessedImage`] frees whatever it holds when it goes out of scope.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::format::Format;
use super::orientation::Orientation;
use super::params::Quality;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Process-wide backend entry point.
pub trait ImageBackend: Sync {
    type Image: SourceImage;

    /// Set the number of threads the backend may use inside a single call.
    fn configure_concurrency(&mut self, threads: usize) -> Result<(), BackendError>;

    /// Turn off any cache that could share image data between calls.
    fn disable_result_cache(&mut self);

    /// Parse `blob` as `format` and return a handle to it. Implementations
    /// should read only as much as they need to report dimensions and
    /// metadata.
    fn load_bytes(&self, blob: &[u8], format: Format) -> Result<Self::Image, BackendError>;

    /// Free state cached for the current thread. Safe to call repeatedly.
    fn flush_worker_local_state(&self);
}

/// A loaded, not yet processed, image.
pub trait SourceImage {
    type Output: ProcessedImage;

    /// Width as stored, before orientation.
    fn width(&self) -> u32;

    /// Height as stored, before orientation.
    fn height(&self) -> u32;

    /// Raw EXIF Orientation tag, or 0 when the image carries none.
    fn orientation_tag(&self) -> u16;

    /// Decode pixels, reducing toward `width` x `height` (stored orientation)
    /// where that is cheap. The result may be larger than requested but is
    /// never smaller on either axis unless the source itself is.
    fn load_scaled(
        &self,
        blob: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self::Output, BackendError>;
}

/// An in-progress result image.
pub trait ProcessedImage {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Rotate and/or mirror the pixels so the image displays upright.
    fn orient(&mut self, orientation: Orientation) -> Result<(), BackendError>;

    /// Resample to exactly `width` x `height`.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Keep the `width` x `height` region starting at (`left`, `top`).
    fn crop(&mut self, left: u32, top: u32, width: u32, height: u32)
    -> Result<(), BackendError>;

    /// Encode the current pixels.
    fn serialize(&self, format: Format, quality: Quality) -> Result<Vec<u8>, BackendError>;
}
