//! Image handling: detection, orientation, geometry, and the backend seam.
//!
//! | Concern | Module |
//! |---|---|
//! | **Format allow-list** | [`format`]: magic-byte signatures |
//! | **Orientation** | [`orientation`]: EXIF codes, width/height swap |
//! | **Geometry** | [`calculations`]: `fit_within`, `cover`, shrink factor |
//! | **Requests** | [`params`]: `Options`, `Quality` |
//! | **Backend** | [`backend`]: traits; [`rust_backend`]: `image` crate implementation |
//! | **Results** | [`result`]: in-progress image with guaranteed release |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a request
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
pub mod format;
pub mod orientation;
pub mod params;
pub mod result;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ProcessedImage, SourceImage};
pub use calculations::{cover, fit_within};
pub use format::Format;
pub use orientation::Orientation;
pub use params::{Options, Quality};
pub use rust_backend::RustBackend;

/// Smallest accepted width or height; avoids divide-by-zero in aspect math.
pub const MIN_DIMENSION: u32 = 2;

/// Largest accepted width or height; keeps sizes within signed 16-bit range.
pub const MAX_DIMENSION: u32 = (1 << 15) - 2;
