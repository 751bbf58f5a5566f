//! EXIF orientation handling.
//!
//! The backend reports the raw Orientation tag; this module turns it into an
//! [`Orientation`] and answers the one question the geometry code cares
//! about: are width and height swapped once the image is displayed upright?
//!
//! | Code | Variant | Upright transform | Swaps |
//! |---|---|---|---|
//! | 1 | `TopLeft` | none | no |
//! | 2 | `TopRight` | flip horizontal | no |
//! | 3 | `BottomRight` | rotate 180 | no |
//! | 4 | `BottomLeft` | flip vertical | no |
//! | 5 | `LeftTop` | rotate 90 + flip horizontal | yes |
//! | 6 | `RightTop` | rotate 90 | yes |
//! | 7 | `RightBottom` | rotate 270 + flip horizontal | yes |
//! | 8 | `LeftBottom` | rotate 270 | yes |

use super::backend::SourceImage;
use serde::Serialize;

/// Serializes as its EXIF code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "u16")]
#[repr(u16)]
pub enum Orientation {
    #[default]
    TopLeft = 1,
    TopRight = 2,
    BottomRight = 3,
    BottomLeft = 4,
    LeftTop = 5,
    RightTop = 6,
    RightBottom = 7,
    LeftBottom = 8,
}

impl Orientation {
    /// Map a raw tag value. Missing (0) or out-of-range values mean upright.
    pub fn from_tag(tag: u16) -> Orientation {
        match tag {
            2 => Orientation::TopRight,
            3 => Orientation::BottomRight,
            4 => Orientation::BottomLeft,
            5 => Orientation::LeftTop,
            6 => Orientation::RightTop,
            7 => Orientation::RightBottom,
            8 => Orientation::LeftBottom,
            _ => Orientation::TopLeft,
        }
    }

    /// Read the orientation a backend image reports.
    pub fn resolve(image: &impl SourceImage) -> Orientation {
        Self::from_tag(image.orientation_tag())
    }

    pub fn tag(self) -> u16 {
        self as u16
    }

    /// True for the quarter-turn codes (5-8).
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::LeftTop
                | Orientation::RightTop
                | Orientation::RightBottom
                | Orientation::LeftBottom
        )
    }

    /// Convert between raw and upright dimensions. The mapping is its own
    /// inverse, so it serves both directions.
    pub fn dimensions(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl From<Orientation> for u16 {
    fn from(orientation: Orientation) -> u16 {
        orientation.tag()
    }
}
