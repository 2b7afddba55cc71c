//! # Gallery Model
//!
//! The input representation for the layout engine. A gallery is an
//! ordered sequence of [`GalleryImage`] records, typically deserialized
//! straight from a Picsum-style listing endpoint. The model is
//! intentionally close to that wire shape: declared width/height are
//! whatever the listing claims, and the engine treats them as metadata —
//! the dimensions that drive layout come from an actual decode of the
//! asset (see [`crate::probe`]).

use serde::{Deserialize, Serialize};

/// One image record in a gallery sequence.
///
/// Identity is `id`, unique within a sequence. For layout purposes two
/// records are interchangeable when their ids and *measured* dimensions
/// match; the declared `width`/`height` here are not guaranteed to match
/// the decoded asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: String,
    pub author: String,
    /// Declared pixel width from the listing. Metadata only.
    pub width: f64,
    /// Declared pixel height from the listing. Metadata only.
    pub height: f64,
    /// Canonical page for the image.
    pub url: String,
    /// Direct asset URL, the one the probe decodes.
    #[serde(rename = "download_url")]
    pub download_url: String,
}

/// Measured pixel dimensions of a decoded asset. Both components are
/// strictly positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub width: f64,
    pub height: f64,
}

impl Dimension {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width-over-height ratio.
    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Dimensions recorded for an item whose probe failed. Deliberately not
/// the declared dimensions: a listing that lied about the asset once is
/// not trusted twice.
pub const FALLBACK_DIMENSION: Dimension = Dimension {
    width: 300.0,
    height: 200.0,
};

/// A computed placement for one item, in container-local coordinates.
///
/// Within one layout pass, positions sharing a column never overlap
/// vertically, and the x-ranges of distinct columns never overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Position {
    /// Bottom edge, `y + height`. The container is as tall as the
    /// largest bottom edge across all positions.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
