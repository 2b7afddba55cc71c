//! # Dimension Probing
//!
//! Declared dimensions in a gallery listing are metadata, not truth.
//! Before layout, every item is probed: its asset is decoded off-screen
//! and the *natural* pixel dimensions are recorded. A probe that fails —
//! unreachable asset, garbage bytes, unsupported format — is absorbed
//! into the fixed fallback [`FALLBACK_DIMENSION`]; failure never reaches
//! the layout engine.
//!
//! [`ProbeSource`] is the per-item seam hosts implement (or take one of
//! the built-ins: [`decode::BytesProbe`], [`decode::InlineProbe`],
//! [`StaticProbe`]). [`DimensionProber`] runs the all-or-nothing join
//! over a full item sequence and exposes a progress counter.

pub mod decode;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{self, FutureExt, LocalBoxFuture};

use crate::error::ProbeError;
use crate::model::{Dimension, GalleryImage, FALLBACK_DIMENSION};

/// Resolves the true dimensions of a single gallery image.
///
/// Implementations decide what "decode off-screen" means: fetch bytes
/// and sniff a header, ask a browser `Image` element, look up a table.
pub trait ProbeSource {
    fn probe<'a>(
        &'a self,
        image: &'a GalleryImage,
    ) -> LocalBoxFuture<'a, Result<Dimension, ProbeError>>;
}

/// Runs the probe for every item in a sequence and joins the results.
pub struct DimensionProber {
    source: Rc<dyn ProbeSource>,
    items_loaded: Cell<usize>,
}

impl DimensionProber {
    pub fn new(source: Rc<dyn ProbeSource>) -> Self {
        Self {
            source,
            items_loaded: Cell::new(0),
        }
    }

    /// Items resolved so far in the current pass, 0..=N, monotonically
    /// increasing. Which ids resolve first is unspecified.
    pub fn items_loaded(&self) -> usize {
        self.items_loaded.get()
    }

    /// Probe every image and resolve once *all* of them have reported
    /// success or failure. Failures are logged and mapped to
    /// [`FALLBACK_DIMENSION`]. Empty input resolves immediately to an
    /// empty map.
    ///
    /// There is no per-probe timeout: one probe source that never
    /// resolves stalls the whole join. Hosts that need a bound put it
    /// inside their [`ProbeSource`].
    pub async fn probe_all(&self, images: &[GalleryImage]) -> HashMap<String, Dimension> {
        if images.is_empty() {
            return HashMap::new();
        }

        self.items_loaded.set(0);
        let probes = images.iter().map(|image| {
            async move {
                let dimension = match self.source.probe(image).await {
                    Ok(dim) => dim,
                    Err(err) => {
                        log::debug!("probe failed for image {}: {err}", image.id);
                        FALLBACK_DIMENSION
                    }
                };
                self.items_loaded.set(self.items_loaded.get() + 1);
                (image.id.clone(), dimension)
            }
        });

        future::join_all(probes).await.into_iter().collect()
    }
}

/// Probe source backed by a fixed table of dimensions.
///
/// Useful when the host already measured the assets, and as the
/// deterministic source in tests. Unknown ids fail the probe (and thus
/// fall back).
#[derive(Default)]
pub struct StaticProbe {
    dimensions: HashMap<String, Dimension>,
}

impl StaticProbe {
    pub fn new(dimensions: HashMap<String, Dimension>) -> Self {
        Self { dimensions }
    }

    /// Build the table from the declared listing dimensions. Only for
    /// hosts that trust their listing; the probe exists because most
    /// should not.
    pub fn from_declared(images: &[GalleryImage]) -> Self {
        let dimensions = images
            .iter()
            .map(|img| (img.id.clone(), Dimension::new(img.width, img.height)))
            .collect();
        Self { dimensions }
    }
}

impl ProbeSource for StaticProbe {
    fn probe<'a>(
        &'a self,
        image: &'a GalleryImage,
    ) -> LocalBoxFuture<'a, Result<Dimension, ProbeError>> {
        let result = self
            .dimensions
            .get(&image.id)
            .copied()
            .ok_or_else(|| ProbeError::UnsupportedSource(image.id.clone()));
        future::ready(result).boxed_local()
    }
}
