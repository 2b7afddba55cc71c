//! # Image Source
//!
//! Upstream of the engine sits a listing endpoint in the Picsum
//! `/v2/list` shape: a JSON array of [`GalleryImage`] records. The
//! engine's contract with it is deliberately blunt — `fetch_images`
//! returns the records or an *empty* sequence, never an error. Network
//! policy (retry, backoff, auth) belongs to the host's [`Transport`];
//! by the time data reaches the core, failure has already been absorbed.

use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::TransportError;
use crate::model::GalleryImage;

/// Default listing endpoint base.
pub const DEFAULT_BASE_URL: &str = "https://picsum.photos";

/// Async byte fetch, implemented by the host over whatever HTTP (or
/// file, or fixture) stack it has.
pub trait Transport {
    fn get<'a>(&'a self, url: &'a str) -> LocalBoxFuture<'a, Result<Vec<u8>, TransportError>>;
}

/// Produces gallery sequences. Failure yields an empty sequence; the
/// engine never sees transport errors.
pub trait GallerySource {
    fn fetch_images(&self, limit: usize) -> LocalBoxFuture<'_, Vec<GalleryImage>>;
}

/// [`GallerySource`] over a Picsum-shaped JSON listing.
pub struct JsonGallerySource {
    transport: Rc<dyn Transport>,
    base_url: String,
}

impl JsonGallerySource {
    pub fn new(transport: Rc<dyn Transport>) -> Self {
        Self::with_base_url(transport, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(transport: Rc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    fn list_url(&self, limit: usize) -> String {
        format!("{}/v2/list?limit={}", self.base_url, limit)
    }
}

impl GallerySource for JsonGallerySource {
    fn fetch_images(&self, limit: usize) -> LocalBoxFuture<'_, Vec<GalleryImage>> {
        async move {
            let url = self.list_url(limit);
            let bytes = match self.transport.get(&url).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("gallery fetch failed for {url}: {err}");
                    return Vec::new();
                }
            };
            match serde_json::from_slice::<Vec<GalleryImage>>(&bytes) {
                Ok(images) => images,
                Err(err) => {
                    log::warn!("gallery listing at {url} is not valid: {err}");
                    Vec::new()
                }
            }
        }
        .boxed_local()
    }
}
