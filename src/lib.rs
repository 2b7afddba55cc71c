//! # Drystack
//!
//! A masonry layout and viewport virtualization engine for image
//! galleries.
//!
//! Most gallery grids trust the dimensions their listing declares and
//! mount every item they are given. Both assumptions fall over at
//! scale: listings lie about aspect ratios, and a thousand mounted
//! images will bury any renderer. Drystack does the opposite on both
//! counts — **every item is measured by decoding the real asset**, and
//! **only items near the viewport are mounted**.
//!
//! ## Architecture
//!
//! ```text
//! Listing (JSON/API)
//!       ↓
//!   [source]     — fetch + parse the gallery sequence (absorbs failure)
//!       ↓
//!   [probe]      — off-screen decode for true dimensions
//!       ↓
//!   [layout]     — shortest-column masonry packing + FIFO snapshot cache
//!       ↓
//!   [virtualize] — decide what is mounted as the viewport moves
//! ```
//!
//! The engine is an in-process, single-threaded library: no runtime, no
//! wire protocol, no CLI. Hosts plug in a [`source::Transport`] for
//! bytes, a [`virtualize::ScrollSource`] for scroll geometry, and a
//! [`schedule::Scheduler`] for frame timing; everything else is owned
//! here. Mutable state is observed by polling snapshots (`loading()`,
//! `container_height()`, `get_position()`), never by callback from the
//! core.

pub mod error;
pub mod layout;
pub mod model;
pub mod probe;
pub mod schedule;
pub mod source;
pub mod virtualize;

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use layout::throttle::ThrottledLayout;
use layout::MasonryLayout;
use model::GalleryImage;
use probe::ProbeSource;
use schedule::Scheduler;
use source::GallerySource;
use virtualize::{ScrollSource, Virtualizer, VirtualizerConfig};

/// One mounted gallery view: the source, the layout engine, and the
/// virtualizer wired together with a shared item sequence.
///
/// This is the primary entry point for hosts that want the whole
/// pipeline; the pieces compose individually for hosts that don't.
pub struct Gallery {
    source: Rc<dyn GallerySource>,
    items: Rc<RefCell<Vec<GalleryImage>>>,
    layout: Rc<MasonryLayout>,
    throttled: ThrottledLayout,
    virtualizer: Rc<Virtualizer>,
}

impl Gallery {
    pub fn new(
        source: Rc<dyn GallerySource>,
        probe: Rc<dyn ProbeSource>,
        scroll: Rc<dyn ScrollSource>,
        scheduler: Rc<dyn Scheduler>,
        config: VirtualizerConfig,
    ) -> Self {
        let items: Rc<RefCell<Vec<GalleryImage>>> = Rc::new(RefCell::new(Vec::new()));
        let layout = Rc::new(MasonryLayout::new(probe, scheduler.clone()));
        let throttled = ThrottledLayout::new(layout.clone(), scheduler);
        let virtualizer = Rc::new(Virtualizer::new(
            items.clone(),
            layout.clone(),
            scroll,
            config,
        ));
        Self {
            source,
            items,
            layout,
            throttled,
            virtualizer,
        }
    }

    /// Fetch a fresh item sequence and lay it out.
    ///
    /// A changed sequence invalidates everything derived from the old
    /// one: the layout cache is cleared, the loading flag raised, and
    /// the virtualizer's sticky state reset, *before* the new pass
    /// begins.
    pub async fn refresh(&self, limit: usize, container_width: f64) {
        let images = self.source.fetch_images(limit).await;
        *self.items.borrow_mut() = images;

        self.layout.reset_loading();
        self.layout.clear_cache();
        self.virtualizer.reset_state();

        let snapshot = self.items.borrow().clone();
        self.layout.layout(&snapshot, container_width).await;
    }

    /// Re-layout for a new container width, through the throttle.
    /// Suitable for direct wiring to resize events.
    pub async fn handle_resize(&self, container_width: f64) {
        let snapshot = self.items.borrow().clone();
        self.throttled.call(&snapshot, container_width).await;
    }

    /// Should the item at `index` currently be mounted?
    pub fn is_visible(&self, index: usize) -> bool {
        self.virtualizer.is_visible(index)
    }

    pub fn items(&self) -> Ref<'_, Vec<GalleryImage>> {
        self.items.borrow()
    }

    pub fn layout(&self) -> &Rc<MasonryLayout> {
        &self.layout
    }

    pub fn virtualizer(&self) -> &Rc<Virtualizer> {
        &self.virtualizer
    }
}
