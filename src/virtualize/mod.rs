//! # Viewport Virtualization
//!
//! Decides, per item index, whether the item should currently be
//! mounted. The decision is pure geometry — does the item's vertical
//! span intersect the viewport plus an overscan margin — modulated by a
//! recycling policy:
//!
//! - [`RecycleMode::Symmetric`] (default): recomputed from geometry on
//!   every query; items unmount again once scrolled far past.
//! - [`RecycleMode::TopOnly`]: sticky downward — once an index has been
//!   seen it stays mounted until an explicit reset, or until the user
//!   returns to the top while scrolling down (the infinite-feed
//!   restart).
//! - [`RecycleMode::None`]: no virtualization, everything mounts.
//!
//! The virtualizer never talks to the layout engine directly; it sees
//! only the [`PositionLookup`] contract and a [`ScrollSource`] for live
//! scroll geometry.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::layout::PositionLookup;
use crate::model::GalleryImage;

/// Extra margin beyond the viewport, in layout units, within which
/// items are still considered visible. Generous by default so fast
/// scrolling hits already-mounted content.
pub const DEFAULT_OVERSCAN: f64 = 800.0;

/// Scroll offsets at or below this count as "back at the top" for the
/// top-only auto-reset.
const TOP_RESET_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecycleMode {
    /// Visibility recomputed from geometry on every query.
    #[default]
    Symmetric,
    /// Sticky downward: once visible, mounted until reset.
    TopOnly,
    /// Everything is always visible.
    None,
}

#[derive(Debug, Clone, Copy)]
pub struct VirtualizerConfig {
    /// Read scroll geometry from the global viewport rather than a
    /// designated scroll container. Positions are container-local, so
    /// this also switches on the coordinate-space reconciliation.
    pub use_window_scroll: bool,
    pub recycle_mode: RecycleMode,
    pub overscan: f64,
}

impl Default for VirtualizerConfig {
    fn default() -> Self {
        Self {
            use_window_scroll: false,
            recycle_mode: RecycleMode::Symmetric,
            overscan: DEFAULT_OVERSCAN,
        }
    }
}

/// Where scroll geometry is read from. Implemented by the host over the
/// window or over a scrollable element.
pub trait ScrollSource {
    /// Current scroll offset of the active source.
    fn scroll_offset(&self) -> f64;

    /// Visible extent (viewport height) of the active source.
    fn viewport_extent(&self) -> f64;

    /// Top of the positioned container relative to the scroll origin
    /// (element bounding top plus current window scroll). Only
    /// consulted under window scroll, where item positions live in a
    /// different coordinate space than the scroll offset.
    fn container_offset(&self) -> f64 {
        0.0
    }
}

/// Decides which items are mounted as the viewport moves.
pub struct Virtualizer {
    items: Rc<RefCell<Vec<GalleryImage>>>,
    lookup: Rc<dyn PositionLookup>,
    scroll: Rc<dyn ScrollSource>,
    config: VirtualizerConfig,
    scroll_position: Cell<f64>,
    viewport_extent: Cell<f64>,
    rendered: RefCell<HashSet<usize>>,
    last_scroll_position: Cell<f64>,
    subscription: RefCell<Option<ScrollSubscription>>,
}

impl Virtualizer {
    pub fn new(
        items: Rc<RefCell<Vec<GalleryImage>>>,
        lookup: Rc<dyn PositionLookup>,
        scroll: Rc<dyn ScrollSource>,
        config: VirtualizerConfig,
    ) -> Self {
        Self {
            items,
            lookup,
            scroll,
            config,
            scroll_position: Cell::new(0.0),
            viewport_extent: Cell::new(0.0),
            rendered: RefCell::new(HashSet::new()),
            last_scroll_position: Cell::new(0.0),
            subscription: RefCell::new(None),
        }
    }

    pub fn scroll_position(&self) -> f64 {
        self.scroll_position.get()
    }

    pub fn viewport_extent(&self) -> f64 {
        self.viewport_extent.get()
    }

    /// Re-read scroll offset and viewport extent from the active
    /// source. O(1); safe to call on every scroll tick.
    ///
    /// Under top-only recycling this also tracks scroll direction, and
    /// clears the sticky set when the user has come back to the top and
    /// starts moving down again — the restart mechanism for infinite
    /// feeds.
    pub fn handle_scroll(&self) {
        let new_position = self.scroll.scroll_offset();
        self.scroll_position.set(new_position);
        self.viewport_extent.set(self.scroll.viewport_extent());

        if self.config.recycle_mode == RecycleMode::TopOnly {
            let scrolling_down = new_position > self.last_scroll_position.get();
            self.last_scroll_position.set(new_position);

            if scrolling_down && new_position <= TOP_RESET_THRESHOLD {
                self.rendered.borrow_mut().clear();
            }
        }
    }

    /// Should the item at `index` currently be mounted?
    ///
    /// Absent items and items without a computed position are never
    /// visible — a missing position is "not visible", not an error.
    pub fn is_visible(&self, index: usize) -> bool {
        let id = match self.items.borrow().get(index) {
            Some(item) => item.id.clone(),
            None => return false,
        };
        let position = match self.lookup.position_of(&id) {
            Some(position) => position,
            None => return false,
        };

        match self.config.recycle_mode {
            RecycleMode::None => return true,
            RecycleMode::TopOnly => {
                if self.rendered.borrow().contains(&index) {
                    return true;
                }
            }
            RecycleMode::Symmetric => {}
        }

        let mut item_top = position.y;
        let mut item_bottom = position.bottom();

        // Window scroll reads a document-space offset while positions
        // are container-local; shift the span rather than mixing spaces.
        if self.config.use_window_scroll {
            let offset = self.scroll.container_offset();
            item_top += offset;
            item_bottom += offset;
        }

        let scroll = self.scroll_position.get();
        let extent = self.viewport_extent.get();
        let visible = item_bottom >= scroll - self.config.overscan
            && item_top <= scroll + extent + self.config.overscan;

        if visible && self.config.recycle_mode == RecycleMode::TopOnly {
            self.rendered.borrow_mut().insert(index);
        }

        visible
    }

    /// Register with a scroll event source and read initial geometry.
    /// The subscription is dropped on [`deactivate`] or when the
    /// virtualizer itself is dropped, whichever comes first.
    ///
    /// [`deactivate`]: Virtualizer::deactivate
    pub fn activate(self: &Rc<Self>, events: &dyn ScrollEvents) {
        let weak = Rc::downgrade(self);
        let subscription = events.subscribe(Rc::new(move || {
            if let Some(virtualizer) = weak.upgrade() {
                virtualizer.handle_scroll();
            }
        }));
        *self.subscription.borrow_mut() = Some(subscription);
        self.handle_scroll();
    }

    /// Drop the scroll subscription, if any.
    pub fn deactivate(&self) {
        self.subscription.borrow_mut().take();
    }

    /// Forget sticky visibility and the last scroll reading. Must be
    /// invoked whenever the underlying item sequence changes.
    pub fn reset_state(&self) {
        self.rendered.borrow_mut().clear();
        self.last_scroll_position.set(0.0);
    }

    #[cfg(test)]
    fn rendered_len(&self) -> usize {
        self.rendered.borrow().len()
    }
}

/// Scroll event fan-out with RAII listener lifetime.
///
/// Hosts forward their native scroll events into [`emit`]; subscribers
/// are removed when their [`ScrollSubscription`] drops, so a torn-down
/// virtualizer can never leak a listener.
///
/// [`emit`]: ScrollHub::emit
pub trait ScrollEvents {
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> ScrollSubscription;
}

#[derive(Default, Clone)]
pub struct ScrollHub {
    inner: Rc<RefCell<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    listeners: Vec<(u64, Rc<dyn Fn()>)>,
}

impl ScrollHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one scroll tick to every live subscriber.
    pub fn emit(&self) {
        // Clone out first: a listener may subscribe or unsubscribe
        // while running.
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }
}

impl ScrollEvents for ScrollHub {
    fn subscribe(&self, listener: Rc<dyn Fn()>) -> ScrollSubscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, listener));

        let weak: Weak<RefCell<HubInner>> = Rc::downgrade(&self.inner);
        ScrollSubscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }
}

/// Guard for one registered scroll listener; unsubscribes on drop.
pub struct ScrollSubscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl ScrollSubscription {
    /// Explicit early unsubscribe; equivalent to dropping the guard.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for ScrollSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
