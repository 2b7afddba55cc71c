//! Throttled layout wrapper for high-frequency callers.
//!
//! A drag-resize delivers a resize event per frame; running a full
//! layout pass for each would be unbounded work. The wrapper guarantees
//! at most one execution per interval: a call landing in an idle window
//! runs immediately (leading edge), the first call landing inside the
//! window runs when the window closes (trailing edge), and further
//! calls inside a pending window are dropped.

use std::cell::Cell;
use std::rc::Rc;

use crate::layout::MasonryLayout;
use crate::model::GalleryImage;
use crate::schedule::Scheduler;

/// Minimum spacing between two layout executions, in time units.
pub const THROTTLE_INTERVAL_MS: f64 = 200.0;

pub struct ThrottledLayout {
    engine: Rc<MasonryLayout>,
    scheduler: Rc<dyn Scheduler>,
    interval_ms: f64,
    last_run: Cell<Option<f64>>,
    trailing_pending: Cell<bool>,
}

impl ThrottledLayout {
    pub fn new(engine: Rc<MasonryLayout>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self::with_interval(engine, scheduler, THROTTLE_INTERVAL_MS)
    }

    pub fn with_interval(
        engine: Rc<MasonryLayout>,
        scheduler: Rc<dyn Scheduler>,
        interval_ms: f64,
    ) -> Self {
        Self {
            engine,
            scheduler,
            interval_ms,
            last_run: Cell::new(None),
            trailing_pending: Cell::new(false),
        }
    }

    pub fn engine(&self) -> &Rc<MasonryLayout> {
        &self.engine
    }

    /// Request a layout pass, subject to the throttle window.
    ///
    /// Returns once the pass ran, or immediately when the call was
    /// dropped (a trailing call is already pending).
    pub async fn call(&self, images: &[GalleryImage], container_width: f64) {
        let now = self.scheduler.now();
        let since_last = self.last_run.get().map(|t| now - t);

        match since_last {
            None => {
                // First ever call: leading edge.
                self.last_run.set(Some(now));
                self.engine.layout(images, container_width).await;
            }
            Some(elapsed) if elapsed >= self.interval_ms => {
                self.last_run.set(Some(now));
                self.engine.layout(images, container_width).await;
            }
            Some(elapsed) if !self.trailing_pending.get() => {
                self.trailing_pending.set(true);
                self.scheduler.sleep(self.interval_ms - elapsed).await;
                self.last_run.set(Some(self.scheduler.now()));
                self.trailing_pending.set(false);
                self.engine.layout(images, container_width).await;
            }
            Some(_) => {
                log::trace!("throttled layout call dropped (trailing call pending)");
            }
        }
    }
}
