//! # Time Seam
//!
//! The engine has exactly two time-dependent behaviors: the settling
//! delay that keeps the `loading` flag up for one paint frame after a
//! layout pass, and the throttle window around high-frequency relayout.
//! Both read time through [`Scheduler`] instead of the wall clock, so a
//! UI host can back them with its frame clock and tests can run on
//! virtual time.

use std::cell::{Cell, RefCell};

use futures::future::{self, FutureExt, LocalBoxFuture};

/// A monotonic clock plus a deferred-wakeup primitive.
///
/// Hosts embedding the engine implement this over whatever they have:
/// `requestAnimationFrame` chaining on the web, a winit event-loop
/// timer on desktop. The engine never assumes real time passes.
pub trait Scheduler {
    /// Current monotonic time in milliseconds. Only differences are
    /// meaningful.
    fn now(&self) -> f64;

    /// A future resolving once `delay_ms` has elapsed.
    fn sleep(&self, delay_ms: f64) -> LocalBoxFuture<'static, ()>;
}

/// Virtual-time scheduler for tests and headless use.
///
/// `sleep` resolves immediately and advances the virtual clock by the
/// requested delay; every requested delay is recorded so tests can
/// assert that a settling or throttle wait actually happened.
#[derive(Default)]
pub struct ManualScheduler {
    now_ms: Cell<f64>,
    slept: RefCell<Vec<f64>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without sleeping (models time passing
    /// between external events, e.g. two resize callbacks).
    pub fn advance(&self, delta_ms: f64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }

    /// Every delay passed to `sleep`, in call order.
    pub fn slept(&self) -> Vec<f64> {
        self.slept.borrow().clone()
    }
}

impl Scheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.now_ms.get()
    }

    fn sleep(&self, delay_ms: f64) -> LocalBoxFuture<'static, ()> {
        self.slept.borrow_mut().push(delay_ms);
        self.now_ms.set(self.now_ms.get() + delay_ms);
        future::ready(()).boxed_local()
    }
}
