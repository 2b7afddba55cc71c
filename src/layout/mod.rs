//! # Masonry Layout Engine
//!
//! Places an ordered sequence of gallery images into a multi-column
//! masonry grid. The algorithm is shortest-column-first greedy packing:
//!
//! 1. Pick a column count from the container width (coarse breakpoints,
//!    not a continuous function).
//! 2. Probe every item for its true dimensions (all-or-nothing join).
//! 3. For each item in input order, drop it into the currently shortest
//!    column, scaled to the fixed column width at its aspect ratio.
//!
//! This is the greedy multiprocessor-scheduling heuristic — minimize the
//! tallest column — not optimal, but O(N·columns) and deterministic
//! given input order and measured dimensions.
//!
//! Completed passes are cached per `(width, columns, item count)` shape
//! with FIFO eviction, so resize bursts that revisit a shape skip both
//! the probe join and the packing. State is observed by polling
//! snapshots: `loading()`, `container_height()`, `get_position()`.

pub mod cache;
pub mod throttle;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::model::{GalleryImage, Position};
use crate::probe::{DimensionProber, ProbeSource};
use crate::schedule::Scheduler;

use cache::{LayoutCache, LayoutKey, LayoutSnapshot};

/// Vertical and horizontal spacing between items, in layout units.
pub const GAP: f64 = 20.0;

/// Delay before `loading` clears after a pass completes. One paint
/// frame's worth: callers must never treat layout as synchronously
/// complete.
pub const SETTLE_DELAY_MS: f64 = 100.0;

/// Column count as a step function of container width.
pub fn columns_for_width(width: f64) -> usize {
    if width < 600.0 {
        1
    } else if width < 900.0 {
        2
    } else if width < 1200.0 {
        3
    } else {
        4
    }
}

/// The layout engine. Owns the position map, the layout cache, and the
/// `loading` flag for the lifetime of one mounted gallery view.
///
/// Single-threaded by design: all mutation happens through `&self` on
/// the UI thread, suspension points are the probe join and the settling
/// delay.
pub struct MasonryLayout {
    prober: DimensionProber,
    scheduler: Rc<dyn Scheduler>,
    positions: RefCell<HashMap<String, Position>>,
    container_height: Cell<f64>,
    loading: Cell<bool>,
    cache: RefCell<LayoutCache>,
    generation: Cell<u64>,
}

impl MasonryLayout {
    pub fn new(probe: Rc<dyn ProbeSource>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            prober: DimensionProber::new(probe),
            scheduler,
            positions: RefCell::new(HashMap::new()),
            container_height: Cell::new(0.0),
            loading: Cell::new(true),
            cache: RefCell::new(LayoutCache::new()),
            generation: Cell::new(0),
        }
    }

    /// True from construction (and from [`reset_loading`]) until one
    /// settling delay after a pass completes.
    ///
    /// [`reset_loading`]: MasonryLayout::reset_loading
    pub fn loading(&self) -> bool {
        self.loading.get()
    }

    /// Probe progress for the in-flight pass, for progress indication.
    pub fn items_loaded(&self) -> usize {
        self.prober.items_loaded()
    }

    /// Height of the packed container: the tallest column's bottom
    /// edge. Zero before the first pass and for empty sequences.
    pub fn container_height(&self) -> f64 {
        self.container_height.get()
    }

    pub fn get_position(&self, id: &str) -> Option<Position> {
        self.positions.borrow().get(id).copied()
    }

    /// Raise the loading flag ahead of a fresh pass (item set changed).
    pub fn reset_loading(&self) {
        self.loading.set(true);
    }

    pub fn clear_cache(&self) {
        self.cache.borrow_mut().clear();
    }

    /// Compute (or restore) positions for `images` at `container_width`.
    ///
    /// No-op while the container is unmeasured (`container_width == 0`).
    /// On a cache hit the snapshot is restored verbatim; on a miss the
    /// full item set is probed and packed. Either way `loading` clears
    /// only after the settling delay.
    ///
    /// Passes are serialized by generation: a pass that returns from
    /// its probe join to find a newer pass has started discards its
    /// result instead of overwriting newer state.
    pub async fn layout(&self, images: &[GalleryImage], container_width: f64) {
        if container_width == 0.0 {
            return;
        }

        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        let columns = columns_for_width(container_width);
        let key = LayoutKey::new(container_width, columns, images.len());

        let cached = self.cache.borrow().get(&key).cloned();
        if let Some(snapshot) = cached {
            let height = snapshot
                .positions
                .values()
                .map(Position::bottom)
                .fold(0.0, f64::max);
            *self.positions.borrow_mut() = snapshot.positions;
            self.container_height.set(height);
            log::debug!(
                "layout cache hit: width={container_width} columns={columns} items={}",
                images.len()
            );
            self.settle().await;
            return;
        }

        let dimensions = self.prober.probe_all(images).await;
        if self.generation.get() != generation {
            log::debug!("discarding stale layout pass (generation {generation})");
            return;
        }

        let (new_positions, height) = pack(images, &dimensions, container_width, columns);
        *self.positions.borrow_mut() = new_positions.clone();
        self.container_height.set(height);
        self.cache.borrow_mut().insert(
            key,
            LayoutSnapshot {
                positions: new_positions,
                container_height: height,
            },
        );

        self.settle().await;
    }

    async fn settle(&self) {
        self.scheduler.sleep(SETTLE_DELAY_MS).await;
        self.loading.set(false);
    }
}

/// Shortest-column-first greedy packing. Returns the position map and
/// the resulting container height (tallest column, trailing gap
/// included).
fn pack(
    images: &[GalleryImage],
    dimensions: &HashMap<String, crate::model::Dimension>,
    container_width: f64,
    columns: usize,
) -> (HashMap<String, Position>, f64) {
    let column_width = (container_width - GAP * (columns as f64 - 1.0)) / columns as f64;
    let mut column_heights = vec![0.0_f64; columns];
    let mut positions = HashMap::with_capacity(images.len());

    for image in images {
        // Guaranteed present by the probe join; skip defensively so an
        // unpositioned item can never reach the rendered set.
        let Some(dimension) = dimensions.get(&image.id) else {
            continue;
        };

        let shortest = shortest_column(&column_heights);
        let scaled_height = column_width / dimension.aspect_ratio();

        positions.insert(
            image.id.clone(),
            Position {
                x: shortest as f64 * (column_width + GAP),
                y: column_heights[shortest],
                width: column_width,
                height: scaled_height,
            },
        );
        column_heights[shortest] += scaled_height + GAP;
    }

    let height = column_heights.iter().copied().fold(0.0, f64::max);
    (positions, height)
}

/// Index of the current minimum; ties go to the leftmost column.
fn shortest_column(heights: &[f64]) -> usize {
    let mut shortest = 0;
    for (i, &h) in heights.iter().enumerate().skip(1) {
        if h < heights[shortest] {
            shortest = i;
        }
    }
    shortest
}

/// Position lookup contract consumed by the virtualizer. Keeps the
/// virtualizer decoupled from the engine: anything that can answer
/// "where is this id" qualifies.
pub trait PositionLookup {
    fn position_of(&self, id: &str) -> Option<Position>;
}

impl PositionLookup for MasonryLayout {
    fn position_of(&self, id: &str) -> Option<Position> {
        self.get_position(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::StaticProbe;
    use crate::schedule::ManualScheduler;
    use std::collections::HashMap as Map;

    fn make_image(id: &str) -> GalleryImage {
        GalleryImage {
            id: id.to_string(),
            author: "author".to_string(),
            width: 0.0,
            height: 0.0,
            url: String::new(),
            download_url: String::new(),
        }
    }

    fn square_probe(ids: &[&str]) -> StaticProbe {
        let mut table = Map::new();
        for id in ids {
            table.insert(id.to_string(), crate::model::Dimension::new(100.0, 100.0));
        }
        StaticProbe::new(table)
    }

    fn engine_with(probe: StaticProbe) -> (Rc<MasonryLayout>, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let engine = Rc::new(MasonryLayout::new(Rc::new(probe), scheduler.clone()));
        (engine, scheduler)
    }

    #[test]
    fn test_columns_step_function() {
        assert_eq!(columns_for_width(500.0), 1);
        assert_eq!(columns_for_width(599.0), 1);
        assert_eq!(columns_for_width(600.0), 2);
        assert_eq!(columns_for_width(700.0), 2);
        assert_eq!(columns_for_width(899.0), 2);
        assert_eq!(columns_for_width(900.0), 3);
        assert_eq!(columns_for_width(1000.0), 3);
        assert_eq!(columns_for_width(1199.0), 3);
        assert_eq!(columns_for_width(1200.0), 4);
        assert_eq!(columns_for_width(1300.0), 4);
    }

    #[test]
    fn test_zero_width_is_noop() {
        let images = vec![make_image("a")];
        let (engine, _) = engine_with(square_probe(&["a"]));
        pollster::block_on(engine.layout(&images, 0.0));
        assert!(engine.get_position("a").is_none());
        assert!(engine.loading());
    }

    #[test]
    fn test_empty_sequence() {
        let (engine, _) = engine_with(StaticProbe::default());
        pollster::block_on(engine.layout(&[], 1000.0));
        assert!((engine.container_height() - 0.0).abs() < 0.001);
        assert!(!engine.loading());
    }

    #[test]
    fn test_single_column_stacks_in_order() {
        let images = vec![make_image("a"), make_image("b")];
        let (engine, _) = engine_with(square_probe(&["a", "b"]));
        pollster::block_on(engine.layout(&images, 500.0));

        // One column, full width, square items scale to 500x500.
        let a = engine.get_position("a").unwrap();
        let b = engine.get_position("b").unwrap();
        assert!((a.x - 0.0).abs() < 0.001);
        assert!((a.y - 0.0).abs() < 0.001);
        assert!((a.width - 500.0).abs() < 0.001);
        assert!((a.height - 500.0).abs() < 0.001);
        assert!((b.y - 520.0).abs() < 0.001); // 500 + gap
        assert!((engine.container_height() - 1040.0).abs() < 0.001);
    }

    #[test]
    fn test_shortest_column_first() {
        // Item "a" is tall; "b" and "c" should both land in column 1.
        let mut table = Map::new();
        table.insert("a".to_string(), crate::model::Dimension::new(100.0, 400.0));
        table.insert("b".to_string(), crate::model::Dimension::new(100.0, 100.0));
        table.insert("c".to_string(), crate::model::Dimension::new(100.0, 100.0));
        let images = vec![make_image("a"), make_image("b"), make_image("c")];
        let (engine, _) = engine_with(StaticProbe::new(table));

        // 620 wide → 2 columns of (620-20)/2 = 300.
        pollster::block_on(engine.layout(&images, 620.0));
        let a = engine.get_position("a").unwrap();
        let b = engine.get_position("b").unwrap();
        let c = engine.get_position("c").unwrap();

        assert!((a.x - 0.0).abs() < 0.001);
        assert!((a.height - 1200.0).abs() < 0.001); // 300 / (100/400)
        assert!((b.x - 320.0).abs() < 0.001);
        assert!((c.x - 320.0).abs() < 0.001);
        assert!((c.y - 320.0).abs() < 0.001); // below b: 300 + gap
    }

    #[test]
    fn test_every_item_positioned_no_column_overlap() {
        let ids: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let images: Vec<GalleryImage> = ids.iter().map(|id| make_image(id)).collect();
        let (engine, _) = engine_with(square_probe(&id_refs));

        pollster::block_on(engine.layout(&images, 1300.0));

        // Every item received exactly one position.
        let positions: Vec<Position> = ids
            .iter()
            .map(|id| engine.get_position(id).expect("item positioned"))
            .collect();
        assert_eq!(positions.len(), 30);

        // No two items sharing a column overlap vertically, and the
        // x-ranges of distinct columns are disjoint (checked via the
        // shared x coordinate per column).
        for (i, a) in positions.iter().enumerate() {
            for b in positions.iter().skip(i + 1) {
                if (a.x - b.x).abs() < 0.001 {
                    let disjoint = a.bottom() <= b.y + 0.001 || b.bottom() <= a.y + 0.001;
                    assert!(disjoint, "items in one column overlap: {a:?} vs {b:?}");
                } else {
                    assert!(
                        (a.x - b.x).abs() + 0.001 >= a.width.min(b.width),
                        "column x-ranges overlap: {a:?} vs {b:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_cache_hit_ignores_item_identity() {
        let images = vec![make_image("a"), make_image("b")];
        let mut table = Map::new();
        table.insert("a".to_string(), crate::model::Dimension::new(100.0, 100.0));
        table.insert("b".to_string(), crate::model::Dimension::new(100.0, 300.0));
        let (engine, _) = engine_with(StaticProbe::new(table));

        pollster::block_on(engine.layout(&images, 700.0));
        let first_a = engine.get_position("a").unwrap();
        let first_b = engine.get_position("b").unwrap();

        // Same (width, columns, count) shape, reversed order: the
        // cached positions come back, not a recomputation.
        let reversed = vec![images[1].clone(), images[0].clone()];
        pollster::block_on(engine.layout(&reversed, 700.0));
        assert_eq!(engine.get_position("a").unwrap(), first_a);
        assert_eq!(engine.get_position("b").unwrap(), first_b);
    }

    #[test]
    fn test_cache_hit_recomputes_height_and_settles() {
        let images = vec![make_image("a")];
        let (engine, scheduler) = engine_with(square_probe(&["a"]));

        pollster::block_on(engine.layout(&images, 500.0));
        let height = engine.container_height();
        assert_eq!(scheduler.slept(), vec![SETTLE_DELAY_MS]);

        engine.reset_loading();
        assert!(engine.loading());
        pollster::block_on(engine.layout(&images, 500.0));
        assert!((engine.container_height() - height).abs() < 0.001);
        assert!(!engine.loading());
        // The hit path settles too: loading never clears synchronously.
        assert_eq!(scheduler.slept(), vec![SETTLE_DELAY_MS, SETTLE_DELAY_MS]);
    }

    #[test]
    fn test_clear_cache_forces_recompute() {
        struct CountingProbe(Cell<usize>, StaticProbe);
        impl ProbeSource for CountingProbe {
            fn probe<'a>(
                &'a self,
                image: &'a GalleryImage,
            ) -> futures::future::LocalBoxFuture<
                'a,
                Result<crate::model::Dimension, crate::error::ProbeError>,
            > {
                self.0.set(self.0.get() + 1);
                self.1.probe(image)
            }
        }

        let images = vec![make_image("a")];
        let probe = Rc::new(CountingProbe(Cell::new(0), square_probe(&["a"])));
        let scheduler = Rc::new(ManualScheduler::new());
        let engine = MasonryLayout::new(probe.clone(), scheduler);

        pollster::block_on(engine.layout(&images, 500.0));
        assert_eq!(probe.0.get(), 1);

        // Hit path: no probing.
        pollster::block_on(engine.layout(&images, 500.0));
        assert_eq!(probe.0.get(), 1);

        engine.clear_cache();
        pollster::block_on(engine.layout(&images, 500.0));
        assert_eq!(probe.0.get(), 2);
    }

    #[test]
    fn test_stale_pass_discards_its_result() {
        use futures::future::{FutureExt, LocalBoxFuture};
        use futures::task::noop_waker;
        use std::future::Future;
        use std::task::{Context, Poll};

        // Probes stay pending until the gate opens, holding a pass
        // inside its probe join.
        struct GatedProbe {
            open: Rc<Cell<bool>>,
        }
        impl ProbeSource for GatedProbe {
            fn probe<'a>(
                &'a self,
                _image: &'a GalleryImage,
            ) -> LocalBoxFuture<'a, Result<crate::model::Dimension, crate::error::ProbeError>>
            {
                let open = self.open.clone();
                async move {
                    futures::future::poll_fn(|_| {
                        if open.get() {
                            Poll::Ready(())
                        } else {
                            Poll::Pending
                        }
                    })
                    .await;
                    Ok(crate::model::Dimension::new(100.0, 100.0))
                }
                .boxed_local()
            }
        }

        let open = Rc::new(Cell::new(false));
        let scheduler = Rc::new(ManualScheduler::new());
        let engine = MasonryLayout::new(
            Rc::new(GatedProbe { open: open.clone() }),
            scheduler,
        );
        let images = vec![make_image("a")];

        // Pass A starts and parks in its probe join.
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let pass_a = engine.layout(&images, 500.0);
        futures::pin_mut!(pass_a);
        assert!(pass_a.as_mut().poll(&mut cx).is_pending());

        // Pass B starts later and completes first.
        open.set(true);
        pollster::block_on(engine.layout(&images, 700.0));
        let b_position = engine.get_position("a").unwrap();
        assert!((b_position.width - 340.0).abs() < 0.001);

        // Pass A resumes, notices it is stale, and discards its result
        // instead of overwriting pass B's positions.
        assert!(pass_a.as_mut().poll(&mut cx).is_ready());
        assert_eq!(engine.get_position("a").unwrap(), b_position);
    }

    #[test]
    fn test_pack_skips_item_without_dimension() {
        let images = vec![make_image("a"), make_image("b")];
        let mut dimensions = Map::new();
        dimensions.insert("a".to_string(), crate::model::Dimension::new(100.0, 100.0));

        let (positions, height) = pack(&images, &dimensions, 500.0, 1);
        assert!(positions.contains_key("a"));
        assert!(!positions.contains_key("b"));
        assert!((height - 520.0).abs() < 0.001);
    }

    #[test]
    fn test_failed_probe_gets_fallback_position() {
        let images = vec![make_image("a"), make_image("b")];
        let (engine, _) = engine_with(square_probe(&["a"]));
        pollster::block_on(engine.layout(&images, 500.0));

        // "b" failed its probe: positioned at the 300x200 fallback ratio.
        let b = engine.get_position("b").unwrap();
        assert!((b.height - 500.0 / 1.5).abs() < 0.001);
    }

    #[test]
    fn test_fallback_dimension_drives_scaled_height() {
        let images = vec![make_image("a")];
        let (engine, _) = engine_with(StaticProbe::default());
        pollster::block_on(engine.layout(&images, 500.0));
        let a = engine.get_position("a").unwrap();
        // 500-wide column at the 300:200 fallback ratio.
        assert!((a.height - 500.0 * 200.0 / 300.0).abs() < 0.001);
    }
}
