//! The grid engine.
//!
//! One [`GridEngine`] drives one scrolling grid. Hosts feed it scroll and
//! layout signals, and call [`GridEngine::on_frame`] once per paint. Each
//! frame runs the pipeline at most once, in a fixed order:
//!
//! 1. drain cross-boundary input (touches, media events, thumbnail replies)
//!    and restart loads whose backoff elapsed;
//! 2. recompute the ranges from the latest geometry;
//! 3. reconcile and emit structural operations (removes, moves, adds);
//! 4. admit and evict, then issue exactly one `load` / `unload` per change;
//! 5. play or pause admitted items by visibility;
//! 6. run the safety sweep when due;
//! 7. prefetch thumbnails ahead of the buffered range;
//! 8. report stats.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use smallvec::SmallVec;
use vidgrid_core::{
    AdmissionRequest, CollectionView, DomOperation, EngineConfig, FavoriteOverlay, FilterCriteria,
    GridGeometry, ImageRef, Inbox, Item, ItemId, ItemSource, OperationBatch, RenderedSet,
    SharedClock, SlotManager, SlotState, SortMode, ThumbnailRequest, ThumbnailSink, ViewportRanges,
    ViewportState, compute_ranges, prefetch_range, reconcile, system_clock,
};
use vidgrid_media::{MediaHost, MediaLifecycle, MediaState, PlaybackPolicy, RetryPolicy, ThumbnailCache};
use web_time::Instant;

use crate::error::EngineError;
use crate::scheduler::{Dirty, FRAME_BUDGET, FrameRequester, FrameScheduler, SweepTimer};
use crate::stats::{GridStats, ItemDecoration};

pub type OperationCallback = Box<dyn FnMut(&DomOperation)>;
pub type ClickCallback = Box<dyn FnMut(&ItemId, usize)>;
pub type StatsCallback = Box<dyn FnMut(&GridStats)>;

/// Refreshes LRU timestamps from outside the pipeline (hover handlers,
/// other threads). Touches are queued and applied at the start of the next
/// frame, so they never interleave with a transition.
#[derive(Clone)]
pub struct TouchHandle {
    inbox: Inbox<ItemId>,
}

impl TouchHandle {
    pub fn touch(&self, id: &ItemId) {
        self.inbox.push(id.clone());
    }
}

/// What one pipeline run did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub dirty: Dirty,
    /// Operations handed to the structural callback, in order.
    pub operations: Vec<DomOperation>,
    pub admitted: Vec<ItemId>,
    pub evicted: Vec<ItemId>,
    pub deferred: Vec<ItemId>,
    /// Corrections made by the sweep, if it ran.
    pub swept: Option<usize>,
}

pub struct GridEngine {
    config: EngineConfig,
    geometry: GridGeometry,
    items: Vec<Item>,
    /// Collection index by id, for every item whether shown or not.
    index_of: HashMap<ItemId, usize>,
    view: CollectionView,
    viewport: Option<ViewportState>,
    rendered: RenderedSet,
    ranges: ViewportRanges,

    slots: SlotManager,
    media: MediaLifecycle,
    thumbnails: ThumbnailCache,
    thumbnail_replies: ThumbnailSink,
    touches: Inbox<ItemId>,

    scheduler: FrameScheduler,
    sweep: SweepTimer,
    clock: SharedClock,

    source: Option<Box<dyn ItemSource>>,
    favorites: Option<Box<dyn FavoriteOverlay>>,
    on_op: Option<OperationCallback>,
    on_click: Option<ClickCallback>,
    on_stats: Option<StatsCallback>,

    last_stats: GridStats,
    sweeps: u64,
}

impl GridEngine {
    /// Creates an engine with no items and the default geometry. The sweep
    /// starts immediately and stops when the engine is dropped.
    pub fn new(config: EngineConfig, host: impl MediaHost + 'static) -> Result<Self, EngineError> {
        config.validate()?;
        let clock = system_clock();
        let mut sweep = SweepTimer::new(config.sweep_interval());
        sweep.start(clock.now());
        let geometry = GridGeometry {
            buffer_rows: config.buffer_rows,
            ..GridGeometry::default()
        };
        Ok(Self {
            geometry,
            items: Vec::new(),
            index_of: HashMap::new(),
            view: CollectionView::new(),
            viewport: None,
            rendered: RenderedSet::new(),
            ranges: ViewportRanges::default(),
            slots: SlotManager::new(config.max_active_resources),
            media: MediaLifecycle::new(
                Box::new(host),
                PlaybackPolicy::from_config(&config),
                RetryPolicy::from_config(&config),
            ),
            thumbnails: ThumbnailCache::new(config.thumbnail_capacity),
            thumbnail_replies: ThumbnailSink::new(),
            touches: Inbox::new(),
            scheduler: FrameScheduler::new(),
            sweep,
            clock,
            source: None,
            favorites: None,
            on_op: None,
            on_click: None,
            on_stats: None,
            last_stats: GridStats::default(),
            sweeps: 0,
            config,
        })
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        if self.sweep.is_running() {
            self.sweep.stop();
            self.sweep.start(self.clock.now());
        }
        self
    }

    pub fn with_frame_requester(mut self, requester: impl FrameRequester + 'static) -> Self {
        self.scheduler.set_requester(Box::new(requester));
        self
    }

    pub fn with_source(mut self, source: impl ItemSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_favorites(mut self, favorites: impl FavoriteOverlay + 'static) -> Self {
        self.favorites = Some(Box::new(favorites));
        self.rebuild_view();
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_dirty()
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn slots(&self) -> &SlotManager {
        &self.slots
    }

    pub fn view(&self) -> &CollectionView {
        &self.view
    }

    /// The item laid out at grid position `position`.
    pub fn item_at(&self, position: usize) -> Option<&Item> {
        self.view.collection_index(position).and_then(|i| self.items.get(i))
    }

    /// Grid position of `id`, or `None` if it is filtered out or unknown.
    pub fn position_of(&self, id: &ItemId) -> Option<usize> {
        self.view.position_of(id)
    }

    // ---- collection, geometry, config ----

    /// Replaces the collection.
    ///
    /// Ids that survive with the same source and duration keep their slot
    /// and lifecycle record. Surviving ids whose media changed, and ids that
    /// are gone, are unloaded now; the changed ones load again on the next
    /// frame. Duplicate ids keep their first occurrence. Pending thumbnail
    /// requests are abandoned.
    pub fn set_items(&mut self, items: Vec<Item>) {
        let before = items.len();
        let mut seen = HashSet::with_capacity(before);
        let items: Vec<Item> = items.into_iter().filter(|i| seen.insert(i.id.clone())).collect();
        if items.len() != before {
            log::warn!("engine: dropped {} duplicate item ids", before - items.len());
        }

        let changed: Vec<ItemId> = items
            .iter()
            .filter(|new| {
                self.index_of
                    .get(&new.id)
                    .and_then(|&i| self.items.get(i))
                    .is_some_and(|old| old.needs_reload(new))
            })
            .map(|new| new.id.clone())
            .collect();
        for id in &changed {
            self.slots.release(id);
            self.media.unload(id);
            self.thumbnails.remove(id);
        }

        self.index_of = items.iter().enumerate().map(|(i, it)| (it.id.clone(), i)).collect();
        self.items = items;
        self.rebuild_view();

        let mut gone: Vec<ItemId> = self
            .slots
            .iter()
            .map(|(id, _)| id)
            .chain(self.media.ids())
            .filter(|id| !self.index_of.contains_key(*id))
            .cloned()
            .collect();
        gone.sort();
        gone.dedup();
        for id in &gone {
            self.slots.release(id);
            self.media.unload(id);
            self.thumbnails.remove(id);
        }

        self.thumbnails.invalidate_pending();
        log::info!(
            "engine: {} items ({} released from the previous collection, {} with new media)",
            self.items.len(),
            gone.len(),
            changed.len()
        );
        self.scheduler.invalidate(Dirty::ITEMS);
    }

    /// Pulls the collection from the attached [`ItemSource`]. Returns the
    /// item count.
    pub fn load_from_source(&mut self) -> Result<usize, EngineError> {
        let items = self.source.as_ref().ok_or(EngineError::NoSource)?.items();
        let n = items.len();
        self.set_items(items);
        Ok(n)
    }

    /// Replaces the geometry. `total_count` is ignored; it always mirrors the
    /// number of shown items. The buffer row count becomes the configured one too.
    pub fn set_geometry(&mut self, geometry: GridGeometry) -> Result<(), EngineError> {
        geometry.validate()?;
        self.geometry = GridGeometry {
            total_count: self.view.len(),
            ..geometry
        };
        self.config.buffer_rows = geometry.buffer_rows;
        log::info!(
            "engine: geometry {}px x {} columns, {} buffer rows",
            geometry.item_height,
            geometry.items_per_row,
            geometry.buffer_rows
        );
        self.scheduler.invalidate(Dirty::GEOMETRY);
        Ok(())
    }

    pub fn set_columns(&mut self, items_per_row: usize) -> Result<(), EngineError> {
        self.set_geometry(GridGeometry {
            items_per_row,
            ..self.geometry
        })
    }

    /// Applies a new configuration. Lowering the cap evicts down to it now.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        let now = self.clock.now();

        let evicted = self
            .slots
            .set_capacity(config.max_active_resources, self.ranges.visible_center());
        for id in &evicted {
            self.media.unload(id);
        }
        self.media
            .set_policies(PlaybackPolicy::from_config(&config), RetryPolicy::from_config(&config));
        self.thumbnails.set_capacity(config.thumbnail_capacity);
        self.sweep.set_interval(config.sweep_interval(), now);
        self.geometry.buffer_rows = config.buffer_rows;

        log::info!(
            "engine: config updated (cap {}, {} evicted)",
            config.max_active_resources,
            evicted.len()
        );
        self.config = config;
        self.scheduler.invalidate(Dirty::CONFIG);
        Ok(())
    }

    // ---- filter and sort ----

    /// Items failing `criteria` leave the grid: they get a `Remove` on the
    /// next frame and lose their slot like any item scrolled out of range.
    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.view.set_criteria(criteria);
        self.refresh_view();
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.view.set_sort_mode(mode);
        self.refresh_view();
    }

    /// Replaces the hidden set.
    pub fn set_hidden(&mut self, ids: impl IntoIterator<Item = ItemId>) {
        self.view.set_hidden(ids);
        self.refresh_view();
    }

    /// Re-applies the filter and sort order, e.g. after the favorite overlay
    /// changed behind the engine's back.
    pub fn refresh_view(&mut self) {
        self.rebuild_view();
        log::info!("engine: {} of {} items shown", self.view.len(), self.items.len());
        self.scheduler.invalidate(Dirty::VIEW);
    }

    fn rebuild_view(&mut self) {
        self.view.rebuild(&self.items, self.favorites.as_deref());
        self.geometry.total_count = self.view.len();
        let view = &self.view;
        self.slots.reindex(|id| view.position_of(id));
    }

    // ---- scroll signals ----

    /// Records the scroll position. Never runs the pipeline; the work happens
    /// in the next [`on_frame`](Self::on_frame).
    pub fn update_viewport(&mut self, scroll_top: f64, viewport_height: f64) {
        self.viewport = Some(ViewportState::new(scroll_top, viewport_height));
        self.scheduler.invalidate(Dirty::VIEWPORT);
    }

    /// Viewport height changed; the scroll position is kept.
    pub fn resize(&mut self, viewport_height: f64) {
        let scroll_top = self.viewport.map_or(0.0, |v| v.scroll_top);
        self.update_viewport(scroll_top, viewport_height);
    }

    // ---- callbacks ----

    pub fn on_structural_op(&mut self, f: impl FnMut(&DomOperation) + 'static) {
        self.on_op = Some(Box::new(f));
    }

    pub fn on_item_click(&mut self, f: impl FnMut(&ItemId, usize) + 'static) {
        self.on_click = Some(Box::new(f));
    }

    /// Called after any tick or event pump that changed the stats, and after
    /// every tick that deferred admissions.
    pub fn on_stats(&mut self, f: impl FnMut(&GridStats) + 'static) {
        self.on_stats = Some(Box::new(f));
    }

    // ---- frame loop ----

    /// Runs the pipeline if anything is dirty or the sweep is due. Returns
    /// `None` when there was nothing to do.
    pub fn on_frame(&mut self) -> Option<TickReport> {
        let started = Instant::now();
        let now = self.clock.now();
        let dirty = self.scheduler.begin_frame();
        let drained = self.drain_inputs(now);
        let sweep_due = self.sweep.is_due(now);

        if dirty.is_empty() && !sweep_due {
            if drained > 0 {
                self.report_stats(false);
            }
            return None;
        }

        let report = self.tick(now, dirty, sweep_due);

        let elapsed = started.elapsed();
        if elapsed > FRAME_BUDGET {
            log::warn!(
                "engine: tick took {:.2}ms ({} ops, {} admitted)",
                elapsed.as_secs_f64() * 1000.0,
                report.operations.len(),
                report.admitted.len()
            );
        }
        Some(report)
    }

    /// Applies queued media events, touches and thumbnail replies without
    /// running the pipeline. Returns how many were applied.
    pub fn pump_events(&mut self) -> usize {
        let n = self.drain_inputs(self.clock.now());
        if n > 0 {
            self.report_stats(false);
        }
        n
    }

    /// When the host should call [`on_frame`](Self::on_frame) again even if
    /// nothing scrolls: the next sweep or automatic retry.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.sweep.next_due(), self.media.next_retry_at()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn start(&mut self) {
        self.sweep.start(self.clock.now());
    }

    pub fn stop(&mut self) {
        self.sweep.stop();
    }

    fn drain_inputs(&mut self, now: Instant) -> usize {
        let mut n = 0;
        for id in self.touches.drain() {
            self.slots.touch(&id, now);
            n += 1;
        }
        n += self.media.pump(now);
        for reply in self.thumbnail_replies.drain() {
            self.thumbnails.complete(reply);
            n += 1;
        }
        n += self.media.poll_retries(now).len();
        n
    }

    fn tick(&mut self, now: Instant, dirty: Dirty, sweep_due: bool) -> TickReport {
        self.geometry.total_count = self.view.len();
        let ranges = compute_ranges(
            self.viewport.as_ref(),
            &self.geometry,
            self.config.initial_visible_rows,
        );

        let window: Vec<ItemId> = self
            .view
            .order()
            .get(ranges.buffered.clone())
            .unwrap_or(&[])
            .iter()
            .filter_map(|&i| self.items.get(i))
            .map(|item| item.id.clone())
            .collect();
        let rec = reconcile(&self.rendered, &window, ranges.buffered.start);
        if let Some(cb) = self.on_op.as_mut() {
            for op in &rec.operations {
                cb(op);
            }
        }

        let outcome = self.slots.request_admit(
            &AdmissionRequest {
                requested: &rec.admission_request,
                visible: ranges.visible.clone(),
                eviction_candidates: &rec.eviction_candidates,
            },
            now,
        );
        for id in &outcome.evicted {
            self.media.unload(id);
        }
        for id in &outcome.admitted {
            let Some(item) = self.index_of.get(id).and_then(|&i| self.items.get(i)) else {
                continue;
            };
            let visible = self.slots.get(id).is_some_and(|e| e.state == SlotState::Visible);
            self.media.load(item, visible);
        }
        for (id, entry) in self.slots.iter() {
            self.media.set_visible(id, entry.state == SlotState::Visible);
        }

        log::debug!(
            "engine: tick {:?} visible {:?} buffered {:?}: {} ops, +{} -{} ({} deferred)",
            dirty,
            ranges.visible,
            ranges.buffered,
            rec.operations.len(),
            outcome.admitted.len(),
            outcome.evicted.len(),
            outcome.deferred.len()
        );

        self.rendered = rec.rendered;
        self.ranges = ranges;

        let swept = sweep_due.then(|| self.run_sweep(now));
        self.prefetch_thumbnails();
        self.report_stats(!outcome.deferred.is_empty());

        TickReport {
            dirty,
            operations: rec.operations,
            admitted: outcome.admitted,
            evicted: outcome.evicted,
            deferred: outcome.deferred,
            swept,
        }
    }

    /// Forces the admitted set and the records to agree with the ranges just
    /// computed. Returns the number of corrections.
    fn run_sweep(&mut self, now: Instant) -> usize {
        self.sweep.fire(now);
        self.sweeps += 1;
        let mut corrections = 0;

        // Admitted but no longer in the buffered range.
        for id in self.slots.detached() {
            self.slots.release(&id);
            self.media.unload(&id);
            corrections += 1;
        }

        // Records without a slot.
        let orphans: SmallVec<[ItemId; 8]> = self
            .media
            .ids()
            .filter(|id| !self.slots.contains(id))
            .cloned()
            .collect();
        for id in &orphans {
            log::warn!("engine: sweep unloading {id}, which holds no slot");
            self.media.unload(id);
            corrections += 1;
        }

        // Slots whose load never started.
        let unloaded: SmallVec<[(ItemId, bool); 8]> = self
            .slots
            .iter()
            .filter(|(id, _)| !self.media.contains(id))
            .map(|(id, e)| (id.clone(), e.state == SlotState::Visible))
            .collect();
        for (id, visible) in &unloaded {
            match self.index_of.get(id).and_then(|&i| self.items.get(i)) {
                Some(item) => {
                    log::warn!("engine: sweep loading {id}, admitted without a record");
                    self.media.load(item, *visible);
                }
                None => {
                    self.slots.release(id);
                }
            }
            corrections += 1;
        }

        if corrections > 0 {
            log::debug!("engine: sweep made {corrections} corrections");
        }
        if corrections > 0 && !self.slots.deferred().is_empty() {
            // Freed slots go to the deferred ids on the next frame.
            self.scheduler.invalidate(Dirty::SLOTS);
        }
        corrections
    }

    fn prefetch_thumbnails(&mut self) {
        let range = prefetch_range(&self.ranges, &self.geometry);
        let view = &self.view;
        self.thumbnails
            .retain_pending(|id| view.position_of(id).is_some_and(|p| range.contains(&p)));

        let Some(source) = self.source.as_deref() else {
            return;
        };
        let shown = self.view.order().get(range.clone()).unwrap_or(&[]);
        for item in shown.iter().filter_map(|&i| self.items.get(i)) {
            if self.thumbnails.contains(&item.id) || self.thumbnails.is_pending(&item.id) {
                continue;
            }
            let timestamp = self.media.policy().thumbnail_timestamp(item.duration_hint);
            if let Some(image) = source.thumbnail(&item.id) {
                self.thumbnails.insert(item.id.clone(), image, timestamp);
                continue;
            }
            if let Some(ticket) = self.thumbnails.begin_request(&item.id, timestamp) {
                source.request_thumbnail(
                    ThumbnailRequest {
                        id: item.id.clone(),
                        source: item.source.clone(),
                        timestamp_hint: timestamp,
                        ticket,
                    },
                    self.thumbnail_replies.clone(),
                );
            }
        }
    }

    fn report_stats(&mut self, exhausted: bool) {
        let stats = self.get_stats();
        let changed = stats != self.last_stats;
        self.last_stats = stats;
        if (changed || exhausted)
            && let Some(cb) = self.on_stats.as_mut()
        {
            cb(&self.last_stats);
        }
    }

    // ---- interaction ----

    /// A click on an item: refreshes its LRU time and forwards it with its
    /// grid position to the click callback. Filtered-out items are unknown.
    pub fn click(&mut self, id: &ItemId) -> Result<(), EngineError> {
        let index = self
            .view
            .position_of(id)
            .ok_or_else(|| EngineError::UnknownItem(id.clone()))?;
        self.slots.touch(id, self.clock.now());
        if let Some(cb) = self.on_click.as_mut() {
            cb(id, index);
        }
        Ok(())
    }

    /// Refreshes the LRU time of an admitted item. Returns `false` if it holds
    /// no slot.
    pub fn touch(&mut self, id: &ItemId) -> bool {
        self.slots.touch(id, self.clock.now())
    }

    pub fn touch_handle(&self) -> TouchHandle {
        TouchHandle {
            inbox: self.touches.clone(),
        }
    }

    /// Gives up the slot of `id` and unloads it now. A visible item is
    /// re-admitted on the next frame.
    pub fn release(&mut self, id: &ItemId) -> bool {
        let had_slot = self.slots.release(id);
        let had_record = self.media.unload(id);
        if had_slot || had_record {
            self.scheduler.invalidate(Dirty::SLOTS);
        }
        had_slot || had_record
    }

    /// Manual retry of an item whose automatic retries ran out.
    pub fn retry(&mut self, id: &ItemId) -> Result<(), EngineError> {
        if !self.index_of.contains_key(id) {
            return Err(EngineError::UnknownItem(id.clone()));
        }
        if !self.media.retry(id) {
            return Err(EngineError::NotRetryable(id.clone()));
        }
        self.report_stats(false);
        Ok(())
    }

    /// Drops the collection, the rendered set and every live resource. The
    /// presentation layer receives a `Remove` for each rendered item first.
    /// Geometry, config and the viewport survive.
    pub fn reset(&mut self) {
        let mut batch = OperationBatch::new();
        for (id, _) in self.rendered.sorted() {
            batch.push(DomOperation::Remove { id });
        }
        let ops = batch.into_ordered();
        if let Some(cb) = self.on_op.as_mut() {
            for op in &ops {
                cb(op);
            }
        }

        self.slots.clear();
        let released = self.media.unload_all();
        self.thumbnails.clear();
        self.rendered = RenderedSet::new();
        self.ranges = ViewportRanges::default();
        self.items.clear();
        self.index_of.clear();
        self.rebuild_view();

        log::info!("engine: reset ({} removed, {released} released)", ops.len());
        self.report_stats(false);
        self.scheduler.invalidate(Dirty::ITEMS);
    }

    // ---- queries ----

    pub fn get_stats(&self) -> GridStats {
        let counts = self.media.counts();
        let deferred = self.slots.deferred();
        let deferred_visible = deferred
            .iter()
            .filter(|id| {
                self.view
                    .position_of(id)
                    .is_some_and(|p| self.ranges.visible.contains(&p))
            })
            .count();
        GridStats {
            admitted: self.slots.len(),
            visible: self.ranges.visible.len(),
            deferred: deferred_visible,
            deferred_offscreen: deferred.len() - deferred_visible,
            errors: counts.errors,
            total_items: self.items.len(),
            shown: self.view.len(),
            rendered: self.rendered.len(),
            loading: counts.loading,
            playing: counts.playing,
            paused: counts.paused,
            thumbnails_cached: self.thumbnails.len(),
            evictions: self.slots.evictions(),
            stale_completions: self.media.stale_events() + self.thumbnails.stats().stale_replies,
            sweeps: self.sweeps,
        }
    }

    pub fn state_of(&self, id: &ItemId) -> MediaState {
        self.media.state(id)
    }

    pub fn is_admitted(&self, id: &ItemId) -> bool {
        self.slots.contains(id)
    }

    pub fn thumbnail(&self, id: &ItemId) -> Option<&ImageRef> {
        self.thumbnails.peek(id).map(|e| &e.image)
    }

    pub fn decoration(&self, id: &ItemId) -> ItemDecoration {
        let mut d = ItemDecoration::empty();
        if self.favorites.as_ref().is_some_and(|f| f.is_favorite(id)) {
            d |= ItemDecoration::FAVORITE;
        }
        let state = self.media.state(id);
        if state.shows_thumbnail() && self.thumbnails.contains(id) {
            d |= ItemDecoration::THUMBNAIL;
        }
        match state {
            MediaState::Loading => d |= ItemDecoration::LOADING,
            MediaState::Playing => d |= ItemDecoration::PLAYING,
            MediaState::Error => {
                d |= ItemDecoration::ERROR;
                if self.media.record(id).is_some_and(|r| r.is_sticky_error()) {
                    d |= ItemDecoration::RETRYABLE;
                }
            }
            _ => {}
        }
        d
    }

    pub fn visible_range(&self) -> Range<usize> {
        self.ranges.visible.clone()
    }

    pub fn buffered_range(&self) -> Range<usize> {
        self.ranges.buffered.clone()
    }
}

impl Drop for GridEngine {
    fn drop(&mut self) {
        self.sweep.stop();
        let n = self.media.unload_all();
        if n > 0 {
            log::debug!("engine: released {n} handles on drop");
        }
    }
}
