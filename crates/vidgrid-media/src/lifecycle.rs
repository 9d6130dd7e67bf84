//! Per-item media lifecycle.
//!
//! ```text
//! Idle ─load─▶ Loading ─ready─▶ Loaded ─visible─▶ Playing ⇄ Paused
//!                 │
//!                 └─failed─▶ Error ─backoff─▶ Loading   (up to N retries)
//!                              └─exhausted─▶ Error (sticky, manual retry)
//! any ─unload─▶ Unloaded (record dropped, handle released)
//! ```
//!
//! Records are keyed by a generation-checked [`RecordKey`]; every event the
//! host reports carries the key and attempt number it was started with, so a
//! completion that arrives after its record was unloaded, or after a newer
//! attempt started, is recognized and ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use vidgrid_core::{Item, ItemId, SourceRef};
use web_time::Instant;

use crate::error::LoadError;
use crate::handle::{LoadTicket, MediaEvent, MediaEventKind, MediaEvents, MediaHost, RecordKey, ResourceGuard};
use crate::preview::{LoopWindow, PlaybackMode, PlaybackPolicy};
use crate::retry::RetryPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaState {
    Idle,
    Loading,
    Loaded,
    Playing,
    Paused,
    Error,
    Unloaded,
}

impl MediaState {
    /// Whether the still thumbnail should cover the item.
    pub fn shows_thumbnail(self) -> bool {
        matches!(
            self,
            MediaState::Idle | MediaState::Loading | MediaState::Unloaded | MediaState::Error
        )
    }

    /// Holds, or is about to hold, decoded frames.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            MediaState::Loading | MediaState::Loaded | MediaState::Playing | MediaState::Paused
        )
    }
}

pub struct LifecycleRecord {
    id: ItemId,
    source: SourceRef,
    duration_hint: Option<f64>,
    state: MediaState,
    attempt: u32,
    failures: u32,
    retry_at: Option<Instant>,
    sticky: bool,
    last_error: Option<LoadError>,
    mode: Option<PlaybackMode>,
    visible: bool,
    guard: ResourceGuard,
}

impl LifecycleRecord {
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    pub fn state(&self) -> MediaState {
        self.state
    }

    /// Failed attempts since the last successful load.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn is_sticky_error(&self) -> bool {
        self.sticky
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.last_error.as_ref()
    }

    pub fn mode(&self) -> Option<PlaybackMode> {
        self.mode
    }

    pub fn loop_window(&self) -> Option<LoopWindow> {
        match self.mode {
            Some(PlaybackMode::PreviewLoop(w)) => Some(w),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }
}

/// What an incoming event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Applied(MediaState),
    /// Record gone, superseded attempt, or an event the state does not expect.
    Stale,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleCounts {
    pub loading: usize,
    pub loaded: usize,
    pub playing: usize,
    pub paused: usize,
    pub errors: usize,
    pub sticky_errors: usize,
}

pub struct MediaLifecycle {
    host: Box<dyn MediaHost>,
    events: MediaEvents,
    records: SlotMap<RecordKey, LifecycleRecord>,
    by_id: HashMap<ItemId, RecordKey>,
    policy: PlaybackPolicy,
    retry: RetryPolicy,
    stale_events: u64,
    releases: u64,
}

impl MediaLifecycle {
    pub fn new(host: Box<dyn MediaHost>, policy: PlaybackPolicy, retry: RetryPolicy) -> Self {
        Self {
            host,
            events: MediaEvents::new(),
            records: SlotMap::with_key(),
            by_id: HashMap::new(),
            policy,
            retry,
            stale_events: 0,
            releases: 0,
        }
    }

    /// The inbox hosts report load results and time updates into.
    pub fn events(&self) -> MediaEvents {
        self.events.clone()
    }

    pub fn set_policies(&mut self, policy: PlaybackPolicy, retry: RetryPolicy) {
        self.policy = policy;
        self.retry = retry;
    }

    pub fn policy(&self) -> &PlaybackPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn record(&self, id: &ItemId) -> Option<&LifecycleRecord> {
        self.by_id.get(id).and_then(|k| self.records.get(*k))
    }

    /// `Idle` for ids without a record.
    pub fn state(&self, id: &ItemId) -> MediaState {
        self.record(id).map_or(MediaState::Idle, |r| r.state)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.by_id.keys()
    }

    /// Events ignored because their record or attempt was gone.
    pub fn stale_events(&self) -> u64 {
        self.stale_events
    }

    /// Handles released so far.
    pub fn releases(&self) -> u64 {
        self.releases
    }

    pub fn counts(&self) -> LifecycleCounts {
        let mut c = LifecycleCounts::default();
        for r in self.records.values() {
            match r.state {
                MediaState::Loading => c.loading += 1,
                MediaState::Loaded => c.loaded += 1,
                MediaState::Playing => c.playing += 1,
                MediaState::Paused => c.paused += 1,
                MediaState::Error => {
                    c.errors += 1;
                    if r.sticky {
                        c.sticky_errors += 1;
                    }
                }
                MediaState::Idle | MediaState::Unloaded => {}
            }
        }
        c
    }

    /// `Idle → Loading`. Returns `false` if the id already has a record;
    /// there is never more than one load in flight per id.
    pub fn load(&mut self, item: &Item, visible: bool) -> bool {
        if self.by_id.contains_key(&item.id) {
            log::debug!("media: {} already has a record; ignoring load", item.id);
            return false;
        }
        let handle = self.host.create_handle(item, self.events.clone());
        let key = self.records.insert(LifecycleRecord {
            id: item.id.clone(),
            source: item.source.clone(),
            duration_hint: item.duration_hint,
            state: MediaState::Loading,
            attempt: 0,
            failures: 0,
            retry_at: None,
            sticky: false,
            last_error: None,
            mode: None,
            visible,
            guard: ResourceGuard::new(item.id.clone(), handle),
        });
        self.by_id.insert(item.id.clone(), key);
        if let Some(r) = self.records.get_mut(key) {
            start_attempt(key, r);
        }
        log::debug!("media: {} Idle -> Loading", item.id);
        true
    }

    /// `any → Unloaded`: stop, clear the source, release the handle, drop the
    /// record. Returns `false` for ids without a record.
    pub fn unload(&mut self, id: &ItemId) -> bool {
        let Some(key) = self.by_id.remove(id) else {
            return false;
        };
        let Some(record) = self.records.remove(key) else {
            return false;
        };
        log::debug!("media: {id} {:?} -> Unloaded", record.state);
        record.guard.release();
        self.releases += 1;
        true
    }

    pub fn unload_all(&mut self) -> usize {
        let ids: Vec<ItemId> = self.by_id.keys().cloned().collect();
        ids.iter().filter(|id| self.unload(id)).count()
    }

    /// Visibility-only transitions: `Loaded/Paused → Playing` when on-screen,
    /// `Loaded/Playing → Paused` when only buffered.
    pub fn set_visible(&mut self, id: &ItemId, visible: bool) {
        let Some(&key) = self.by_id.get(id) else {
            return;
        };
        if let Some(r) = self.records.get_mut(key) {
            r.visible = visible;
            apply_visibility(r);
        }
    }

    /// Applies one host event.
    pub fn handle_event(&mut self, event: MediaEvent, now: Instant) -> EventOutcome {
        let Some(r) = self.records.get_mut(event.ticket.key) else {
            self.stale_events += 1;
            log::debug!("media: dropping {:?} for a record that is gone", kind_name(&event.kind));
            return EventOutcome::Stale;
        };
        if r.attempt != event.ticket.attempt {
            self.stale_events += 1;
            log::debug!(
                "media: dropping {} for {} attempt {} (current {})",
                kind_name(&event.kind),
                r.id,
                event.ticket.attempt,
                r.attempt
            );
            return EventOutcome::Stale;
        }

        match event.kind {
            MediaEventKind::Ready { duration } => {
                if r.state != MediaState::Loading {
                    return EventOutcome::Stale;
                }
                let mode = self.policy.mode_for(duration.or(r.duration_hint));
                r.guard.with(|h| match mode {
                    PlaybackMode::PreviewLoop(w) => {
                        h.set_native_loop(false);
                        h.seek(w.start);
                    }
                    PlaybackMode::NativeLoop => h.set_native_loop(true),
                });
                r.mode = Some(mode);
                r.state = MediaState::Loaded;
                r.failures = 0;
                r.last_error = None;
                log::debug!("media: {} Loading -> Loaded ({mode:?})", r.id);
                apply_visibility(r);
                EventOutcome::Applied(r.state)
            }
            MediaEventKind::Failed(err) => {
                if r.state != MediaState::Loading {
                    return EventOutcome::Stale;
                }
                r.guard.with(|h| h.clear_source());
                r.failures += 1;
                r.state = MediaState::Error;
                if self.retry.allows(r.failures) {
                    let delay = self.retry.delay_for(r.failures);
                    r.retry_at = Some(now + delay);
                    log::debug!(
                        "media: {} failed ({err}); retry {} of {} in {delay:?}",
                        r.id,
                        r.failures,
                        self.retry.attempts
                    );
                } else {
                    r.sticky = true;
                    r.retry_at = None;
                    log::warn!("media: {} failed after {} attempts: {err}", r.id, r.failures);
                }
                r.last_error = Some(err);
                EventOutcome::Applied(MediaState::Error)
            }
            MediaEventKind::TimeUpdate { position } => {
                if r.state == MediaState::Playing
                    && let Some(PlaybackMode::PreviewLoop(w)) = r.mode
                    && let Some(target) = w.seek_target(position)
                {
                    r.guard.with(|h| h.seek(target));
                }
                EventOutcome::Applied(r.state)
            }
        }
    }

    /// Drains the host inbox and applies every event.
    pub fn pump(&mut self, now: Instant) -> usize {
        let events = self.events.drain();
        let n = events.len();
        for e in events {
            self.handle_event(e, now);
        }
        n
    }

    /// Restarts loads whose backoff has elapsed. Returns the ids restarted.
    pub fn poll_retries(&mut self, now: Instant) -> Vec<ItemId> {
        let mut restarted = Vec::new();
        for (key, r) in self.records.iter_mut() {
            if r.state == MediaState::Error
                && !r.sticky
                && r.retry_at.is_some_and(|at| at <= now)
            {
                r.retry_at = None;
                start_attempt(key, r);
                log::debug!("media: {} Error -> Loading (retry {})", r.id, r.failures);
                restarted.push(r.id.clone());
            }
        }
        restarted
    }

    /// Earliest pending automatic retry.
    pub fn next_retry_at(&self) -> Option<Instant> {
        self.records.values().filter_map(|r| r.retry_at).min()
    }

    /// User-triggered retry of a sticky error. Returns `false` if the id is
    /// not in a sticky error state.
    pub fn retry(&mut self, id: &ItemId) -> bool {
        let Some(&key) = self.by_id.get(id) else {
            return false;
        };
        let Some(r) = self.records.get_mut(key) else {
            return false;
        };
        if !(r.state == MediaState::Error && r.sticky) {
            return false;
        }
        r.sticky = false;
        r.failures = 0;
        r.retry_at = None;
        start_attempt(key, r);
        log::info!("media: {} manual retry", r.id);
        true
    }
}

impl Drop for MediaLifecycle {
    fn drop(&mut self) {
        let n = self.unload_all();
        if n > 0 {
            log::debug!("media: released {n} handles on shutdown");
        }
    }
}

fn start_attempt(key: RecordKey, r: &mut LifecycleRecord) {
    r.attempt += 1;
    r.state = MediaState::Loading;
    r.mode = None;
    let ticket = LoadTicket {
        key,
        attempt: r.attempt,
    };
    let source = &r.source;
    r.guard.with(|h| h.set_source(source, ticket));
}

fn apply_visibility(r: &mut LifecycleRecord) {
    match (r.state, r.visible) {
        (MediaState::Loaded | MediaState::Paused, true) => {
            r.guard.with(|h| h.play());
            r.state = MediaState::Playing;
        }
        (MediaState::Loaded | MediaState::Playing, false) => {
            r.guard.with(|h| h.pause());
            r.state = MediaState::Paused;
        }
        _ => {}
    }
}

fn kind_name(kind: &MediaEventKind) -> &'static str {
    match kind {
        MediaEventKind::Ready { .. } => "ready",
        MediaEventKind::Failed(_) => "failure",
        MediaEventKind::TimeUpdate { .. } => "time update",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{HandleCall, MockHost};

    fn lifecycle(host: &MockHost) -> MediaLifecycle {
        MediaLifecycle::new(
            Box::new(host.clone()),
            PlaybackPolicy {
                long_item_threshold: 30.0,
                preview_window: 5.0,
            },
            RetryPolicy {
                attempts: 2,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(5),
            },
        )
    }

    fn item(id: &str, duration: f64) -> Item {
        Item::new(id, format!("{id}.mp4").as_str()).with_duration(duration)
    }

    #[test]
    fn visible_item_plays_after_ready() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("a", 10.0);
        assert!(media.load(&a, true));
        assert!(!media.load(&a, true));
        assert_eq!(media.state(&a.id), MediaState::Loading);

        host.complete(&a.id, Some(10.0));
        media.pump(Instant::now());
        assert_eq!(media.state(&a.id), MediaState::Playing);
        assert!(host.calls(&a.id).contains(&HandleCall::NativeLoop(true)));
        assert!(host.calls(&a.id).contains(&HandleCall::Play));
    }

    #[test]
    fn buffered_item_pauses_and_resumes() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("a", 10.0);
        media.load(&a, false);
        host.complete(&a.id, None);
        media.pump(Instant::now());
        assert_eq!(media.state(&a.id), MediaState::Paused);

        media.set_visible(&a.id, true);
        assert_eq!(media.state(&a.id), MediaState::Playing);
        media.set_visible(&a.id, false);
        assert_eq!(media.state(&a.id), MediaState::Paused);
    }

    #[test]
    fn long_item_oscillates_inside_window() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("long", 60.0);
        media.load(&a, true);
        host.complete(&a.id, Some(60.0));
        media.pump(Instant::now());

        let w = media.record(&a.id).and_then(|r| r.loop_window()).unwrap();
        assert_eq!((w.start, w.end), (27.5, 32.5));
        assert_eq!(host.position(&a.id), 27.5);

        // Simulate the host clock advancing playback several loops.
        for _ in 0..40 {
            let pos = host.advance_playback(&a.id, 0.5);
            media.pump(Instant::now());
            assert!((27.5..=32.5).contains(&pos));
            assert!((27.5..32.5).contains(&host.position(&a.id)));
        }
        assert!(host
            .calls(&a.id)
            .iter()
            .filter(|c| matches!(c, HandleCall::Seek(s) if *s == 27.5))
            .count()
            > 2);
    }

    #[test]
    fn late_ready_after_unload_is_ignored() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("a", 10.0);
        media.load(&a, true);
        assert!(media.unload(&a.id));

        host.complete(&a.id, Some(10.0));
        assert_eq!(media.pump(Instant::now()), 1);
        assert_eq!(media.stale_events(), 1);
        assert!(!media.contains(&a.id));
        assert_eq!(host.release_count(&a.id), 1);
    }

    #[test]
    fn failures_back_off_then_stick() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("bad", 10.0);
        let t0 = Instant::now();
        media.load(&a, true);

        host.fail(&a.id, "decode error");
        media.pump(t0);
        assert_eq!(media.state(&a.id), MediaState::Error);
        assert!(media.poll_retries(t0 + Duration::from_millis(50)).is_empty());
        assert_eq!(media.poll_retries(t0 + Duration::from_millis(100)), vec![a.id.clone()]);
        assert_eq!(media.state(&a.id), MediaState::Loading);

        host.fail(&a.id, "decode error");
        media.pump(t0 + Duration::from_millis(100));
        assert_eq!(media.next_retry_at(), Some(t0 + Duration::from_millis(300)));
        media.poll_retries(t0 + Duration::from_millis(300));

        host.fail(&a.id, "decode error");
        media.pump(t0 + Duration::from_millis(300));
        let r = media.record(&a.id).unwrap();
        assert!(r.is_sticky_error());
        assert_eq!(r.failures(), 3);
        assert!(media.poll_retries(t0 + Duration::from_secs(60)).is_empty());

        // Manual retry, then success.
        assert!(media.retry(&a.id));
        host.complete(&a.id, Some(10.0));
        media.pump(t0 + Duration::from_secs(61));
        assert_eq!(media.state(&a.id), MediaState::Playing);
        assert_eq!(media.counts().errors, 0);
    }

    #[test]
    fn superseded_attempt_is_stale() {
        let host = MockHost::new();
        let mut media = lifecycle(&host);
        let a = item("a", 10.0);
        let t0 = Instant::now();
        media.load(&a, true);
        let first = host.last_ticket(&a.id).unwrap();
        host.fail(&a.id, "net");
        media.pump(t0);
        media.poll_retries(t0 + Duration::from_secs(1));

        let outcome = media.handle_event(
            MediaEvent {
                ticket: first,
                kind: MediaEventKind::Ready { duration: None },
            },
            t0,
        );
        assert_eq!(outcome, EventOutcome::Stale);
        assert_eq!(media.state(&a.id), MediaState::Loading);
    }

    #[test]
    fn every_handle_released_exactly_once() {
        let host = MockHost::new();
        let ids: Vec<ItemId> = {
            let mut media = lifecycle(&host);
            let items: Vec<Item> = (0..5).map(|i| item(&format!("i{i}"), 5.0)).collect();
            for it in &items {
                media.load(it, true);
            }
            media.unload(&items[0].id);
            media.unload(&items[0].id);
            items.into_iter().map(|i| i.id).collect()
            // remaining four released when `media` drops
        };
        for id in &ids {
            assert_eq!(host.release_count(id), 1, "{id}");
        }
    }
}
