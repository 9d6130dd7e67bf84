//! Recording host for tests.
//!
//! Every handle call is logged per item id. Loads never complete on their
//! own; the test decides when with [`MockHost::complete`] or
//! [`MockHost::fail`], which push the event the real host would send.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use vidgrid_core::{Item, ItemId, SourceRef};

use crate::error::LoadError;
use crate::handle::{LoadTicket, MediaEvent, MediaEventKind, MediaEvents, MediaHandle, MediaHost};

#[derive(Clone, Debug, PartialEq)]
pub enum HandleCall {
    SetSource(String),
    Play,
    Pause,
    Seek(f64),
    NativeLoop(bool),
    ClearSource,
    Release,
}

#[derive(Default)]
struct HandleLog {
    calls: Vec<HandleCall>,
    /// Load started and not answered yet.
    pending: Option<LoadTicket>,
    /// Attempt whose source is currently set.
    attached: Option<LoadTicket>,
    position: f64,
    events: Option<MediaEvents>,
    created: usize,
    releases: usize,
}

#[derive(Clone, Default)]
pub struct MockHost {
    logs: Arc<Mutex<HashMap<ItemId, HandleLog>>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self, id: &ItemId) -> Vec<HandleCall> {
        self.logs.lock().get(id).map(|l| l.calls.clone()).unwrap_or_default()
    }

    pub fn release_count(&self, id: &ItemId) -> usize {
        self.logs.lock().get(id).map_or(0, |l| l.releases)
    }

    pub fn created_count(&self, id: &ItemId) -> usize {
        self.logs.lock().get(id).map_or(0, |l| l.created)
    }

    /// Handles created and not yet released, across all ids.
    pub fn live_handles(&self) -> usize {
        self.logs.lock().values().map(|l| l.created - l.releases).sum()
    }

    pub fn last_ticket(&self, id: &ItemId) -> Option<LoadTicket> {
        self.logs.lock().get(id).and_then(|l| l.attached)
    }

    pub fn position(&self, id: &ItemId) -> f64 {
        self.logs.lock().get(id).map_or(0.0, |l| l.position)
    }

    /// Ids whose most recent load has not been answered yet.
    pub fn loading_ids(&self) -> Vec<ItemId> {
        let logs = self.logs.lock();
        let mut ids: Vec<ItemId> = logs
            .iter()
            .filter(|(_, l)| l.pending.is_some() && l.created > l.releases)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn send(&self, id: &ItemId, kind: MediaEventKind) -> bool {
        let mut logs = self.logs.lock();
        let Some(log) = logs.get_mut(id) else {
            return false;
        };
        let (Some(ticket), Some(events)) = (log.pending.take(), log.events.clone()) else {
            return false;
        };
        events.push(MediaEvent { ticket, kind });
        true
    }

    /// Reports the pending load of `id` as ready.
    pub fn complete(&self, id: &ItemId, duration: Option<f64>) -> bool {
        self.send(id, MediaEventKind::Ready { duration })
    }

    pub fn fail(&self, id: &ItemId, reason: &str) -> bool {
        self.send(id, MediaEventKind::Failed(LoadError::Failed(reason.to_string())))
    }

    /// Moves the playhead forward and reports the new position. Returns the
    /// reported position.
    pub fn advance_playback(&self, id: &ItemId, seconds: f64) -> f64 {
        let mut logs = self.logs.lock();
        let Some(log) = logs.get_mut(id) else {
            return 0.0;
        };
        log.position += seconds;
        let position = log.position;
        if let (Some(events), Some(ticket)) = (&log.events, log.attached) {
            events.push(MediaEvent {
                ticket,
                kind: MediaEventKind::TimeUpdate { position },
            });
        }
        position
    }
}

impl MediaHost for MockHost {
    fn create_handle(&mut self, item: &Item, events: MediaEvents) -> Box<dyn MediaHandle> {
        let mut logs = self.logs.lock();
        let log = logs.entry(item.id.clone()).or_default();
        log.created += 1;
        log.events = Some(events);
        Box::new(MockHandle {
            id: item.id.clone(),
            logs: self.logs.clone(),
        })
    }
}

struct MockHandle {
    id: ItemId,
    logs: Arc<Mutex<HashMap<ItemId, HandleLog>>>,
}

impl MockHandle {
    fn record(&self, call: HandleCall, f: impl FnOnce(&mut HandleLog)) {
        let mut logs = self.logs.lock();
        let log = logs.entry(self.id.clone()).or_default();
        log.calls.push(call);
        f(log);
    }
}

impl MediaHandle for MockHandle {
    fn set_source(&mut self, source: &SourceRef, ticket: LoadTicket) {
        self.record(HandleCall::SetSource(source.0.clone()), |l| {
            l.pending = Some(ticket);
            l.attached = Some(ticket);
            l.position = 0.0;
        });
    }

    fn play(&mut self) {
        self.record(HandleCall::Play, |_| {});
    }

    fn pause(&mut self) {
        self.record(HandleCall::Pause, |_| {});
    }

    fn seek(&mut self, seconds: f64) {
        self.record(HandleCall::Seek(seconds), |l| l.position = seconds);
    }

    fn set_native_loop(&mut self, looping: bool) {
        self.record(HandleCall::NativeLoop(looping), |_| {});
    }

    fn clear_source(&mut self) {
        // A load already in flight may still report back, like a real host.
        self.record(HandleCall::ClearSource, |l| l.attached = None);
    }

    fn release(&mut self) {
        self.record(HandleCall::Release, |l| l.releases += 1);
    }
}
