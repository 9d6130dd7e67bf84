use slotmap::new_key_type;
use vidgrid_core::{Inbox, Item, ItemId, SourceRef};

use crate::error::LoadError;

new_key_type! {
    /// Generation-checked key of a lifecycle record. A key outlives its
    /// record; lookups with it fail once the record is gone, even if the slot
    /// has been reused.
    pub struct RecordKey;
}

/// Identifies one load attempt. Hosts echo it back in every [`MediaEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub key: RecordKey,
    pub attempt: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MediaEventKind {
    /// Metadata is available; `duration` in seconds if the host knows it.
    Ready { duration: Option<f64> },
    Failed(LoadError),
    /// Playback position report, in seconds.
    TimeUpdate { position: f64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediaEvent {
    pub ticket: LoadTicket,
    pub kind: MediaEventKind,
}

pub type MediaEvents = Inbox<MediaEvent>;

/// A live, finite decoding resource owned by the host (a `<video>` element,
/// a platform player, a hardware decoder session).
///
/// `release` must actually return the resource to the host; dropping the
/// box is not enough.
pub trait MediaHandle {
    /// Starts an asynchronous load. Completion is reported through the event
    /// inbox the handle was created with, tagged with `ticket`.
    fn set_source(&mut self, source: &SourceRef, ticket: LoadTicket);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_native_loop(&mut self, looping: bool);
    fn clear_source(&mut self);
    fn release(&mut self);
}

pub trait MediaHost {
    fn create_handle(&mut self, item: &Item, events: MediaEvents) -> Box<dyn MediaHandle>;
}

/// Owns a handle and releases it exactly once: explicitly through
/// [`ResourceGuard::release`], or on drop as a fallback.
pub struct ResourceGuard {
    id: ItemId,
    handle: Option<Box<dyn MediaHandle>>,
}

impl ResourceGuard {
    pub fn new(id: ItemId, handle: Box<dyn MediaHandle>) -> Self {
        Self {
            id,
            handle: Some(handle),
        }
    }

    pub fn id(&self) -> &ItemId {
        &self.id
    }

    /// Runs `f` against the live handle. No-op after release.
    pub fn with<R>(&mut self, f: impl FnOnce(&mut dyn MediaHandle) -> R) -> Option<R> {
        match self.handle.as_deref_mut() {
            Some(h) => Some(f(h)),
            None => None,
        }
    }

    /// Stop, clear the source, release.
    pub fn release(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) -> bool {
        match self.handle.take() {
            Some(mut h) => {
                h.pause();
                h.clear_source();
                h.release();
                true
            }
            None => false,
        }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        if self.teardown() {
            log::warn!("media: handle for {} released on drop", self.id);
        }
    }
}
