//! Frame coalescing and the safety sweep.
//!
//! Scroll and resize events only mark the engine dirty and ask the host for
//! a frame. However many events land before the host paints, the pipeline
//! runs once, in [`GridEngine::on_frame`](crate::GridEngine::on_frame).

use std::time::Duration;

use bitflags::bitflags;
use web_time::Instant;

/// Budget of one 60 Hz frame. A tick over budget is logged.
pub const FRAME_BUDGET: Duration = Duration::from_micros(16_667);

/// Asks the host to call `on_frame` before its next paint
/// (`requestAnimationFrame`, `Window::request_redraw`, ...).
pub trait FrameRequester {
    fn request_frame(&self);
}

impl<F: Fn()> FrameRequester for F {
    fn request_frame(&self) {
        self()
    }
}

bitflags! {
    /// Why the next frame has work.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Dirty: u8 {
        const VIEWPORT = 1 << 0;
        const GEOMETRY = 1 << 1;
        const ITEMS = 1 << 2;
        const CONFIG = 1 << 3;
        /// A slot was freed outside the pipeline.
        const SLOTS = 1 << 4;
        /// Filter, sort order or hidden set changed.
        const VIEW = 1 << 5;
    }
}

#[derive(Default)]
pub struct FrameScheduler {
    dirty: Dirty,
    frame_pending: bool,
    requester: Option<Box<dyn FrameRequester>>,
    requested: u64,
    coalesced: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_requester(&mut self, requester: Box<dyn FrameRequester>) {
        self.requester = Some(requester);
        if !self.dirty.is_empty() {
            self.frame_pending = false;
            self.request();
        }
    }

    /// Marks work for the next frame, requesting one if none is pending.
    pub fn invalidate(&mut self, why: Dirty) {
        self.dirty |= why;
        if self.frame_pending {
            self.coalesced += 1;
        } else {
            self.request();
        }
    }

    fn request(&mut self) {
        self.frame_pending = true;
        self.requested += 1;
        if let Some(r) = &self.requester {
            r.request_frame();
        }
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty(&self) -> Dirty {
        self.dirty
    }

    /// Called at the start of a frame: takes the accumulated work.
    pub fn begin_frame(&mut self) -> Dirty {
        self.frame_pending = false;
        std::mem::take(&mut self.dirty)
    }

    /// Frames requested from the host so far.
    pub fn frames_requested(&self) -> u64 {
        self.requested
    }

    /// Invalidations folded into an already pending frame.
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}

/// The periodic safety sweep. Owned by the engine; stopped on drop.
#[derive(Clone, Debug)]
pub struct SweepTimer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl SweepTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.next_due.is_none() {
            self.next_due = Some(now + self.interval);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        if self.next_due.is_some() {
            self.next_due = Some(now + interval);
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Marks a sweep done and schedules the next one.
    pub fn fire(&mut self, now: Instant) {
        if self.next_due.is_some() {
            self.next_due = Some(now + self.interval);
        }
    }
}
