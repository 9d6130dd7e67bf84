use bitflags::bitflags;
use serde::Serialize;

/// Engine counters. Computed on demand by
/// [`GridEngine::get_stats`](crate::GridEngine::get_stats) and pushed to the
/// stats callback after ticks that change them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GridStats {
    /// Ids holding a live resource slot.
    pub admitted: usize,
    /// Items in the visible range.
    pub visible: usize,
    /// Visible items still waiting for a slot.
    pub deferred: usize,
    /// Buffered, off-screen items waiting for a slot.
    pub deferred_offscreen: usize,
    /// Items in an error state, retrying or sticky.
    pub errors: usize,
    pub total_items: usize,
    /// Items passing the current filter; the grid lays out this many.
    pub shown: usize,
    /// Presentation nodes currently placed.
    pub rendered: usize,
    pub loading: usize,
    pub playing: usize,
    pub paused: usize,
    pub thumbnails_cached: usize,
    pub evictions: u64,
    pub stale_completions: u64,
    pub sweeps: u64,
}

impl GridStats {
    /// Admissions are waiting on the cap.
    pub fn is_exhausted(&self) -> bool {
        self.deferred + self.deferred_offscreen > 0
    }
}

bitflags! {
    /// How the presentation layer should dress an item.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ItemDecoration: u8 {
        const FAVORITE = 1 << 0;
        /// Cover the item with its cached still.
        const THUMBNAIL = 1 << 1;
        const LOADING = 1 << 2;
        const PLAYING = 1 << 3;
        const ERROR = 1 << 4;
        /// Error is sticky; show a retry affordance.
        const RETRYABLE = 1 << 5;
    }
}
