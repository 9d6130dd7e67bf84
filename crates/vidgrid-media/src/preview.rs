use serde::{Deserialize, Serialize};
use vidgrid_core::EngineConfig;

/// Seconds of slack before a position below the window counts as a jump.
const REWIND_TOLERANCE: f64 = 0.25;

/// The looped span of a long item, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoopWindow {
    pub start: f64,
    pub end: f64,
}

impl LoopWindow {
    /// `width` seconds centered on the midpoint, clamped to `[0, duration]`.
    pub fn centered(duration: f64, width: f64) -> Self {
        let mid = duration / 2.0;
        let half = width / 2.0;
        Self {
            start: (mid - half).max(0.0),
            end: (mid + half).min(duration),
        }
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }

    /// Where to seek for a reported `position`, if anywhere.
    pub fn seek_target(&self, position: f64) -> Option<f64> {
        if position >= self.end || position < self.start - REWIND_TOLERANCE {
            Some(self.start)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Loop a window around the midpoint.
    PreviewLoop(LoopWindow),
    /// Play start to end and let the host loop.
    NativeLoop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackPolicy {
    pub long_item_threshold: f64,
    pub preview_window: f64,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl PlaybackPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            long_item_threshold: config.long_item_threshold_seconds,
            preview_window: config.preview_window_seconds,
        }
    }

    pub fn mode_for(&self, duration: Option<f64>) -> PlaybackMode {
        match duration {
            Some(d) if d.is_finite() && d > self.long_item_threshold => {
                PlaybackMode::PreviewLoop(LoopWindow::centered(d, self.preview_window))
            }
            _ => PlaybackMode::NativeLoop,
        }
    }

    /// Where a thumbnail should be taken from: the start of the preview for
    /// long items, a tenth of the way in otherwise.
    pub fn thumbnail_timestamp(&self, duration: Option<f64>) -> f64 {
        match self.mode_for(duration) {
            PlaybackMode::PreviewLoop(w) => w.start,
            PlaybackMode::NativeLoop => duration.filter(|d| d.is_finite()).map_or(0.0, |d| d * 0.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sixty_second_item_loops_around_midpoint() {
        let policy = PlaybackPolicy {
            long_item_threshold: 30.0,
            preview_window: 5.0,
        };
        let PlaybackMode::PreviewLoop(w) = policy.mode_for(Some(60.0)) else {
            panic!("expected a preview loop");
        };
        assert_eq!(w, LoopWindow { start: 27.5, end: 32.5 });
        assert_eq!(w.seek_target(32.5), Some(27.5));
        assert_eq!(w.seek_target(30.0), None);
        assert_eq!(w.seek_target(3.0), Some(27.5));
    }

    #[test]
    fn short_and_unknown_durations_use_native_loop() {
        let policy = PlaybackPolicy::default();
        assert_eq!(policy.mode_for(Some(12.0)), PlaybackMode::NativeLoop);
        assert_eq!(policy.mode_for(Some(30.0)), PlaybackMode::NativeLoop);
        assert_eq!(policy.mode_for(None), PlaybackMode::NativeLoop);
        assert_eq!(policy.mode_for(Some(f64::INFINITY)), PlaybackMode::NativeLoop);
    }

    #[test]
    fn window_wider_than_item_is_clamped() {
        let w = LoopWindow::centered(4.0, 10.0);
        assert_eq!(w, LoopWindow { start: 0.0, end: 4.0 });
    }

    #[test]
    fn thumbnail_timestamps() {
        let policy = PlaybackPolicy::default();
        assert_eq!(policy.thumbnail_timestamp(Some(60.0)), 27.5);
        assert_eq!(policy.thumbnail_timestamp(Some(10.0)), 1.0);
        assert_eq!(policy.thumbnail_timestamp(None), 0.0);
    }
}
