//! Viewport math.
//!
//! Pure functions from scroll state and [`GridGeometry`] to item index
//! ranges. Nothing here is cached between ticks: every tick recomputes from
//! the latest geometry, so a column change in the middle of a scroll burst
//! can never mix row sizes.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::geometry::GridGeometry;

/// Rows assumed visible before the host has reported a layout.
pub const DEFAULT_VISIBLE_ROW_ESTIMATE: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub scroll_top: f64,
    pub viewport_height: f64,
}

impl ViewportState {
    pub fn new(scroll_top: f64, viewport_height: f64) -> Self {
        Self {
            scroll_top,
            viewport_height,
        }
    }

    /// A viewport with no usable height means layout has not happened yet.
    pub fn has_layout(&self) -> bool {
        self.viewport_height.is_finite() && self.viewport_height > 0.0
    }
}

/// End-exclusive item index ranges for one tick. `visible` always lies
/// inside `buffered`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewportRanges {
    pub visible: Range<usize>,
    pub buffered: Range<usize>,
}

impl ViewportRanges {
    pub fn is_empty(&self) -> bool {
        self.buffered.is_empty()
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    /// Midpoint of the visible range in index space. Distance from it drives
    /// admission priority and eviction tie-breaks.
    pub fn visible_center(&self) -> f64 {
        if self.visible.is_empty() {
            self.visible.start as f64
        } else {
            (self.visible.start + self.visible.end - 1) as f64 / 2.0
        }
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }
}

/// Computes the visible and buffered index ranges.
///
/// Rows are `floor(scroll_top / item_height)` through the row under the
/// bottom edge of the viewport, inclusive. The buffered range adds
/// `buffer_rows` on each side; both are clamped to the collection.
///
/// With no layout yet (`viewport` is `None` or has zero height) the first
/// `items_per_row * (2 * buffer_rows + row_estimate)` items are returned so
/// the first frame is never blank.
pub fn compute_ranges(
    viewport: Option<&ViewportState>,
    geometry: &GridGeometry,
    row_estimate: usize,
) -> ViewportRanges {
    let total_rows = geometry.total_rows();
    if total_rows == 0 {
        return ViewportRanges::default();
    }

    let (start_row, end_row) = match viewport.filter(|v| v.has_layout()) {
        Some(v) => {
            let top = if v.scroll_top.is_finite() {
                v.scroll_top.max(0.0)
            } else {
                0.0
            };
            let first = (top / geometry.item_height).floor() as usize;
            let last = ((top + v.viewport_height) / geometry.item_height).floor() as usize;
            let first = first.min(total_rows.saturating_sub(1));
            (first, last.saturating_add(1).clamp(first + 1, total_rows))
        }
        None => {
            // No layout: the buffer margin sits below the estimate instead of
            // above it, since there is nothing above row 0.
            let rows = row_estimate.max(1);
            (0, rows.min(total_rows))
        }
    };

    let buffered_start_row = start_row.saturating_sub(geometry.buffer_rows);
    let buffered_end_row = if viewport.is_some_and(|v| v.has_layout()) {
        end_row.saturating_add(geometry.buffer_rows).min(total_rows)
    } else {
        end_row
            .saturating_add(2 * geometry.buffer_rows)
            .min(total_rows)
    };

    ViewportRanges {
        visible: geometry.row_start(start_row)..geometry.row_start(end_row),
        buffered: geometry.row_start(buffered_start_row)..geometry.row_start(buffered_end_row),
    }
}

/// The predictive thumbnail window: the buffered range grown by one more
/// buffer zone on each side.
pub fn prefetch_range(ranges: &ViewportRanges, geometry: &GridGeometry) -> Range<usize> {
    if ranges.buffered.is_empty() {
        return 0..0;
    }
    let zone = geometry.buffer_rows.max(1);
    let first_row = geometry.row_of(ranges.buffered.start).saturating_sub(zone);
    let last_row = geometry
        .row_of(ranges.buffered.end - 1)
        .saturating_add(zone + 1)
        .min(geometry.total_rows());
    geometry.row_start(first_row)..geometry.row_start(last_row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(total: usize) -> GridGeometry {
        GridGeometry::new(300.0, 4, 2).unwrap().with_total_count(total)
    }

    #[test]
    fn top_of_large_grid() {
        let r = compute_ranges(Some(&ViewportState::new(0.0, 900.0)), &geometry(10_000), 3);
        // rows 0..=3 visible, rows 0..=5 buffered
        assert_eq!(r.visible, 0..16);
        assert_eq!(r.buffered, 0..24);
    }

    #[test]
    fn middle_of_grid_buffers_both_sides() {
        let r = compute_ranges(Some(&ViewportState::new(9000.0, 900.0)), &geometry(10_000), 3);
        assert_eq!(r.visible, 120..136);
        assert_eq!(r.buffered, 112..144);
        assert_eq!(r.visible_center(), 127.5);
    }

    #[test]
    fn partial_rows_count_as_visible() {
        let r = compute_ranges(Some(&ViewportState::new(150.0, 900.0)), &geometry(10_000), 3);
        assert_eq!(r.visible, 0..16);
        assert_eq!(r.buffered, 0..24);
    }

    #[test]
    fn empty_collection_has_empty_ranges() {
        let r = compute_ranges(Some(&ViewportState::new(0.0, 900.0)), &geometry(0), 3);
        assert!(r.visible.is_empty());
        assert!(r.buffered.is_empty());
    }

    #[test]
    fn small_collection_renders_everything() {
        let r = compute_ranges(Some(&ViewportState::new(0.0, 900.0)), &geometry(6), 3);
        assert_eq!(r.visible, 0..6);
        assert_eq!(r.buffered, 0..6);
    }

    #[test]
    fn scrolled_past_the_end_clamps() {
        let r = compute_ranges(Some(&ViewportState::new(1e9, 900.0)), &geometry(10), 3);
        assert_eq!(r.visible, 8..10);
        assert_eq!(r.buffered, 0..10);
    }

    #[test]
    fn no_layout_uses_row_estimate() {
        let g = geometry(10_000);
        let r = compute_ranges(None, &g, 3);
        assert_eq!(r.buffered.len(), 4 * (2 * 2 + 3));
        let r2 = compute_ranges(Some(&ViewportState::new(0.0, 0.0)), &g, 3);
        assert_eq!(r, r2);
    }

    #[test]
    fn prefetch_extends_one_zone() {
        let g = geometry(10_000);
        let r = compute_ranges(Some(&ViewportState::new(9000.0, 900.0)), &g, 3);
        assert_eq!(prefetch_range(&r, &g), 104..152);
    }
}
