use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Grid layout. Only changed by explicit resize / column-count operations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridGeometry {
    /// Row pitch in logical pixels.
    pub item_height: f64,
    pub items_per_row: usize,
    /// Rows kept rendered beyond the viewport on each side.
    pub buffer_rows: usize,
    /// Mirrors the item collection length; the engine overwrites it.
    pub total_count: usize,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            item_height: 300.0,
            items_per_row: 4,
            buffer_rows: 2,
            total_count: 0,
        }
    }
}

impl GridGeometry {
    pub fn new(item_height: f64, items_per_row: usize, buffer_rows: usize) -> Result<Self, ConfigError> {
        let g = Self {
            item_height,
            items_per_row,
            buffer_rows,
            total_count: 0,
        };
        g.validate()?;
        Ok(g)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            return Err(ConfigError::invalid(
                "item_height",
                format!("must be a positive number, got {}", self.item_height),
            ));
        }
        if self.items_per_row == 0 {
            return Err(ConfigError::invalid("items_per_row", "must be at least 1"));
        }
        Ok(())
    }

    pub fn with_total_count(mut self, total_count: usize) -> Self {
        self.total_count = total_count;
        self
    }

    pub fn total_rows(&self) -> usize {
        self.total_count.div_ceil(self.items_per_row.max(1))
    }

    pub fn row_of(&self, index: usize) -> usize {
        index / self.items_per_row.max(1)
    }

    /// First item index of `row`, clamped to the collection.
    pub fn row_start(&self, row: usize) -> usize {
        row.saturating_mul(self.items_per_row).min(self.total_count)
    }

    /// Total scrollable height.
    pub fn content_height(&self) -> f64 {
        self.total_rows() as f64 * self.item_height
    }

    /// Pixel offset of the top edge of the row holding `index`.
    pub fn offset_of(&self, index: usize) -> f64 {
        self.row_of(index) as f64 * self.item_height
    }
}
