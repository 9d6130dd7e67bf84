//! # Viewport-driven media grid core
//!
//! Pure building blocks of the grid engine. Nothing in this crate owns a
//! media resource or talks to a host; it decides *what* should be rendered
//! and *which* items may hold a live decoder.
//!
//! - [`viewport::compute_ranges`]: scroll state → visible and buffered
//!   index ranges.
//! - [`reconcile::reconcile`]: previous rendered set + new window →
//!   ordered `Add` / `Remove` / `Move` operations, the admission request and
//!   the eviction candidates.
//! - [`slots::SlotManager`]: the hard cap on live resources, LRU victims,
//!   deferral when only on-screen items are left.
//! - [`view::CollectionView`]: filter and sort order; grid positions are
//!   view positions.
//!
//! ```rust
//! use vidgrid_core::*;
//!
//! let geometry = GridGeometry::new(300.0, 4, 2).unwrap().with_total_count(10_000);
//! let ranges = compute_ranges(Some(&ViewportState::new(0.0, 900.0)), &geometry, 3);
//! assert_eq!(ranges.buffered, 0..24);
//!
//! let items = numbered_items(10_000);
//! let window: Vec<ItemId> = items[ranges.buffered.clone()].iter().map(|i| i.id.clone()).collect();
//! let rec = reconcile(&RenderedSet::new(), &window, ranges.buffered.start);
//! assert_eq!(rec.operations.len(), 24);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod geometry;
pub mod inbox;
pub mod item;
pub mod reconcile;
pub mod slots;
pub mod source;
pub mod view;
pub mod viewport;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use inbox::*;
pub use item::*;
pub use reconcile::*;
pub use slots::*;
pub use source::*;
pub use view::*;
pub use viewport::*;

pub mod tests;
