//! # Grid engine
//!
//! The public surface of vidgrid. [`GridEngine`] owns the item collection,
//! the rendered set, the resource slots and the media lifecycle, and runs
//! them as one pipeline per paint frame.
//!
//! A host wires it up roughly like this:
//!
//! ```rust,ignore
//! let mut engine = GridEngine::new(EngineConfig::default(), host)?
//!     .with_frame_requester(move || window.request_redraw());
//! engine.on_structural_op(|op| presentation.apply(op));
//! engine.set_items(items);
//!
//! // scroll handler: cheap, never runs the pipeline
//! engine.update_viewport(scroll_top, height);
//!
//! // paint callback
//! engine.on_frame();
//! ```
//!
//! Between frames, [`GridEngine::next_deadline`] tells the host when the
//! sweep or a retry needs another frame even if nothing scrolls.

pub mod engine;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use engine::*;
pub use error::*;
pub use scheduler::*;
pub use stats::*;

pub use vidgrid_core::{
    DomOperation, EngineConfig, FilterCriteria, GridGeometry, ImageRef, Item, ItemId, SortMode,
    SourceRef,
};
pub use vidgrid_media::{MediaHandle, MediaHost, MediaState};
