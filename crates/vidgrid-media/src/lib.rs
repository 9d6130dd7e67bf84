//! # Media lifecycle
//!
//! Everything that touches a live decoding resource:
//!
//! - [`MediaHandle`] / [`MediaHost`]: the host's resource, behind a trait.
//! - [`ResourceGuard`]: releases a handle exactly once.
//! - [`MediaLifecycle`]: the per-item state machine (load, preview loop,
//!   retry with backoff, visibility pause, teardown).
//! - [`ThumbnailCache`]: stills shown while an item has no playing frame.
//!
//! Hosts report asynchronous results into [`MediaEvents`]; the lifecycle
//! applies them when the owner calls [`MediaLifecycle::pump`].

pub mod error;
pub mod handle;
pub mod lifecycle;
pub mod preview;
pub mod retry;
pub mod thumbnail;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::*;
pub use handle::*;
pub use lifecycle::*;
pub use preview::*;
pub use retry::*;
pub use thumbnail::*;
