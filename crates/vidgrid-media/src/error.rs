use thiserror::Error;

/// Why a host failed to load a source. Contained inside the lifecycle;
/// surfaces only as an item's error state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("load failed: {0}")]
    Failed(String),

    #[error("unsupported media: {0}")]
    Unsupported(String),

    #[error("load aborted")]
    Aborted,
}
