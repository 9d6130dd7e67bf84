use thiserror::Error;
use vidgrid_core::{ConfigError, ItemId};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no item with id {0} in the current collection")]
    UnknownItem(ItemId),

    #[error("item {0} is not waiting for a manual retry")]
    NotRetryable(ItemId),

    #[error("no item source attached")]
    NoSource,
}
