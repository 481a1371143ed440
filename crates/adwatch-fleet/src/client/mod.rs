//! Telegram client adapters

#[cfg(feature = "mtproto")]
mod mtproto;

#[cfg(feature = "mtproto")]
pub use mtproto::{GrammersClient, GrammersFactory};

use std::sync::Arc;

use adwatch_common::AppError;
use adwatch_core::ClientFactory;

/// Client factory compiled into this binary
#[cfg(feature = "mtproto")]
pub fn default_factory() -> Result<Arc<dyn ClientFactory>, AppError> {
    Ok(Arc::new(GrammersFactory::new()))
}

/// Client factory compiled into this binary
#[cfg(not(feature = "mtproto"))]
pub fn default_factory() -> Result<Arc<dyn ClientFactory>, AppError> {
    Err(AppError::config(
        "built without the `mtproto` feature; no Telegram client available",
    ))
}
