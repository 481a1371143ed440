//! Fleet error types

use adwatch_bus::BusError;
use adwatch_common::AppError;
use adwatch_core::{ClientError, DomainError};

/// Errors surfaced by fleet components
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Store error: {0}")]
    Store(#[from] DomainError),

    #[error("Telegram error: {0}")]
    Client(#[from] ClientError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Fleet core is not running")]
    Stopped,
}

/// Result type for fleet operations
pub type FleetResult<T> = Result<T, FleetError>;

impl From<FleetError> for AppError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::Store(e) => Self::Domain(e),
            FleetError::Client(e) => Self::Telegram(e),
            FleetError::Bus(e) => Self::Bus(e.to_string()),
            FleetError::Stopped => Self::Fleet("Fleet core is not running".to_string()),
        }
    }
}
