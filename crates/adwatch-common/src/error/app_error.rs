//! Application error types
//!
//! Process-level error for startup and the long-lived service loops.

use adwatch_core::{ClientError, DomainError};
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Event bus error: {0}")]
    Bus(String),

    #[error("Telegram error: {0}")]
    Telegram(#[from] ClientError),

    #[error("Fleet error: {0}")]
    Fleet(String),

    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl AppError {
    /// Get error code for logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Bus(_) => "BUS_ERROR",
            Self::Telegram(ClientError::Banned(_)) => "SESSION_BANNED",
            Self::Telegram(_) => "TELEGRAM_ERROR",
            Self::Fleet(_) => "FLEET_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(e) => e.code(),
        }
    }

    /// Whether retrying the failed operation later can succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) | Self::Bus(_) => true,
            Self::Telegram(e) => matches!(e, ClientError::Transient(_)),
            Self::Domain(e) => matches!(e, DomainError::DatabaseError(_)),
            Self::Config(_) | Self::Fleet(_) | Self::Internal(_) => false,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(msg: impl fmt::Display) -> Self {
        Self::Config(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<crate::config::ConfigError> for AppError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
