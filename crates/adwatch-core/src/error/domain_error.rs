//! Domain errors - error types for the domain layer

use thiserror::Error;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Channel not found: {0}")]
    ChannelNotFound(i64),

    #[error("Subscription not found: channel {channel_id}, session {session_id}")]
    SubscriptionNotFound { channel_id: i64, session_id: i64 },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid channel link: {0}")]
    InvalidLink(String),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("Phone number already registered: {0}")]
    PhoneAlreadyExists(String),

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("No userbot available")]
    NoSessionAvailable,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Stable error code for logs and bus payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "UNKNOWN_SESSION",
            Self::ChannelNotFound(_) => "UNKNOWN_CHANNEL",
            Self::SubscriptionNotFound { .. } => "UNKNOWN_SUBSCRIPTION",
            Self::InvalidLink(_) => "INVALID_LINK",
            Self::PhoneAlreadyExists(_) => "PHONE_ALREADY_EXISTS",
            Self::NoSessionAvailable => "NO_SESSION_AVAILABLE",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::ChannelNotFound(_) | Self::SubscriptionNotFound { .. }
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::PhoneAlreadyExists(_))
    }
}
