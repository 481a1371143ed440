//! Bus topic definitions.
//!
//! Defines the topic naming conventions shared by the fleet and bot processes.

/// Topic the fleet listens on for subscribe requests
pub const SUBSCRIBE_TOPIC: &str = "userbot:subscribe";
/// Prefix of the per-request reply topic
pub const RESPONSE_TOPIC_PREFIX: &str = "bot:response:";
/// Topic carrying new-ad notifications to the bot
pub const NEW_AD_TOPIC: &str = "bot:new_ad";

/// Bus topics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Subscribe requests from the bot
    SubscribeRequests,
    /// Reply topic for one subscribe request
    Response(String),
    /// New-ad notifications
    NewAd,
    /// Custom topic name
    Custom(String),
}

impl Topic {
    /// Reply topic derived from a request id
    #[must_use]
    pub fn response(request_id: impl Into<String>) -> Self {
        Self::Response(request_id.into())
    }

    /// Create a custom topic
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Get the wire topic name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::SubscribeRequests => SUBSCRIBE_TOPIC.to_string(),
            Self::Response(id) => format!("{RESPONSE_TOPIC_PREFIX}{id}"),
            Self::NewAd => NEW_AD_TOPIC.to_string(),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a wire topic name back to a `Topic`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            SUBSCRIBE_TOPIC => Self::SubscribeRequests,
            NEW_AD_TOPIC => Self::NewAd,
            _ => match name.strip_prefix(RESPONSE_TOPIC_PREFIX) {
                Some(id) if !id.is_empty() => Self::Response(id.to_string()),
                _ => Self::Custom(name.to_string()),
            },
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
