//! Message ingestion
//!
//! Runs once per inbound post on the owning session's task. Every failure is
//! logged and swallowed so one bad message never stops the session.

use adwatch_bus::{BusMessage, NewAdMessage, Topic};
use adwatch_core::entities::NewChannelNews;
use adwatch_core::traits::InsertOutcome;
use adwatch_core::{is_advertisement, IncomingMessage};
use tracing::{debug, info, instrument, warn};

use crate::context::FleetContext;

/// What happened to one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Channel is not tracked
    Untracked,
    NotAdvertisement,
    /// Already stored earlier
    Duplicate,
    /// Stored; `published` tells whether the notification went out
    Stored { published: bool },
    /// Store failure, logged
    Failed,
}

/// Classifies, stores and announces advertising posts
#[derive(Clone, Debug)]
pub struct MessageIngestor {
    ctx: FleetContext,
}

impl MessageIngestor {
    pub fn new(ctx: FleetContext) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, message), fields(chat_id = message.chat_id, message_id = message.message_id))]
    pub async fn handle(&self, session_id: i64, message: &IncomingMessage) -> IngestOutcome {
        let channel = match self.ctx.channels().find_by_telegram_id(message.chat_id.abs()).await {
            Ok(Some(channel)) => channel,
            Ok(None) => return IngestOutcome::Untracked,
            Err(e) => {
                warn!(session_id, error = %e, "Channel lookup failed");
                return IngestOutcome::Failed;
            }
        };

        if !is_advertisement(&message.text) {
            return IngestOutcome::NotAdvertisement;
        }

        let news = NewChannelNews {
            channel_id: channel.id,
            message_id: message.message_id,
            message: message.text.clone(),
        };
        match self.ctx.news().insert(&news).await {
            Ok(InsertOutcome::Inserted(_)) => {}
            Ok(InsertOutcome::Duplicate) => {
                debug!(channel_id = channel.id, "Post already stored");
                return IngestOutcome::Duplicate;
            }
            Err(e) => {
                warn!(session_id, channel_id = channel.id, error = %e, "Failed to store post");
                return IngestOutcome::Failed;
            }
        }

        let notification = BusMessage::NewAdMessage(NewAdMessage {
            channel_id: channel.telegram_id,
            channel_title: channel.title.clone(),
            channel_link: channel.public_link(),
            message_id: message.message_id,
            message_text: message.text.clone(),
        });
        let published = match self.ctx.bus().publish(&Topic::NewAd, &notification).await {
            Ok(_) => true,
            Err(e) => {
                warn!(channel_id = channel.id, error = %e, "Failed to publish new-ad notification");
                false
            }
        };

        info!(
            session_id,
            channel_id = channel.id,
            title = %channel.title,
            "Advertising post stored"
        );
        IngestOutcome::Stored { published }
    }
}
