//! Subscription model -> entity mappers

use adwatch_core::entities::{Channel, ChannelSubscription, SubscriptionWithChannel};

use crate::models::{SubscriptionModel, SubscriptionWithChannelModel};

impl From<SubscriptionModel> for ChannelSubscription {
    fn from(model: SubscriptionModel) -> Self {
        ChannelSubscription {
            id: model.id,
            channel_id: model.channel_id,
            session_id: model.userbot_id,
            is_subscribed: model.is_subscribed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<SubscriptionWithChannelModel> for SubscriptionWithChannel {
    fn from(model: SubscriptionWithChannelModel) -> Self {
        SubscriptionWithChannel {
            subscription: ChannelSubscription {
                id: model.id,
                channel_id: model.channel_id,
                session_id: model.userbot_id,
                is_subscribed: model.is_subscribed,
                created_at: model.created_at,
                updated_at: model.updated_at,
            },
            channel: Channel {
                id: model.channel_id,
                telegram_id: model.telegram_id,
                title: model.title,
                main_username: model.main_username,
                link_subscription: model.link_subscription,
                is_private: model.is_private,
                created_at: model.channel_created_at,
                updated_at: model.channel_updated_at,
            },
        }
    }
}
