//! Channel model -> entity mapper

use adwatch_core::entities::Channel;

use crate::models::ChannelModel;

impl From<ChannelModel> for Channel {
    fn from(model: ChannelModel) -> Self {
        Channel {
            id: model.id,
            telegram_id: model.telegram_id,
            title: model.title,
            main_username: model.main_username,
            link_subscription: model.link_subscription,
            is_private: model.is_private,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
