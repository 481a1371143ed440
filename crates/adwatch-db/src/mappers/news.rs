//! Channel news model -> entity mapper

use adwatch_core::entities::ChannelNews;

use crate::models::ChannelNewsModel;

impl From<ChannelNewsModel> for ChannelNews {
    fn from(model: ChannelNewsModel) -> Self {
        ChannelNews {
            id: model.id,
            channel_id: model.channel_id,
            message_id: model.message_id,
            message: model.message,
            created_at: model.created_at,
        }
    }
}
