//! Userbot model -> entity mapper

use std::path::Path;

use adwatch_core::entities::{SessionCredential, SessionLoad, SessionStatus, UserbotSession};

use crate::models::{SessionLoadModel, SessionModel};

impl SessionModel {
    /// Convert to the entity, resolving the credential against `sessions_dir`
    pub fn into_entity(self, sessions_dir: &Path) -> UserbotSession {
        let credential = SessionCredential::resolve(
            self.string_session.as_deref(),
            self.session_file.as_deref(),
            sessions_dir,
            self.id,
            &self.phone,
        );

        UserbotSession {
            id: self.id,
            name: self.name,
            phone: self.phone,
            api_id: self.api_id,
            api_hash: self.api_hash,
            credential,
            status: SessionStatus::parse(&self.status),
            is_active: self.is_active,
            max_channels: self.max_channels,
            last_error: self.last_error,
            last_activity: self.last_activity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl SessionLoadModel {
    pub fn into_entity(self, sessions_dir: &Path) -> SessionLoad {
        SessionLoad {
            session: self.session.into_entity(sessions_dir),
            subscribed: self.subscribed,
        }
    }
}
