//! MTProto adapter backed by grammers
//!
//! Every grammers error is classified here, once, into [`ClientError`].

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use adwatch_core::{
    AccountInfo, ChannelInfo, ClientError, ClientFactory, ClientResult, IncomingMessage,
    InviteCheck, SessionCredential, UserClient, UserbotSession,
};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use grammers_client::types::Chat;
use grammers_client::{grammers_tl_types as tl, Client, Config, InitParams, InvocationError, Update};
use grammers_session::Session;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

fn classify(err: &InvocationError) -> ClientError {
    match err {
        InvocationError::Rpc(rpc) => ClientError::from_rpc_name(&rpc.name, err),
        other => ClientError::transient(other),
    }
}

fn chat_info(chat: &Chat) -> ChannelInfo {
    ChannelInfo {
        telegram_id: chat.id().abs(),
        title: chat.name().to_string(),
        username: chat.username().map(str::to_string),
    }
}

fn raw_chat_info(chat: &tl::enums::Chat) -> Option<ChannelInfo> {
    match chat {
        tl::enums::Chat::Channel(c) => Some(ChannelInfo {
            telegram_id: c.id,
            title: c.title.clone(),
            username: c.username.clone(),
        }),
        tl::enums::Chat::Chat(c) => Some(ChannelInfo {
            telegram_id: c.id,
            title: c.title.clone(),
            username: None,
        }),
        _ => None,
    }
}

fn chat_from_updates(updates: &tl::enums::Updates) -> Option<ChannelInfo> {
    let chats = match updates {
        tl::enums::Updates::Combined(data) => &data.chats,
        tl::enums::Updates::Updates(data) => &data.chats,
        _ => return None,
    };
    chats.iter().find_map(raw_chat_info)
}

/// Telethon string sessions: version `1`, then url-safe base64 of
/// dc id, IPv4 or IPv6 address, port and the 256-byte auth key
fn is_telethon_string(encoded: &str) -> bool {
    let Some(body) = encoded.trim().strip_prefix('1') else {
        return false;
    };
    URL_SAFE
        .decode(body)
        .is_ok_and(|bytes| matches!(bytes.len(), 263 | 275))
}

fn load_session(credential: &SessionCredential) -> ClientResult<Session> {
    match credential {
        SessionCredential::StringSession(encoded) if is_telethon_string(encoded) => {
            warn!("Telethon string session is not supported, re-authorize the account");
            Err(ClientError::NotAuthorized)
        }
        SessionCredential::StringSession(encoded) => {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| ClientError::transient(format!("undecodable session string: {e}")))?;
            Session::load(&bytes)
                .map_err(|e| ClientError::transient(format!("invalid session string: {e}")))
        }
        SessionCredential::File(path) => Session::load_file_or_create(path)
            .map_err(|e| ClientError::transient(format!("{}: {e}", path.display()))),
    }
}

/// Connected grammers client
pub struct GrammersClient {
    client: Client,
    session_file: Option<PathBuf>,
    connected: AtomicBool,
    stop: CancellationToken,
}

impl GrammersClient {
    fn new(client: Client, credential: &SessionCredential) -> Self {
        let session_file = match credential {
            SessionCredential::File(path) => Some(path.clone()),
            SessionCredential::StringSession(_) => None,
        };
        Self {
            client,
            session_file,
            connected: AtomicBool::new(true),
            stop: CancellationToken::new(),
        }
    }

    fn observe<T>(&self, result: Result<T, InvocationError>) -> ClientResult<T> {
        result.map_err(|e| {
            if !matches!(e, InvocationError::Rpc(_)) {
                self.connected.store(false, Ordering::Relaxed);
            }
            classify(&e)
        })
    }

    async fn resolve(&self, handle: &str) -> ClientResult<Chat> {
        self.observe(self.client.resolve_username(handle).await)?
            .ok_or_else(|| ClientError::InvalidLink(format!("@{handle} not found")))
    }
}

#[async_trait]
impl UserClient for GrammersClient {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed) && !self.stop.is_cancelled()
    }

    async fn reconnect(&self) -> ClientResult<()> {
        // grammers redials on the next request
        self.observe(self.client.get_me().await)?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn me(&self) -> ClientResult<AccountInfo> {
        let me = self.observe(self.client.get_me().await)?;
        self.connected.store(true, Ordering::Relaxed);
        Ok(AccountInfo {
            user_id: me.id(),
            display_name: me.full_name(),
            username: me.username().map(str::to_string),
        })
    }

    async fn resolve_public(&self, handle: &str) -> ClientResult<ChannelInfo> {
        self.resolve(handle).await.map(|chat| chat_info(&chat))
    }

    async fn join_public(&self, handle: &str) -> ClientResult<ChannelInfo> {
        let chat = self.resolve(handle).await?;
        self.observe(self.client.join_chat(chat.pack()).await)?;
        Ok(chat_info(&chat))
    }

    async fn import_invite(&self, hash: &str) -> ClientResult<ChannelInfo> {
        let request = tl::functions::messages::ImportChatInvite {
            hash: hash.to_string(),
        };
        let updates = self.observe(self.client.invoke(&request).await)?;
        chat_from_updates(&updates)
            .ok_or_else(|| ClientError::transient("joined, but no chat in the response"))
    }

    async fn check_invite(&self, hash: &str) -> ClientResult<InviteCheck> {
        let request = tl::functions::messages::CheckChatInvite {
            hash: hash.to_string(),
        };
        match self.observe(self.client.invoke(&request).await)? {
            tl::enums::ChatInvite::Already(already) => raw_chat_info(&already.chat)
                .map(InviteCheck::Member)
                .ok_or_else(|| ClientError::InvalidLink(format!("+{hash} is not a chat"))),
            tl::enums::ChatInvite::Invite(invite) => Ok(InviteCheck::NotMember {
                title: invite.title,
            }),
            tl::enums::ChatInvite::Peek(peek) => raw_chat_info(&peek.chat)
                .map(InviteCheck::Member)
                .ok_or_else(|| ClientError::InvalidLink(format!("+{hash} is not a chat"))),
        }
    }

    async fn run(&self, sink: mpsc::Sender<IncomingMessage>) -> ClientResult<()> {
        loop {
            let update = tokio::select! {
                () = self.stop.cancelled() => return Ok(()),
                update = self.client.next_update() => self.observe(update)?,
            };

            let Update::NewMessage(message) = update else {
                continue;
            };
            if message.outgoing() || !matches!(message.chat(), Chat::Channel(_)) {
                continue;
            }

            let incoming = IncomingMessage {
                chat_id: message.chat().id(),
                message_id: i64::from(message.id()),
                text: message.text().to_string(),
                date: message.date(),
            };
            if sink.send(incoming).await.is_err() {
                debug!("Message sink closed, leaving update loop");
                return Ok(());
            }
        }
    }

    async fn disconnect(&self) {
        self.stop.cancel();
        self.connected.store(false, Ordering::Relaxed);
        if let Some(path) = &self.session_file {
            if let Err(e) = self.client.session().save_to_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to save session file");
            }
        }
    }
}

/// Builds [`GrammersClient`]s from persisted sessions
#[derive(Debug, Default, Clone, Copy)]
pub struct GrammersFactory;

impl GrammersFactory {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClientFactory for GrammersFactory {
    async fn create(&self, session: &UserbotSession) -> ClientResult<Arc<dyn UserClient>> {
        let client = Client::connect(Config {
            session: load_session(&session.credential)?,
            api_id: session.api_id,
            api_hash: session.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(ClientError::transient)?;

        match client.is_authorized().await {
            Ok(true) => {}
            Ok(false) => return Err(ClientError::NotAuthorized),
            Err(e) => return Err(classify(&e)),
        }

        info!(
            session_id = session.id,
            string_session = session.credential.is_string_session(),
            "Telegram client connected"
        );
        Ok(Arc::new(GrammersClient::new(client, &session.credential)))
    }
}
