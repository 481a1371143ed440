//! Channel link parsing
//!
//! Accepted forms: `t.me/<handle>`, `https://t.me/<handle>`, `@<handle>`, `<handle>`,
//! `t.me/+<hash>`, `https://t.me/+<hash>` and the legacy `t.me/joinchat/<hash>`.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DomainError;

static HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]{2,31}$").expect("valid regex")
});

static HASH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]{4,64}$").expect("valid regex")
});

static SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,;]+").expect("valid regex"));

const HOSTS: &[&str] = &["t.me/", "telegram.me/", "telegram.dog/"];

/// A parsed channel link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelLink {
    /// Public channel reachable by handle
    Public { handle: String },
    /// Private channel reachable by invite hash
    Invite { hash: String },
}

impl ChannelLink {
    /// Parse a user-supplied link
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let invalid = || DomainError::InvalidLink(raw.to_string());

        let mut rest = raw.trim();
        for scheme in ["https://", "http://"] {
            if let Some(stripped) = rest.strip_prefix(scheme) {
                rest = stripped;
            }
        }
        rest = rest.strip_prefix("www.").unwrap_or(rest);
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let path = match HOSTS.iter().find_map(|host| rest.strip_prefix(host)) {
            Some(path) => path.trim_matches('/'),
            None if rest.contains('/') => return Err(invalid()),
            None => rest.strip_prefix('@').unwrap_or(rest),
        };

        if let Some(hash) = path
            .strip_prefix('+')
            .or_else(|| path.strip_prefix("joinchat/"))
        {
            let hash = hash.trim_end_matches('/');
            return if HASH_RE.is_match(hash) {
                Ok(Self::Invite { hash: hash.to_string() })
            } else {
                Err(invalid())
            };
        }

        // t.me/<handle>/<post id> points at a post inside the channel
        let handle = path.split('/').next().unwrap_or_default();
        if HANDLE_RE.is_match(handle) {
            Ok(Self::Public { handle: handle.to_string() })
        } else {
            Err(invalid())
        }
    }

    #[inline]
    pub fn is_invite(&self) -> bool {
        matches!(self, Self::Invite { .. })
    }

    /// Normalized https form
    pub fn canonical(&self) -> String {
        match self {
            Self::Public { handle } => format!("https://t.me/{handle}"),
            Self::Invite { hash } => format!("https://t.me/+{hash}"),
        }
    }
}

impl fmt::Display for ChannelLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Split free text into distinct links, keeping first-seen order
pub fn parse_channel_links(text: &str) -> Vec<String> {
    let mut links: Vec<String> = Vec::new();
    for token in SEPARATOR_RE.split(text).map(str::trim).filter(|t| !t.is_empty()) {
        if !links.iter().any(|l| l == token) {
            links.push(token.to_string());
        }
    }
    links
}
