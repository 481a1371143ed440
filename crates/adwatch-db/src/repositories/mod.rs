//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in adwatch-core.

mod channel;
mod error;
mod news;
mod session;
mod subscription;

pub use channel::PgChannelRepository;
pub use news::PgNewsRepository;
pub use session::PgSessionRepository;
pub use subscription::PgSubscriptionRepository;
