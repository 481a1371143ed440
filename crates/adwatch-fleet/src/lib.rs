//! # adwatch-fleet
//!
//! The userbot fleet: a pool of Telegram user sessions that join channels on
//! request, watch them for advertisements and survive bans by migrating their
//! channels to a healthy session.
//!
//! ## Components
//!
//! - [`FleetCore`] - session lifecycle, health monitor, ban handling
//! - [`SubscriptionHandler`] - serves subscribe requests
//! - [`LoadBalancer`] - picks the least-loaded eligible session
//! - [`MessageIngestor`] - classifies and stores channel posts
//! - [`MigrationHandler`] - moves a banned session's channels
//! - [`RequestListener`] - bus consumer for subscribe requests
//! - [`SessionAdmin`] - one-off authorization checks
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adwatch_fleet::{serve, FleetContext};
//!
//! let ctx = FleetContext::new(sessions, channels, subscriptions, news, bus, config.fleet);
//! serve(ctx, factory, shutdown).await?;
//! ```

pub mod admin;
pub mod balancer;
pub mod client;
pub mod context;
pub mod error;
pub mod fleet;
pub mod ingest;
pub mod listener;
pub mod migration;
pub mod server;
pub mod subscription;

pub use admin::{CheckOutcome, SessionAdmin};
pub use balancer::{pick_least_loaded, LoadBalancer};
pub use context::FleetContext;
pub use error::{FleetError, FleetResult};
pub use fleet::{ClientRegistry, FleetCore, FleetHandle, SessionReport};
pub use ingest::{IngestOutcome, MessageIngestor};
pub use listener::RequestListener;
pub use migration::{MigrationHandler, MigrationReport};
pub use server::{check_sessions, install_signal_handler, run, serve};
pub use subscription::{SubscriptionHandler, CLIENT_UNAVAILABLE, NO_USERBOT_AVAILABLE};
