//! # adwatch-db
//!
//! Database layer implementing repository traits with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! This crate provides PostgreSQL implementations for the repository traits
//! defined in `adwatch-core`:
//!
//! - Connection pool management and migrations
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adwatch_db::{create_pool, DatabaseConfig, PgSessionRepository};
//!
//! let pool = create_pool(&DatabaseConfig::from_env()).await?;
//! let sessions = PgSessionRepository::new(pool, "userbot/sessions");
//! ```

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, run_migrations, DatabaseConfig, PgPool};
pub use repositories::{
    PgChannelRepository, PgNewsRepository, PgSessionRepository, PgSubscriptionRepository,
};
