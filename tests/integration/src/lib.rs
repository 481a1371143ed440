//! Integration test utilities for the userbot fleet
//!
//! In-memory fakes of the store and the Telegram client, plus a harness that
//! runs a real fleet core over the in-process bus.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
