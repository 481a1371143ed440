//! Model → entity mappers

mod channel;
mod news;
mod session;
mod subscription;
