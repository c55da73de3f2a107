//! `RoomChat` — real-time chat room client library.

pub mod api;
pub mod app;
pub mod channel;
pub mod config;
pub mod identity;
pub mod session;
pub mod ui;
