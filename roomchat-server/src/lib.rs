//! `RoomChat` development and test server.
//!
//! Serves the HTTP history API and the WebSocket room channel that the
//! client expects from its backend collaborator.

pub mod config;
pub mod rooms;
pub mod server;
