//! `RoomChat` development server — HTTP history API plus WebSocket rooms.
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000
//! cargo run --bin roomchat-server
//!
//! # Run on a custom address
//! cargo run --bin roomchat-server -- --bind 127.0.0.1:8080
//! ```

use std::sync::Arc;

use clap::Parser;

use roomchat_server::config::{ServerCliArgs, ServerConfig};
use roomchat_server::server::{self, ServerState};

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting roomchat server");

    let state = Arc::new(ServerState::new());
    for name in &config.rooms {
        if let Err(e) = state.rooms.create_room(name, vec![]).await {
            tracing::warn!(room = name, err = %e, "could not seed room");
        }
    }

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "server listening");
            if let Err(e) = handle.await {
                tracing::error!(err = %e, "server task failed");
            }
        }
        Err(e) => {
            tracing::error!(err = %e, "failed to start server");
            std::process::exit(1);
        }
    }
}
