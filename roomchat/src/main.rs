//! `RoomChat` — real-time chat room client.
//!
//! Launches the terminal front-end against a chat backend. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/roomchat/config.toml`).
//!
//! ```bash
//! # Against a local backend
//! cargo run --bin roomchat
//!
//! # Against a deployed backend
//! cargo run --bin roomchat -- --server-url https://chat.example.com \
//!     --socket-url wss://chat.example.com/ws --name alice --email a@example.com
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;

use roomchat::api::HttpRoomApi;
use roomchat::app::{Action, App, Screen};
use roomchat::channel::ws::WsConnector;
use roomchat::config::{CliArgs, ClientConfig};
use roomchat::identity::IdentityStore;
use roomchat::session::{SessionController, SessionEvent};
use roomchat::ui;
use roomchat_proto::user::User;

/// Controller type as assembled by the binary.
type Controller = SessionController<HttpRoomApi, WsConnector>;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    // Initialize logging before terminal setup (logs go to file, not stdout).
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("roomchat starting");

    // Resolve the user identity: stored session first, CLI sign-in second.
    let identity = IdentityStore::open().map_err(io::Error::other)?;
    let user = resolve_user(&identity, &cli).map_err(io::Error::other)?;
    tracing::info!(user = %user.id, name = %user.name, "signed in");

    let api = HttpRoomApi::new(config.base_url.clone()).with_identity(identity);
    let connector = WsConnector::new(config.socket_url.clone());
    let (controller, events) =
        SessionController::new(api, connector, user, config.session_config());
    let controller = Arc::new(controller);

    // Set up terminal.
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app.
    let result = run_app(&mut terminal, &controller, events, &config).await;

    // Restore terminal.
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    tracing::info!("roomchat exiting");
    result
}

/// Load the stored identity, or create one from the CLI sign-in flags.
fn resolve_user(
    identity: &IdentityStore,
    cli: &CliArgs,
) -> Result<User, roomchat::identity::IdentityError> {
    if let Some(user) = identity.load()? {
        return Ok(user);
    }
    let name = cli.name.clone().unwrap_or_else(|| "guest".to_string());
    let email = cli
        .email
        .clone()
        .unwrap_or_else(|| format!("{name}@localhost"));
    let user = User::new(uuid::Uuid::now_v7().to_string(), name, email);
    identity.save(&user)?;
    Ok(user)
}

/// Initialize file-based logging.
///
/// Logs are written to a file (never stdout, since ratatui owns the
/// terminal). Returns a [`WorkerGuard`] that must be held until shutdown to
/// ensure all buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("roomchat.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Main application loop.
async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    controller: &Arc<Controller>,
    mut events: mpsc::Receiver<SessionEvent>,
    config: &ClientConfig,
) -> io::Result<()> {
    let mut app = App::new(config.timestamp_format.clone());

    // Initial room list fetch.
    match controller.list_rooms().await {
        Ok(rooms) => app.on_rooms_loaded(rooms),
        Err(e) => app.set_notice(format!("could not fetch rooms: {e}")),
    }

    loop {
        // Step 1: apply queued inbound channel events and timers.
        controller.try_pump().await;
        controller.tick(Instant::now()).await;

        // Step 2: drain engine events (navigation, notices).
        drain_session_events(&mut app, &mut events);

        // Step 3: report the surface geometry and snapshot the view-state.
        let size = terminal.size()?;
        controller
            .mount_viewport(App::chat_viewport_height(size.height))
            .await;
        app.set_view(controller.view().await);

        // Step 4: draw.
        terminal.draw(|frame| ui::draw(frame, &app))?;

        // Step 5: poll for input.
        if event::poll(config.poll_timeout)?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if let Some(action) = app.handle_key_event(key) {
                dispatch(controller, &mut app, action).await;
            }
        }

        if app.should_quit {
            // Leaving the room closes the channel before exit.
            controller.leave_room().await;
            return Ok(());
        }
    }
}

/// Dispatch a user action to the session engine.
async fn dispatch(controller: &Arc<Controller>, app: &mut App, action: Action) {
    match action {
        Action::FetchRooms => match controller.list_rooms().await {
            Ok(rooms) => app.on_rooms_loaded(rooms),
            Err(e) => app.set_notice(format!("could not fetch rooms: {e}")),
        },
        Action::EnterRoom(name) => {
            // Entry fetches history over HTTP; run it off the UI loop.
            // Failures surface through SessionEvent::Notice.
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                let _ = controller.enter_room(&name).await;
            });
        }
        Action::LeaveRoom => controller.leave_room().await,
        Action::SendMessage(text) => {
            if let Err(e) = controller.send_message(&text).await {
                app.set_notice(format!("send failed: {e}"));
            }
        }
        Action::Keystroke => controller.keystroke(Instant::now()).await,
        Action::ScrollBy(delta) => controller.scroll_by(delta).await,
        Action::JumpToLatest => controller.jump_to_latest().await,
        Action::Quit => {}
    }
}

/// Drain all pending `SessionEvent`s and apply them to the app.
fn drain_session_events(app: &mut App, rx: &mut mpsc::Receiver<SessionEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            SessionEvent::RoomEntered { room, message_count } => {
                tracing::debug!(room = %room.name, message_count, "room entered");
                app.screen = Screen::Chat;
                app.notice = None;
            }
            SessionEvent::RoomLeft => {
                app.screen = Screen::RoomList;
            }
            SessionEvent::ConnectionLost => {
                app.set_notice("connection lost — leave and re-enter the room");
            }
            SessionEvent::Notice(notice) => {
                app.set_notice(notice);
            }
            SessionEvent::MessageAppended { .. } | SessionEvent::TypingChanged { .. } => {
                // Covered by the view-state snapshot on the next frame.
            }
        }
    }
}
