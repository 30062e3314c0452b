use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use maze_chase_server::config::GameConfig;
use maze_chase_server::error::ServerError;
use maze_chase_server::server_utils::resolve_static_dir;
use maze_chase_server::session::ServerContext;
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tower_http::services::{ServeDir, ServeFile};

type SharedContext = Arc<Mutex<ServerContext>>;

#[derive(Clone)]
struct AppState {
    context: SharedContext,
    index_file: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiplayer maze-chase game server")]
struct Args {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
    /// Directory holding the browser client (must contain index.html).
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,
    /// JSON file overriding game tunables.
    #[arg(long, env = "GAME_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    if let Err(err) = run(args).await {
        tracing::error!(error = %err, "server stopped");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = GameConfig::load(args.config.as_deref())?;
    let context = Arc::new(Mutex::new(ServerContext::new(config, rand::random())));
    start_tick_loop(context.clone());

    let static_dir = resolve_static_dir(args.static_dir.as_deref());
    let state = AppState {
        context,
        index_file: static_dir.as_ref().map(|dir| dir.join("index.html")),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .route("/", get(root_handler))
        .with_state(state);

    let app = if let Some(static_dir) = static_dir {
        tracing::info!(root = %static_dir.display(), "serving static files");
        let index_file = static_dir.join("index.html");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::warn!("static file root not found; only the websocket endpoint is served");
        app
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.map_err(ServerError::Serve)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state.context, socket))
}

/// Browsers open the socket on the page origin itself, so `/` is both the
/// upgrade endpoint and the client page.
async fn root_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    if let Ok(ws) = ws {
        return ws
            .on_upgrade(move |socket| handle_socket(state.context, socket))
            .into_response();
    }
    let Some(index_file) = state.index_file else {
        return (StatusCode::NOT_FOUND, "client not built").into_response();
    };
    match tokio::fs::read_to_string(&index_file).await {
        Ok(body) => Html(body).into_response(),
        Err(err) => {
            tracing::warn!(path = %index_file.display(), error = %err, "failed to read index");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn handle_socket(context: SharedContext, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<String>(256);
    let client_id = context.lock().await.connect(tx);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };
        match message {
            Message::Text(raw) => {
                context.lock().await.handle_message(&client_id, raw.as_str());
            }
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => context.lock().await.handle_message(&client_id, text),
                Err(_) => tracing::warn!(client_id, "dropping non-utf8 frame"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Dropping the context's sender closes the writer's queue.
    context.lock().await.disconnect(&client_id);
    let _ = writer.await;
}

/// Fixed simulated step per tick; only the wall-clock wait follows the
/// current game speed.
fn start_tick_loop(context: SharedContext) {
    tokio::spawn(async move {
        let mut period = context.lock().await.tick_period();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let next_period = {
                let mut guard = context.lock().await;
                guard.tick();
                guard.tick_period()
            };
            if next_period != period {
                period = next_period;
                interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                tracing::debug!(?period, "tick period changed");
            }
        }
    });
}
