//! CodeBoard WebSocket Server
//!
//! Hosts shared rooms (whiteboard + code buffer) over WebSocket.
//!
//! ## Protocol
//!
//! Every text frame is one JSON event tagged by `type`:
//! ```json
//! { "type": "join", "roomId": "r1", "username": "Alice" }
//! { "type": "whiteboard-begin", "roomId": "r1", "point": { "x": 0, "y": 0 } }
//! { "type": "code-change", "roomId": "r1", "code": "print(1)" }
//! ```
//! See [`codeboard_core::protocol`] for the full event set.

pub mod config;
pub mod event_loop;
pub mod transport;

use std::io;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use config::{ConfigError, ServerConfig};
use event_loop::{CommandTx, ConnectionCommand};
use transport::WsTransport;

/// How long a single outbound write may block before the peer is dropped.
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Invalid CORS origin {0:?}")]
    CorsOrigin(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Shared application state
struct AppState {
    commands: CommandTx,
    transport: WsTransport,
}

/// Build the HTTP router and start the event loop behind it.
pub fn router(config: &ServerConfig) -> Result<Router, ServerError> {
    let transport = WsTransport::new();
    let (commands, _event_loop) = event_loop::spawn(transport.clone(), config.coordinator);
    let state = Arc::new(AppState { commands, transport });

    let cors = match &config.cors_origin {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|_| ServerError::CorsOrigin(origin.clone()))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET])
        }
        None => CorsLayer::permissive(),
    };

    Ok(Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve on an already-bound listener until the process ends.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<(), ServerError> {
    let app = router(config)?;
    let addr = listener.local_addr()?;
    info!("CodeBoard server listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind the configured address and serve.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    serve(listener, &config).await
}

/// Index page
async fn index() -> &'static str {
    "CodeBoard Server - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4().to_string();
    info!("New connection: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let mut outgoing = state.transport.register(&connection_id);

    loop {
        tokio::select! {
            // Frames from the client go to the event loop
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let command = ConnectionCommand::Frame {
                            from: connection_id.clone(),
                            text: text.as_str().to_owned(),
                        };
                        if state.commands.send(command).await.is_err() {
                            warn!("Event loop gone, closing {}", connection_id);
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", connection_id);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }

            // Events routed to this connection
            frame = outgoing.recv() => {
                match frame {
                    Some(frame) => {
                        match timeout(WRITE_TIMEOUT, sender.send(Message::Text(frame))).await {
                            Ok(Ok(())) => {}
                            Ok(Err(_)) => break,
                            Err(_) => {
                                warn!("Write to {} timed out", connection_id);
                                break;
                            }
                        }
                    }
                    // Dropped by the transport as a lagging peer
                    None => break,
                }
            }
        }
    }

    // The event loop unregisters the socket after fanning out the departure
    let _ = state
        .commands
        .send(ConnectionCommand::Disconnect {
            from: connection_id.clone(),
        })
        .await;
    info!("Connection closed: {}", connection_id);
}
