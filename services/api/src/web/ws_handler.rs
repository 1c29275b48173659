//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a mint-workflow
//! WebSocket connection. It accepts the start message, spawns the workflow
//! task, forwards its progress messages, and relays cancellation.

use std::sync::Arc;

use academy_core::domain::Principal;
use academy_core::ports::PortError;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::web::{
    mint_task::{mint_process, MintRequest},
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, MintSessionState},
};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>, // from auth middleware
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, principal))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, principal: Principal) {
    info!("New WebSocket connection established for {}", principal);

    let (sender, mut receiver) = socket.split();
    let ws_sender = Arc::new(Mutex::new(sender));
    let mut session = MintSessionState::new(principal);
    let mut workflow_handle: Option<JoinHandle<()>> = None;
    let mut forward_handle: Option<JoinHandle<()>> = None;

    loop {
        let msg = match receiver.next().await {
            Some(Ok(msg)) => msg,
            _ => {
                info!("Client disconnected.");
                break;
            }
        };

        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::StartMint {
                    course_id,
                    module_id,
                    time_spent_minutes,
                    score,
                }) => {
                    if session.workflow_running {
                        warn!("StartMint received while a workflow is already running.");
                        send_error(&ws_sender, "A mint workflow is already running.").await;
                        continue;
                    }
                    session.workflow_running = true;

                    let request = MintRequest {
                        course_id,
                        module_id,
                        time_spent_minutes,
                        score,
                    };
                    let (progress_tx, progress_rx) = mpsc::channel::<ServerMessage>(32);

                    // Forward workflow progress to the socket.
                    forward_handle = Some(tokio::spawn(forward_progress(
                        progress_rx,
                        ws_sender.clone(),
                    )));

                    let task = {
                        let app_state = app_state.clone();
                        let principal = session.principal.clone();
                        let ws_sender = ws_sender.clone();
                        let token = session.cancellation_token.clone();
                        tokio::spawn(async move {
                            match mint_process(app_state, principal, request, progress_tx, token)
                                .await
                            {
                                Ok(outcome) => {
                                    info!("Mint workflow finished: {:?}", outcome);
                                }
                                Err(e) => {
                                    error!("Mint workflow failed: {:?}", e);
                                    send_error(&ws_sender, &workflow_error_message(&e)).await;
                                }
                            }
                        })
                    };
                    workflow_handle = Some(task);
                }
                Ok(ClientMessage::CancelMint) => {
                    info!("CancelMint received. Cancelling workflow.");
                    session.cancellation_token.cancel();
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Message::Close(_) => {
                info!("Client sent close message.");
                break;
            }
            _ => {}
        }
    }

    // Cleanup: the workflow does not outlive the connection.
    session.cancellation_token.cancel();
    if let Some(handle) = workflow_handle {
        handle.abort();
    }
    if let Some(handle) = forward_handle {
        handle.abort();
    }
    info!("WebSocket connection closed.");
}

/// Drains the workflow's progress channel into the socket.
async fn forward_progress(
    mut progress_rx: mpsc::Receiver<ServerMessage>,
    ws_sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
) {
    while let Some(message) = progress_rx.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize server message: {}", e);
                continue;
            }
        };
        if ws_sender
            .lock()
            .await
            .send(Message::Text(json.into()))
            .await
            .is_err()
        {
            warn!("Failed to forward progress message. Client may have disconnected.");
            break;
        }
    }
}

async fn send_error(ws_sender: &Arc<Mutex<SplitSink<WebSocket, Message>>>, message: &str) {
    let msg = ServerMessage::Error {
        message: message.to_string(),
    };
    if let Ok(json) = serde_json::to_string(&msg) {
        let _ = ws_sender.lock().await.send(Message::Text(json.into())).await;
    }
}

/// Maps a workflow failure to the client-facing error text.
fn workflow_error_message(error: &PortError) -> String {
    match error {
        PortError::Contract(e) => format!("The contract rejected the call: {}", e),
        PortError::NotFound(msg) => msg.clone(),
        _ => "The mint workflow failed unexpectedly.".to_string(),
    }
}
