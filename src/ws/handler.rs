//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{ArenaInput, ArenaOutput};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    info!(client_id = %client_id, "New observer connection");

    let (mut ws_sink, ws_stream) = socket.split();

    // Subscribe before greeting so no replication sent after the welcome is missed
    let output_rx = state.arena.subscribe();

    let welcome = ServerMsg::Welcome {
        client_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(client_id = %client_id, error = %e, "Failed to send welcome");
        return;
    }

    // Spectators get the existing characters without having to join
    let sync = ArenaInput {
        client_id,
        msg: ClientMsg::Sync,
        received_at: unix_millis(),
    };
    if state.arena.input_tx.send(sync).await.is_err() {
        error!(client_id = %client_id, "Arena input channel closed");
        return;
    }

    run_session(
        client_id,
        ws_sink,
        ws_stream,
        state.arena.input_tx.clone(),
        output_rx,
    )
    .await;

    info!(client_id = %client_id, "Observer connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    client_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<ArenaInput>,
    mut output_rx: broadcast::Receiver<ArenaOutput>,
) {
    let rate_limiter = ConnectionRateLimiter::default();

    // Spawn writer task: arena output -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match output_rx.recv().await {
                Ok(output) => {
                    if !output.is_for(client_id) {
                        continue;
                    }
                    if let Err(e) = send_msg(&mut ws_sink, &output.msg).await {
                        debug!(client_id = %client_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // Skipped replication is not resent; the next change of each field heals it
                    warn!(
                        client_id = %client_id,
                        lagged_count = n,
                        "Observer lagged, skipping {} messages", n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(client_id = %client_id, "Arena channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(client_id = %client_id, "Rate limited client message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let input = ArenaInput {
                            client_id,
                            msg,
                            received_at: unix_millis(),
                        };

                        if input_tx.send(input).await.is_err() {
                            debug!(client_id = %client_id, "Arena input channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(client_id = %client_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(client_id = %client_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(client_id = %client_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Despawn the character this connection controlled
    let _ = input_tx
        .send(ArenaInput {
            client_id,
            msg: ClientMsg::Leave,
            received_at: unix_millis(),
        })
        .await;

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
