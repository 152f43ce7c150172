//! Per-connection handler: attach to the hub, then shuttle frames both ways.

use std::net::SocketAddr;

use callroom_core::{ClientEvent, Notification};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::RelayError;
use crate::hub::HubHandle;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Handle a single WebSocket connection until it closes.
pub async fn handle_connection(
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    hub: HubHandle,
    channel_capacity: usize,
) {
    let (mut sink, mut stream) = ws.split();
    let conn = hub.next_connection_id();

    // 1. Attach so this client starts receiving roster broadcasts.
    let (tx, mut rx) = mpsc::channel::<Notification>(channel_capacity);
    if hub.attach(conn, tx).await.is_err() {
        tracing::warn!(peer = %addr, "Hub unavailable, dropping connection");
        return;
    }
    tracing::info!(peer = %addr, %conn, "Client connected");

    // 2. Forwarding loop.
    loop {
        tokio::select! {
            // Notifications from the hub → this client's WebSocket
            notification = rx.recv() => {
                let Some(notification) = notification else {
                    // The hub dropped our sender: this client fell behind and was evicted.
                    tracing::info!(%conn, "Evicted by hub");
                    break;
                };
                if let Err(e) = send_notification(&mut sink, &notification).await {
                    tracing::debug!(%conn, error = %e, "Send failed");
                    break;
                }
            }

            // Frames from this client → hub
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        let delivered = match parse_frame(text.as_str()) {
                            Ok(event) => hub.event(conn, event).await,
                            Err(reply) => {
                                tracing::warn!(%conn, "Malformed event");
                                send_notification(&mut sink, &reply).await
                            }
                        };
                        if let Err(e) = delivered {
                            tracing::debug!(%conn, error = %e, "Forwarding failed");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(peer = %addr, error = %e, "WS error");
                        break;
                    }
                    // tungstenite answers pings itself; binary frames are ignored.
                    _ => {}
                }
            }
        }
    }

    // 3. Cleanup.
    tracing::info!(peer = %addr, %conn, "Client disconnected");
    if let Err(e) = hub.detach(conn).await {
        tracing::warn!(%conn, error = %e, "Detach failed");
    }
}

/// Parse one text frame. A malformed frame yields the `errorMsg` to send back.
pub fn parse_frame(text: &str) -> Result<ClientEvent, Notification> {
    serde_json::from_str(text).map_err(|e| Notification::ErrorMsg {
        message: format!("malformed event: {e}"),
    })
}

/// Send a notification as a JSON text frame.
async fn send_notification(
    sink: &mut WsSink,
    notification: &Notification,
) -> Result<(), RelayError> {
    let json = serde_json::to_string(notification)?;
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}
