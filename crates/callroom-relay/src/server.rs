//! Accept loop: origin check during the handshake, then one task per client.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header, StatusCode};

use crate::config::RelayConfig;
use crate::connection::handle_connection;
use crate::hub;

/// Serve WebSocket clients on `listener` until the process exits.
pub async fn serve(listener: TcpListener, config: RelayConfig) {
    let (hub, _hub_task) = hub::spawn();

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let hub = hub.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    let callback =
                        |req: &Request, resp: Response| check_origin(&config, peer, req, resp);
                    match accept_hdr_async(stream, callback).await {
                        Ok(ws) => handle_connection(ws, peer, hub, config.channel_capacity).await,
                        Err(e) => {
                            tracing::warn!(peer = %peer, error = %e, "WS handshake failed");
                        }
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}

/// Reject browser handshakes from origins the config does not allow.
fn check_origin(
    config: &RelayConfig,
    peer: SocketAddr,
    req: &Request,
    resp: Response,
) -> Result<Response, ErrorResponse> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if config.allows_origin(origin) {
        return Ok(resp);
    }
    tracing::warn!(peer = %peer, origin = ?origin, "Origin rejected");
    let mut reject = ErrorResponse::new(Some("origin not allowed".into()));
    *reject.status_mut() = StatusCode::FORBIDDEN;
    Err(reject)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::HeaderValue;
    use tokio_tungstenite::tungstenite::{Error as WsError, Message};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start(config: RelayConfig) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, config));
        addr
    }

    async fn next_message(ws: &mut Client) -> Message {
        tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .unwrap()
    }

    async fn next_json(ws: &mut Client) -> Value {
        loop {
            if let Message::Text(text) = next_message(ws).await {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn send_text(ws: &mut Client, text: &str) {
        ws.send(Message::Text(text.to_string().into())).await.unwrap();
    }

    fn restricted() -> RelayConfig {
        RelayConfig {
            allowed_origins: vec!["https://game.example".into()],
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_and_changes_nothing() {
        let addr = start(RelayConfig::default()).await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        send_text(&mut ws, r#"{"type":"join"}"#).await;
        let reply = next_json(&mut ws).await;
        assert_eq!(reply["type"], "errorMsg");
        assert!(reply["message"].as_str().unwrap().starts_with("malformed event"));

        send_text(&mut ws, r#"{"type":"join","role":"player1"}"#).await;
        assert_eq!(
            next_json(&mut ws).await,
            json!({"type": "users", "users": [{"role": "player1", "busy": false}]})
        );
    }

    #[tokio::test]
    async fn binary_frames_are_ignored_and_pings_answered() {
        let addr = start(RelayConfig::default()).await;
        let (mut ws, _) = connect_async(format!("ws://{addr}")).await.unwrap();

        ws.send(Message::Binary(vec![1, 2, 3].into())).await.unwrap();
        ws.send(Message::Ping(b"are you there".to_vec().into())).await.unwrap();
        send_text(&mut ws, r#"{"type":"join","role":"host"}"#).await;

        let mut saw_pong = false;
        loop {
            match next_message(&mut ws).await {
                Message::Pong(data) => {
                    assert_eq!(&data[..], b"are you there");
                    saw_pong = true;
                }
                Message::Text(text) => {
                    let v: Value = serde_json::from_str(text.as_str()).unwrap();
                    assert_eq!(v["type"], "users", "binary frame produced {v}");
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_pong);
    }

    #[tokio::test]
    async fn disallowed_origin_is_rejected_with_403() {
        let addr = start(restricted()).await;
        let mut req = format!("ws://{addr}").into_client_request().unwrap();
        req.headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("https://evil.example"));

        match connect_async(req).await {
            Err(WsError::Http(resp)) => assert_eq!(resp.status(), StatusCode::FORBIDDEN),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("handshake should have been rejected"),
        }
    }

    #[tokio::test]
    async fn allowed_origin_connects() {
        let addr = start(restricted()).await;
        let mut req = format!("ws://{addr}").into_client_request().unwrap();
        req.headers_mut()
            .insert(header::ORIGIN, HeaderValue::from_static("https://game.example"));

        let (mut ws, _) = connect_async(req).await.unwrap();
        send_text(&mut ws, r#"{"type":"join","role":"player2"}"#).await;
        assert_eq!(next_json(&mut ws).await["type"], "users");
    }
}
