//! Duplex message transport for the gateway connection.
//!
//! The connection state machine talks to an abstract [`GatewayTransport`] so
//! tests can drive it with a scripted transport (see [`crate::testing`]).
//! Production uses [`WsTransport`] over tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

use accord_core::GatewayPayload;

use crate::errors::GatewayError;

/// One inbound item from the transport.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    /// A decoded gateway payload.
    Payload(GatewayPayload),
    /// The peer closed the socket.
    Closed {
        /// Close code, if one accompanied the close frame.
        code: Option<u16>,
        /// Server-provided reason, possibly empty.
        reason: String,
    },
}

/// Factory for gateway socket connections.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Open a new socket to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayStream>, GatewayError>;
}

/// One open gateway socket.
#[async_trait]
pub trait GatewayStream: Send {
    /// Receive the next frame. `None` means the transport is gone without
    /// a close frame (abnormal closure).
    async fn next_frame(&mut self) -> Option<Result<Frame, GatewayError>>;

    /// Send a payload.
    async fn send(&mut self, payload: &GatewayPayload) -> Result<(), GatewayError>;

    /// Close the socket gracefully. Idempotent.
    async fn close(&mut self) -> Result<(), GatewayError>;
}

/// Production transport over tokio-tungstenite.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl GatewayTransport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayStream>, GatewayError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;
        Ok(Box::new(WsStream { socket }))
    }
}

struct WsStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl GatewayStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, GatewayError>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => {
                    return Some(
                        serde_json::from_str::<GatewayPayload>(&text)
                            .map(Frame::Payload)
                            .map_err(|e| GatewayError::Protocol(e.to_string())),
                    );
                }
                Ok(Message::Binary(data)) => {
                    return Some(
                        serde_json::from_slice::<GatewayPayload>(&data)
                            .map(Frame::Payload)
                            .map_err(|e| GatewayError::Protocol(e.to_string())),
                    );
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = frame
                        .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                        .unwrap_or((None, String::new()));
                    return Some(Ok(Frame::Closed { code, reason }));
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Control frames; tungstenite answers pings itself.
                    trace!("websocket control frame");
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(GatewayError::Transport(e.to_string()))),
            }
        }
    }

    async fn send(&mut self, payload: &GatewayPayload) -> Result<(), GatewayError> {
        let json = serde_json::to_string(payload)
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        self.socket
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        self.socket
            .close(None)
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::Opcode;

    #[test]
    fn frame_payload_equality() {
        let a = Frame::Payload(GatewayPayload::heartbeat(Some(1)));
        let b = Frame::Payload(GatewayPayload::heartbeat(Some(1)));
        assert_eq!(a, b);
    }

    #[test]
    fn frame_closed_carries_code() {
        let frame = Frame::Closed {
            code: Some(4004),
            reason: "authentication failed".into(),
        };
        assert_matches::assert_matches!(
            frame,
            Frame::Closed { code: Some(4004), .. }
        );
    }

    #[test]
    fn payload_json_roundtrips_through_wire_shape() {
        // The exact strings WsStream would read off the socket.
        let wire = r#"{"op":10,"d":{"heartbeat_interval_ms":41250}}"#;
        let payload: GatewayPayload = serde_json::from_str(wire).unwrap();
        assert_eq!(payload.op, Opcode::Hello);
        assert_eq!(payload.hello_heartbeat_interval_ms(), Some(41_250));
    }
}
