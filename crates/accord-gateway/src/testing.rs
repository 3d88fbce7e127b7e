//! Test utilities: a scripted in-memory gateway transport.
//!
//! Tests (here and in `accord-client`) drive the connection state machine
//! by playing server frames into a [`SessionScript`] and asserting on the
//! payloads the connection sends back.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use accord_core::GatewayPayload;

use crate::errors::GatewayError;
use crate::transport::{Frame, GatewayStream, GatewayTransport};

/// Handle a test holds on one scripted socket.
pub struct SessionScript {
    /// Feed server frames to the connection. Dropping this sender looks
    /// like an abnormal transport loss to the connection.
    pub frames: mpsc::UnboundedSender<Frame>,
    /// Inject read errors, e.g. a socket-level failure mid-session.
    pub faults: mpsc::UnboundedSender<GatewayError>,
    /// Payloads the connection sent, in order.
    pub sent: mpsc::UnboundedReceiver<GatewayPayload>,
    /// Whether the connection closed this socket gracefully.
    pub closed: Arc<AtomicBool>,
}

impl SessionScript {
    /// Whether the connection called `close()` on this socket.
    #[must_use]
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct PendingSocket {
    frames: mpsc::UnboundedReceiver<Frame>,
    faults: mpsc::UnboundedReceiver<GatewayError>,
    sent: mpsc::UnboundedSender<GatewayPayload>,
    closed: Arc<AtomicBool>,
}

/// Transport whose `connect` hands out pre-scripted sockets in order.
///
/// When the script runs out, further connects fail — which the state
/// machine sees as a transient connect failure.
#[derive(Default)]
pub struct ScriptedTransport {
    pending: Mutex<VecDeque<PendingSocket>>,
    connects: AtomicUsize,
}

impl ScriptedTransport {
    /// An empty transport; every connect fails until a session is scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one more socket and return the test's handle to it.
    pub fn script_session(&self) -> SessionScript {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (fault_tx, fault_rx) = mpsc::unbounded_channel();
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.pending.lock().push_back(PendingSocket {
            frames: frame_rx,
            faults: fault_rx,
            sent: sent_tx,
            closed: closed.clone(),
        });
        SessionScript {
            frames: frame_tx,
            faults: fault_tx,
            sent: sent_rx,
            closed,
        }
    }

    /// How many times the connection attempted to connect.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }
}

#[async_trait]
impl GatewayTransport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn GatewayStream>, GatewayError> {
        let _ = self.connects.fetch_add(1, Ordering::AcqRel);
        let socket = self.pending.lock().pop_front();
        match socket {
            Some(socket) => Ok(Box::new(ScriptedStream { socket })),
            None => Err(GatewayError::Connect("no scripted session left".into())),
        }
    }
}

struct ScriptedStream {
    socket: PendingSocket,
}

#[async_trait]
impl GatewayStream for ScriptedStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, GatewayError>> {
        tokio::select! {
            biased;
            fault = self.socket.faults.recv() => fault.map(Err),
            frame = self.socket.frames.recv() => frame.map(Ok),
        }
    }

    async fn send(&mut self, payload: &GatewayPayload) -> Result<(), GatewayError> {
        self.socket
            .sent
            .send(payload.clone())
            .map_err(|_| GatewayError::Transport("test harness dropped".into()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        self.socket.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::Opcode;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_frames_flow_through() {
        let transport = ScriptedTransport::new();
        let script = transport.script_session();

        let mut stream = transport.connect("wss://ignored").await.unwrap();
        script
            .frames
            .send(Frame::Payload(GatewayPayload::control(
                Opcode::Hello,
                json!({"heartbeat_interval_ms": 1000}),
            )))
            .unwrap();

        let frame = stream.next_frame().await.unwrap().unwrap();
        assert_matches::assert_matches!(frame, Frame::Payload(p) if p.op == Opcode::Hello);
    }

    #[tokio::test]
    async fn sent_payloads_are_observable() {
        let transport = ScriptedTransport::new();
        let mut script = transport.script_session();

        let mut stream = transport.connect("wss://ignored").await.unwrap();
        stream.send(&GatewayPayload::heartbeat(Some(3))).await.unwrap();

        let sent = script.sent.recv().await.unwrap();
        assert_eq!(sent.op, Opcode::Heartbeat);
    }

    #[tokio::test]
    async fn exhausted_script_fails_connects() {
        let transport = ScriptedTransport::new();
        assert!(transport.connect("wss://ignored").await.is_err());
        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn injected_fault_surfaces_as_an_error() {
        let transport = ScriptedTransport::new();
        let script = transport.script_session();
        let mut stream = transport.connect("wss://ignored").await.unwrap();
        script
            .faults
            .send(GatewayError::Transport("connection reset".into()))
            .unwrap();
        assert!(stream.next_frame().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn dropped_sender_reads_as_transport_loss() {
        let transport = ScriptedTransport::new();
        let script = transport.script_session();
        let mut stream = transport.connect("wss://ignored").await.unwrap();
        drop(script);
        assert!(stream.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn close_is_recorded() {
        let transport = ScriptedTransport::new();
        let script = transport.script_session();
        let mut stream = transport.connect("wss://ignored").await.unwrap();
        assert!(!script.was_closed());
        stream.close().await.unwrap();
        assert!(script.was_closed());
    }
}
