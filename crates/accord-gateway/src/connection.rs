//! The gateway connection state machine.
//!
//! One [`GatewayConnection`] keeps one logical session alive across
//! physical reconnects: it drives the transport, paces heartbeats through
//! the [`Heartbeater`], advances the [`SessionTracker`], classifies close
//! codes, and forwards dispatch payloads to the consumer over an mpsc
//! channel. Every state transition is reported to the injected
//! [`ConnectionObserver`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use accord_core::backoff::exponential_delay;
use accord_core::{CloseAction, CloseCodePolicy, GatewayPayload, Intents, Opcode};

use crate::errors::GatewayError;
use crate::heartbeat::{HeartbeatSignal, Heartbeater};
use crate::session::{HandshakePlan, SessionTracker};
use crate::state::{ConnectionObserver, ConnectionState};
use crate::transport::{Frame, GatewayStream, GatewayTransport};

/// Connection tuning.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Gateway endpoint.
    pub url: String,
    /// Authentication token for identify/resume.
    pub token: String,
    /// Capability intents requested during identify.
    pub intents: Intents,
    /// Base delay for reconnect backoff, ms.
    pub base_delay_ms: u64,
    /// Ceiling for reconnect backoff, ms.
    pub max_delay_ms: u64,
    /// Consecutive failed reconnects before giving up.
    pub max_consecutive_failures: u32,
    /// How long to wait for the server's initial control frame.
    pub hello_timeout: Duration,
}

impl GatewayConfig {
    /// Config with production defaults for the given endpoint and token.
    #[must_use]
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            intents: Intents::standard(),
            base_delay_ms: 1000,
            max_delay_ms: 60_000,
            max_consecutive_failures: 7,
            hello_timeout: Duration::from_secs(20),
        }
    }
}

/// A dispatch payload handed to the consumer.
#[derive(Clone, Debug)]
pub struct DispatchedEvent {
    /// Event name from the envelope's `t` field.
    pub name: String,
    /// Event payload from the envelope's `d` field.
    pub data: Value,
    /// Sequence number from the envelope's `s` field.
    pub sequence: Option<u64>,
}

/// External view of a running connection.
#[derive(Clone)]
pub struct GatewayHandle {
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
}

impl GatewayHandle {
    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Request a graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// How one physical session ended.
enum SessionEnd {
    /// Local shutdown was requested.
    Shutdown,
    /// Terminal failure; no retry.
    Fatal(GatewayError),
    /// Reconnect; the session tracker already reflects whether a resume
    /// is possible.
    Disconnected {
        /// Whether this session reached `Connected` at some point. A
        /// connected period resets the backoff and failure counters.
        reached_connected: bool,
    },
}

/// Result of waiting for the server's initial control frame.
enum HelloResult {
    Interval(u64),
    Closed { code: Option<u16>, reason: String },
    Lost,
}

/// The gateway connection state machine.
pub struct GatewayConnection {
    config: GatewayConfig,
    transport: Arc<dyn GatewayTransport>,
    observer: Arc<dyn ConnectionObserver>,
    close_policy: CloseCodePolicy,
    session: SessionTracker,
    dispatch_tx: mpsc::Sender<DispatchedEvent>,
    state: Arc<Mutex<ConnectionState>>,
    cancel: CancellationToken,
}

impl GatewayConnection {
    /// Build a connection. It does nothing until [`run`] is awaited.
    ///
    /// [`run`]: GatewayConnection::run
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        transport: Arc<dyn GatewayTransport>,
        observer: Arc<dyn ConnectionObserver>,
        dispatch_tx: mpsc::Sender<DispatchedEvent>,
    ) -> Self {
        Self {
            config,
            transport,
            observer,
            close_policy: CloseCodePolicy::platform_default(),
            session: SessionTracker::new(),
            dispatch_tx,
            state: Arc::new(Mutex::new(ConnectionState::Idle)),
            cancel: CancellationToken::new(),
        }
    }

    /// Override the close-code classification table.
    #[must_use]
    pub fn with_close_policy(mut self, policy: CloseCodePolicy) -> Self {
        self.close_policy = policy;
        self
    }

    /// Tie this connection's shutdown to an external token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for observing state and requesting shutdown.
    #[must_use]
    pub fn handle(&self) -> GatewayHandle {
        GatewayHandle {
            state: self.state.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Drive the connection until shutdown or terminal failure.
    ///
    /// Returns `Ok(())` after a graceful local shutdown, or the fatal
    /// error that moved the connection to `Failed`.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let mut attempt: u32 = 0;
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                self.set_state(ConnectionState::Closing);
                self.set_state(ConnectionState::Idle);
                return Ok(());
            }

            self.set_state(ConnectionState::Connecting);
            match self.run_session().await {
                SessionEnd::Shutdown => {
                    self.set_state(ConnectionState::Idle);
                    return Ok(());
                }
                SessionEnd::Fatal(err) => {
                    self.set_state(ConnectionState::Failed);
                    return Err(err);
                }
                SessionEnd::Disconnected { reached_connected } => {
                    if reached_connected {
                        attempt = 0;
                        consecutive_failures = 0;
                    } else {
                        consecutive_failures += 1;
                        if consecutive_failures >= self.config.max_consecutive_failures {
                            self.set_state(ConnectionState::Failed);
                            return Err(GatewayError::ReconnectExhausted {
                                attempts: consecutive_failures,
                            });
                        }
                    }

                    let delay_ms = exponential_delay(
                        attempt,
                        self.config.base_delay_ms,
                        self.config.max_delay_ms,
                    );
                    attempt = attempt.saturating_add(1);
                    self.observer.on_reconnect_scheduled(attempt, delay_ms);

                    tokio::select! {
                        () = time::sleep(Duration::from_millis(delay_ms)) => {}
                        () = self.cancel.cancelled() => {
                            self.set_state(ConnectionState::Closing);
                            self.set_state(ConnectionState::Idle);
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// One physical connection: connect, handshake, pump events.
    async fn run_session(&mut self) -> SessionEnd {
        let url = self.connect_url();
        let mut stream = match self.transport.connect(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "gateway connect failed");
                return SessionEnd::Disconnected {
                    reached_connected: false,
                };
            }
        };
        self.set_state(ConnectionState::AwaitingHandshake);

        let hello = tokio::select! {
            hello = time::timeout(self.config.hello_timeout, self.await_hello(&mut stream)) => hello,
            () = self.cancel.cancelled() => {
                self.set_state(ConnectionState::Closing);
                let _ = stream.close().await;
                return SessionEnd::Shutdown;
            }
        };
        let interval_ms = match hello {
            Ok(HelloResult::Interval(ms)) => ms,
            Ok(HelloResult::Closed { code, reason }) => {
                return self.classify_close(code, reason, false);
            }
            Ok(HelloResult::Lost) => {
                return SessionEnd::Disconnected {
                    reached_connected: false,
                };
            }
            Err(_elapsed) => {
                warn!(error = %GatewayError::HelloTimeout, "reconnecting");
                let _ = stream.close().await;
                return SessionEnd::Disconnected {
                    reached_connected: false,
                };
            }
        };

        let handshake = match self.session.decide() {
            HandshakePlan::Fresh => {
                self.set_state(ConnectionState::Identifying);
                GatewayPayload::identify(
                    &self.config.token,
                    self.config.intents,
                    &identify_properties(),
                )
            }
            HandshakePlan::Resume {
                session_id,
                sequence,
            } => {
                self.set_state(ConnectionState::Resuming);
                GatewayPayload::resume(&self.config.token, &session_id, sequence)
            }
        };
        if let Err(e) = stream.send(&handshake).await {
            warn!(error = %e, "failed to send handshake");
            return SessionEnd::Disconnected {
                reached_connected: false,
            };
        }

        // Heartbeats pace from the hello interval, first beat jittered
        // across the whole interval so mass reconnects do not align.
        let interval = Duration::from_millis(interval_ms);
        let (heartbeater, mut beats) = Heartbeater::start(interval, interval);

        let mut reached_connected = false;
        let end = loop {
            tokio::select! {
                maybe_frame = stream.next_frame() => match maybe_frame {
                    None => {
                        self.observer.on_close(None, "transport lost");
                        break SessionEnd::Disconnected { reached_connected };
                    }
                    Some(Err(GatewayError::Protocol(detail))) => {
                        // Malformed payload: drop it, keep the session.
                        self.observer.on_decode_dropped(&detail);
                    }
                    Some(Err(e)) => {
                        // Socket-level failure: the session is over.
                        self.observer.on_close(None, &e.to_string());
                        break SessionEnd::Disconnected { reached_connected };
                    }
                    Some(Ok(Frame::Closed { code, reason })) => {
                        break self.classify_close(code, reason, reached_connected);
                    }
                    Some(Ok(Frame::Payload(payload))) => {
                        if let Some(end) = self
                            .handle_payload(payload, &mut stream, &heartbeater, &mut reached_connected)
                            .await
                        {
                            break end;
                        }
                    }
                },
                signal = beats.recv() => match signal {
                    Some(HeartbeatSignal::Beat) => {
                        let beat = GatewayPayload::heartbeat(self.session.sequence());
                        if let Err(e) = stream.send(&beat).await {
                            warn!(error = %e, "failed to send heartbeat");
                            break SessionEnd::Disconnected { reached_connected };
                        }
                    }
                    Some(HeartbeatSignal::Zombie) => {
                        self.observer.on_zombie();
                        let _ = stream.close().await;
                        break SessionEnd::Disconnected { reached_connected };
                    }
                    None => {
                        warn!("heartbeat scheduler stopped unexpectedly");
                        break SessionEnd::Disconnected { reached_connected };
                    }
                },
                () = self.cancel.cancelled() => {
                    self.set_state(ConnectionState::Closing);
                    let _ = stream.close().await;
                    break SessionEnd::Shutdown;
                }
            }
        };
        heartbeater.stop();
        end
    }

    /// Read frames until the server's initial control frame arrives.
    async fn await_hello(&self, stream: &mut Box<dyn GatewayStream>) -> HelloResult {
        loop {
            match stream.next_frame().await {
                None => return HelloResult::Lost,
                Some(Err(GatewayError::Protocol(detail))) => {
                    self.observer.on_decode_dropped(&detail);
                }
                Some(Err(e)) => {
                    self.observer.on_close(None, &e.to_string());
                    return HelloResult::Lost;
                }
                Some(Ok(Frame::Closed { code, reason })) => {
                    return HelloResult::Closed { code, reason };
                }
                Some(Ok(Frame::Payload(payload))) => {
                    if let Some(ms) = payload.hello_heartbeat_interval_ms() {
                        return HelloResult::Interval(ms);
                    }
                    debug!(op = ?payload.op, "unexpected frame before hello");
                }
            }
        }
    }

    /// Process one decoded payload. `Some` ends the session.
    async fn handle_payload(
        &mut self,
        payload: GatewayPayload,
        stream: &mut Box<dyn GatewayStream>,
        heartbeater: &Heartbeater,
        reached_connected: &mut bool,
    ) -> Option<SessionEnd> {
        match payload.op {
            Opcode::Dispatch => {
                if let Some(sequence) = payload.s {
                    self.session.record(sequence);
                }
                let name = payload.t.clone().unwrap_or_default();
                match name.as_str() {
                    "READY" => {
                        if let Some(session_id) =
                            payload.d.get("session_id").and_then(Value::as_str)
                        {
                            let resume_url = payload
                                .d
                                .get("resume_url")
                                .and_then(Value::as_str)
                                .map(str::to_owned);
                            self.session.establish(session_id.to_owned(), resume_url);
                        }
                        *reached_connected = true;
                        self.set_state(ConnectionState::Connected);
                    }
                    "RESUMED" => {
                        *reached_connected = true;
                        self.set_state(ConnectionState::Connected);
                    }
                    _ => {}
                }
                let event = DispatchedEvent {
                    name,
                    data: payload.d,
                    sequence: payload.s,
                };
                if self.dispatch_tx.send(event).await.is_err() {
                    debug!("dispatch consumer gone; dropping event");
                }
                None
            }
            Opcode::Heartbeat => {
                // Server-requested immediate beat.
                let beat = GatewayPayload::heartbeat(self.session.sequence());
                if let Err(e) = stream.send(&beat).await {
                    warn!(error = %e, "failed to answer heartbeat request");
                    return Some(SessionEnd::Disconnected {
                        reached_connected: *reached_connected,
                    });
                }
                None
            }
            Opcode::HeartbeatAck => {
                heartbeater.on_ack();
                None
            }
            Opcode::Reconnect => {
                info!("server requested reconnect");
                let _ = stream.close().await;
                Some(SessionEnd::Disconnected {
                    reached_connected: *reached_connected,
                })
            }
            Opcode::InvalidSession => {
                let resumable = payload.invalid_session_resumable();
                info!(resumable, "session invalidated by server");
                self.session.on_invalidated(resumable);
                let _ = stream.close().await;
                Some(SessionEnd::Disconnected {
                    reached_connected: *reached_connected,
                })
            }
            Opcode::Hello => None,
            Opcode::Identify | Opcode::Resume | Opcode::Unknown(_) => {
                debug!(op = ?payload.op, "ignoring unexpected opcode");
                None
            }
        }
    }

    /// Classify a close code into the next step.
    fn classify_close(
        &mut self,
        code: Option<u16>,
        reason: String,
        reached_connected: bool,
    ) -> SessionEnd {
        self.observer.on_close(code, &reason);
        match self.close_policy.classify(code) {
            CloseAction::Resume => SessionEnd::Disconnected { reached_connected },
            CloseAction::Reidentify => {
                self.session.clear();
                SessionEnd::Disconnected { reached_connected }
            }
            CloseAction::Fatal => SessionEnd::Fatal(GatewayError::FatalClose {
                code: code.unwrap_or(0),
                reason,
            }),
        }
    }

    /// The URL to connect to: the server-directed resume endpoint when
    /// resuming, otherwise the configured gateway endpoint.
    fn connect_url(&self) -> String {
        match self.session.decide() {
            HandshakePlan::Resume { .. } => self
                .session
                .resume_url()
                .unwrap_or(&self.config.url)
                .to_owned(),
            HandshakePlan::Fresh => self.config.url.clone(),
        }
    }

    fn set_state(&self, to: ConnectionState) {
        let from = {
            let mut state = self.state.lock();
            let from = *state;
            *state = to;
            from
        };
        if from != to {
            self.observer.on_transition(from, to);
        }
    }
}

/// Identify properties describing this client.
fn identify_properties() -> Value {
    json!({
        "os": std::env::consts::OS,
        "browser": "accord",
        "device": "accord",
    })
}
