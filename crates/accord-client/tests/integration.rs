//! End-to-end runtime tests over a scripted gateway transport: handshake,
//! cache priming, zombie recovery, session invalidation, and shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use accord_cache::{CacheSubscriber, CacheUpdate, Resource, ResourceKind};
use accord_client::Client;
use accord_core::ids::ResourceId;
use accord_core::{GatewayPayload, Opcode};
use accord_gateway::testing::{ScriptedTransport, SessionScript};
use accord_gateway::transport::Frame;
use accord_rest::transport::{
    CommandRequest, CommandResponse, Reachability, RestTransport,
};
use accord_rest::{CommandError, RestError};
use accord_settings::types::ClientSettings;

struct OkRest {
    calls: AtomicUsize,
}

#[async_trait]
impl RestTransport for OkRest {
    async fn execute(&self, _request: &CommandRequest) -> Result<CommandResponse, RestError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommandResponse {
            status: 200,
            headers: std::collections::HashMap::new(),
            body: json!({"ok": true}),
        })
    }
}

struct AlwaysReachable;

#[async_trait]
impl Reachability for AlwaysReachable {
    async fn is_reachable(&self) -> bool {
        true
    }
}

struct Recorder {
    names: Mutex<Vec<ResourceKind>>,
}

impl CacheSubscriber for Recorder {
    fn on_update(&self, update: &CacheUpdate) -> Result<(), String> {
        self.names.lock().push(update.kind);
        Ok(())
    }
}

fn hello(interval_ms: u64) -> Frame {
    Frame::Payload(GatewayPayload::control(
        Opcode::Hello,
        json!({"heartbeat_interval_ms": interval_ms}),
    ))
}

fn dispatch(name: &str, data: Value, seq: u64) -> Frame {
    Frame::Payload(GatewayPayload {
        op: Opcode::Dispatch,
        d: data,
        s: Some(seq),
        t: Some(name.into()),
    })
}

fn ready(session_id: &str, seq: u64) -> Frame {
    dispatch(
        "READY",
        json!({
            "session_id": session_id,
            "resume_url": "wss://resume.accord.gg",
            "guilds": [{"id": "g1", "unavailable": true}],
        }),
        seq,
    )
}

struct Harness {
    client: Client,
    transport: Arc<ScriptedTransport>,
    rest: Arc<OkRest>,
}

fn start_client(sessions: usize) -> (Harness, Vec<SessionScript>) {
    let transport = Arc::new(ScriptedTransport::new());
    let scripts: Vec<SessionScript> = (0..sessions).map(|_| transport.script_session()).collect();
    let rest = Arc::new(OkRest {
        calls: AtomicUsize::new(0),
    });
    let client = Client::with_transports(
        ClientSettings::default(),
        "tok",
        transport.clone(),
        rest.clone(),
        Arc::new(AlwaysReachable),
    );
    client.start();
    (
        Harness {
            client,
            transport,
            rest,
        },
        scripts,
    )
}

async fn next_non_heartbeat(script: &mut SessionScript) -> GatewayPayload {
    loop {
        let payload = script.sent.recv().await.expect("connection hung up");
        if payload.op != Opcode::Heartbeat {
            return payload;
        }
    }
}

fn get(client: &Client, kind: ResourceKind, id: &str) -> Option<Arc<Resource>> {
    client.cache().get(kind, &ResourceId::from(id))
}

#[tokio::test(start_paused = true)]
async fn full_session_primes_cache_and_serves_commands() {
    let (harness, mut scripts) = start_client(1);
    let recorder = Arc::new(Recorder {
        names: Mutex::new(Vec::new()),
    });
    harness.client.subscribe(recorder.clone());

    scripts[0].frames.send(hello(45_000)).unwrap();
    let identify = next_non_heartbeat(&mut scripts[0]).await;
    assert_eq!(identify.op, Opcode::Identify);
    assert_eq!(identify.d["token"], "tok");

    assert!(!harness.client.is_ready());
    scripts[0].frames.send(ready("sess-1", 1)).unwrap();
    harness.client.wait_until_ready().await;

    // READY seeded the guild list.
    assert!(get(&harness.client, ResourceKind::Guild, "g1").is_some());

    scripts[0]
        .frames
        .send(dispatch(
            "CHANNEL_CREATE",
            json!({"id": "c1", "type": 0, "name": "general"}),
            2,
        ))
        .unwrap();
    // Paused clock: yield until the pump has applied the event.
    while get(&harness.client, ResourceKind::Channel, "c1").is_none() {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        *recorder.names.lock(),
        vec![ResourceKind::Guild, ResourceKind::Channel]
    );

    // REST command round-trips through the queue.
    let response = harness
        .client
        .enqueue(CommandRequest::post("/channels/c1/messages", json!({"content": "hi"})))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(harness.rest.calls.load(Ordering::SeqCst), 1);

    harness.client.shutdown().await;
    assert!(scripts[0].was_closed());

    // Commands after shutdown fail fast.
    let late = harness.client.enqueue(CommandRequest::get("/late")).await;
    assert!(matches!(late, Err(CommandError::Shutdown)));
}

#[tokio::test(start_paused = true)]
async fn zombie_connection_resumes_and_keeps_cache() {
    let (harness, mut scripts) = start_client(2);

    scripts[0].frames.send(hello(100)).unwrap();
    let identify = next_non_heartbeat(&mut scripts[0]).await;
    assert_eq!(identify.op, Opcode::Identify);
    scripts[0].frames.send(ready("sess-1", 1)).unwrap();
    harness.client.wait_until_ready().await;
    scripts[0]
        .frames
        .send(dispatch(
            "CHANNEL_CREATE",
            json!({"id": "c1", "type": 0}),
            2,
        ))
        .unwrap();

    // Heartbeats are never acknowledged: the connection force-closes
    // and resumes on a fresh socket.
    scripts[1].frames.send(hello(45_000)).unwrap();
    let resume = next_non_heartbeat(&mut scripts[1]).await;
    assert_eq!(resume.op, Opcode::Resume);
    assert_eq!(resume.d["session_id"], "sess-1");
    assert_eq!(harness.transport.connect_count(), 2);

    scripts[1].frames.send(dispatch("RESUMED", json!({}), 3)).unwrap();
    scripts[1]
        .frames
        .send(dispatch(
            "CHANNEL_CREATE",
            json!({"id": "c2", "type": 0}),
            4,
        ))
        .unwrap();
    while get(&harness.client, ResourceKind::Channel, "c2").is_none() {
        tokio::task::yield_now().await;
    }

    // Resume did not clear anything: both sockets' events are cached.
    assert!(get(&harness.client, ResourceKind::Channel, "c1").is_some());

    harness.client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn deletes_stay_dead_until_a_fresh_session() {
    let (harness, mut scripts) = start_client(2);

    scripts[0].frames.send(hello(45_000)).unwrap();
    let _ = next_non_heartbeat(&mut scripts[0]).await;
    scripts[0].frames.send(ready("sess-1", 1)).unwrap();
    harness.client.wait_until_ready().await;

    scripts[0]
        .frames
        .send(dispatch("CHANNEL_CREATE", json!({"id": "c1", "type": 0}), 2))
        .unwrap();
    scripts[0]
        .frames
        .send(dispatch("CHANNEL_DELETE", json!({"id": "c1", "type": 0}), 3))
        .unwrap();
    // Stale same-session update arrives after the delete.
    scripts[0]
        .frames
        .send(dispatch("CHANNEL_UPDATE", json!({"id": "c1", "type": 0}), 4))
        .unwrap();
    // Marker event proves the stale update has been pumped.
    scripts[0]
        .frames
        .send(dispatch("CHANNEL_CREATE", json!({"id": "marker", "type": 0}), 5))
        .unwrap();
    while get(&harness.client, ResourceKind::Channel, "marker").is_none() {
        tokio::task::yield_now().await;
    }
    assert!(get(&harness.client, ResourceKind::Channel, "c1").is_none());

    // Server invalidates the session non-resumably: fresh handshake.
    scripts[0]
        .frames
        .send(Frame::Payload(GatewayPayload::control(
            Opcode::InvalidSession,
            json!(false),
        )))
        .unwrap();

    scripts[1].frames.send(hello(45_000)).unwrap();
    let second = next_non_heartbeat(&mut scripts[1]).await;
    assert_eq!(second.op, Opcode::Identify);
    scripts[1].frames.send(ready("sess-2", 1)).unwrap();

    // New session cleared the tombstones: c1 may exist again.
    scripts[1]
        .frames
        .send(dispatch("CHANNEL_CREATE", json!({"id": "c1", "type": 0}), 2))
        .unwrap();
    while get(&harness.client, ResourceKind::Channel, "c1").is_none() {
        tokio::task::yield_now().await;
    }

    harness.client.shutdown().await;
}
