//! The client object that owns every runtime piece.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use accord_cache::{Cache, CachePolicy, CacheSubscriber, EventDispatcher, KindFlags};
use accord_core::backoff::LinearBackoff;
use accord_gateway::readiness::ReadinessGate;
use accord_gateway::state::{ConnectionState, TracingObserver};
use accord_gateway::transport::{GatewayTransport, WsTransport};
use accord_gateway::{DispatchedEvent, GatewayConfig, GatewayConnection, GatewayHandle};
use accord_rest::transport::{HttpProbe, HttpTransport, Reachability, RestTransport};
use accord_rest::{CommandFuture, CommandQueue, CommandRequest};
use accord_settings::types::{CacheFlags, ClientSettings, CopyOnUpdateFlags};

use crate::shutdown::ShutdownCoordinator;

const GATEWAY_REQUIREMENT: &str = "gateway";
const CACHE_REQUIREMENT: &str = "cache-primed";

/// The runtime client.
///
/// Construct inside a tokio runtime (the command-queue worker spawns
/// immediately), then call [`start`] to bring up the realtime
/// connection and [`wait_until_ready`] to block until the first READY
/// has primed the cache.
///
/// [`start`]: Client::start
/// [`wait_until_ready`]: Client::wait_until_ready
pub struct Client {
    settings: ClientSettings,
    token: String,
    shutdown: ShutdownCoordinator,
    cache: Arc<Cache>,
    dispatcher: Arc<EventDispatcher>,
    queue: Arc<CommandQueue>,
    readiness: Arc<ReadinessGate>,
    gateway_transport: Arc<dyn GatewayTransport>,
    gateway: Mutex<Option<GatewayHandle>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Client {
    /// Client with production transports.
    #[must_use]
    pub fn new(settings: ClientSettings, token: impl Into<String>) -> Self {
        let token = token.into();
        let rest: Arc<dyn RestTransport> =
            Arc::new(HttpTransport::new(&settings.rest_base_url, &token));
        let probe: Arc<dyn Reachability> = Arc::new(HttpProbe::new(&settings.probe_url));
        Self::with_transports(settings, token, Arc::new(WsTransport), rest, probe)
    }

    /// Client with injected transports. This is the seam the
    /// integration tests script against.
    #[must_use]
    pub fn with_transports(
        settings: ClientSettings,
        token: impl Into<String>,
        gateway_transport: Arc<dyn GatewayTransport>,
        rest_transport: Arc<dyn RestTransport>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        let shutdown = ShutdownCoordinator::new();
        let cache = Arc::new(Cache::new(cache_policy(&settings)));
        let dispatcher = Arc::new(EventDispatcher::new(cache.clone()));
        let backoff = LinearBackoff::new(
            settings.queue.start_delay_ms,
            settings.queue.increment_ms,
            settings.queue.cap_ms,
        );
        let queue = Arc::new(CommandQueue::start(
            rest_transport,
            reachability,
            backoff,
            shutdown.token(),
        ));

        if settings.command_sync_manager {
            // Recognized knob with no runtime effect in this core.
            debug!("commandSyncManager enabled; nothing to manage here");
        }

        Self {
            settings,
            token: token.into(),
            shutdown,
            cache,
            dispatcher,
            queue,
            readiness: Arc::new(ReadinessGate::new()),
            gateway_transport,
            gateway: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Bring up the realtime connection and the dispatch pump.
    ///
    /// With `enableGateway` off this is a no-op and the client reports
    /// ready immediately.
    pub fn start(&self) {
        if !self.settings.enable_gateway {
            info!("realtime connection disabled by settings");
            return;
        }

        self.readiness.register(GATEWAY_REQUIREMENT);
        self.readiness.register(CACHE_REQUIREMENT);

        let (dispatch_tx, dispatch_rx) = mpsc::channel(256);
        let config = GatewayConfig {
            base_delay_ms: self.settings.reconnect.base_delay_ms,
            max_delay_ms: self.settings.reconnect.max_delay_ms,
            max_consecutive_failures: self.settings.reconnect.max_consecutive_failures,
            hello_timeout: Duration::from_millis(self.settings.reconnect.hello_timeout_ms),
            ..GatewayConfig::new(self.settings.gateway_url.clone(), self.token.clone())
        };
        let connection = GatewayConnection::new(
            config,
            self.gateway_transport.clone(),
            Arc::new(TracingObserver),
            dispatch_tx,
        )
        .with_cancel(self.shutdown.token());
        *self.gateway.lock() = Some(connection.handle());

        let mut handles = self.handles.lock();
        handles.push(tokio::spawn(async move {
            if let Err(e) = connection.run().await {
                error!(error = %e, "gateway connection terminated");
            }
        }));
        handles.push(tokio::spawn(pump(
            dispatch_rx,
            self.dispatcher.clone(),
            self.readiness.clone(),
            self.shutdown.token(),
        )));
    }

    /// Suspend until every registered readiness requirement signaled.
    pub async fn wait_until_ready(&self) {
        self.readiness.wait_ready().await;
    }

    /// Whether the client is fully ready.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Snapshot store of decoded resources.
    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Queue a REST command.
    pub fn enqueue(&self, request: CommandRequest) -> CommandFuture {
        self.queue.enqueue(request)
    }

    /// The serialized command queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<CommandQueue> {
        &self.queue
    }

    /// Register a cache-update subscriber.
    pub fn subscribe(&self, subscriber: Arc<dyn CacheSubscriber>) {
        self.dispatcher.subscribe(subscriber);
    }

    /// Current gateway lifecycle state, if started.
    #[must_use]
    pub fn gateway_state(&self) -> Option<ConnectionState> {
        self.gateway.lock().as_ref().map(GatewayHandle::state)
    }

    /// Two-phase shutdown bounded by `maxShutdownTimeMs`: cancel,
    /// drain tasks, abort stragglers, fail pending commands.
    pub async fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        let timeout = Duration::from_millis(self.settings.max_shutdown_time_ms);
        self.shutdown.graceful_shutdown(handles, timeout).await;
        self.queue.join_within(timeout).await;
        info!("client shut down");
    }
}

/// Forward dispatch payloads into the cache layer and flip readiness
/// on the first READY of each session.
async fn pump(
    mut rx: mpsc::Receiver<DispatchedEvent>,
    dispatcher: Arc<EventDispatcher>,
    readiness: Arc<ReadinessGate>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
            () = cancel.cancelled() => break,
        };

        let is_ready_event = event.name == "READY";
        if is_ready_event {
            // Fresh session: tombstones from the old one no longer apply.
            dispatcher.cache().begin_session();
        }
        let _ = dispatcher.apply(&event.name, &event.data);
        if is_ready_event && !readiness.is_ready() {
            readiness.signal(GATEWAY_REQUIREMENT);
            readiness.signal(CACHE_REQUIREMENT);
        }
    }
    debug!("dispatch pump stopped");
}

fn cache_policy(settings: &ClientSettings) -> CachePolicy {
    CachePolicy {
        cache: kind_flags_from_cache(&settings.effective_cache()),
        copy_on_update: kind_flags_from_copy(&settings.effective_copy_on_update()),
        retain_archived_threads: settings.retain_archived_threads,
    }
}

fn kind_flags_from_cache(flags: &CacheFlags) -> KindFlags {
    KindFlags {
        guilds: flags.guilds,
        channels: flags.channels,
        threads: flags.threads,
        roles: flags.roles,
        members: flags.members,
        presences: flags.presences,
        voice_states: flags.voice_states,
        emojis: flags.emojis,
    }
}

fn kind_flags_from_copy(flags: &CopyOnUpdateFlags) -> KindFlags {
    KindFlags {
        guilds: flags.guilds,
        channels: flags.channels,
        threads: flags.threads,
        roles: flags.roles,
        members: flags.members,
        presences: flags.presences,
        voice_states: flags.voice_states,
        emojis: flags.emojis,
    }
}
