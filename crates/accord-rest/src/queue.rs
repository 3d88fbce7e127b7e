//! Serialized command queue.
//!
//! All REST commands flow through one worker that delivers them in
//! submission order. A transport failure holds the whole queue behind a
//! linear backoff and the same command is retried; the reachability
//! probe only tells "we are offline" apart from "that endpoint is down"
//! in the logs. Only a well-formed error response fails a command.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use accord_core::backoff::LinearBackoff;

use crate::errors::CommandError;
use crate::transport::{CommandRequest, CommandResponse, Reachability, RestTransport};

type CommandResult = Result<CommandResponse, CommandError>;

/// Resolves when the queued command completes, fails, or the client
/// shuts down.
pub struct CommandFuture {
    rx: oneshot::Receiver<CommandResult>,
}

impl Future for CommandFuture {
    type Output = CommandResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CommandError::Shutdown)),
            Poll::Pending => Poll::Pending,
        }
    }
}

struct QueuedCommand {
    request: CommandRequest,
    reply: oneshot::Sender<CommandResult>,
}

/// Handle to the queue worker. Cheap to share behind an `Arc`.
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<QueuedCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    /// Spawn the worker. It stops when the token is cancelled, failing
    /// everything still queued with [`CommandError::Shutdown`].
    #[must_use]
    pub fn start(
        transport: Arc<dyn RestTransport>,
        reachability: Arc<dyn Reachability>,
        backoff: LinearBackoff,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            transport,
            reachability,
            backoff,
            cancel,
            rx,
        };
        Self {
            tx,
            worker: Mutex::new(Some(tokio::spawn(worker.run()))),
        }
    }

    /// Queue a command. Never blocks; the returned future resolves when
    /// the worker gets to it.
    pub fn enqueue(&self, request: CommandRequest) -> CommandFuture {
        let (reply, rx) = oneshot::channel();
        if let Err(rejected) = self.tx.send(QueuedCommand { request, reply }) {
            // Worker already gone; resolve immediately.
            let _ = rejected.0.reply.send(Err(CommandError::Shutdown));
        }
        CommandFuture { rx }
    }

    /// Wait for the worker to finish. Used during shutdown, after the
    /// cancellation token fires.
    pub async fn join(&self) {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!(error = %e, "command queue worker panicked");
        }
    }

    /// [`join`] with a deadline: if the worker has not stopped within
    /// `bound`, abort it.
    ///
    /// [`join`]: CommandQueue::join
    pub async fn join_within(&self, bound: Duration) {
        let handle = self.worker.lock().take();
        if let Some(mut handle) = handle {
            match time::timeout(bound, &mut handle).await {
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!(error = %e, "command queue worker panicked");
                }
                Ok(_) => {}
                Err(_) => {
                    warn!(?bound, "command queue worker outlived its shutdown bound; aborting");
                    handle.abort();
                }
            }
        }
    }
}

struct Worker {
    transport: Arc<dyn RestTransport>,
    reachability: Arc<dyn Reachability>,
    backoff: LinearBackoff,
    cancel: CancellationToken,
    rx: mpsc::UnboundedReceiver<QueuedCommand>,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let queued = tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
                () = self.cancel.cancelled() => break,
            };
            match self.deliver(&queued.request).await {
                Some(result) => {
                    let _ = queued.reply.send(result);
                }
                None => {
                    // Shutdown interrupted the hold.
                    let _ = queued.reply.send(Err(CommandError::Shutdown));
                    break;
                }
            }
        }
        self.drain();
        debug!("command queue worker stopped");
    }

    /// Drive one command to completion. `None` means shutdown won.
    async fn deliver(&mut self, request: &CommandRequest) -> Option<CommandResult> {
        loop {
            // The in-flight request races shutdown too; a transport that
            // never answers must not pin the worker open.
            let outcome = tokio::select! {
                outcome = self.transport.execute(request) => outcome,
                () = self.cancel.cancelled() => return None,
            };
            match outcome {
                Ok(response) => {
                    // A well-formed response proves the send path works.
                    self.backoff.reset();
                    if response.is_success() {
                        return Some(Ok(response));
                    }
                    return Some(Err(CommandError::Api {
                        status: response.status,
                        body: response.body,
                    }));
                }
                Err(e) => {
                    let delay_ms = self.backoff.next_delay_ms();
                    if self.reachability.is_reachable().await {
                        warn!(error = %e, delay_ms, path = %request.path,
                            "endpoint unreachable with network up; holding command queue");
                    } else {
                        warn!(error = %e, delay_ms, path = %request.path,
                            "offline; holding command queue");
                    }
                    tokio::select! {
                        () = time::sleep(Duration::from_millis(delay_ms)) => {}
                        () = self.cancel.cancelled() => return None,
                    }
                }
            }
        }
    }

    fn drain(&mut self) {
        self.rx.close();
        while let Ok(queued) = self.rx.try_recv() {
            let _ = queued.reply.send(Err(CommandError::Shutdown));
        }
    }
}
