//! Heartbeat pacing for the gateway connection.
//!
//! The scheduler runs on its own tokio timer, independent of the read loop:
//! a blocked read must never delay a heartbeat. Each tick either asks the
//! connection to send a beat or, if the previous beat was never
//! acknowledged, signals that the connection is a zombie.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// What the scheduler wants the connection to do at a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartbeatSignal {
    /// Send a heartbeat frame now.
    Beat,
    /// The previous beat was never acknowledged; the connection is dead
    /// on the other end and must be force-closed and resumed.
    Zombie,
}

/// Observable heartbeat state.
#[derive(Clone, Copy, Debug)]
pub struct HeartbeatSnapshot {
    /// Interval between beats.
    pub interval: Duration,
    /// When the last beat was emitted, if any.
    pub last_sent_at: Option<Instant>,
    /// Whether a beat is awaiting acknowledgement.
    pub ack_pending: bool,
}

struct Shared {
    interval: Duration,
    last_sent_at: Mutex<Option<Instant>>,
    ack_pending: AtomicBool,
}

/// Paces heartbeats on a dedicated task.
///
/// [`Heartbeater::start`] schedules the first tick after a random delay in
/// `[0, jitter)` so many connections identifying at once do not beat in
/// lockstep, then every `interval`.
pub struct Heartbeater {
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl Heartbeater {
    /// Start the scheduler. Signals arrive on the returned receiver.
    #[must_use]
    pub fn start(interval: Duration, jitter: Duration) -> (Self, mpsc::Receiver<HeartbeatSignal>) {
        let (tx, rx) = mpsc::channel(4);
        let shared = Arc::new(Shared {
            interval,
            last_sent_at: Mutex::new(None),
            ack_pending: AtomicBool::new(false),
        });
        let cancel = CancellationToken::new();

        #[allow(clippy::cast_possible_truncation)]
        let initial_delay = if jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..jitter.as_millis() as u64))
        };
        debug!(?interval, ?initial_delay, "starting heartbeat scheduler");

        let task_shared = shared.clone();
        let task_cancel = cancel.clone();
        drop(tokio::spawn(async move {
            tokio::select! {
                () = time::sleep(initial_delay) => {}
                () = task_cancel.cancelled() => return,
            }

            let mut ticker = time::interval(interval);
            // Consume the immediate first tick; the beat below covers it.
            let _ = ticker.tick().await;
            loop {
                let signal = if task_shared.ack_pending.load(Ordering::Acquire) {
                    HeartbeatSignal::Zombie
                } else {
                    task_shared.ack_pending.store(true, Ordering::Release);
                    *task_shared.last_sent_at.lock() = Some(Instant::now());
                    HeartbeatSignal::Beat
                };
                trace!(?signal, "heartbeat tick");
                if tx.send(signal).await.is_err() {
                    return;
                }

                tokio::select! {
                    _ = ticker.tick() => {}
                    () = task_cancel.cancelled() => return,
                }
            }
        }));

        (Self { shared, cancel }, rx)
    }

    /// Clear the pending flag: the server acknowledged the last beat.
    pub fn on_ack(&self) {
        self.shared.ack_pending.store(false, Ordering::Release);
    }

    /// Current heartbeat state.
    #[must_use]
    pub fn snapshot(&self) -> HeartbeatSnapshot {
        HeartbeatSnapshot {
            interval: self.shared.interval,
            last_sent_at: *self.shared.last_sent_at.lock(),
            ack_pending: self.shared.ack_pending.load(Ordering::Acquire),
        }
    }

    /// Cancel all pending ticks. Idempotent.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Heartbeater {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
