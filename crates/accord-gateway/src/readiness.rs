//! Composite readiness signal.
//!
//! Merges N independent "subsystem ready" signals into one awaitable
//! condition. Requirements register before startup; each signals exactly
//! once; any number of tasks can await the composite. A signal that
//! arrives before anyone waits is remembered, not lost.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Multi-waiter, single-completer-per-requirement readiness gate.
#[derive(Debug, Default)]
pub struct ReadinessGate {
    requirements: Mutex<HashMap<String, bool>>,
    notify: Notify,
}

impl ReadinessGate {
    /// An empty gate. With no requirements registered it reads as ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named requirement. Must happen before waiting makes
    /// sense; registering the same name twice is a no-op.
    pub fn register(&self, name: &str) {
        let mut reqs = self.requirements.lock();
        if !reqs.contains_key(name) {
            let _ = reqs.insert(name.to_owned(), false);
        }
    }

    /// Mark a requirement satisfied. Signalling a name twice is ignored
    /// with a warning; signalling an unregistered name registers it
    /// satisfied so an early signal is never lost.
    pub fn signal(&self, name: &str) {
        {
            let mut reqs = self.requirements.lock();
            match reqs.get_mut(name) {
                Some(satisfied) if *satisfied => {
                    warn!(name, "readiness requirement signalled more than once");
                    return;
                }
                Some(satisfied) => *satisfied = true,
                None => {
                    debug!(name, "signal before registration; remembering");
                    let _ = reqs.insert(name.to_owned(), true);
                }
            }
        }
        self.notify.notify_waiters();
    }

    /// Whether every registered requirement has signalled.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.requirements.lock().values().all(|satisfied| *satisfied)
    }

    /// Names of requirements that have not signalled yet.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .requirements
            .lock()
            .iter()
            .filter(|(_, satisfied)| !**satisfied)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Suspend until every registered requirement has signalled.
    ///
    /// Returns immediately if already ready. Any number of tasks can wait
    /// concurrently.
    pub async fn wait_ready(&self) {
        loop {
            // Arm the notification before checking to avoid a missed
            // wakeup between the check and the await.
            let notified = self.notify.notified();
            if self.is_ready() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn ready_immediately_when_all_signalled() {
        let gate = ReadinessGate::new();
        gate.register("gateway");
        gate.register("cache");
        gate.signal("gateway");
        gate.signal("cache");
        // Must not hang.
        tokio::time::timeout(Duration::from_secs(1), gate.wait_ready())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn waits_for_last_requirement() {
        let gate = Arc::new(ReadinessGate::new());
        gate.register("a");
        gate.register("b");
        gate.signal("a");

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.wait_ready().await })
        };
        assert!(!waiter.is_finished());

        gate.signal("b");
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn multiple_waiters_all_released() {
        let gate = Arc::new(ReadinessGate::new());
        gate.register("only");

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                tokio::spawn(async move { gate.wait_ready().await })
            })
            .collect();

        gate.signal("only");
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[test]
    fn signal_before_registration_is_remembered() {
        let gate = ReadinessGate::new();
        gate.signal("early");
        gate.register("early"); // no-op: already present and satisfied
        assert!(gate.is_ready());
    }

    #[test]
    fn duplicate_signal_is_ignored() {
        let gate = ReadinessGate::new();
        gate.register("x");
        gate.signal("x");
        gate.signal("x"); // warned, not a second completion
        assert!(gate.is_ready());
    }

    #[test]
    fn pending_lists_unsatisfied() {
        let gate = ReadinessGate::new();
        gate.register("b");
        gate.register("a");
        gate.register("c");
        gate.signal("b");
        assert_eq!(gate.pending(), vec!["a".to_owned(), "c".to_owned()]);
    }

    #[test]
    fn empty_gate_is_ready() {
        let gate = ReadinessGate::new();
        assert!(gate.is_ready());
    }

    #[tokio::test]
    async fn unsatisfied_gate_blocks() {
        let gate = ReadinessGate::new();
        gate.register("never");
        let result =
            tokio::time::timeout(Duration::from_millis(50), gate.wait_ready()).await;
        assert!(result.is_err(), "gate should still be waiting");
    }
}
