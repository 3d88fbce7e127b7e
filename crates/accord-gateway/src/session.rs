//! Session resumption bookkeeping.
//!
//! Pure decision logic, no I/O: the tracker owns the resumption token
//! (session id + last sequence number) and decides fresh-handshake vs
//! resume after a reconnect.

use tracing::warn;

/// What the next handshake should be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandshakePlan {
    /// No usable session: identify from scratch.
    Fresh,
    /// Replay missed events from a previous session.
    Resume {
        /// The session to resume.
        session_id: String,
        /// Last sequence number seen on that session.
        sequence: u64,
    },
}

/// Owns the resumption token for one logical session.
#[derive(Clone, Debug, Default)]
pub struct SessionTracker {
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
}

impl SessionTracker {
    /// A tracker with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the session established by a completed fresh handshake.
    pub fn establish(&mut self, session_id: String, resume_url: Option<String>) {
        self.session_id = Some(session_id);
        self.resume_url = resume_url;
    }

    /// Decide the next handshake from the current state.
    #[must_use]
    pub fn decide(&self) -> HandshakePlan {
        match (&self.session_id, self.sequence) {
            (Some(session_id), Some(sequence)) => HandshakePlan::Resume {
                session_id: session_id.clone(),
                sequence,
            },
            _ => HandshakePlan::Fresh,
        }
    }

    /// Record a sequence number from an event payload.
    ///
    /// Sequences are non-decreasing while a session is valid; a regression
    /// is logged (non-fatally) and the higher value is kept.
    pub fn record(&mut self, sequence: u64) {
        match self.sequence {
            Some(current) if sequence < current => {
                warn!(current, observed = sequence, "sequence regression observed");
            }
            _ => self.sequence = Some(sequence),
        }
    }

    /// React to a session-invalidated control frame.
    ///
    /// If `resumable`, the session is kept for one more resume attempt;
    /// otherwise it is cleared, forcing a fresh handshake next connect.
    pub fn on_invalidated(&mut self, resumable: bool) {
        if !resumable {
            self.clear();
        }
    }

    /// Drop all session state.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
    }

    /// Last recorded sequence, if any.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    /// The session id, if a session is established.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// The server-directed resume endpoint, if one was provided.
    #[must_use]
    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fresh_when_empty() {
        let tracker = SessionTracker::new();
        assert_eq!(tracker.decide(), HandshakePlan::Fresh);
    }

    #[test]
    fn fresh_when_session_but_no_sequence() {
        let mut tracker = SessionTracker::new();
        tracker.establish("sess-1".into(), None);
        // No events seen yet: nothing to replay from.
        assert_eq!(tracker.decide(), HandshakePlan::Fresh);
    }

    #[test]
    fn resume_when_session_and_sequence() {
        let mut tracker = SessionTracker::new();
        tracker.establish("sess-1".into(), Some("wss://resume.accord.gg".into()));
        tracker.record(12);
        assert_eq!(
            tracker.decide(),
            HandshakePlan::Resume {
                session_id: "sess-1".into(),
                sequence: 12,
            }
        );
        assert_eq!(tracker.resume_url(), Some("wss://resume.accord.gg"));
    }

    #[test]
    fn record_keeps_maximum() {
        let mut tracker = SessionTracker::new();
        tracker.record(5);
        tracker.record(9);
        tracker.record(3); // regression, logged and ignored
        assert_eq!(tracker.sequence(), Some(9));
    }

    #[test]
    fn invalidated_resumable_keeps_session() {
        let mut tracker = SessionTracker::new();
        tracker.establish("sess-1".into(), None);
        tracker.record(7);
        tracker.on_invalidated(true);
        assert_eq!(
            tracker.decide(),
            HandshakePlan::Resume {
                session_id: "sess-1".into(),
                sequence: 7,
            }
        );
    }

    #[test]
    fn invalidated_not_resumable_clears_session() {
        let mut tracker = SessionTracker::new();
        tracker.establish("sess-1".into(), None);
        tracker.record(7);
        tracker.on_invalidated(false);
        assert_eq!(tracker.decide(), HandshakePlan::Fresh);
        assert_eq!(tracker.sequence(), None);
        assert!(tracker.session_id().is_none());
    }

    #[test]
    fn clear_resets_everything() {
        let mut tracker = SessionTracker::new();
        tracker.establish("sess-1".into(), Some("wss://x".into()));
        tracker.record(1);
        tracker.clear();
        assert!(tracker.session_id().is_none());
        assert!(tracker.sequence().is_none());
        assert!(tracker.resume_url().is_none());
    }

    proptest! {
        /// For any sequence of recorded values, the tracker holds the
        /// maximum observed so far.
        #[test]
        fn recorded_sequence_is_running_max(values in proptest::collection::vec(0u64..10_000, 1..50)) {
            let mut tracker = SessionTracker::new();
            for v in &values {
                tracker.record(*v);
            }
            prop_assert_eq!(tracker.sequence(), values.iter().copied().max());
        }
    }
}
