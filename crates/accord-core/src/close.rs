//! Close-code classification for the persistent connection.
//!
//! When the gateway closes the socket it attaches a numeric close code. The
//! code decides what the reconnect loop does next: resume the session,
//! re-identify from scratch, or give up. The table below carries the
//! platform defaults; deployments with different numbering override
//! individual codes via [`CloseCodePolicy::with_action`].

use std::collections::HashMap;

/// What to do after the connection closes with a given code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseAction {
    /// Reconnect and replay with the existing session.
    Resume,
    /// Reconnect, clear the session, and perform a fresh handshake.
    Reidentify,
    /// Terminal failure; surface to the application, no retry.
    Fatal,
}

/// Classification table mapping close codes to [`CloseAction`]s.
#[derive(Clone, Debug)]
pub struct CloseCodePolicy {
    overrides: HashMap<u16, CloseAction>,
}

impl CloseCodePolicy {
    /// The platform default table.
    ///
    /// - Re-identify (fresh handshake, session cleared): 4001 unknown
    ///   opcode, 4002 decode error, 4005 already authenticated, 4007
    ///   invalid sequence
    /// - Fatal (no retry): 4004 authentication failed, 4011 sharding
    ///   required, 4013 invalid intents, 4014 disallowed intents
    /// - Everything else, including abnormal closures without a code,
    ///   resumes.
    #[must_use]
    pub fn platform_default() -> Self {
        let mut overrides = HashMap::new();
        for code in [4001, 4002, 4005, 4007] {
            let _ = overrides.insert(code, CloseAction::Reidentify);
        }
        for code in [4004, 4011, 4013, 4014] {
            let _ = overrides.insert(code, CloseAction::Fatal);
        }
        Self { overrides }
    }

    /// An empty table: every close resumes.
    #[must_use]
    pub fn resume_all() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Override the action for a single code.
    #[must_use]
    pub fn with_action(mut self, code: u16, action: CloseAction) -> Self {
        let _ = self.overrides.insert(code, action);
        self
    }

    /// Classify a close code. `None` (no code observed) resumes.
    #[must_use]
    pub fn classify(&self, code: Option<u16>) -> CloseAction {
        code.and_then(|c| self.overrides.get(&c).copied())
            .unwrap_or(CloseAction::Resume)
    }
}

impl Default for CloseCodePolicy {
    fn default() -> Self {
        Self::platform_default()
    }
}
