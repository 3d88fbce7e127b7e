//! Gateway wire envelope and control opcodes.
//!
//! Every frame on the persistent connection is a [`GatewayPayload`]:
//! `{op, d, s, t}`. The `s` sequence number and `t` event name are only
//! present on `Dispatch` frames. The envelope matches the platform wire
//! format exactly — field names are part of the protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::intents::Intents;

/// Gateway control opcode.
///
/// Consumed: `Dispatch`, `Heartbeat`, `Reconnect`, `InvalidSession`,
/// `Hello`, `HeartbeatAck`. Produced: `Heartbeat`, `Identify`, `Resume`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Opcode {
    /// An event pushed by the server (carries `s` and `t`).
    Dispatch,
    /// Liveness ping; also sent by the server to request an immediate beat.
    Heartbeat,
    /// Fresh handshake with token and intents.
    Identify,
    /// Replay handshake with session id and last sequence.
    Resume,
    /// Server asks the client to disconnect and resume.
    Reconnect,
    /// The session was invalidated; `d` is a bool: resumable or not.
    InvalidSession,
    /// First frame after connect; `d.heartbeat_interval_ms` dictates pacing.
    Hello,
    /// Acknowledgement of a client heartbeat.
    HeartbeatAck,
    /// Opcode this client does not recognize.
    Unknown(u8),
}

impl From<u8> for Opcode {
    fn from(raw: u8) -> Self {
        match raw {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            other => Self::Unknown(other),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        match op {
            Opcode::Dispatch => 0,
            Opcode::Heartbeat => 1,
            Opcode::Identify => 2,
            Opcode::Resume => 6,
            Opcode::Reconnect => 7,
            Opcode::InvalidSession => 9,
            Opcode::Hello => 10,
            Opcode::HeartbeatAck => 11,
            Opcode::Unknown(raw) => raw,
        }
    }
}

/// The gateway event envelope: `{op, d, s, t}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Control opcode.
    pub op: Opcode,
    /// Opcode-specific payload.
    #[serde(default)]
    pub d: Value,
    /// Sequence number; present only on `Dispatch` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Event name; present only on `Dispatch` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Build a control payload with no sequence or event name.
    #[must_use]
    pub fn control(op: Opcode, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// Build a `Heartbeat` frame carrying the last seen sequence.
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        let d = sequence.map_or(Value::Null, |s| json!(s));
        Self::control(Opcode::Heartbeat, d)
    }

    /// Build an `Identify` frame for a fresh handshake.
    #[must_use]
    pub fn identify(token: &str, intents: Intents, properties: &Value) -> Self {
        Self::control(
            Opcode::Identify,
            json!({
                "token": token,
                "intents": intents.bits(),
                "properties": properties,
            }),
        )
    }

    /// Build a `Resume` frame replaying a previous session.
    #[must_use]
    pub fn resume(token: &str, session_id: &str, sequence: u64) -> Self {
        Self::control(
            Opcode::Resume,
            json!({
                "token": token,
                "session_id": session_id,
                "seq": sequence,
            }),
        )
    }

    /// The heartbeat interval from a `Hello` frame, if present and sane.
    #[must_use]
    pub fn hello_heartbeat_interval_ms(&self) -> Option<u64> {
        if self.op != Opcode::Hello {
            return None;
        }
        self.d
            .get("heartbeat_interval_ms")
            .and_then(Value::as_u64)
            .filter(|ms| *ms > 0)
    }

    /// Whether an `InvalidSession` frame flags the session as resumable.
    ///
    /// Absent or malformed `d` is treated as not resumable — the safe
    /// direction is a fresh handshake.
    #[must_use]
    pub fn invalid_session_resumable(&self) -> bool {
        self.op == Opcode::InvalidSession && self.d.as_bool().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrip_known() {
        for raw in [0u8, 1, 2, 6, 7, 9, 10, 11] {
            let op = Opcode::from(raw);
            assert_eq!(u8::from(op), raw);
            assert!(!matches!(op, Opcode::Unknown(_)));
        }
    }

    #[test]
    fn opcode_unknown_preserves_value() {
        let op = Opcode::from(42);
        assert_eq!(op, Opcode::Unknown(42));
        assert_eq!(u8::from(op), 42);
    }

    #[test]
    fn dispatch_envelope_deserializes() {
        let raw = r#"{"op":0,"d":{"id":"1"},"s":42,"t":"CHANNEL_UPDATE"}"#;
        let payload: GatewayPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.op, Opcode::Dispatch);
        assert_eq!(payload.s, Some(42));
        assert_eq!(payload.t.as_deref(), Some("CHANNEL_UPDATE"));
        assert_eq!(payload.d["id"], "1");
    }

    #[test]
    fn control_envelope_omits_s_and_t() {
        let payload = GatewayPayload::heartbeat(Some(7));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["op"], 1);
        assert_eq!(json["d"], 7);
        assert!(json.get("s").is_none());
        assert!(json.get("t").is_none());
    }

    #[test]
    fn heartbeat_without_sequence_sends_null() {
        let payload = GatewayPayload::heartbeat(None);
        assert_eq!(payload.d, Value::Null);
    }

    #[test]
    fn identify_carries_token_and_intents() {
        let payload = GatewayPayload::identify(
            "tok",
            Intents::GUILDS | Intents::GUILD_MEMBERS,
            &json!({"os": "linux"}),
        );
        assert_eq!(payload.op, Opcode::Identify);
        assert_eq!(payload.d["token"], "tok");
        assert_eq!(
            payload.d["intents"],
            (Intents::GUILDS | Intents::GUILD_MEMBERS).bits()
        );
        assert_eq!(payload.d["properties"]["os"], "linux");
    }

    #[test]
    fn resume_carries_session_and_sequence() {
        let payload = GatewayPayload::resume("tok", "sess-1", 99);
        assert_eq!(payload.op, Opcode::Resume);
        assert_eq!(payload.d["session_id"], "sess-1");
        assert_eq!(payload.d["seq"], 99);
    }

    #[test]
    fn hello_interval_extraction() {
        let payload = GatewayPayload::control(
            Opcode::Hello,
            json!({"heartbeat_interval_ms": 41_250}),
        );
        assert_eq!(payload.hello_heartbeat_interval_ms(), Some(41_250));
    }

    #[test]
    fn hello_interval_rejects_zero_and_missing() {
        let zero =
            GatewayPayload::control(Opcode::Hello, json!({"heartbeat_interval_ms": 0}));
        assert_eq!(zero.hello_heartbeat_interval_ms(), None);

        let missing = GatewayPayload::control(Opcode::Hello, json!({}));
        assert_eq!(missing.hello_heartbeat_interval_ms(), None);
    }

    #[test]
    fn hello_interval_on_wrong_opcode_is_none() {
        let payload = GatewayPayload::control(
            Opcode::Dispatch,
            json!({"heartbeat_interval_ms": 41_250}),
        );
        assert_eq!(payload.hello_heartbeat_interval_ms(), None);
    }

    #[test]
    fn invalid_session_resumable_flag() {
        let resumable = GatewayPayload::control(Opcode::InvalidSession, json!(true));
        assert!(resumable.invalid_session_resumable());

        let not_resumable = GatewayPayload::control(Opcode::InvalidSession, json!(false));
        assert!(!not_resumable.invalid_session_resumable());
    }

    #[test]
    fn invalid_session_malformed_d_is_not_resumable() {
        let malformed = GatewayPayload::control(Opcode::InvalidSession, json!({"x": 1}));
        assert!(!malformed.invalid_session_resumable());

        let null = GatewayPayload::control(Opcode::InvalidSession, Value::Null);
        assert!(!null.invalid_session_resumable());
    }

    #[test]
    fn missing_d_defaults_to_null() {
        let raw = r#"{"op":11}"#;
        let payload: GatewayPayload = serde_json::from_str(raw).unwrap();
        assert_eq!(payload.op, Opcode::HeartbeatAck);
        assert_eq!(payload.d, Value::Null);
    }
}
