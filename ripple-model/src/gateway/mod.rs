//! The gateway wire envelope: opcodes, the [`Packet`] type, and outgoing
//! command payloads.

pub mod payload;

use serde::{
    de::{Deserialize, Deserializer, Error as DeError, MapAccess, Visitor},
    ser::{Serialize, SerializeStruct, Serializer},
};
use serde_json::value::RawValue;
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt::{Formatter, Result as FmtResult};

/// A gateway opcode, tagging the meaning of a [`Packet`]'s `d` field.
///
/// This enumeration is intentionally not exhaustive in spirit (the core is
/// "opcode-extensible, not opcode-complete" per design) but is declared as a
/// closed `repr(u8)` enum since every opcode Discord currently documents is
/// represented; unknown opcodes fail to deserialize rather than silently
/// being dropped, and callers who need to emit an opcode this enum doesn't
/// name yet can still do so via a raw [`Packet`].
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, Hash, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum OpCode {
    /// An event dispatch, carrying a named event in `t`.
    Dispatch = 0,
    /// A heartbeat, sent both ways.
    Heartbeat = 1,
    /// Starts a new session during the initial handshake.
    Identify = 2,
    /// Update the client's presence.
    StatusUpdate = 3,
    /// Join/leave/move between voice channels.
    VoiceStateUpdate = 4,
    /// Ping the voice gateway.
    VoiceServerPing = 5,
    /// Resume a previously disconnected session.
    Resume = 6,
    /// Tells the client to reconnect and resume.
    Reconnect = 7,
    /// Requests information about offline guild members.
    RequestGuildMembers = 8,
    /// The session has been invalidated; a full reconnect is required.
    InvalidSession = 9,
    /// Sent on connection establishment, contains `heartbeat_interval`.
    Hello = 10,
    /// Acknowledges a client heartbeat.
    HeartbeatAck = 11,
}

/// The gateway's wire-level message envelope.
///
/// `data` is deliberately an un-typed, re-parseable blob: the core captures
/// whatever JSON value was under `d` without interpreting it, so that a
/// downstream typed parser picks an event-specific shape to deserialize into
/// lazily. This keeps the core opcode- and event-extensible without a
/// library update.
#[derive(Debug)]
pub struct Packet {
    /// The opcode tagging this packet's meaning.
    pub op: OpCode,
    /// The sequence number, present only on [`OpCode::Dispatch`] packets.
    pub sequence: Option<u64>,
    /// The raw, unparsed `d` payload.
    pub data: Box<RawValue>,
    /// The dispatch event name, present only on [`OpCode::Dispatch`] packets.
    pub event_type: Option<Box<str>>,
}

impl Clone for Packet {
    fn clone(&self) -> Self {
        Self {
            op: self.op,
            sequence: self.sequence,
            data: RawValue::from_string(self.data.get().to_owned())
                .expect("RawValue::get() always returns valid JSON text"),
            event_type: self.event_type.clone(),
        }
    }
}

#[derive(serde::Deserialize)]
#[serde(field_identifier, rename_all = "lowercase")]
enum Field {
    D,
    Op,
    S,
    T,
}

struct PacketVisitor;

impl<'de> Visitor<'de> for PacketVisitor {
    type Value = Packet;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a gateway packet with op, s, d, and t fields")
    }

    fn visit_map<V: MapAccess<'de>>(self, mut map: V) -> Result<Packet, V::Error> {
        let mut op = None;
        let mut sequence = None;
        let mut data = None;
        let mut event_type = None;

        while let Some(key) = map.next_key()? {
            match key {
                Field::Op => {
                    if op.is_some() {
                        return Err(DeError::duplicate_field("op"));
                    }

                    op = Some(map.next_value()?);
                }
                Field::S => {
                    if sequence.is_some() {
                        return Err(DeError::duplicate_field("s"));
                    }

                    sequence = map.next_value::<Option<u64>>()?;
                }
                Field::D => {
                    if data.is_some() {
                        return Err(DeError::duplicate_field("d"));
                    }

                    data = Some(map.next_value::<Box<RawValue>>()?);
                }
                Field::T => {
                    if event_type.is_some() {
                        return Err(DeError::duplicate_field("t"));
                    }

                    event_type = map.next_value::<Option<Box<str>>>()?;
                }
            }
        }

        let op = op.ok_or_else(|| DeError::missing_field("op"))?;
        let data = data.ok_or_else(|| DeError::missing_field("d"))?;

        Ok(Packet {
            op,
            sequence,
            data,
            event_type,
        })
    }
}

impl<'de> Deserialize<'de> for Packet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PacketVisitor)
    }
}

impl Serialize for Packet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Packet", 4)?;
        state.serialize_field("op", &self.op)?;
        state.serialize_field("s", &self.sequence)?;
        state.serialize_field("d", &self.data)?;
        state.serialize_field("t", &self.event_type)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::{OpCode, Packet};
    use static_assertions::assert_impl_all;

    assert_impl_all!(Packet: Clone, Send, Sync);
    assert_impl_all!(OpCode: Clone, Copy, Eq, Send, Sync);

    #[test]
    fn opcode_discriminants_match_the_protocol() {
        assert_eq!(0, OpCode::Dispatch as u8);
        assert_eq!(1, OpCode::Heartbeat as u8);
        assert_eq!(2, OpCode::Identify as u8);
        assert_eq!(3, OpCode::StatusUpdate as u8);
        assert_eq!(4, OpCode::VoiceStateUpdate as u8);
        assert_eq!(5, OpCode::VoiceServerPing as u8);
        assert_eq!(6, OpCode::Resume as u8);
        assert_eq!(7, OpCode::Reconnect as u8);
        assert_eq!(8, OpCode::RequestGuildMembers as u8);
        assert_eq!(9, OpCode::InvalidSession as u8);
        assert_eq!(10, OpCode::Hello as u8);
        assert_eq!(11, OpCode::HeartbeatAck as u8);
    }

    #[test]
    fn packet_round_trip_is_byte_identical_for_known_fields() {
        let input = r#"{"op":0,"s":1,"d":{"foo":"bar"},"t":"event type"}"#;
        let packet: Packet = serde_json::from_str(input).unwrap();

        assert_eq!(OpCode::Dispatch, packet.op);
        assert_eq!(Some(1), packet.sequence);
        assert_eq!(Some("event type".into()), packet.event_type);
        assert_eq!(r#"{"foo":"bar"}"#, packet.data.get());

        let output = serde_json::to_string(&packet).unwrap();
        let reparsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let expected: serde_json::Value = serde_json::from_str(input).unwrap();

        assert_eq!(expected, reparsed);
    }

    #[test]
    fn packet_without_sequence_or_event_type() {
        let input = r#"{"op":11,"s":null,"d":null,"t":null}"#;
        let packet: Packet = serde_json::from_str(input).unwrap();

        assert_eq!(OpCode::HeartbeatAck, packet.op);
        assert_eq!(None, packet.sequence);
        assert_eq!(None, packet.event_type);
        assert_eq!("null", packet.data.get());
    }

    #[test]
    fn clone_preserves_the_raw_payload() {
        let input = r#"{"op":0,"s":1,"d":{"a":[1,2,3]},"t":"x"}"#;
        let packet: Packet = serde_json::from_str(input).unwrap();
        let cloned = packet.clone();

        assert_eq!(packet.data.get(), cloned.data.get());
    }
}
