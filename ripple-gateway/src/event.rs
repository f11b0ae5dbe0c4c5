//! The event stream a [`Shard`](crate::shard::Shard) exposes to its caller.

use ripple_model::gateway::Packet;

/// A close frame observed on the wire.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Close {
    /// The 16-bit close code.
    pub code: u16,
    /// The UTF-8 reason, if the close frame carried one.
    pub reason: Option<String>,
}

/// Decode a WebSocket close frame payload: a big-endian `u16` code followed
/// by an optional UTF-8 reason.
///
/// Returns `None` if `payload` is shorter than 2 bytes (an empty close
/// frame carries no code at all).
#[must_use]
pub fn decode_close_payload(payload: &[u8]) -> Option<Close> {
    if payload.len() < 2 {
        return None;
    }

    let code = u16::from_be_bytes([payload[0], payload[1]]);
    let reason = if payload.len() > 2 {
        Some(String::from_utf8_lossy(&payload[2..]).into_owned())
    } else {
        None
    };

    Some(Close { code, reason })
}

/// Encode a close code and optional reason back into wire form.
#[must_use]
pub fn encode_close_payload(code: u16, reason: Option<&str>) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + reason.map_or(0, str::len));
    payload.extend_from_slice(&code.to_be_bytes());

    if let Some(reason) = reason {
        payload.extend_from_slice(reason.as_bytes());
    }

    payload
}

/// An event observed by a [`Shard`](crate::shard::Shard)'s consumer.
///
/// `Connected` always precedes every `Packet` of a session; `Disconnected`
/// always follows every `Packet`, with an optional `Close` immediately
/// preceding it.
#[derive(Debug)]
#[non_exhaustive]
pub enum Event {
    /// The WebSocket connection was established and the read loop is about
    /// to start.
    Connected,
    /// A gateway packet was received and decoded.
    Packet(Packet),
    /// The remote sent a close frame.
    Close(Close),
    /// The session has ended; no further events will be emitted.
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::{decode_close_payload, encode_close_payload, Close};

    #[test]
    fn two_byte_payload_yields_code_with_no_reason() {
        let close = decode_close_payload(&[0x03, 0xe8]).unwrap();

        assert_eq!(
            Close {
                code: 1000,
                reason: None,
            },
            close
        );
    }

    #[test]
    fn trailing_utf8_becomes_the_reason() {
        let payload = encode_close_payload(4000, Some("resuming connection"));
        let close = decode_close_payload(&payload).unwrap();

        assert_eq!(4000, close.code);
        assert_eq!(Some("resuming connection".to_owned()), close.reason);
    }

    #[test]
    fn payload_shorter_than_two_bytes_has_no_code() {
        assert_eq!(None, decode_close_payload(&[]));
        assert_eq!(None, decode_close_payload(&[0x01]));
    }
}
