//! Outgoing gateway command payloads.
//!
//! Each type here implements [`Command`], a trait sealed against this
//! module so that [`Shard::send`] can only ever be given a payload this
//! crate knows how to map to an [`OpCode`](crate::gateway::OpCode). Callers
//! reaching for an opcode this module doesn't model yet use
//! `Shard::send_raw` with a hand-built [`Packet`](crate::gateway::Packet)
//! instead.

use serde::Serialize;

mod private {
    use super::{Heartbeat, Identify, RequestGuildMembers, Resume, UpdatePresence, UpdateVoiceState};
    use serde::Serialize;

    pub trait Sealed: Serialize {}

    impl Sealed for Heartbeat {}
    impl Sealed for Identify {}
    impl Sealed for RequestGuildMembers {}
    impl Sealed for Resume {}
    impl Sealed for UpdatePresence {}
    impl Sealed for UpdateVoiceState {}
}

/// Marker trait for payloads that [`Shard::send`](crate) can serialize into
/// a gateway command packet.
pub trait Command: private::Sealed {
    /// The opcode this payload is sent under.
    const OP: crate::gateway::OpCode;
}

/// `Heartbeat` (opcode 1): the client's last received sequence number, or
/// `None` if no dispatch has been received yet.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(transparent)]
pub struct Heartbeat {
    /// The last sequence number received, if any.
    pub sequence: Option<u64>,
}

impl Command for Heartbeat {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::Heartbeat;
}

/// The `properties` object every `Identify` payload carries, describing the
/// connecting client.
#[derive(Clone, Debug, Serialize)]
pub struct IdentifyProperties {
    /// The operating system the shard is running on.
    #[serde(rename = "$os")]
    pub os: String,
    /// The library's name.
    #[serde(rename = "$browser")]
    pub browser: String,
    /// The library's name, repeated per the gateway's documented shape.
    #[serde(rename = "$device")]
    pub device: String,
}

impl IdentifyProperties {
    /// The fixed identity this core always sends when identifying:
    /// `{os: "Linux", browser: "cryogonal", device: "cryogonal"}`, matching
    /// the connection identity Discord requires and that spec.md fixes
    /// verbatim rather than deriving from the host.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            os: "Linux".to_owned(),
            browser: "cryogonal".to_owned(),
            device: "cryogonal".to_owned(),
        }
    }
}

/// `Identify` (opcode 2): starts a new session.
#[derive(Clone, Debug, Serialize)]
pub struct Identify {
    /// The bot token to authenticate with.
    pub token: String,
    /// The client identity properties.
    pub properties: IdentifyProperties,
    /// Whether to compress the rest of the session's packets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    /// The number of members a guild must exceed before offline members
    /// stop being sent in the initial guild payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u64>,
    /// `[shard_id, shard_count]`, omitted for unsharded sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u32; 2]>,
    /// The initial presence to set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresence>,
}

impl Command for Identify {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::Identify;
}

/// `Resume` (opcode 6): resumes a previously disconnected session.
#[derive(Clone, Debug, Serialize)]
pub struct Resume {
    /// The bot token used for the original session.
    pub token: String,
    /// The session ID to resume.
    pub session_id: String,
    /// The last sequence number received before disconnecting.
    pub seq: u64,
}

impl Command for Resume {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::Resume;
}

/// `RequestGuildMembers` (opcode 8): requests offline guild members.
#[derive(Clone, Debug, Serialize)]
pub struct RequestGuildMembers {
    /// The guild to request members for.
    pub guild_id: crate::Snowflake,
    /// Filter members whose username starts with this string; an empty
    /// string requests all members when `user_ids` is not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Specific user IDs to fetch, mutually exclusive with `query`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<crate::Snowflake>>,
    /// Maximum number of members to return, or `0` for all (only valid with
    /// `query`).
    pub limit: u32,
    /// Whether to also include each member's presence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    /// A nonce echoed back in the `GUILD_MEMBERS_CHUNK` dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl Command for RequestGuildMembers {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::RequestGuildMembers;
}

/// `UpdateVoiceState` (opcode 4): joins, moves, or leaves a voice channel.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct UpdateVoiceState {
    /// The guild whose voice state is being updated.
    pub guild_id: crate::Snowflake,
    /// The voice channel to join, or `None` to leave.
    pub channel_id: Option<crate::Snowflake>,
    /// Whether to mute the client's own microphone.
    pub self_mute: bool,
    /// Whether to deafen the client's own audio.
    pub self_deaf: bool,
}

impl Command for UpdateVoiceState {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::VoiceStateUpdate;
}

/// An activity advertised as part of a presence update.
#[derive(Clone, Debug, Serialize)]
pub struct Activity {
    /// The activity's display name.
    pub name: String,
    /// The activity type, per Discord's documented integer enum.
    #[serde(rename = "type")]
    pub kind: u8,
    /// A URL, only meaningful for streaming activities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `UpdateStatus` (opcode 3, modeled here as [`UpdatePresence`]): updates the
/// client's presence.
#[derive(Clone, Debug, Serialize)]
pub struct UpdatePresence {
    /// Milliseconds since the client went idle, or `None` if active.
    pub since: Option<u64>,
    /// The activities to display.
    pub activities: Vec<Activity>,
    /// The new status string (`"online"`, `"idle"`, `"dnd"`, `"invisible"`,
    /// `"offline"`).
    pub status: String,
    /// Whether the client is AFK.
    pub afk: bool,
}

impl Command for UpdatePresence {
    const OP: crate::gateway::OpCode = crate::gateway::OpCode::StatusUpdate;
}

#[cfg(test)]
mod tests {
    use super::{Heartbeat, Identify, IdentifyProperties};
    use static_assertions::assert_impl_all;

    assert_impl_all!(Heartbeat: Send, Sync);
    assert_impl_all!(Identify: Send, Sync);

    #[test]
    fn heartbeat_serializes_as_a_bare_sequence() {
        assert_eq!("1", serde_json::to_string(&Heartbeat { sequence: Some(1) }).unwrap());
        assert_eq!("null", serde_json::to_string(&Heartbeat { sequence: None }).unwrap());
    }

    #[test]
    fn identify_properties_are_fixed() {
        let properties = IdentifyProperties::fixed();

        assert_eq!("Linux", properties.os);
        assert_eq!("cryogonal", properties.browser);
        assert_eq!("cryogonal", properties.device);
    }

    #[test]
    fn identify_omits_absent_optional_fields() {
        let identify = Identify {
            token: "Bot x".into(),
            properties: IdentifyProperties::fixed(),
            compress: None,
            large_threshold: None,
            shard: None,
            presence: None,
        };

        let json = serde_json::to_value(&identify).unwrap();
        let object = json.as_object().unwrap();

        assert!(!object.contains_key("compress"));
        assert!(!object.contains_key("shard"));
        assert!(!object.contains_key("presence"));
    }
}
