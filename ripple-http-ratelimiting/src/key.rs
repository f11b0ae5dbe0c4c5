//! The identity a caller addresses a rate-limit [`Bucket`](crate::Bucket) by.
//!
//! A [`LimitKey`] is deliberately not the request URL: it names a route
//! *template* (`route_tag`) plus the major path parameter that partitions an
//! otherwise shared route into independent server-side buckets. The server
//! bucket a key ultimately resolves to is only discoverable from a response,
//! which is why [`crate::Ratelimiter`] keeps a second index from bucket id
//! back to the same [`Bucket`](crate::Bucket) instance.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// The kind of major parameter partitioning a route's rate limit, if any.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum MajorParameter {
    /// The route has no major parameter.
    None,
    /// The route is partitioned per channel.
    ChannelId,
    /// The route is partitioned per guild.
    GuildId,
    /// The route is partitioned per webhook.
    WebhookId,
}

impl Display for MajorParameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::None => "none",
            Self::ChannelId => "channel_id",
            Self::GuildId => "guild_id",
            Self::WebhookId => "webhook_id",
        })
    }
}

/// Identifies a caller's logical route for the purpose of rate-limit bucket
/// lookup. Two keys with the same fields are the same route for this
/// purpose, regardless of anything else about the request.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct LimitKey {
    /// A caller-chosen symbol identifying a route template. This is not the
    /// URL — e.g. `"get_channel_message"`, not `/channels/123/messages/456`.
    pub route_tag: &'static str,
    /// The kind of major parameter this route carries, if any.
    pub major_parameter: MajorParameter,
    /// The value of the major parameter, absent iff `major_parameter` is
    /// [`MajorParameter::None`].
    pub major_parameter_id: Option<u64>,
}

impl LimitKey {
    /// A key for a route with no major parameter.
    #[must_use]
    pub const fn new(route_tag: &'static str) -> Self {
        Self {
            route_tag,
            major_parameter: MajorParameter::None,
            major_parameter_id: None,
        }
    }

    /// A key for a route partitioned by channel.
    #[must_use]
    pub const fn with_channel(route_tag: &'static str, channel_id: u64) -> Self {
        Self {
            route_tag,
            major_parameter: MajorParameter::ChannelId,
            major_parameter_id: Some(channel_id),
        }
    }

    /// A key for a route partitioned by guild.
    #[must_use]
    pub const fn with_guild(route_tag: &'static str, guild_id: u64) -> Self {
        Self {
            route_tag,
            major_parameter: MajorParameter::GuildId,
            major_parameter_id: Some(guild_id),
        }
    }

    /// A key for a route partitioned by webhook.
    #[must_use]
    pub const fn with_webhook(route_tag: &'static str, webhook_id: u64) -> Self {
        Self {
            route_tag,
            major_parameter: MajorParameter::WebhookId,
            major_parameter_id: Some(webhook_id),
        }
    }

    /// The key for Discord's account-wide global rate limit.
    #[must_use]
    pub const fn global() -> Self {
        Self::new("global")
    }
}

impl Display for LimitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.route_tag)?;

        if let Some(id) = self.major_parameter_id {
            write!(f, "[{}={}]", self.major_parameter, id)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LimitKey, MajorParameter};
    use static_assertions::assert_impl_all;

    assert_impl_all!(LimitKey: Copy, Eq, Send, Sync);

    #[test]
    fn equality_is_structural() {
        let a = LimitKey::with_channel("get_messages", 1);
        let b = LimitKey::with_channel("get_messages", 1);
        let c = LimitKey::with_channel("get_messages", 2);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn global_has_no_major_parameter() {
        let global = LimitKey::global();

        assert_eq!(MajorParameter::None, global.major_parameter);
        assert_eq!(None, global.major_parameter_id);
    }

    #[test]
    fn display_includes_the_major_parameter_when_present() {
        let key = LimitKey::with_guild("get_guild", 42);

        assert_eq!("get_guild[guild_id=42]", key.to_string());
        assert_eq!("global", LimitKey::global().to_string());
    }
}
