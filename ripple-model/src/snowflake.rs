//! Discord's snowflake ID format.

use serde::{
    de::{Deserializer, Error as DeError, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// A Discord snowflake: a 64-bit ID with a millisecond timestamp encoded in
/// its upper 42 bits.
///
/// Snowflakes are totally ordered by their numeric value, and that ordering
/// doubles as creation-time ordering. On the wire they are always encoded as
/// a decimal string, never a JSON number, since `2^63`-and-up values lose
/// precision in JavaScript's `f64`-backed number type.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Discord's custom epoch: 2015-01-01T00:00:00Z, in Unix milliseconds.
    pub const EPOCH: u64 = 1_420_070_400_000;

    /// Create a snowflake from a raw 64-bit value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Construct the snowflake that Discord would mint at `time`, with the
    /// worker/process/increment bits zeroed.
    ///
    /// # Panics
    ///
    /// Panics if `time` precedes [`Snowflake::EPOCH`].
    #[must_use]
    pub fn from_time(time: SystemTime) -> Self {
        let since_epoch = time
            .duration_since(UNIX_EPOCH + Duration::from_millis(Self::EPOCH))
            .expect("time predates the Discord epoch");

        #[allow(clippy::cast_possible_truncation)]
        let millis = since_epoch.as_millis() as u64;

        Self(millis << 22)
    }

    /// The moment this ID was minted, recoverable to millisecond resolution.
    #[must_use]
    pub fn creation_time(self) -> SystemTime {
        let millis = (self.0 >> 22) + Self::EPOCH;

        UNIX_EPOCH + Duration::from_millis(millis)
    }

    /// The raw 64-bit value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for Snowflake {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Display::fmt(&self.0, f)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("a snowflake as a string or integer")
    }

    fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
        v.parse()
            .map(Snowflake)
            .map_err(|_| DeError::invalid_value(serde::de::Unexpected::Str(v), &self))
    }

    fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Snowflake(v))
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::Snowflake;
    use serde_test::Token;
    use static_assertions::assert_impl_all;
    use std::{fmt::Debug, hash::Hash, time::Duration};

    assert_impl_all!(Snowflake: Clone, Copy, Debug, Eq, Hash, Ord, PartialOrd, Send, Sync);

    #[test]
    fn serializes_as_a_string_but_deserializes_from_either() {
        serde_test::assert_tokens(
            &Snowflake(175_928_847_299_117_063),
            &[Token::Str("175928847299117063")],
        );
        serde_test::assert_de_tokens(
            &Snowflake(175_928_847_299_117_063),
            &[Token::U64(175_928_847_299_117_063)],
        );
    }

    #[test]
    fn epoch_constant() {
        assert_eq!(1_420_070_400_000, Snowflake::EPOCH);
    }

    #[test]
    fn round_trip_via_string() {
        for value in [0_u64, 1, u64::from(u32::MAX), u64::MAX] {
            let snowflake = Snowflake::new(value);
            let reparsed: Snowflake = snowflake.to_string().parse::<u64>().unwrap().into();

            assert_eq!(value, reparsed.get());
        }
    }

    #[test]
    fn round_trip_via_json() {
        let snowflake = Snowflake::new(175_928_847_299_117_063);
        let json = serde_json::to_string(&snowflake).unwrap();

        assert_eq!(r#""175928847299117063""#, json);
        assert_eq!(snowflake, serde_json::from_str(&json).unwrap());
    }

    #[test]
    fn from_time_round_trips_to_millisecond_resolution() {
        use std::time::{SystemTime, UNIX_EPOCH};

        let now = SystemTime::now();
        let now_millis = now.duration_since(UNIX_EPOCH).unwrap().as_millis();
        let truncated = UNIX_EPOCH + Duration::from_millis(now_millis as u64);

        let snowflake = Snowflake::from_time(truncated);

        let delta = snowflake
            .creation_time()
            .duration_since(truncated)
            .unwrap_or_else(|e| e.duration());

        assert!(delta < Duration::from_millis(1));
    }

    #[test]
    fn from_time_matches_known_date() {
        use std::time::UNIX_EPOCH;

        // 2018-04-18T04:31:40.046Z, the moment encoded by the Bot token
        // client-id snowflake used throughout the API error test fixtures.
        let expected_millis: u64 = 1_524_029_500_046;
        let time = UNIX_EPOCH + Duration::from_millis(expected_millis);
        let snowflake = Snowflake::from_time(time);

        let got_millis = snowflake
            .creation_time()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;

        assert_eq!(expected_millis, got_millis);
    }

    #[test]
    fn ordering_matches_numeric_comparison() {
        let low = Snowflake::new(1);
        let high = Snowflake::new(2);

        assert!(low < high);
        assert!(low.get() < high.get());
    }
}
