//! Tolerant parsing of Discord's `X-RateLimit-*` response headers.

use http::HeaderMap;

use crate::error::{UpdateError, UpdateErrorType};

/// The subset of rate-limit response headers this crate acts on, parsed out
/// of an [`http::HeaderMap`] but not yet interpreted into a reset instant —
/// that interpretation needs a clock reference the headers themselves don't
/// carry.
#[derive(Debug, Default)]
pub struct RawHeaders {
    /// `X-RateLimit-Bucket`: the server-assigned bucket id.
    pub bucket: Option<Box<str>>,
    /// `X-RateLimit-Limit`: requests permitted per window.
    pub limit: Option<u64>,
    /// `X-RateLimit-Remaining`: requests left in the current window.
    pub remaining: Option<u64>,
    /// `X-RateLimit-Reset`: UNIX timestamp, in fractional seconds, the
    /// current window resets at.
    pub reset: Option<f64>,
    /// `Retry-After`: milliseconds the caller must wait before retrying,
    /// present on `429` responses (both global and per-route).
    pub retry_after: Option<f64>,
    /// `Date`: the server's clock at the time of the response, used as the
    /// reference point for `Retry-After`.
    pub date: Option<Box<str>>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, UpdateError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    value
        .to_str()
        .map(Some)
        .map_err(|_| UpdateErrorType::Parsing {
            name,
            value: String::from_utf8_lossy(value.as_bytes()).into(),
        })
        .map_err(UpdateError::from)
}

fn header_f64(headers: &HeaderMap, name: &'static str) -> Result<Option<f64>, UpdateError> {
    let Some(raw) = header_str(headers, name)? else {
        return Ok(None);
    };

    raw.parse()
        .map(Some)
        .map_err(|_| UpdateError::from(UpdateErrorType::Parsing { name, value: raw.into() }))
}

fn header_u64(headers: &HeaderMap, name: &'static str) -> Result<Option<u64>, UpdateError> {
    let Some(raw) = header_str(headers, name)? else {
        return Ok(None);
    };

    raw.parse()
        .map(Some)
        .map_err(|_| UpdateError::from(UpdateErrorType::Parsing { name, value: raw.into() }))
}

impl From<UpdateErrorType> for UpdateError {
    fn from(kind: UpdateErrorType) -> Self {
        Self { kind, source: None }
    }
}

/// Parse the rate-limit headers this crate recognizes out of `headers`.
/// Every field is optional: Discord omits the whole family on routes with no
/// bucket, and only sends `Retry-After`/`X-RateLimit-Global` on `429`s.
///
/// # Errors
///
/// Returns an error if a present header's value isn't valid UTF-8 or
/// doesn't parse as the expected number.
pub fn parse_raw(headers: &HeaderMap) -> Result<RawHeaders, UpdateError> {
    Ok(RawHeaders {
        bucket: header_str(headers, "x-ratelimit-bucket")?.map(Into::into),
        limit: header_u64(headers, "x-ratelimit-limit")?,
        remaining: header_u64(headers, "x-ratelimit-remaining")?,
        reset: header_f64(headers, "x-ratelimit-reset")?,
        retry_after: header_f64(headers, "retry-after")?,
        date: header_str(headers, "date")?.map(Into::into),
    })
}

#[cfg(test)]
mod tests {
    use super::parse_raw;
    use http::HeaderMap;

    #[test]
    fn missing_headers_parse_to_all_none() {
        let headers = HeaderMap::new();
        let raw = parse_raw(&headers).expect("parses");

        assert_eq!(None, raw.bucket);
        assert_eq!(None, raw.limit);
        assert_eq!(None, raw.retry_after);
    }

    #[test]
    fn present_headers_parse_their_values() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-bucket", "abcd1234".parse().unwrap());
        headers.insert("x-ratelimit-limit", "5".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "3".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1700000000.5".parse().unwrap());

        let raw = parse_raw(&headers).expect("parses");

        assert_eq!(Some("abcd1234".into()), raw.bucket);
        assert_eq!(Some(5), raw.limit);
        assert_eq!(Some(3), raw.remaining);
        assert_eq!(Some(1_700_000_000.5), raw.reset);
    }

    #[test]
    fn unparsable_numeric_header_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-remaining", "not-a-number".parse().unwrap());

        assert!(parse_raw(&headers).is_err());
    }
}
