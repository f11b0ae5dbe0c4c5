//! Tagged credential strings with inferred kind and safe redaction.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// The kind of credential a [`Token`] carries, inferred from its prefix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum TokenKind {
    /// No token was provided.
    Empty,
    /// A bot token (`Bot <token>`).
    Bot,
    /// HTTP Basic credentials (`Basic <token>`).
    Basic,
    /// An OAuth2 bearer token (`Bearer <token>`).
    Bearer,
    /// A non-empty string that doesn't match any known prefix.
    Unknown,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Empty => "Empty",
            Self::Bot => "Bot",
            Self::Basic => "Basic",
            Self::Bearer => "Bearer",
            Self::Unknown => "Unknown",
        })
    }
}

/// A credential string paired with its inferred [`TokenKind`].
///
/// The raw value is sensitive and is never exposed by [`Debug`]; only
/// [`Token::kind`] and, for [`TokenKind::Bot`] tokens, the derived
/// [`Token::client_id`] are safe to render. Use [`Token::authorization`] to
/// obtain the full value when building the `Authorization` header — that is
/// the one place the raw string is meant to leave this type.
#[derive(Clone)]
pub struct Token {
    raw: Box<str>,
    kind: TokenKind,
}

impl Token {
    /// Wrap a raw credential string, inferring its [`TokenKind`] by prefix.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into().into_boxed_str();
        let kind = if raw.is_empty() {
            TokenKind::Empty
        } else if raw.starts_with("Bot ") {
            TokenKind::Bot
        } else if raw.starts_with("Basic ") {
            TokenKind::Basic
        } else if raw.starts_with("Bearer ") {
            TokenKind::Bearer
        } else {
            TokenKind::Unknown
        };

        Self { raw, kind }
    }

    /// The inferred kind of this token.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// The full credential string, suitable only for the `Authorization`
    /// header of an outgoing request.
    #[must_use]
    pub fn authorization(&self) -> &str {
        &self.raw
    }

    /// For a [`TokenKind::Bot`] token, the application/client ID embedded in
    /// the token, derived by base64-decoding the segment before the first
    /// `.` in the payload following the `Bot ` prefix.
    ///
    /// Returns `None` for any other kind, or if the embedded segment is not
    /// valid base64 or not a valid decimal integer once decoded.
    #[must_use]
    pub fn client_id(&self) -> Option<u64> {
        if self.kind != TokenKind::Bot {
            return None;
        }

        let payload = self.raw.strip_prefix("Bot ")?;
        let segment = payload.split('.').next()?;

        let decoded = STANDARD_NO_PAD
            .decode(segment.trim_end_matches('='))
            .ok()?;
        let text = std::str::from_utf8(&decoded).ok()?;

        text.parse().ok()
    }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut debug = f.debug_struct("Token");
        debug.field("kind", &self.kind);

        if let Some(client_id) = self.client_id() {
            debug.field("client_id", &client_id);
        }

        debug.finish()
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::{Token, TokenKind};
    use static_assertions::assert_impl_all;

    assert_impl_all!(Token: Clone, Send, Sync);

    #[test]
    fn kind_inference() {
        assert_eq!(TokenKind::Empty, Token::new("").kind());
        assert_eq!(TokenKind::Unknown, Token::new("abc").kind());
        assert_eq!(TokenKind::Bot, Token::new("Bot foo").kind());
        assert_eq!(TokenKind::Basic, Token::new("Basic foo").kind());
        assert_eq!(TokenKind::Bearer, Token::new("Bearer foo").kind());
    }

    #[test]
    fn bot_client_id_derivation() {
        let token = Token::new(
            "Bot MzI2NzIxNjMxODYwOTQ4OTky.XTXqrw.A0dA46HlGf4Fiv6XgDr3MGHf8gs",
        );

        assert_eq!(Some(326_721_631_860_948_992), token.client_id());
    }

    #[test]
    fn non_bot_tokens_have_no_client_id() {
        assert_eq!(None, Token::new("Bearer abc.def.ghi").client_id());
        assert_eq!(None, Token::new("").client_id());
    }

    #[test]
    fn debug_never_leaks_the_raw_value_or_secret_tail() {
        let token = Token::new(
            "Bot MzI2NzIxNjMxODYwOTQ4OTky.XTXqrw.A0dA46HlGf4Fiv6XgDr3MGHf8gs",
        );
        let rendered = format!("{:?}", token);

        assert!(rendered.contains("client_id=326721631860948992") || rendered.contains("326721631860948992"));
        assert!(!rendered.contains("XTXqrw"));
        assert!(!rendered.contains("A0dA46HlGf4Fiv6XgDr3MGHf8gs"));
        assert!(!rendered.contains(token.authorization()));
    }

    #[test]
    fn debug_of_non_bot_token_carries_only_kind() {
        let token = Token::new("Bearer sensitive-value");
        let rendered = format!("{:?}", token);

        assert!(!rendered.contains("sensitive-value"));
        assert!(rendered.contains("Bearer"));
    }
}
