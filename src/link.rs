//! Session join descriptors and the shareable session link format.
//!
//! A Together session is advertised as a websocket URL of the form
//! `ws://{host}:{port}/together?sid={sessionId}&key={sessionKey}`, which
//! doubles as the deep link guests paste to join. [`encode`] and [`decode`]
//! convert between [`JoinInfo`] and that link; [`candidate_urls`] derives the
//! ordered endpoint candidates (primary plus ws↔wss alternate) tried on
//! every connection attempt.
//!
//! Session ids and keys are opaque URL-safe tokens (UUIDs in practice); the
//! link format performs no percent-encoding.

/// Immutable descriptor of a session to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinInfo {
    pub host: String,
    pub port: u16,
    /// Identifies the session on the coordination server.
    pub session_id: String,
    /// Shared secret gating entry to the session.
    pub session_key: String,
}

impl JoinInfo {
    /// Create a new join descriptor.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        session_id: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            session_id: session_id.into(),
            session_key: session_key.into(),
        }
    }

    /// The primary websocket endpoint URL for this session.
    pub fn ws_url(&self) -> String {
        format!(
            "ws://{}:{}/together?sid={}&key={}",
            self.host, self.port, self.session_id, self.session_key
        )
    }
}

/// Encode a [`JoinInfo`] as a shareable session link.
pub fn encode(join: &JoinInfo) -> String {
    join.ws_url()
}

/// Decode a session link back into a [`JoinInfo`].
///
/// Accepts both `ws://` and `wss://` links. Returns `None` if the scheme,
/// authority, or the `sid`/`key` query parameters are missing or malformed.
pub fn decode(raw: &str) -> Option<JoinInfo> {
    let trimmed = raw.trim();
    let rest = trimmed
        .strip_prefix("ws://")
        .or_else(|| trimmed.strip_prefix("wss://"))?;

    let (authority, tail) = match rest.split_once('/') {
        Some((authority, tail)) => (authority, tail),
        None => (rest, ""),
    };
    let (host, port) = authority.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port: u16 = port.parse().ok()?;

    let query = tail.split_once('?').map(|(_, q)| q).unwrap_or("");
    let mut session_id = None;
    let mut session_key = None;
    for pair in query.split('&') {
        match pair.split_once('=') {
            Some(("sid", value)) if !value.is_empty() => session_id = Some(value),
            Some(("key", value)) if !value.is_empty() => session_key = Some(value),
            _ => {}
        }
    }

    Some(JoinInfo {
        host: host.to_string(),
        port,
        session_id: session_id?.to_string(),
        session_key: session_key?.to_string(),
    })
}

/// The same URL with the `ws`/`wss` scheme swapped, or `None` when the URL
/// carries neither scheme.
pub fn alternate_ws_scheme(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if let Some(rest) = trimmed.strip_prefix("ws://") {
        Some(format!("wss://{rest}"))
    } else {
        trimmed
            .strip_prefix("wss://")
            .map(|rest| format!("ws://{rest}"))
    }
}

/// Ordered, de-duplicated endpoint candidates for one connection attempt:
/// the primary URL followed by its alternate-scheme twin.
pub(crate) fn candidate_urls(primary: &str) -> Vec<String> {
    let primary = primary.trim().to_string();
    let mut candidates = vec![primary.clone()];
    if let Some(alternate) = alternate_ws_scheme(&primary) {
        if alternate != primary {
            candidates.push(alternate);
        }
    }
    candidates
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn link_round_trip() {
        let join = JoinInfo::new("192.168.1.20", 42117, "sid123", "key456");
        let encoded = encode(&join);
        let decoded = decode(&encoded).unwrap();
        assert_eq!(join, decoded);
    }

    #[test]
    fn decode_plain_ws_url() {
        let decoded = decode("ws://10.0.0.5:42117/together?sid=sid123&key=key456").unwrap();
        assert_eq!(decoded.host, "10.0.0.5");
        assert_eq!(decoded.port, 42117);
        assert_eq!(decoded.session_id, "sid123");
        assert_eq!(decoded.session_key, "key456");
    }

    #[test]
    fn decode_accepts_wss_and_surrounding_whitespace() {
        let decoded = decode("  wss://host.example:443/together?sid=a&key=b \n").unwrap();
        assert_eq!(decoded.host, "host.example");
        assert_eq!(decoded.port, 443);
    }

    #[test]
    fn decode_rejects_missing_pieces() {
        assert!(decode("http://10.0.0.5:42117/together?sid=a&key=b").is_none());
        assert!(decode("ws://10.0.0.5/together?sid=a&key=b").is_none());
        assert!(decode("ws://10.0.0.5:42117/together?sid=a").is_none());
        assert!(decode("ws://10.0.0.5:42117/together?sid=&key=b").is_none());
        assert!(decode("ws://:42117/together?sid=a&key=b").is_none());
        assert!(decode("ws://10.0.0.5:notaport/together?sid=a&key=b").is_none());
    }

    #[test]
    fn alternate_scheme_swaps_both_ways() {
        assert_eq!(
            alternate_ws_scheme("ws://h:1/p").as_deref(),
            Some("wss://h:1/p")
        );
        assert_eq!(
            alternate_ws_scheme("wss://h:1/p").as_deref(),
            Some("ws://h:1/p")
        );
        assert!(alternate_ws_scheme("http://h:1/p").is_none());
    }

    #[test]
    fn candidates_are_ordered_primary_first() {
        let candidates = candidate_urls("ws://h:1/together?sid=a&key=b");
        assert_eq!(
            candidates,
            vec![
                "ws://h:1/together?sid=a&key=b".to_string(),
                "wss://h:1/together?sid=a&key=b".to_string(),
            ]
        );
    }

    #[test]
    fn candidates_without_ws_scheme_have_no_alternate() {
        let candidates = candidate_urls("tcp://h:1");
        assert_eq!(candidates, vec!["tcp://h:1".to_string()]);
    }
}
