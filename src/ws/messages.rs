//! Messages the relay itself originates.
//!
//! Everything else on the wire is client payload relayed verbatim.

use axum::extract::ws::Utf8Bytes;
use serde::Serialize;

use crate::domain::Payload;

/// Text sent to a consumer whose command found no producer.
pub const NO_PRODUCER_MESSAGE: &str = "no producer connected";

/// Maximum size of a close frame reason, in bytes.
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Diagnostic notice sent by the relay, e.g.
/// `{"error":"no producer connected"}`.
#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    /// Human-readable error.
    pub error: &'static str,
}

impl Notice {
    /// The "no producer connected" notice.
    #[must_use]
    pub const fn no_producer() -> Self {
        Self {
            error: NO_PRODUCER_MESSAGE,
        }
    }

    /// Renders the notice as a text payload.
    #[must_use]
    pub fn to_payload(&self) -> Payload {
        let json = serde_json::to_string(self)
            .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", self.error));
        Payload::Text(Utf8Bytes::from(json))
    }
}

/// Shortens a close reason to fit a close frame, cutting on a character
/// boundary.
#[must_use]
pub fn truncate_close_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason;
    }
    let end = reason
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= MAX_CLOSE_REASON_BYTES)
        .last()
        .unwrap_or(0);
    reason.get(..end).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn no_producer_notice_shape() {
        let Payload::Text(text) = Notice::no_producer().to_payload() else {
            panic!("notice must be a text payload");
        };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(text.as_str()) else {
            panic!("notice must be valid JSON");
        };
        assert_eq!(value, serde_json::json!({ "error": "no producer connected" }));
    }

    #[test]
    fn short_reason_untouched() {
        assert_eq!(truncate_close_reason("handshake timeout"), "handshake timeout");
    }

    #[test]
    fn long_reason_cut_on_char_boundary() {
        let reason = "é".repeat(100);
        let cut = truncate_close_reason(&reason);
        assert!(cut.len() <= MAX_CLOSE_REASON_BYTES);
        assert_eq!(cut.len(), 122);
        assert!(reason.starts_with(cut));
    }
}
