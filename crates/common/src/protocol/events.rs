// Event types for the anchorage-stream.v1 SSE protocol.
//
// A generation job publishes JSON frames on a per-request subscription
// address. Only `content_update` carries document text; every other
// known type is informational and unknown types are tolerated so the
// producer can evolve independently.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// All frame types in the anchorage-stream.v1 protocol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Producer -> Client: a textual delta for the target block.
    ContentUpdate { content: String },

    /// Producer -> Client: the generation job finished.
    Done,

    /// Producer -> Client: the generation job failed upstream.
    Error {
        #[serde(default)]
        message: String,
    },

    /// Anything this client version does not understand.
    #[serde(other)]
    Unknown,
}

/// Subscription address for a generation request.
pub fn sse_path(request_id: &str) -> String {
    format!("/sse/{request_id}")
}

/// Parses one raw frame body.
///
/// A frame must be a JSON object with a string `type` tag. Unknown tags
/// parse successfully as [`StreamEvent::Unknown`]; structural problems
/// are reported so the reconciler can drop and log the frame.
pub fn parse_frame(raw: &str) -> Result<StreamEvent, ProtocolError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|error| ProtocolError::Malformed(error.to_string()))?;

    if value.get("type").and_then(|tag| tag.as_str()).is_none() {
        return Err(ProtocolError::MissingField("type"));
    }

    serde_json::from_value(value).map_err(|error| ProtocolError::Malformed(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_update() {
        let event = parse_frame(r#"{"type":"content_update","content":"Hello"}"#)
            .expect("frame should parse");
        assert_eq!(event, StreamEvent::ContentUpdate { content: "Hello".to_owned() });
    }

    #[test]
    fn parses_done_and_error() {
        assert_eq!(parse_frame(r#"{"type":"done"}"#).expect("frame should parse"), StreamEvent::Done);
        assert_eq!(
            parse_frame(r#"{"type":"error","message":"quota"}"#).expect("frame should parse"),
            StreamEvent::Error { message: "quota".to_owned() }
        );
    }

    #[test]
    fn unknown_type_is_tolerated() {
        let event =
            parse_frame(r#"{"type":"heartbeat","ts":12}"#).expect("unknown frame should parse");
        assert_eq!(event, StreamEvent::Unknown);
    }

    #[test]
    fn missing_type_is_rejected() {
        let error = parse_frame(r#"{"content":"x"}"#).expect_err("frame should be rejected");
        assert_eq!(error, ProtocolError::MissingField("type"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let error = parse_frame("data: nope").expect_err("frame should be rejected");
        assert!(matches!(error, ProtocolError::Malformed(_)));
    }

    #[test]
    fn sse_path_includes_request_id() {
        assert_eq!(sse_path("req-42"), "/sse/req-42");
    }
}
