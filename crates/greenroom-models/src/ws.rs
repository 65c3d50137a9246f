//! Preview session message types.
//!
//! These messages keep the wire shape the browser client already speaks.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CompositionSettings, JobId};

/// Client → server session messages.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewRequest {
    /// Bind the session to a job
    Init {
        #[serde(rename = "jobId")]
        job_id: JobId,
    },

    /// Render one preview frame with these settings
    Update {
        #[serde(default)]
        settings: CompositionSettings,
    },
}

/// Server → client message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PreviewResponseType {
    PreviewFrame,
    Error,
}

impl PreviewResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewResponseType::PreviewFrame => "preview_frame",
            PreviewResponseType::Error => "error",
        }
    }
}

/// Server → client session messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PreviewResponse {
    /// Rendered still as a `data:` URI
    PreviewFrame { image: String },

    /// Human-readable failure reason
    Error { message: String },
}

impl PreviewResponse {
    /// Create a frame message.
    pub fn frame(image: impl Into<String>) -> Self {
        PreviewResponse::PreviewFrame {
            image: image.into(),
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        PreviewResponse::Error {
            message: message.into(),
        }
    }

    /// Get the message type.
    pub fn message_type(&self) -> PreviewResponseType {
        match self {
            PreviewResponse::PreviewFrame { .. } => PreviewResponseType::PreviewFrame,
            PreviewResponse::Error { .. } => PreviewResponseType::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_message() {
        let msg: PreviewRequest = serde_json::from_str(r#"{"type":"init","jobId":"abc"}"#).unwrap();
        match msg {
            PreviewRequest::Init { job_id } => assert_eq!(job_id.as_str(), "abc"),
            other => panic!("Expected Init, got {:?}", other),
        }
    }

    #[test]
    fn test_update_message() {
        let msg: PreviewRequest = serde_json::from_str(
            r##"{"type":"update","settings":{"keyColor":"#0000FF","timestamp":3}}"##,
        )
        .unwrap();
        match msg {
            PreviewRequest::Update { settings } => {
                assert_eq!(settings.key_color, "#0000FF");
                assert_eq!(settings.timestamp, Some(3.0));
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_response_serialization() {
        let json = serde_json::to_string(&PreviewResponse::frame("data:image/png;base64,AAAA")).unwrap();
        assert!(json.contains("\"type\":\"preview_frame\""));
        assert!(json.contains("\"image\":\"data:image/png;base64,AAAA\""));

        let json = serde_json::to_string(&PreviewResponse::error("Failed to generate preview.")).unwrap();
        assert!(json.contains("\"type\":\"error\""));
        assert_eq!(
            PreviewResponse::error("x").message_type().as_str(),
            "error"
        );
    }
}
