//! Response types for the WebSocket request/response pattern

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Response Result
// =============================================================================

/// One-shot response to a request: `{ success, data?, msg? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ResponseResult {
    /// Create a success response with data
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            msg: None,
        }
    }

    /// Create a success response without data
    pub fn success_empty() -> Self {
        Self {
            success: true,
            data: None,
            msg: None,
        }
    }

    /// Create a failure response
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            msg: Some(msg.into()),
        }
    }

    /// Interpret an inbound payload as a response.
    ///
    /// Payloads that do not have the response shape become a failure carrying
    /// the decode error, so callers never have to handle a second error path.
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        match serde_json::from_value::<ResponseResult>(payload.clone()) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Response payload has unexpected shape");
                Self::failure(format!("Malformed response: {e}"))
            }
        }
    }

    /// True when the payload looks like a response rather than a bare push body.
    pub fn is_response_shaped(payload: &serde_json::Value) -> bool {
        payload
            .get("success")
            .is_some_and(serde_json::Value::is_boolean)
    }

    /// Server-provided failure reason, or a generic one.
    pub fn reason(&self) -> &str {
        self.msg
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or("no reason given")
    }

    /// Decode the data payload of a successful response.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        if !self.success {
            return Err(RequestError::Rejected(self.reason().to_string()));
        }
        let data = self.data.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(data).map_err(|e| RequestError::Serialization(e.to_string()))
    }
}

// =============================================================================
// Request Error (Client-Side)
// =============================================================================

/// Why a response could not be turned into typed data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Response data did not decode into the expected type
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Server answered with `success: false`
    #[error("Request rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn failure_reason_falls_back_when_empty() {
        let r = ResponseResult::from_payload(&json!({"success": false, "msg": ""}));
        assert!(!r.success);
        assert_eq!(r.reason(), "no reason given");
    }

    #[test]
    fn malformed_payload_becomes_failure() {
        let r = ResponseResult::from_payload(&json!(["not", "a", "response"]));
        assert!(!r.success);
        assert!(r.reason().starts_with("Malformed response"));
    }

    #[test]
    fn decode_rejects_failed_response() {
        let r = ResponseResult::failure("Not your turn");
        assert_eq!(
            r.decode::<serde_json::Value>(),
            Err(RequestError::Rejected("Not your turn".into()))
        );
    }

    #[test]
    fn response_shape_detection() {
        assert!(ResponseResult::is_response_shaped(&json!({"success": true})));
        assert!(!ResponseResult::is_response_shaped(&json!({"villagers": []})));
    }
}
