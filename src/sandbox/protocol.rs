//! Messages exchanged with the sandbox worker
//!
//! Every message travels as one JSON text frame with a `type` field. Source
//! code is a plain string field of the `RUN` frame, so no escaping is ever
//! done by hand.

use super::error::ProtocolError;
use crate::trace::outcome::{Failure, RunOutcome, RunStatus, TraceEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bridge → sandbox
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    Init,
    Run { id: Uuid, code: String },
    Abort { id: Uuid },
}

/// Sandbox → bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Response {
    Ready,
    InitFailed { error: String },
    Result(RunResult),
}

/// Result of one `RUN`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub id: Uuid,
    /// False for syntax errors and for sandbox-side failures
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    /// Absent when the sandbox failed before producing a trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<TraceEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunResult {
    /// A failure that happened before any trace existed
    pub fn sandbox_failure(id: Uuid, error: impl Into<String>) -> Self {
        RunResult {
            id,
            success: false,
            status: None,
            trace: None,
            failure: None,
            stdout: String::new(),
            stderr: String::new(),
            execution_time: None,
            error: Some(error.into()),
        }
    }

    /// Reassemble the outcome; `None` when the result carries no trace
    pub fn outcome(&self) -> Option<RunOutcome> {
        Some(RunOutcome {
            status: self.status?,
            trace: self.trace.clone()?,
            failure: self.failure.clone(),
        })
    }
}

pub fn encode<T: Serialize>(message: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode_request(frame: &str) -> Result<Request, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

pub fn decode_response(frame: &str) -> Result<Response, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

/// The correlation id of a `RESULT` frame that failed to decode, if readable
pub fn recover_result_id(frame: &str) -> Option<Uuid> {
    let value: serde_json::Value = serde_json::from_str(frame).ok()?;
    if value.get("type")?.as_str()? != "RESULT" {
        return None;
    }
    value.get("id")?.as_str()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_frames() {
        let id = Uuid::nil();
        let frame = encode(&Request::Run {
            id,
            code: "print(\"hi\")\n".to_string(),
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!({"type": "RUN", "id": id.to_string(), "code": "print(\"hi\")\n"})
        );
        assert_eq!(decode_request(r#"{"type":"INIT"}"#).unwrap(), Request::Init);
    }

    #[test]
    fn test_result_frame_fields() {
        let frame = json!({
            "type": "RESULT",
            "id": Uuid::nil().to_string(),
            "success": true,
            "status": "ok",
            "trace": [],
            "stdout": "1\n",
            "stderr": "",
            "executionTime": 1.5
        })
        .to_string();
        let Response::Result(result) = decode_response(&frame).unwrap() else {
            panic!("expected a result");
        };
        assert_eq!(result.execution_time, Some(1.5));
        assert_eq!(result.outcome().unwrap().status, RunStatus::Ok);
    }

    #[test]
    fn test_failure_without_trace_has_no_outcome() {
        let result = RunResult::sandbox_failure(Uuid::nil(), "boom");
        assert!(result.outcome().is_none());
        let frame = encode(&Response::Result(result)).unwrap();
        assert!(!frame.contains("\"trace\""));
        assert!(frame.contains("\"error\":\"boom\""));
    }

    #[test]
    fn test_recover_result_id() {
        let id = Uuid::new_v4();
        let frame = format!(r#"{{"type":"RESULT","id":"{}","success":"yes"}}"#, id);
        assert!(decode_response(&frame).is_err());
        assert_eq!(recover_result_id(&frame), Some(id));
        assert_eq!(recover_result_id("not json"), None);
        assert_eq!(recover_result_id(r#"{"type":"READY"}"#), None);
    }
}
