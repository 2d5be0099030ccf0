//! Trace records and the classified result of a run

use super::serialize::SerializedValue;
use crate::parser::ast::CodeOrigin;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Line,
    Return,
    Exception,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Error,
}

impl From<EventKind> for StepStatus {
    fn from(event: EventKind) -> Self {
        match event {
            EventKind::Exception => StepStatus::Error,
            EventKind::Line | EventKind::Return => StepStatus::Success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// One observed point in the submitted program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// 1-based, strictly increasing within a trace
    pub step: usize,
    pub line: usize,
    pub event: EventKind,
    pub func: String,
    pub locals: IndexMap<String, SerializedValue>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Synthetic entry explaining why a trace ended early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub status: NoticeLevel,
    pub title: String,
    pub desc: String,
    #[serde(rename = "isError")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusNotice {
    pub fn truncated(budget: usize) -> Self {
        StatusNotice {
            status: NoticeLevel::Warning,
            title: "Execution truncated".to_string(),
            desc: format!("Execution exceeded {} steps; tracing stopped.", budget),
            is_error: false,
            line: None,
            reason: None,
        }
    }

    pub fn syntax_error(line: usize, message: &str) -> Self {
        StatusNotice {
            status: NoticeLevel::Error,
            title: "Syntax error".to_string(),
            desc: format!("{} ({}, line {})", message, CodeOrigin::Submitted.filename(), line),
            is_error: true,
            line: Some(line as i64),
            reason: Some(message.to_string()),
        }
    }

    pub fn cancelled() -> Self {
        StatusNotice {
            status: NoticeLevel::Warning,
            title: "Execution cancelled".to_string(),
            desc: "The run was aborted before it finished.".to_string(),
            is_error: false,
            line: None,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceEntry {
    Step(TraceStep),
    Notice(StatusNotice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Ok,
    Truncated,
    SyntaxError,
    RuntimeError,
    Cancelled,
}

/// Where and why a run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: String,
    /// Innermost submitted-source line, `-1` when unknown
    pub line: i64,
    pub message: String,
}

impl Failure {
    /// `Kind: message`, or just `Kind` for an empty message
    pub fn summary(&self) -> String {
        if self.message.is_empty() {
            self.kind.clone()
        } else {
            format!("{}: {}", self.kind, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub trace: Vec<TraceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
}

impl RunOutcome {
    pub fn steps(&self) -> impl Iterator<Item = &TraceStep> {
        self.trace.iter().filter_map(|entry| match entry {
            TraceEntry::Step(step) => Some(step),
            TraceEntry::Notice(_) => None,
        })
    }

    /// The terminal notice, if the run ended with one
    pub fn notice(&self) -> Option<&StatusNotice> {
        match self.trace.last() {
            Some(TraceEntry::Notice(notice)) => Some(notice),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(n: usize, event: EventKind) -> TraceStep {
        TraceStep {
            step: n,
            line: 1,
            event,
            func: "<module>".to_string(),
            locals: IndexMap::new(),
            status: event.into(),
            exception: None,
        }
    }

    #[test]
    fn test_step_wire_form() {
        let mut step = step(1, EventKind::Exception);
        step.locals.insert("x".to_string(), SerializedValue::Int(1));
        step.exception = Some(ExceptionInfo {
            kind: "IndexError".to_string(),
            message: "list index out of range".to_string(),
        });
        let json = serde_json::to_value(TraceEntry::Step(step)).unwrap();
        assert_eq!(
            json,
            json!({
                "step": 1, "line": 1, "event": "exception", "func": "<module>",
                "locals": {"x": 1}, "status": "error",
                "exception": {"type": "IndexError", "message": "list index out of range"}
            })
        );
    }

    #[test]
    fn test_outcome_round_trips_entries() {
        let outcome = RunOutcome {
            status: RunStatus::Truncated,
            trace: vec![
                TraceEntry::Step(step(1, EventKind::Line)),
                TraceEntry::Notice(StatusNotice::truncated(1)),
            ],
            failure: None,
        };
        let text = outcome.to_json().unwrap();
        assert!(text.contains("\"status\":\"truncated\""));
        assert!(text.contains("\"isError\":false"));

        let decoded: RunOutcome = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, outcome);
        assert_eq!(decoded.steps().count(), 1);
        assert!(decoded.notice().is_some());
    }

    #[test]
    fn test_failure_summary() {
        let failure = Failure {
            kind: "ZeroDivisionError".to_string(),
            line: 3,
            message: "division by zero".to_string(),
        };
        assert_eq!(failure.summary(), "ZeroDivisionError: division by zero");
    }

    #[test]
    fn test_syntax_error_notice_names_the_submitted_file() {
        let notice = StatusNotice::syntax_error(3, "invalid syntax");
        assert_eq!(notice.desc, "invalid syntax (<submitted>, line 3)");
        assert_eq!(notice.line, Some(3));
        assert!(notice.is_error);
    }
}
