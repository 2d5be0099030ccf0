// Step recording with a fixed budget

use super::outcome::{EventKind, ExceptionInfo, TraceEntry, TraceStep};
use super::serialize::serialize_value;
use crate::interpreter::errors::PyException;
use crate::memory::stack::Frame;
use indexmap::IndexMap;

/// Variables with this prefix are interpreter internals and never recorded
pub const RESERVED_PREFIX: &str = "__";

/// Accumulates the steps of one run
#[derive(Debug)]
pub struct StepRecorder {
    entries: Vec<TraceEntry>,
    counter: usize,
    budget: usize,
}

impl StepRecorder {
    pub fn new(budget: usize) -> Self {
        StepRecorder {
            entries: Vec::new(),
            counter: 0,
            budget,
        }
    }

    /// Snapshot the frame's variables and append a step
    pub fn record(&mut self, frame: &Frame, event: EventKind, exception: Option<&PyException>) {
        self.counter += 1;
        let locals: IndexMap<String, _> = frame
            .local_variables()
            .into_iter()
            .filter(|(name, _)| !name.starts_with(RESERVED_PREFIX))
            .map(|(name, value)| {
                let serialized = serialize_value(&value);
                (name, serialized)
            })
            .collect();

        self.entries.push(TraceEntry::Step(TraceStep {
            step: self.counter,
            line: frame.line,
            event,
            func: frame.function_name.to_string(),
            locals,
            status: event.into(),
            exception: exception.map(|exc| ExceptionInfo {
                kind: exc.type_name(),
                message: exc.message(),
            }),
        }));
    }

    /// Whether the budget is spent; the next event must not be recorded
    pub fn should_stop(&self) -> bool {
        self.counter >= self.budget
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.counter = 0;
    }

    pub fn step_count(&self) -> usize {
        self.counter
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Hand over the recorded entries, leaving the recorder empty
    pub fn take_entries(&mut self) -> Vec<TraceEntry> {
        self.counter = 0;
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stack::Namespace;
    use crate::memory::value::Value;
    use crate::parser::ast::CodeOrigin;
    use crate::trace::serialize::SerializedValue;

    fn module_frame(vars: &[(&str, Value)]) -> Frame {
        let globals = Namespace::new_scope(None);
        for (name, value) in vars {
            globals.borrow_mut().vars.insert(name.to_string(), value.clone());
        }
        let mut frame = Frame::module(CodeOrigin::Submitted, globals);
        frame.line = 4;
        frame
    }

    #[test]
    fn test_record_filters_reserved_names() {
        let frame = module_frame(&[
            ("__name__", Value::str("__main__")),
            ("x", Value::Int(1)),
            ("_private", Value::Bool(true)),
        ]);
        let mut recorder = StepRecorder::new(10);
        recorder.record(&frame, EventKind::Line, None);

        let entries = recorder.take_entries();
        let TraceEntry::Step(step) = &entries[0] else {
            panic!("expected a step");
        };
        assert_eq!(step.step, 1);
        assert_eq!(step.line, 4);
        assert_eq!(step.func, "<module>");
        let names: Vec<&str> = step.locals.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["x", "_private"]);
        assert_eq!(step.locals["x"], SerializedValue::Int(1));
    }

    #[test]
    fn test_budget_and_reset() {
        let frame = module_frame(&[]);
        let mut recorder = StepRecorder::new(2);
        assert!(!recorder.should_stop());
        recorder.record(&frame, EventKind::Line, None);
        recorder.record(&frame, EventKind::Return, None);
        assert!(recorder.should_stop());
        assert_eq!(recorder.step_count(), 2);

        recorder.reset();
        assert!(!recorder.should_stop());
        assert!(recorder.take_entries().is_empty());
    }
}
