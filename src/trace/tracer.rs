//! Execution tracer
//!
//! A [`Tracer`] compiles submitted source, runs it on a fresh interpreter with
//! a hook subscribed only to frames whose origin is `<submitted>`, and
//! classifies how the run ended:
//!
//! - the source does not parse: `syntax-error`, no steps, one error notice
//! - an exception escapes the module: `runtime-error` with a [`Failure`]
//! - the step budget is spent: `truncated`, one warning notice after the steps
//! - the abort signal fires: `cancelled`, one warning notice
//! - otherwise `ok`
//!
//! The hook lives only as long as the interpreter borrowing it, so
//! instrumentation is gone once `run` returns on every path, including an
//! interpreter panic (caught and reported as an `InternalError`).
//!
//! The interpreter recurses on the native stack. Each run therefore executes
//! on a scoped thread with [`TracerLimits::run_stack_size`] bytes of stack,
//! whatever thread calls [`Tracer::run`].

use super::outcome::{EventKind, Failure, RunOutcome, RunStatus, StatusNotice, TraceEntry};
use super::recorder::StepRecorder;
use crate::config::TracerLimits;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{Flow, HaltReason};
use crate::interpreter::hook::{Hook, HookControl, TraceEvent};
use crate::interpreter::prelude::prelude_program;
use crate::memory::stack::Frame;
use crate::parser::ast::{CodeOrigin, Program};
use crate::parser::parse::{parse_source, ParseError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

/// Kind reported when the interpreter itself fails
pub const INTERNAL_ERROR: &str = "InternalError";
pub const RUN_THREAD_NAME: &str = "pytrace-run";

/// Polled between statements; returning true stops the run
pub type AbortSignal<'a> = &'a mut (dyn FnMut() -> bool + Send);

/// Result of one traced run with the program's captured output
#[derive(Debug, Clone)]
pub struct TraceRun {
    pub outcome: RunOutcome,
    pub stdout: String,
    pub stderr: String,
}

pub struct Tracer {
    limits: TracerLimits,
    prelude: Program,
    recorder: StepRecorder,
}

impl Tracer {
    pub fn new(limits: TracerLimits) -> Result<Self, ParseError> {
        Ok(Tracer {
            limits,
            prelude: prelude_program()?,
            recorder: StepRecorder::new(limits.step_budget),
        })
    }

    pub fn limits(&self) -> TracerLimits {
        self.limits
    }

    pub fn run(&mut self, source: &str) -> TraceRun {
        self.run_with_abort(source, None)
    }

    /// Trace `source`, polling `abort` between statements and stopping once it returns true
    pub fn run_with_abort(&mut self, source: &str, abort: Option<AbortSignal<'_>>) -> TraceRun {
        let stack_size = self.limits.run_stack_size;
        thread::scope(|scope| {
            let spawned = thread::Builder::new()
                .name(RUN_THREAD_NAME.to_string())
                .stack_size(stack_size)
                .spawn_scoped(scope, || self.trace(source, abort));
            match spawned {
                Ok(handle) => handle.join().unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(%message, "run thread panicked");
                    internal_run(message)
                }),
                Err(err) => {
                    tracing::error!(%err, "failed to start the run thread");
                    internal_run(format!("cannot start the run thread: {}", err))
                }
            }
        })
    }

    fn trace(&mut self, source: &str, abort: Option<AbortSignal<'_>>) -> TraceRun {
        self.recorder.reset();

        let program = match parse_source(source, CodeOrigin::Submitted) {
            Ok(program) => program,
            Err(err) => return syntax_failure(&err),
        };

        let mut hook = TraceHook {
            recorder: &mut self.recorder,
            abort,
            budget_spent: false,
        };
        let mut interpreter = Interpreter::new(&mut hook, self.limits);
        let prelude = &self.prelude;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.load_prelude(prelude)?;
            interpreter.run_program(&program)
        }));
        let (stdout, mut stderr) = interpreter.take_console().into_streams();
        drop(interpreter);

        let (status, failure, notice) = match result {
            Ok(Ok(())) => (RunStatus::Ok, None, None),
            Ok(Err(Flow::Raise(exc))) => {
                let failure = Failure {
                    kind: exc.type_name(),
                    line: exc.submitted_line().map_or(-1, |line| line as i64),
                    message: exc.message(),
                };
                (RunStatus::RuntimeError, Some(failure), None)
            }
            Ok(Err(Flow::Halt(HaltReason::HookStopped))) => (
                RunStatus::Truncated,
                None,
                Some(StatusNotice::truncated(self.limits.step_budget)),
            ),
            Ok(Err(Flow::Halt(HaltReason::Aborted))) => {
                (RunStatus::Cancelled, None, Some(StatusNotice::cancelled()))
            }
            Ok(Err(flow)) => (
                RunStatus::RuntimeError,
                Some(internal_failure(format!("control flow escaped the module: {:?}", flow))),
                None,
            ),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%message, "interpreter panicked");
                (RunStatus::RuntimeError, Some(internal_failure(message)), None)
            }
        };

        if let Some(failure) = &failure {
            stderr.push_str(&failure.summary());
            stderr.push('\n');
        }

        let mut trace = self.recorder.take_entries();
        trace.extend(notice.map(TraceEntry::Notice));
        tracing::debug!(?status, entries = trace.len(), "trace finished");

        TraceRun {
            outcome: RunOutcome {
                status,
                trace,
                failure,
            },
            stdout,
            stderr,
        }
    }
}

/// Subscribes to submitted-source frames and feeds the recorder
struct TraceHook<'a, 'b> {
    recorder: &'a mut StepRecorder,
    abort: Option<&'a mut (dyn FnMut() -> bool + Send + 'b)>,
    budget_spent: bool,
}

impl Hook for TraceHook<'_, '_> {
    fn on_call(&mut self, frame: &Frame) -> bool {
        frame.origin == CodeOrigin::Submitted
    }

    fn on_event(&mut self, frame: &Frame, event: TraceEvent<'_>) -> HookControl {
        if self.budget_spent || self.recorder.should_stop() {
            self.budget_spent = true;
            return HookControl::Stop;
        }
        match event {
            TraceEvent::Line => self.recorder.record(frame, EventKind::Line, None),
            TraceEvent::Return(_) => self.recorder.record(frame, EventKind::Return, None),
            TraceEvent::Exception(exc) => {
                self.recorder.record(frame, EventKind::Exception, Some(exc))
            }
        }
        HookControl::Continue
    }

    fn should_abort(&mut self) -> bool {
        self.abort.as_mut().is_some_and(|abort| abort())
    }
}

fn syntax_failure(err: &ParseError) -> TraceRun {
    let line = err.location.line;
    TraceRun {
        outcome: RunOutcome {
            status: RunStatus::SyntaxError,
            trace: vec![TraceEntry::Notice(StatusNotice::syntax_error(line, &err.message))],
            failure: Some(Failure {
                kind: "SyntaxError".to_string(),
                line: line as i64,
                message: err.message.clone(),
            }),
        },
        stdout: String::new(),
        stderr: format!("SyntaxError: {}\n", err.message),
    }
}

/// A run that never reached the interpreter
fn internal_run(message: String) -> TraceRun {
    let failure = internal_failure(message);
    let stderr = format!("{}\n", failure.summary());
    TraceRun {
        outcome: RunOutcome {
            status: RunStatus::RuntimeError,
            trace: Vec::new(),
            failure: Some(failure),
        },
        stdout: String::new(),
        stderr,
    }
}

fn internal_failure(message: String) -> Failure {
    Failure {
        kind: INTERNAL_ERROR.to_string(),
        line: -1,
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "interpreter panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::outcome::TraceStep;

    fn tracer() -> Tracer {
        Tracer::new(TracerLimits::default()).unwrap()
    }

    fn steps(run: &TraceRun) -> Vec<&TraceStep> {
        run.outcome.steps().collect()
    }

    #[test]
    fn test_simple_program_events() {
        let run = tracer().run("x = 1\ny = x + 1\n");
        assert_eq!(run.outcome.status, RunStatus::Ok);
        let events: Vec<(usize, EventKind)> = steps(&run).iter().map(|s| (s.line, s.event)).collect();
        assert_eq!(
            events,
            vec![(1, EventKind::Line), (2, EventKind::Line), (2, EventKind::Return)]
        );
        let last = steps(&run)[2];
        assert_eq!(last.locals.len(), 2);
    }

    #[test]
    fn test_prelude_frames_are_not_traced() {
        let run = tracer().run("def double(n):\n    return n * 2\nys = map(double, [1, 2])\n");
        assert_eq!(run.outcome.status, RunStatus::Ok);
        assert!(steps(&run).iter().all(|s| s.line <= 3));
        assert!(steps(&run).iter().all(|s| s.func == "<module>" || s.func == "double"));
        // Each call of the callback is traced: one line and one return per call.
        let double_steps = steps(&run).iter().filter(|s| s.func == "double").count();
        assert_eq!(double_steps, 4);
        assert_eq!(run.stdout, "");
    }

    #[test]
    fn test_runtime_error_is_classified() {
        let run = tracer().run("def f():\n    return 1 / 0\nf()\n");
        assert_eq!(run.outcome.status, RunStatus::RuntimeError);
        let failure = run.outcome.failure.as_ref().unwrap();
        assert_eq!(failure.kind, "ZeroDivisionError");
        assert_eq!(failure.line, 2);
        assert_eq!(failure.message, "division by zero");
        assert_eq!(run.stderr, "ZeroDivisionError: division by zero\n");
        assert!(run.outcome.notice().is_none());

        // Reported once in f and once in the module; no return event from f.
        let exception_funcs: Vec<&str> = steps(&run)
            .iter()
            .filter(|s| s.event == EventKind::Exception)
            .map(|s| s.func.as_str())
            .collect();
        assert_eq!(exception_funcs, vec!["f", "<module>"]);
        assert!(!steps(&run).iter().any(|s| s.func == "f" && s.event == EventKind::Return));
    }

    #[test]
    fn test_caught_exception_keeps_running() {
        let source = "try:\n    int('x')\nexcept ValueError as e:\n    msg = str(e)\nprint(msg)\n";
        let run = tracer().run(source);
        assert_eq!(run.outcome.status, RunStatus::Ok);
        assert_eq!(run.stdout, "invalid literal for int() with base 10: 'x'\n");
        let exception = steps(&run)
            .into_iter()
            .find(|s| s.event == EventKind::Exception)
            .unwrap();
        assert_eq!(exception.line, 2);
        assert_eq!(exception.exception.as_ref().unwrap().kind, "ValueError");
    }

    #[test]
    fn test_abort_flag_cancels() {
        let mut polls = 0;
        let mut abort = || {
            polls += 1;
            polls > 3
        };
        let limits = TracerLimits {
            step_budget: usize::MAX,
            ..TracerLimits::default()
        };
        let mut tracer = Tracer::new(limits).unwrap();
        let run = tracer.run_with_abort("while True:\n    pass\n", Some(&mut abort as AbortSignal<'_>));
        assert_eq!(run.outcome.status, RunStatus::Cancelled);
        assert!(run.outcome.notice().is_some());
    }

    #[test]
    fn test_runs_do_not_share_steps() {
        let mut tracer = tracer();
        let first = tracer.run("a = 1\nb = 2\nc = 3\n");
        let second = tracer.run("z = 0\n");
        assert_eq!(first.outcome.steps().count(), 4);
        let numbers: Vec<usize> = second.outcome.steps().map(|s| s.step).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_panic_message_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
