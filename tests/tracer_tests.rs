// Integration tests for the execution tracer

use pytrace::config::TracerLimits;
use pytrace::trace::outcome::{EventKind, NoticeLevel, RunStatus, TraceEntry};
use pytrace::trace::{SerializedValue, Tracer};

fn tracer() -> Tracer {
    Tracer::new(TracerLimits::default()).expect("prelude should compile")
}

#[test]
fn test_infinite_loop_is_truncated() {
    let run = tracer().run("while True:\n    x = 1\n");
    let outcome = &run.outcome;

    assert_eq!(outcome.status, RunStatus::Truncated);
    assert_eq!(outcome.trace.len(), 1001);
    assert_eq!(outcome.steps().count(), 1000);

    let notice = outcome.notice().expect("truncation notice");
    assert_eq!(notice.status, NoticeLevel::Warning);
    assert!(!notice.is_error);
    assert!(notice.desc.contains("1000"));
    assert!(outcome.failure.is_none());
}

#[test]
fn test_syntax_error_has_no_steps() {
    let run = tracer().run("def f(:");
    let outcome = &run.outcome;

    assert_eq!(outcome.status, RunStatus::SyntaxError);
    assert_eq!(outcome.steps().count(), 0);
    assert_eq!(outcome.trace.len(), 1);

    let notice = outcome.notice().expect("syntax error notice");
    assert_eq!(notice.status, NoticeLevel::Error);
    assert!(notice.is_error);
    assert_eq!(notice.line, Some(1));
    assert_eq!(outcome.failure.as_ref().map(|f| f.line), Some(1));
    assert!(run.stderr.starts_with("SyntaxError"));
}

#[test]
fn test_index_error_ends_trace() {
    let run = tracer().run("x = [1,2]\nprint(x[5])");
    let outcome = &run.outcome;

    assert_eq!(outcome.status, RunStatus::RuntimeError);
    let last = outcome.steps().last().expect("at least one step");
    assert_eq!(last.event, EventKind::Exception);
    assert_eq!(last.line, 2);
    let exception = last.exception.as_ref().expect("exception descriptor");
    assert_eq!(exception.kind, "IndexError");
    assert_eq!(exception.message, "list index out of range");

    let failure = outcome.failure.as_ref().expect("classified failure");
    assert_eq!(failure.kind, "IndexError");
    assert_eq!(failure.line, 2);
    assert!(outcome.notice().is_none());
}

#[test]
fn test_only_submitted_lines_appear() {
    let source = "def outer():\n    return [y for y in filter(lambda v: v > 1, [1, 2, 3])]\n";
    let run = tracer().run(&format!("{}print(sorted(map(str, outer())))\n", source));

    assert_eq!(run.outcome.status, RunStatus::Ok);
    assert_eq!(run.stdout, "['2', '3']\n");
    for step in run.outcome.steps() {
        assert!(
            (1..=3).contains(&step.line),
            "step {} reports line {} of {}",
            step.step,
            step.line,
            step.func
        );
    }
}

#[test]
fn test_step_ordinals_are_contiguous() {
    let source = r#"
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)

total = 0
for i in range(5):
    total += fact(i)
"#;
    let run = tracer().run(source);
    assert_eq!(run.outcome.status, RunStatus::Ok);

    let ordinals: Vec<usize> = run.outcome.steps().map(|s| s.step).collect();
    let expected: Vec<usize> = (1..=ordinals.len()).collect();
    assert_eq!(ordinals, expected);
    assert!(ordinals.len() <= 1000);
}

#[test]
fn test_locals_are_serialized_in_order() {
    let source = "name = 'ada'\nitems = list(range(12))\n_hidden = 1\n__dunder = 2\npoint = (1, 2.5)\n";
    let run = tracer().run(source);
    let last = run.outcome.steps().last().expect("return step");
    assert_eq!(last.event, EventKind::Return);

    let names: Vec<&str> = last.locals.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["name", "items", "_hidden", "point"]);
    assert_eq!(last.locals["name"], SerializedValue::Str("ada".to_string()));
    match &last.locals["items"] {
        SerializedValue::Sequence { items, overflow, .. } => {
            assert_eq!(items.len(), 10);
            assert_eq!(*overflow, 2);
        }
        other => panic!("expected a sequence, got {:?}", other),
    }
}

#[test]
fn test_function_frames_report_their_name() {
    let run = tracer().run("def add(a, b):\n    return a + b\nz = add(1, 2)\n");
    let funcs: Vec<(&str, EventKind)> = run
        .outcome
        .steps()
        .map(|s| (s.func.as_str(), s.event))
        .collect();
    assert_eq!(
        funcs,
        vec![
            ("<module>", EventKind::Line),
            ("<module>", EventKind::Line),
            ("add", EventKind::Line),
            ("add", EventKind::Return),
            ("<module>", EventKind::Return),
        ]
    );

    let add_return = run.outcome.steps().nth(3).expect("add returns");
    assert_eq!(add_return.locals["a"], SerializedValue::Int(1));
    assert_eq!(add_return.locals["b"], SerializedValue::Int(2));
}

#[test]
fn test_outcome_json_shape() {
    let run = tracer().run("while True:\n    pass\n");
    let json: serde_json::Value =
        serde_json::from_str(&run.outcome.to_json().expect("encodes")).expect("valid json");

    assert_eq!(json["status"], "truncated");
    let trace = json["trace"].as_array().expect("trace array");
    assert_eq!(trace[0]["event"], "line");
    assert_eq!(trace[0]["status"], "success");
    assert_eq!(trace[0]["func"], "<module>");
    let notice = trace.last().expect("notice");
    assert_eq!(notice["status"], "warning");
    assert_eq!(notice["isError"], false);

    match run.outcome.trace.last() {
        Some(TraceEntry::Notice(_)) => {}
        other => panic!("expected a trailing notice, got {:?}", other),
    }
}

#[test]
fn test_user_exception_subclass() {
    let source = r#"
class BadInput(ValueError):
    pass

def check(v):
    if v < 0:
        raise BadInput("negative: " + str(v))
    return v

try:
    check(-3)
except ValueError as e:
    print(type(e).__name__, e)
"#;
    let run = tracer().run(source);
    assert_eq!(run.outcome.status, RunStatus::Ok);
    assert_eq!(run.stdout, "BadInput negative: -3\n");
    let raised = run
        .outcome
        .steps()
        .find(|s| s.event == EventKind::Exception)
        .expect("exception event");
    assert_eq!(raised.func, "check");
    assert_eq!(raised.exception.as_ref().map(|e| e.kind.as_str()), Some("BadInput"));
}

const RUNAWAY_RECURSION: &str = "def f(n):\n    return f(n + 1)\nf(0)\n";

fn assert_recursion_error(run: &pytrace::trace::TraceRun) {
    assert_eq!(run.outcome.status, RunStatus::RuntimeError);
    let failure = run.outcome.failure.as_ref().expect("classified failure");
    assert_eq!(failure.kind, "RecursionError");
    assert_eq!(failure.line, 2);
    assert!(run.stderr.starts_with("RecursionError"));
}

#[test]
fn test_runaway_recursion_at_default_limits() {
    let run = tracer().run(RUNAWAY_RECURSION);
    assert_recursion_error(&run);
}

#[test]
fn test_runs_do_not_depend_on_the_caller_stack() {
    let run = std::thread::Builder::new()
        .stack_size(512 * 1024)
        .spawn(|| tracer().run(RUNAWAY_RECURSION))
        .expect("thread starts")
        .join()
        .expect("tracer does not overflow the caller");
    assert_recursion_error(&run);
}

#[test]
fn test_deeply_nested_expression_is_a_syntax_error() {
    let run = tracer().run(&format!("x = {}1\n", "-".repeat(400_000)));
    assert_eq!(run.outcome.status, RunStatus::SyntaxError);
    assert_eq!(run.outcome.steps().count(), 0);
    let failure = run.outcome.failure.as_ref().expect("syntax failure");
    assert_eq!(failure.message, "expression is too deeply nested");
}
