// Integration tests for the sandbox bridge

use std::time::Duration;

use pytrace::config::{Config, TracerLimits};
use pytrace::sandbox::protocol::{decode_request, encode, Request, Response, RunResult};
use pytrace::sandbox::{BridgeError, SandboxBridge};
use pytrace::trace::outcome::RunStatus;
use tokio::sync::mpsc;
use uuid::Uuid;

fn ok_result(id: Uuid, stdout: &str) -> String {
    let result = RunResult {
        id,
        success: true,
        status: Some(RunStatus::Ok),
        trace: Some(Vec::new()),
        failure: None,
        stdout: stdout.to_string(),
        stderr: String::new(),
        execution_time: Some(0.5),
        error: None,
    };
    encode(&Response::Result(result)).expect("encodes")
}

async fn next_request(requests: &mut mpsc::UnboundedReceiver<String>) -> Request {
    let frame = requests.recv().await.expect("bridge sent a request");
    decode_request(&frame).expect("well-formed request")
}

#[tokio::test]
async fn test_execute_in_real_sandbox() {
    let bridge = SandboxBridge::start(Config::default()).expect("sandbox starts");

    let result = bridge
        .execute("greeting = 'hi'\nprint(greeting)\n")
        .await
        .expect("execution succeeds");
    assert!(result.success);
    assert_eq!(result.outcome.status, RunStatus::Ok);
    assert_eq!(result.stdout, "hi\n");
    assert_eq!(result.outcome.steps().count(), 3);
    assert!(result.execution_time >= 0.0);
    assert!(result.error.is_none());
    assert_eq!(bridge.pending_count(), 0);

    let json = serde_json::to_value(&result).expect("serializes");
    assert_eq!(json["status"], "ok");
    assert!(json["executionTime"].is_number());
    assert!(json.get("executionTimeMs").is_none());
    assert!(json.get("error").is_none());
    assert_eq!(json["trace"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_syntax_error_is_a_result_not_an_error() {
    let bridge = SandboxBridge::start(Config::default()).expect("sandbox starts");
    let result = bridge.execute("def f(:").await.expect("transport succeeds");
    assert!(!result.success);
    assert_eq!(result.outcome.status, RunStatus::SyntaxError);
    assert_eq!(result.outcome.steps().count(), 0);
    assert!(result.stderr.starts_with("SyntaxError"));

    let error = result.error.as_deref().expect("unsuccessful results carry an error");
    assert!(error.starts_with("SyntaxError: "));
    let json = serde_json::to_value(&result).expect("serializes");
    assert_eq!(json["error"], error);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_deep_nesting_does_not_take_down_the_sandbox() {
    let bridge = SandboxBridge::start(Config::default()).expect("sandbox starts");
    let result = bridge
        .execute(&format!("x = {}1\n", "-".repeat(400_000)))
        .await
        .expect("transport succeeds");
    assert!(!result.success);
    assert_eq!(result.outcome.status, RunStatus::SyntaxError);
    assert!(result.error.is_some());

    let result = bridge
        .execute("def f(n):\n    return f(n + 1)\nf(0)\n")
        .await
        .expect("sandbox still serves runs");
    assert_eq!(result.outcome.status, RunStatus::RuntimeError);
    assert_eq!(
        result.outcome.failure.as_ref().map(|f| f.kind.as_str()),
        Some("RecursionError")
    );
}

#[tokio::test]
async fn test_real_timeout_aborts_the_run() {
    let mut config = Config::default();
    config.bridge.timeout = Duration::from_millis(300);
    config.limits = TracerLimits {
        step_budget: 1_000_000,
        ..TracerLimits::default()
    };
    let bridge = SandboxBridge::start(config).expect("sandbox starts");

    let err = bridge
        .execute("while True:\n    total = sum(range(100000))\n")
        .await
        .expect_err("runaway loop times out");
    assert!(matches!(err, BridgeError::Timeout(_)));
    assert_eq!(bridge.pending_count(), 0);

    // The abort frees the worker for the next run.
    let result = bridge.execute("x = 1\n").await.expect("worker recovered");
    assert_eq!(result.outcome.status, RunStatus::Ok);
}

#[tokio::test]
async fn test_timeout_drops_late_result() {
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_millis(100));
    response_tx.send(encode(&Response::Ready).unwrap()).unwrap();

    let err = bridge.execute("while True: pass").await.unwrap_err();
    assert!(matches!(err, BridgeError::Timeout(_)));
    assert_eq!(bridge.pending_count(), 0);

    let Request::Run { id: late_id, .. } = next_request(&mut request_rx).await else {
        panic!("expected RUN first");
    };
    assert_eq!(next_request(&mut request_rx).await, Request::Abort { id: late_id });

    // The late result finds no pending entry.
    response_tx.send(ok_result(late_id, "late\n")).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(bridge.pending_count(), 0);

    // A following request resolves with its own result only.
    let responder = tokio::spawn(async move {
        let Request::Run { id, .. } = next_request(&mut request_rx).await else {
            panic!("expected RUN");
        };
        response_tx.send(ok_result(id, "fresh\n")).unwrap();
        id
    });
    let result = bridge.execute("x = 1").await.expect("second run resolves");
    let answered = responder.await.unwrap();
    assert_ne!(answered, late_id);
    assert_eq!(result.stdout, "fresh\n");
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_malformed_result_rejects_request() {
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_secs(2));
    response_tx.send(encode(&Response::Ready).unwrap()).unwrap();

    tokio::spawn(async move {
        // Garbage first; it carries no id, so it is only logged.
        response_tx.send("{not json".to_string()).unwrap();
        let Request::Run { id, .. } = next_request(&mut request_rx).await else {
            panic!("expected RUN");
        };
        let frame = format!(r#"{{"type":"RESULT","id":"{}","success":"maybe"}}"#, id);
        response_tx.send(frame).unwrap();
        // Keep the transport open until the bridge is done.
        let _ = request_rx.recv().await;
    });

    let err = bridge.execute("x = 1").await.unwrap_err();
    assert!(matches!(err, BridgeError::MalformedResponse(_)));
    assert_eq!(bridge.pending_count(), 0);
}

#[tokio::test]
async fn test_results_are_correlated_out_of_order() {
    let (request_tx, mut request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();
    let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_secs(2));
    response_tx.send(encode(&Response::Ready).unwrap()).unwrap();

    tokio::spawn(async move {
        let mut runs = Vec::new();
        while runs.len() < 2 {
            if let Request::Run { id, code } = next_request(&mut request_rx).await {
                runs.push((id, code));
            }
        }
        // Answer in reverse order, echoing the code.
        for (id, code) in runs.into_iter().rev() {
            response_tx.send(ok_result(id, &code)).unwrap();
        }
        let _ = request_rx.recv().await;
    });

    let (first, second) = tokio::join!(bridge.execute("first"), bridge.execute("second"));
    assert_eq!(first.expect("first resolves").stdout, "first");
    assert_eq!(second.expect("second resolves").stdout, "second");
}
