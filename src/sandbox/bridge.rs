//! Async bridge to the sandbox worker
//!
//! The bridge owns the request side of the transport and a dispatcher task
//! that reads response frames. Each `execute` call registers a one-shot
//! responder under a fresh correlation id, so results may arrive in any
//! order. A request whose result does not arrive in time is aborted and
//! removed; a result arriving after that is dropped.

use super::error::BridgeError;
use super::protocol::{decode_response, encode, recover_result_id, Request, Response, RunResult};
use super::worker::spawn_worker;
use crate::config::Config;
use crate::trace::outcome::RunOutcome;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

type Responder = oneshot::Sender<Result<RunResult, BridgeError>>;

struct PendingRequest {
    responder: Responder,
    created: Instant,
}

type PendingMap = Arc<DashMap<Uuid, PendingRequest>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadyState {
    Starting,
    Ready,
    Failed(String),
    Disconnected,
}

/// What a caller gets back for one submitted program
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    pub stdout: String,
    pub stderr: String,
    /// Milliseconds spent in the sandbox
    pub execution_time: f64,
    /// Set when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct SandboxBridge {
    requests: mpsc::UnboundedSender<String>,
    pending: PendingMap,
    ready: watch::Receiver<ReadyState>,
    timeout: Duration,
    dispatcher: JoinHandle<()>,
}

impl SandboxBridge {
    /// Start a worker thread and initialize it. Must be called inside a Tokio runtime.
    pub fn start(config: Config) -> Result<Self, BridgeError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        // Detached: the worker exits once the bridge drops its request sender.
        spawn_worker(config.limits, request_rx, response_tx)?;

        let bridge = Self::with_transport(request_tx, response_rx, config.bridge.timeout);
        bridge.send(&Request::Init)?;
        tracing::info!(timeout_ms = config.bridge.timeout.as_millis() as u64, "sandbox bridge started");
        Ok(bridge)
    }

    /// Bridge over an arbitrary transport; the peer must answer `INIT` with `READY`
    pub fn with_transport(
        requests: mpsc::UnboundedSender<String>,
        responses: mpsc::UnboundedReceiver<String>,
        timeout: Duration,
    ) -> Self {
        let pending: PendingMap = Arc::new(DashMap::new());
        let (ready_tx, ready_rx) = watch::channel(ReadyState::Starting);
        let dispatcher = tokio::spawn(dispatch(responses, Arc::clone(&pending), ready_tx));
        SandboxBridge {
            requests,
            pending,
            ready: ready_rx,
            timeout,
            dispatcher,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Requests still waiting for a result
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Run `code` in the sandbox and wait for its trace
    pub async fn execute(&self, code: &str) -> Result<ExecutionResult, BridgeError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        tokio::time::timeout_at(deadline, self.wait_ready())
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout))??;

        let id = Uuid::new_v4();
        let (responder, receiver) = oneshot::channel();
        self.pending.insert(
            id,
            PendingRequest {
                responder,
                created: Instant::now(),
            },
        );
        let _guard = PendingGuard {
            pending: &self.pending,
            id,
        };
        // The dispatcher marks the state before failing pending requests, so
        // an entry inserted after that sweep is caught here.
        if *self.ready.borrow() == ReadyState::Disconnected {
            return Err(BridgeError::Disconnected);
        }

        self.send(&Request::Run {
            id,
            code: code.to_string(),
        })?;
        tracing::debug!(%id, "run submitted");

        match tokio::time::timeout_at(deadline, receiver).await {
            Ok(Ok(result)) => into_execution_result(result?),
            Ok(Err(_)) => Err(BridgeError::Disconnected),
            Err(_) => {
                tracing::warn!(%id, "run timed out, aborting");
                if let Err(err) = self.send(&Request::Abort { id }) {
                    tracing::debug!(%id, %err, "abort could not be delivered");
                }
                Err(BridgeError::Timeout(self.timeout))
            }
        }
    }

    async fn wait_ready(&self) -> Result<(), BridgeError> {
        let mut ready = self.ready.clone();
        let state = ready
            .wait_for(|state| *state != ReadyState::Starting)
            .await
            .map_err(|_| BridgeError::Disconnected)?
            .clone();
        match state {
            ReadyState::Ready => Ok(()),
            ReadyState::Failed(error) => Err(BridgeError::InitFailed(error)),
            ReadyState::Starting | ReadyState::Disconnected => Err(BridgeError::Disconnected),
        }
    }

    fn send(&self, request: &Request) -> Result<(), BridgeError> {
        let frame = encode(request)?;
        self.requests
            .send(frame)
            .map_err(|_| BridgeError::Disconnected)
    }
}

impl Drop for SandboxBridge {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Removes the pending entry however `execute` exits
struct PendingGuard<'a> {
    pending: &'a PendingMap,
    id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

fn into_execution_result(result: RunResult) -> Result<ExecutionResult, BridgeError> {
    let Some(outcome) = result.outcome() else {
        let error = result
            .error
            .unwrap_or_else(|| "result carried no trace".to_string());
        return Err(BridgeError::Sandbox(error));
    };
    Ok(ExecutionResult {
        success: result.success,
        outcome,
        stdout: result.stdout,
        stderr: result.stderr,
        execution_time: result.execution_time.unwrap_or_default(),
        error: result.error,
    })
}

async fn dispatch(
    mut responses: mpsc::UnboundedReceiver<String>,
    pending: PendingMap,
    ready: watch::Sender<ReadyState>,
) {
    while let Some(frame) = responses.recv().await {
        match decode_response(&frame) {
            Ok(Response::Ready) => {
                tracing::debug!("sandbox ready");
                ready.send_replace(ReadyState::Ready);
            }
            Ok(Response::InitFailed { error }) => {
                tracing::error!(%error, "sandbox failed to initialize");
                ready.send_replace(ReadyState::Failed(error));
            }
            Ok(Response::Result(result)) => {
                let id = result.id;
                resolve(&pending, id, Ok(result));
            }
            Err(err) => match recover_result_id(&frame) {
                Some(id) => {
                    tracing::warn!(%id, %err, "malformed result");
                    resolve(&pending, id, Err(BridgeError::MalformedResponse(err.to_string())));
                }
                None => tracing::warn!(%err, "dropping malformed response frame"),
            },
        }
    }

    tracing::info!("sandbox transport closed");
    ready.send_replace(ReadyState::Disconnected);
    let ids: Vec<Uuid> = pending.iter().map(|entry| *entry.key()).collect();
    for id in ids {
        resolve(&pending, id, Err(BridgeError::Disconnected));
    }
}

fn resolve(pending: &PendingMap, id: Uuid, result: Result<RunResult, BridgeError>) {
    match pending.remove(&id) {
        Some((_, request)) => {
            let waited_ms = request.created.elapsed().as_millis() as u64;
            tracing::debug!(%id, waited_ms, "result delivered");
            // The caller may have given up in the meantime.
            let _ = request.responder.send(result);
        }
        None => tracing::debug!(%id, "late result dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::protocol::decode_request;

    #[tokio::test]
    async fn test_init_failure_is_reported() {
        let (request_tx, _request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_secs(1));
        response_tx
            .send(encode(&Response::InitFailed { error: "no prelude".into() }).unwrap())
            .unwrap();
        let err = bridge.execute("x = 1").await.unwrap_err();
        assert!(matches!(err, BridgeError::InitFailed(msg) if msg == "no prelude"));
        assert_eq!(bridge.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_sandbox_failure_without_trace() {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<String>();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_secs(1));
        response_tx.send(encode(&Response::Ready).unwrap()).unwrap();

        tokio::spawn(async move {
            while let Some(frame) = request_rx.recv().await {
                if let Ok(Request::Run { id, .. }) = decode_request(&frame) {
                    let result = RunResult::sandbox_failure(id, "worker crashed");
                    let _ = response_tx.send(encode(&Response::Result(result)).unwrap());
                }
            }
        });

        let err = bridge.execute("x = 1").await.unwrap_err();
        assert!(matches!(err, BridgeError::Sandbox(msg) if msg == "worker crashed"));
    }

    #[tokio::test]
    async fn test_transport_close_fails_waiters() {
        let (request_tx, _request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let bridge = SandboxBridge::with_transport(request_tx, response_rx, Duration::from_secs(1));
        response_tx.send(encode(&Response::Ready).unwrap()).unwrap();
        drop(response_tx);
        let err = bridge.execute("x = 1").await.unwrap_err();
        assert!(matches!(err, BridgeError::Disconnected));
        assert_eq!(bridge.pending_count(), 0);
    }
}
