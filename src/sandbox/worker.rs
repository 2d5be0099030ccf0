//! Sandbox worker thread
//!
//! The worker owns the [`Tracer`] on a dedicated OS thread and talks to the
//! bridge only through JSON frames on two channels. Runs execute one at a
//! time. While a run is executing, the worker polls its request channel
//! between statements so an `ABORT` for that run can stop it; any other
//! request that arrives meanwhile is queued and handled afterwards.

use super::protocol::{decode_request, encode, Request, Response, RunResult};
use crate::config::TracerLimits;
use crate::trace::outcome::RunStatus;
use crate::trace::tracer::{AbortSignal, Tracer};
use std::collections::VecDeque;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::mpsc::{self, error::TryRecvError};
use uuid::Uuid;

pub const WORKER_THREAD_NAME: &str = "pytrace-sandbox";

/// Spawn the worker; it exits when the request channel closes
pub fn spawn_worker(
    limits: TracerLimits,
    requests: mpsc::UnboundedReceiver<String>,
    responses: mpsc::UnboundedSender<String>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            SandboxWorker::new(limits, requests, responses).run();
        })
}

pub struct SandboxWorker {
    limits: TracerLimits,
    tracer: Option<Tracer>,
    requests: mpsc::UnboundedReceiver<String>,
    responses: mpsc::UnboundedSender<String>,
    /// Requests received while a run was executing
    backlog: VecDeque<Request>,
}

impl SandboxWorker {
    pub fn new(
        limits: TracerLimits,
        requests: mpsc::UnboundedReceiver<String>,
        responses: mpsc::UnboundedSender<String>,
    ) -> Self {
        SandboxWorker {
            limits,
            tracer: None,
            requests,
            responses,
            backlog: VecDeque::new(),
        }
    }

    /// Serve requests until the bridge goes away
    pub fn run(mut self) {
        tracing::info!("sandbox worker started");
        while let Some(request) = self.next_request() {
            let delivered = match request {
                Request::Init => self.handle_init(),
                Request::Run { id, code } => self.handle_run(id, &code),
                Request::Abort { id } => {
                    if !cancel_queued(&mut self.backlog, id) {
                        tracing::debug!(%id, "abort for a run that is not executing");
                    }
                    true
                }
            };
            if !delivered {
                break;
            }
        }
        tracing::info!("sandbox worker stopped");
    }

    fn next_request(&mut self) -> Option<Request> {
        if let Some(request) = self.backlog.pop_front() {
            return Some(request);
        }
        loop {
            let frame = self.requests.blocking_recv()?;
            match decode_request(&frame) {
                Ok(request) => return Some(request),
                Err(err) => tracing::warn!(%err, "dropping malformed request frame"),
            }
        }
    }

    /// Load the tracer once; later `INIT`s just confirm readiness
    fn ensure_tracer(&mut self) -> Result<&mut Tracer, String> {
        if self.tracer.is_none() {
            let tracer = Tracer::new(self.limits).map_err(|err| err.to_string())?;
            self.tracer = Some(tracer);
        }
        self.tracer
            .as_mut()
            .ok_or_else(|| "tracer unavailable".to_string())
    }

    fn handle_init(&mut self) -> bool {
        let response = match self.ensure_tracer() {
            Ok(_) => Response::Ready,
            Err(error) => {
                tracing::error!(%error, "sandbox initialization failed");
                Response::InitFailed { error }
            }
        };
        self.send(&response)
    }

    fn handle_run(&mut self, id: Uuid, code: &str) -> bool {
        tracing::debug!(%id, bytes = code.len(), "run started");
        if let Err(error) = self.ensure_tracer().map(|_| ()) {
            return self.send(&Response::Result(RunResult::sandbox_failure(id, error)));
        }
        let SandboxWorker {
            tracer,
            requests,
            backlog,
            ..
        } = self;
        let Some(tracer) = tracer.as_mut() else {
            return false;
        };

        let mut abort = || poll_abort(id, requests, backlog);
        let start = Instant::now();
        let run = tracer.run_with_abort(code, Some(&mut abort as AbortSignal<'_>));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let status = run.outcome.status;
        tracing::debug!(%id, ?status, elapsed_ms, "run finished");
        let success = status != RunStatus::SyntaxError;
        let error = match &run.outcome.failure {
            Some(failure) if !success => Some(failure.summary()),
            _ => None,
        };
        let result = RunResult {
            id,
            success,
            status: Some(status),
            trace: Some(run.outcome.trace),
            failure: run.outcome.failure,
            stdout: run.stdout,
            stderr: run.stderr,
            execution_time: Some(elapsed_ms),
            error,
        };
        self.send(&Response::Result(result))
    }

    /// Returns false once the bridge has hung up
    fn send(&self, response: &Response) -> bool {
        match encode(response) {
            Ok(frame) => self.responses.send(frame).is_ok(),
            Err(err) => {
                tracing::error!(%err, "failed to encode response");
                true
            }
        }
    }
}

/// Drain pending requests: true if one aborts `current`, others are queued
fn poll_abort(
    current: Uuid,
    requests: &mut mpsc::UnboundedReceiver<String>,
    backlog: &mut VecDeque<Request>,
) -> bool {
    loop {
        match requests.try_recv() {
            Ok(frame) => match decode_request(&frame) {
                Ok(Request::Abort { id }) if id == current => {
                    tracing::info!(%id, "run aborted");
                    return true;
                }
                Ok(Request::Abort { id }) => {
                    if !cancel_queued(backlog, id) {
                        tracing::debug!(%id, "ignoring abort for another run");
                    }
                }
                Ok(request) => backlog.push_back(request),
                Err(err) => tracing::warn!(%err, "dropping malformed request frame"),
            },
            Err(TryRecvError::Empty) => return false,
            // The bridge is gone; nobody is waiting for this run.
            Err(TryRecvError::Disconnected) => return true,
        }
    }
}

/// Drop a queued `RUN` whose caller has given up on it
fn cancel_queued(backlog: &mut VecDeque<Request>, id: Uuid) -> bool {
    let before = backlog.len();
    backlog.retain(|request| !matches!(request, Request::Run { id: queued, .. } if *queued == id));
    let cancelled = backlog.len() < before;
    if cancelled {
        tracing::info!(%id, "queued run aborted");
    }
    cancelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::protocol::decode_response;

    fn start() -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
        JoinHandle<()>,
    ) {
        start_with(TracerLimits::default())
    }

    fn start_with(
        limits: TracerLimits,
    ) -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
        JoinHandle<()>,
    ) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let handle = spawn_worker(limits, request_rx, response_tx).unwrap();
        (request_tx, response_rx, handle)
    }

    fn send(tx: &mpsc::UnboundedSender<String>, request: Request) {
        tx.send(encode(&request).unwrap()).unwrap();
    }

    fn receive(rx: &mut mpsc::UnboundedReceiver<String>) -> Response {
        decode_response(&rx.blocking_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_init_then_run() {
        let (tx, mut rx, handle) = start();
        send(&tx, Request::Init);
        assert_eq!(receive(&mut rx), Response::Ready);

        let id = Uuid::new_v4();
        send(&tx, Request::Run { id, code: "print(1 + 1)\n".to_string() });
        let Response::Result(result) = receive(&mut rx) else {
            panic!("expected a result");
        };
        assert_eq!(result.id, id);
        assert!(result.success);
        assert_eq!(result.stdout, "2\n");
        assert_eq!(result.status, Some(RunStatus::Ok));
        assert!(result.execution_time.is_some());

        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn test_syntax_error_is_unsuccessful_with_trace() {
        let (tx, mut rx, _handle) = start();
        let id = Uuid::new_v4();
        send(&tx, Request::Run { id, code: "def f(:".to_string() });
        let Response::Result(result) = receive(&mut rx) else {
            panic!("expected a result");
        };
        assert!(!result.success);
        assert_eq!(result.trace.map(|t| t.len()), Some(1));
        assert_eq!(result.status, Some(RunStatus::SyntaxError));
        assert!(result.error.is_some_and(|error| error.starts_with("SyntaxError: ")));
    }

    #[test]
    fn test_abort_stops_a_running_program() {
        let (tx, mut rx, _handle) = start();
        let id = Uuid::new_v4();
        let code = "n = 0\nwhile True:\n    n += 1\n".to_string();
        send(&tx, Request::Abort { id });
        send(&tx, Request::Run { id, code });
        send(&tx, Request::Abort { id });
        let Response::Result(result) = receive(&mut rx) else {
            panic!("expected a result");
        };
        // Whichever stopped it first, the run ended early with a notice.
        assert!(matches!(
            result.status,
            Some(RunStatus::Cancelled) | Some(RunStatus::Truncated)
        ));
    }

    #[test]
    fn test_abort_drops_a_queued_run() {
        let limits = TracerLimits {
            step_budget: usize::MAX,
            ..TracerLimits::default()
        };
        let (tx, mut rx, _handle) = start_with(limits);
        let running = Uuid::new_v4();
        let queued = Uuid::new_v4();
        send(&tx, Request::Run { id: running, code: "while True:\n    pass\n".to_string() });
        send(&tx, Request::Run { id: queued, code: "print('late')\n".to_string() });
        send(&tx, Request::Abort { id: queued });
        send(&tx, Request::Abort { id: running });

        let Response::Result(first) = receive(&mut rx) else {
            panic!("expected a result");
        };
        assert_eq!(first.id, running);
        assert_eq!(first.status, Some(RunStatus::Cancelled));

        // The aborted queued run never executes; the next result is for a fresh run.
        let fresh = Uuid::new_v4();
        send(&tx, Request::Run { id: fresh, code: "print('fresh')\n".to_string() });
        let Response::Result(next) = receive(&mut rx) else {
            panic!("expected a result");
        };
        assert_eq!(next.id, fresh);
        assert_eq!(next.stdout, "fresh\n");
    }

    #[test]
    fn test_cancel_queued_only_removes_matching_runs() {
        let keep = Uuid::new_v4();
        let drop_id = Uuid::new_v4();
        let mut backlog = VecDeque::from(vec![
            Request::Run { id: drop_id, code: "a = 1".to_string() },
            Request::Init,
            Request::Run { id: keep, code: "b = 2".to_string() },
        ]);

        assert!(cancel_queued(&mut backlog, drop_id));
        assert!(!cancel_queued(&mut backlog, drop_id));
        assert_eq!(backlog.len(), 2);
        assert!(matches!(backlog.back(), Some(Request::Run { id, .. }) if *id == keep));
    }
}
