//! # AsyncLoader
//!
//! Runs one request on a worker task, caches the outcome and hands it to
//! whichever observer is attached at the time the owner thread picks it up.
//!
//! ```text
//!            start()                        completion
//!   Idle ─────────────▶ Running ─────────────────────────────▶ Delivered(resp)
//!    ▲                     │                                       │
//!    │       reset()       │              reset()                  │
//!    └─────────────────────┴───────────────────────────────────────┘
//!
//!   any state ── destroy() ──▶ Reset (terminal)
//! ```
//!
//! Each `start` spawns two tasks: one runs `execute`, the other waits on it
//! and sends the `Response` back over a channel that belongs to that load
//! only. The owner applies it in `dispatch_pending` or `wait_for_result`.
//! `reset` aborts the execute task and drops the channel, so a late result
//! has nowhere to go. A panicking executor or a worker that vanishes still
//! ends the load, with a transport failure.

use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use super::executor::Executor;
use super::types::{Request, Response};

/// Receives load results on the owner thread.
pub trait LoadObserver {
    fn on_load_finished(&self, response: &Response);

    /// The cached result was discarded. Drop anything derived from it.
    fn on_loader_reset(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Running,
    Delivered(Response),
    /// Destroyed. Never starts again.
    Reset,
}

/// The owner's end of a running load.
struct InFlight {
    rx: Receiver<Response>,
    abort: AbortHandle,
}

pub struct AsyncLoader {
    executor: Arc<dyn Executor>,
    runtime: Handle,
    state: LoadState,
    request: Option<Request>,
    observer: Option<Weak<dyn LoadObserver>>,
    /// Some exactly while `Running`.
    in_flight: Option<InFlight>,
}

impl AsyncLoader {
    pub fn new(executor: Arc<dyn Executor>, runtime: Handle) -> Self {
        Self {
            executor,
            runtime,
            state: LoadState::Idle,
            request: None,
            observer: None,
            in_flight: None,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// The request of the current (running or delivered) load.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn cached(&self) -> Option<&Response> {
        match &self.state {
            LoadState::Delivered(response) => Some(response),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, LoadState::Running)
    }

    /// True if an observer is attached and still alive.
    pub fn has_observer(&self) -> bool {
        self.live_observer().is_some()
    }

    /// Begins loading `request` on the worker runtime. Only the first call
    /// after construction or `reset` has any effect.
    pub fn start(&mut self, request: Request) -> bool {
        match self.state {
            LoadState::Idle => {}
            LoadState::Running | LoadState::Delivered(_) => {
                debug!("start ignored: loader already {}", self.state_label());
                return false;
            }
            LoadState::Reset => {
                warn!("start ignored: loader was destroyed");
                return false;
            }
        }

        info!(
            "Starting load via {}: {} {}",
            self.executor.name(),
            request.verb(),
            request.uri()
        );

        let (tx, rx) = mpsc::channel();
        let executor = Arc::clone(&self.executor);
        let worker_request = request.clone();

        let task = self
            .runtime
            .spawn(async move { executor.execute(&worker_request).await });
        let abort = task.abort_handle();

        self.runtime.spawn(async move {
            let response = match task.await {
                Ok(response) => response,
                Err(e) if e.is_cancelled() => {
                    debug!("Worker cancelled before finishing");
                    return;
                }
                Err(e) => {
                    warn!("Worker failed: {}", e);
                    Response::transport_failure(format!("worker failed: {e}"))
                }
            };
            debug!("Worker finished with HTTP {}", response.status);
            if tx.send(response).is_err() {
                debug!("Completion dropped: load was reset");
            }
        });

        self.request = Some(request);
        self.in_flight = Some(InFlight { rx, abort });
        self.state = LoadState::Running;
        true
    }

    /// Attaches `observer`, replacing any previous one. A cached result is
    /// delivered before this returns.
    pub fn attach<O: LoadObserver + 'static>(&mut self, observer: &Rc<O>) {
        let weak: Weak<O> = Rc::downgrade(observer);
        let weak: Weak<dyn LoadObserver> = weak;
        self.observer = Some(weak);
        debug!("Observer attached while {}", self.state_label());
        self.deliver_cached();
    }

    pub fn detach(&mut self) {
        if self.observer.take().is_some() {
            debug!("Observer detached while {}", self.state_label());
        }
    }

    /// Drops the cached result and returns to `Idle`. A request still in
    /// flight is aborted and its result, if it arrives anyway, discarded.
    pub fn reset(&mut self) {
        if matches!(self.state, LoadState::Idle | LoadState::Reset) {
            return;
        }
        debug!("Reset while {}", self.state_label());
        self.cancel_in_flight();
        self.state = LoadState::Idle;
        self.request = None;
        if let Some(observer) = self.live_observer() {
            observer.on_loader_reset();
        }
    }

    /// Resets, detaches and retires the loader for good.
    pub fn destroy(&mut self) {
        if matches!(self.state, LoadState::Reset) {
            return;
        }
        self.reset();
        self.observer = None;
        self.state = LoadState::Reset;
        debug!("Loader destroyed");
    }

    /// Applies the running load's result if it has arrived, without
    /// blocking. Returns how many results were applied (0 or 1).
    pub fn dispatch_pending(&mut self) -> usize {
        let Some(in_flight) = &self.in_flight else {
            return 0;
        };
        let response = match in_flight.rx.try_recv() {
            Ok(response) => response,
            Err(TryRecvError::Empty) => return 0,
            Err(TryRecvError::Disconnected) => worker_lost(),
        };
        self.complete(response);
        1
    }

    /// Blocks until the running load has been delivered or `timeout` passes.
    /// A timeout too large to represent waits without a deadline.
    /// Returns true if the loader ends up holding a result.
    pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        while let Some(in_flight) = &self.in_flight {
            let received = match deadline {
                Some(deadline) => in_flight
                    .rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => in_flight
                    .rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            let response = match received {
                Ok(response) => response,
                Err(RecvTimeoutError::Timeout) => {
                    debug!("Timed out after {:?} waiting for load", timeout);
                    return false;
                }
                Err(RecvTimeoutError::Disconnected) => worker_lost(),
            };
            self.complete(response);
        }
        self.cached().is_some()
    }

    fn complete(&mut self, response: Response) {
        self.in_flight = None;
        self.state = LoadState::Delivered(response);
        self.deliver_cached();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Aborting in-flight request");
            in_flight.abort.abort();
        }
    }

    fn deliver_cached(&self) {
        let Some(response) = self.cached() else {
            return;
        };
        match self.live_observer() {
            Some(observer) => {
                debug!("Delivering HTTP {} to observer", response.status);
                observer.on_load_finished(response);
            }
            None => debug!("Result cached, no observer attached"),
        }
    }

    fn live_observer(&self) -> Option<Rc<dyn LoadObserver>> {
        self.observer.as_ref().and_then(Weak::upgrade)
    }

    fn state_label(&self) -> &'static str {
        match self.state {
            LoadState::Idle => "idle",
            LoadState::Running => "running",
            LoadState::Delivered(_) => "delivered",
            LoadState::Reset => "reset",
        }
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

/// The worker went away without sending anything (runtime shut down).
fn worker_lost() -> Response {
    warn!("Worker stopped without a result");
    Response::transport_failure("worker stopped without a result")
}
