//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::loader::{Executor, LoadObserver, Request, Response};

/// An executor that answers every request with the same canned response.
/// A gated one holds each call until `release` hands out a permit.
pub struct ScriptedExecutor {
    response: Response,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

/// Decrements the in-flight count when the call finishes or is aborted.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedExecutor {
    pub fn new(response: Response) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(response: Response) -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new(response)
        }
    }

    /// Lets `n` held calls complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls started and not yet finished or dropped.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(&self, _request: &Request) -> Response {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }
        self.response.clone()
    }
}

/// An executor whose every call panics.
pub struct PanickingExecutor;

#[async_trait]
impl Executor for PanickingExecutor {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn execute(&self, _request: &Request) -> Response {
        panic!("executor blew up");
    }
}

/// Observer that remembers everything it was told, and on which thread.
#[derive(Default)]
pub struct RecordingObserver {
    responses: RefCell<Vec<Response>>,
    threads: RefCell<Vec<ThreadId>>,
    resets: RefCell<usize>,
}

impl RecordingObserver {
    pub fn responses(&self) -> Vec<Response> {
        self.responses.borrow().clone()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.borrow().clone()
    }

    pub fn resets(&self) -> usize {
        *self.resets.borrow()
    }
}

impl LoadObserver for RecordingObserver {
    fn on_load_finished(&self, response: &Response) {
        self.responses.borrow_mut().push(response.clone());
        self.threads.borrow_mut().push(std::thread::current().id());
    }

    fn on_loader_reset(&self) {
        *self.resets.borrow_mut() += 1;
    }
}

/// Multi-threaded runtime the loaders under test spawn their workers on.
pub fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("test runtime")
}

/// Polls `cond` until it holds or `timeout` elapses.
pub fn wait_until(cond: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
