//! # Loader Manager
//!
//! Owns loaders by id so they outlive the observers that come and go around
//! them. A host tears its view down with `detach_all`, builds a new one and
//! calls `init_loader` again; a loader that already finished hands over its
//! cached result without another request.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::runtime::Handle;

use super::async_loader::{AsyncLoader, LoadObserver};
use super::executor::Executor;
use super::types::Request;

pub type LoaderId = u32;

pub struct LoaderManager {
    executor: Arc<dyn Executor>,
    runtime: Handle,
    loaders: BTreeMap<LoaderId, AsyncLoader>,
}

impl LoaderManager {
    pub fn new(executor: Arc<dyn Executor>, runtime: Handle) -> Self {
        Self {
            executor,
            runtime,
            loaders: BTreeMap::new(),
        }
    }

    /// Returns the loader for `id`, creating and starting it if needed, with
    /// `observer` attached. An existing loader keeps its original request.
    pub fn init_loader<O: LoadObserver + 'static>(
        &mut self,
        id: LoaderId,
        request: Request,
        observer: &Rc<O>,
    ) -> &mut AsyncLoader {
        let executor = &self.executor;
        let runtime = &self.runtime;
        let loader = self.loaders.entry(id).or_insert_with(|| {
            info!("Creating loader {:#x}", id);
            AsyncLoader::new(Arc::clone(executor), runtime.clone())
        });
        loader.attach(observer);
        loader.start(request);
        loader
    }

    /// Discards any loader for `id` and starts a fresh one.
    pub fn restart_loader<O: LoadObserver + 'static>(
        &mut self,
        id: LoaderId,
        request: Request,
        observer: &Rc<O>,
    ) -> &mut AsyncLoader {
        self.destroy_loader(id);
        self.init_loader(id, request, observer)
    }

    /// Returns false if there was no loader with this id.
    pub fn destroy_loader(&mut self, id: LoaderId) -> bool {
        match self.loaders.remove(&id) {
            Some(mut loader) => {
                debug!("Destroying loader {:#x}", id);
                loader.destroy();
                true
            }
            None => false,
        }
    }

    /// Detaches every observer. Loaders keep running and caching.
    pub fn detach_all(&mut self) {
        for loader in self.loaders.values_mut() {
            loader.detach();
        }
    }

    pub fn get(&self, id: LoaderId) -> Option<&AsyncLoader> {
        self.loaders.get(&id)
    }

    pub fn get_mut(&mut self, id: LoaderId) -> Option<&mut AsyncLoader> {
        self.loaders.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    pub fn dispatch_pending(&mut self) -> usize {
        self.loaders
            .values_mut()
            .map(AsyncLoader::dispatch_pending)
            .sum()
    }

    /// Blocks until no loader is running or `timeout` passes.
    /// Returns true if every loader settled in time.
    pub fn wait_for_results(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        for loader in self.loaders.values_mut() {
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => Duration::MAX,
            };
            if loader.is_running() && !loader.wait_for_result(remaining) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadState, Response};
    use crate::test_support::{RecordingObserver, ScriptedExecutor, test_runtime};

    const SEARCH: LoaderId = 0x1;
    const WAIT: Duration = Duration::from_secs(5);

    fn search_request() -> Request {
        Request::get("http://x/search.json").param("q", "android")
    }

    #[test]
    fn test_init_loader_creates_and_starts() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor.clone(), runtime.handle().clone());
        let observer = Rc::new(RecordingObserver::default());

        let loader = manager.init_loader(SEARCH, search_request(), &observer);
        assert!(loader.is_running() || loader.cached().is_some());
        assert!(manager.wait_for_results(WAIT));

        assert_eq!(manager.len(), 1);
        assert_eq!(observer.responses().len(), 1);
        assert_eq!(executor.calls(), 1);
    }

    #[test]
    fn test_reinit_after_teardown_reuses_cache() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor.clone(), runtime.handle().clone());

        let first = Rc::new(RecordingObserver::default());
        manager.init_loader(SEARCH, search_request(), &first);
        assert!(manager.wait_for_results(WAIT));

        manager.detach_all();
        drop(first);

        let second = Rc::new(RecordingObserver::default());
        manager.init_loader(SEARCH, Request::get("http://x/ignored"), &second);

        assert_eq!(second.responses(), vec![Response::new(200, "body")]);
        assert_eq!(executor.calls(), 1);
        assert_eq!(
            manager.get(SEARCH).and_then(AsyncLoader::request),
            Some(&search_request())
        );
    }

    #[test]
    fn test_teardown_mid_flight_delivers_to_new_observer() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::gated(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor.clone(), runtime.handle().clone());

        let first = Rc::new(RecordingObserver::default());
        manager.init_loader(SEARCH, search_request(), &first);
        manager.detach_all();

        let second = Rc::new(RecordingObserver::default());
        manager.init_loader(SEARCH, search_request(), &second);
        executor.release(1);
        assert!(manager.wait_for_results(WAIT));

        assert!(first.responses().is_empty());
        assert_eq!(second.responses().len(), 1);
        assert_eq!(executor.calls(), 1);
    }

    #[test]
    fn test_restart_loader_fetches_again() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor.clone(), runtime.handle().clone());
        let observer = Rc::new(RecordingObserver::default());

        manager.init_loader(SEARCH, search_request(), &observer);
        assert!(manager.wait_for_results(WAIT));

        let other = Request::get("http://x/search.json").param("q", "rust");
        manager.restart_loader(SEARCH, other.clone(), &observer);
        assert!(manager.wait_for_results(WAIT));

        assert_eq!(observer.resets(), 1);
        assert_eq!(observer.responses().len(), 2);
        assert_eq!(executor.calls(), 2);
        assert_eq!(manager.get(SEARCH).and_then(AsyncLoader::request), Some(&other));
    }

    #[test]
    fn test_wait_for_results_without_deadline() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor, runtime.handle().clone());
        let observer = Rc::new(RecordingObserver::default());

        manager.init_loader(SEARCH, search_request(), &observer);
        assert!(manager.wait_for_results(Duration::MAX));
        assert_eq!(observer.responses().len(), 1);
    }

    #[test]
    fn test_destroy_loader() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor, runtime.handle().clone());
        let observer = Rc::new(RecordingObserver::default());

        assert!(!manager.destroy_loader(SEARCH));
        manager.init_loader(SEARCH, search_request(), &observer);
        assert!(manager.destroy_loader(SEARCH));
        assert!(manager.is_empty());
        assert!(manager.get(SEARCH).is_none());
        assert_eq!(observer.resets(), 1);
    }

    #[test]
    fn test_dispatch_pending_across_loaders() {
        let runtime = test_runtime();
        let executor = Arc::new(ScriptedExecutor::new(Response::new(200, "body")));
        let mut manager = LoaderManager::new(executor.clone(), runtime.handle().clone());
        let a = Rc::new(RecordingObserver::default());
        let b = Rc::new(RecordingObserver::default());

        manager.init_loader(1, search_request(), &a);
        manager.init_loader(2, search_request(), &b);

        let deadline = Instant::now() + WAIT;
        let mut drained = 0;
        while drained < 2 && Instant::now() < deadline {
            drained += manager.dispatch_pending();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(drained, 2);
        assert_eq!(a.responses().len(), 1);
        assert_eq!(b.responses().len(), 1);
        assert!(matches!(
            manager.get_mut(1).map(|l| l.state().clone()),
            Some(LoadState::Delivered(_))
        ));
    }
}
