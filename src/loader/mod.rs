pub mod async_loader;
pub mod executor;
pub mod manager;
pub mod types;

pub use async_loader::{AsyncLoader, LoadObserver, LoadState};
pub use executor::{Executor, HttpExecutor};
pub use manager::{LoaderId, LoaderManager};
pub use types::{HttpVerb, LoadError, Request, Response};
