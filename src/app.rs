//! # Host
//!
//! Owns the loader manager and the search list, runs one search and prints
//! the outcome. Plays the role of the screen that would normally sit around
//! a loader: it creates the observer, hands it to `init_loader`, and reads
//! the list back once the result has been delivered on this thread.

use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tokio::runtime::Handle;

use crate::core::config::ResolvedConfig;
use crate::core::state::{LOAD_FAILED_NOTICE, SearchList};
use crate::loader::{Executor, HttpExecutor, LoaderId, LoaderManager};

pub const SEARCH_LOADER: LoaderId = 0x1;

/// Extra time on top of the HTTP timeout before the host gives up waiting.
const DELIVERY_GRACE: Duration = Duration::from_secs(2);

/// Runs the search described by `config`, writing results to `out` and the
/// failure notice to `err`. Returns whether results were shown.
pub fn run(
    config: &ResolvedConfig,
    runtime: Handle,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<bool> {
    let executor: Arc<dyn Executor> =
        Arc::new(HttpExecutor::new(config.timeout, &config.user_agent));
    let mut manager = LoaderManager::new(executor, runtime);
    let list = Rc::new(SearchList::new());

    manager.init_loader(SEARCH_LOADER, config.request(), &list);
    let wait = delivery_wait(config.timeout);
    if !manager.wait_for_results(wait) {
        warn!("No result after {wait:?}");
    }
    manager.detach_all();

    render(&list, out, err)
}

/// How long the host waits for a delivery given the HTTP timeout.
fn delivery_wait(timeout: Duration) -> Duration {
    timeout.saturating_add(DELIVERY_GRACE)
}

/// Prints the list, or the notice if the last load failed or never finished.
pub fn render(list: &SearchList, out: &mut impl Write, err: &mut impl Write) -> io::Result<bool> {
    if list.deliveries() == 0 {
        writeln!(err, "{LOAD_FAILED_NOTICE}")?;
        return Ok(false);
    }
    if let Some(notice) = list.notice() {
        writeln!(err, "{notice}")?;
        return Ok(false);
    }

    let items = list.items();
    info!("Rendering {} results", items.len());
    for item in &items {
        writeln!(out, "{item}")?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadObserver, Response};

    fn rendered(list: &SearchList) -> (bool, String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let shown = render(list, &mut out, &mut err).unwrap();
        (
            shown,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_render_results() {
        let list = SearchList::new();
        list.on_load_finished(&Response::new(
            200,
            r#"{"results":[{"text":"hello android"},{"text":"bye"}]}"#,
        ));
        let (shown, out, err) = rendered(&list);
        assert!(shown);
        assert_eq!(out, "hello android\nbye\n");
        assert!(err.is_empty());
    }

    #[test]
    fn test_render_failure_notice() {
        let list = SearchList::new();
        list.on_load_finished(&Response::new(500, ""));
        let (shown, out, err) = rendered(&list);
        assert!(!shown);
        assert!(out.is_empty());
        assert_eq!(err.trim_end(), LOAD_FAILED_NOTICE);
    }

    #[test]
    fn test_render_without_delivery() {
        let (shown, _, err) = rendered(&SearchList::new());
        assert!(!shown);
        assert_eq!(err.trim_end(), LOAD_FAILED_NOTICE);
    }

    #[test]
    fn test_delivery_wait_saturates() {
        assert_eq!(delivery_wait(Duration::from_secs(30)), Duration::from_secs(32));
        assert_eq!(delivery_wait(Duration::MAX), Duration::MAX);
        assert_eq!(
            delivery_wait(Duration::from_secs(u64::MAX)),
            Duration::MAX
        );
    }
}
