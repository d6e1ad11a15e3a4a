//! # Search List State
//!
//! What the host shows for a search: the result lines and, when a load
//! fails, a notice. The list is the loader's observer, so it lives on the
//! owner thread and uses plain `RefCell`s.
//!
//! ```text
//! SearchList
//! ├── items: Vec<String>         // last good result set
//! ├── notice: Option<String>     // failure notice, cleared on success
//! └── deliveries: usize          // how many results were handed over
//! ```

use std::cell::{Cell, RefCell};

use log::{info, warn};

use crate::core::search;
use crate::loader::{LoadObserver, Response};

pub const LOAD_FAILED_NOTICE: &str = "Failed to load search results. Check your internet settings.";

#[derive(Default)]
pub struct SearchList {
    items: RefCell<Vec<String>>,
    notice: RefCell<Option<String>>,
    deliveries: Cell<usize>,
}

impl SearchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<String> {
        self.items.borrow().clone()
    }

    pub fn notice(&self) -> Option<String> {
        self.notice.borrow().clone()
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries.get()
    }
}

impl LoadObserver for SearchList {
    fn on_load_finished(&self, response: &Response) {
        self.deliveries.set(self.deliveries.get() + 1);
        match search::interpret(response) {
            Ok(items) => {
                info!("Search returned {} results", items.len());
                *self.items.borrow_mut() = items;
                self.notice.borrow_mut().take();
            }
            Err(e) => {
                // Keep whatever was shown before; never show half a result set.
                warn!("Search load failed: {}", e);
                *self.notice.borrow_mut() = Some(LOAD_FAILED_NOTICE.to_string());
            }
        }
    }

    fn on_loader_reset(&self) {
        self.items.borrow_mut().clear();
    }
}
