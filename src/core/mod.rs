//! # Host-side Logic
//!
//! Everything the demo host needs around the loader, kept free of any
//! terminal or UI code.
//!
//! ```text
//!     ┌──────────────┐   Response    ┌─────────────────────────┐
//!     │  AsyncLoader │ ────────────▶ │  SearchList (observer)  │
//!     │  (loader)    │               │  search::interpret()    │
//!     └──────────────┘               └─────────────────────────┘
//!            ▲
//!            │ Request
//!     ┌──────────────┐
//!     │    config    │  defaults → file → env → CLI
//!     └──────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Settings and their override hierarchy
//! - [`search`]: Flattening a search response into result lines
//! - [`state`]: The `SearchList` observer

pub mod config;
pub mod search;
pub mod state;
