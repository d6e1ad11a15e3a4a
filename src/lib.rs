//! restloader library exports for the binary and tests

pub mod app;
pub mod core;
pub mod loader;

#[cfg(test)]
pub mod test_support;
