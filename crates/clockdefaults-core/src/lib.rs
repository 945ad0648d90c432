//! Per-directory defaults for new time entries.

pub mod api;
pub mod catalog;
pub mod config;
pub mod defaults;
pub mod entry;
pub mod format;
pub mod reconcile;
pub mod search;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
