//! Trellis Host - Runs the script thread and the UI thread as one bridge.
//!
//! This crate contains:
//! - The bridge that forwards script batches to the UI thread
//! - Host configuration loaded from TOML
//! - Logging setup for the `trellis` binary

pub mod bridge;
pub mod config;
pub mod logging;

pub use bridge::{Bridge, FLUSH_UI_BATCH, ROOT_TAG, ROOT_TAG_GLOBAL, UI_MANAGER_CONSTANTS};
pub use config::HostConfig;
pub use logging::setup_logging;
