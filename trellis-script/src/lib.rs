//! Trellis Script - The script side of the bridge.
//!
//! This crate contains:
//! - Marshaling between engine values and `trellis_api::Value`
//! - The script executor (one rhai engine, one global scope)
//! - The console shim forwarding script logging to the host
//! - The dedicated script thread that owns the executor

pub mod marshal;

mod console;
mod error;
mod executor;
mod thread;

pub use console::{ConsoleLevel, ConsoleSink, MAX_CONSOLE_ARGS, TracingSink};
pub use error::{ExecutorError, MarshalError};
pub use executor::{ExecutorConfig, ScriptExecutor};
pub use thread::ScriptThread;
