//! HTTP API module.
//!
//! Upload service around the conversion core, plus the log stream.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{build_router, sanitize_filename, start_server};
pub use types::*;
