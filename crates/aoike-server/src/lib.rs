//! Development server with live reload for aoike blogs.
//!
//! Serves the project root on demand, running each text file through the
//! plugin container, and reloads connected browsers when sources change.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, RunningServer, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
