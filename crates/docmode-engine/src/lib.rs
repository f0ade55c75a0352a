//! docmode Engine - Browsing contexts for document-mode emulation
//!
//! Windows, frames and the event loop that connects them.
//!
//! Features:
//! - Top-level contexts and iframes with per-frame document modes
//! - Page lifecycle with performance timing, pageshow and pagehide
//! - postMessage with origin checks and structured clone
//! - Storage events across windows sharing an area
//! - Virtual-time timers and asynchronous XHR delivery

mod config;
mod context;
mod engine;
mod error;
mod event_loop;
mod messaging;
mod storage_hub;

pub use config::{EngineConfig, DEFAULT_URL};
pub use context::{BrowsingContext, ContextInit, LoadState};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use event_loop::{install_timers, ContextId, EventLoop, Task, TaskKind, TaskSource};
pub use messaging::TargetOrigin;
pub use storage_hub::{notifications, StorageHub};
