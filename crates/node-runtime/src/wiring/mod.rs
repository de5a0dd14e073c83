//! # Runtime Wiring
//!
//! Starts each hosted region's background tasks and HTTP listener and
//! stops them on shutdown.
//!
//! ## Task Layout
//!
//! ```text
//! NodeRuntime
//!   ├── region "us": coordinator supervisor, HTTP server
//!   └── region "eu": coordinator supervisor, HTTP server
//!                │
//!        shared shutdown watch
//! ```
//!
//! The coordinator never gates HTTP startup. `/health` answers as soon as
//! the listener is bound, whatever the replication state.

mod runtime;
mod supervisor;

pub use runtime::{LogBackend, NodeRuntime};
pub use supervisor::{supervise_coordinator, RESTART_DELAY};
