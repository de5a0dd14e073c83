//! # Node Runtime Library
//!
//! This library exposes the runtime's wiring for testing. The main entry
//! point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - Node configuration and per-region dependency injection
//! - `wiring/` - Task startup, coordinator supervision and shutdown

pub mod container;
pub mod wiring;

pub use container::{
    parse_regions, ConfigError, LogConfig, NodeConfig, RegionEndpoint, RegionNode, WiringError,
};
pub use wiring::{supervise_coordinator, LogBackend, NodeRuntime};
