//! # Region Container
//!
//! Configuration and dependency injection for the regions a node hosts.

pub mod config;
mod region;

pub use config::{parse_regions, ConfigError, LogConfig, NodeConfig, RegionEndpoint};
pub use region::{RegionNode, WiringError};
