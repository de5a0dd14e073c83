//! # Region Replicator Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Hot-path benchmarks (criterion)
//! └── src/integration/  # Two regions, one shared log
//!     ├── harness.rs    # Cluster fixture and HTTP helpers
//!     ├── convergence.rs
//!     ├── idempotency.rs
//!     ├── conflicts.rs
//!     └── outage.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rr-tests
//!
//! # By scenario
//! cargo test -p rr-tests integration::convergence::
//! cargo test -p rr-tests integration::outage::
//!
//! # Benchmarks
//! cargo bench -p rr-tests
//! ```

#![allow(dead_code)]

pub mod integration;
