//! # Command Handler (rr-04)
//!
//! Producer-side entry point for local writes.
//!
//! ## Command Flow
//!
//! ```text
//! validate request id ──► reserve id ──► conditional write ──► mark seen ──► publish
//!        │                    │                 │                               │
//!        ▼                    ▼                 ▼                               ▼
//!  MissingRequestId       Duplicate      VersionConflict               ReplicationPending
//!                                        Store / Timeout               (after retries)
//! ```
//!
//! Side effects are strictly ordered: store mutation, then idempotency
//! marker, then publish. A publish failure never rolls back the store.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | A rejected command has no side effect | `service.rs` - `handle()` |
//! | INVARIANT-2 | One request id commits at most once | `service.rs` - `handle()` via `try_reserve` |
//! | INVARIANT-3 | Only committed records are published | `service.rs` - `publish_with_retry()` |

pub mod config;
pub mod domain;
pub mod error;
pub mod service;

pub use config::CommandConfig;
pub use domain::UpdateCommand;
pub use error::CommandError;
pub use service::CommandHandler;
