//! # Idempotency Guard (rr-02)
//!
//! Tracks which client-supplied request identifiers have already produced
//! a committed effect, so a retried command is rejected instead of being
//! applied twice.
//!
//! ## Lifecycle of a request id
//!
//! ```text
//!   (absent) --try_reserve--> InFlight --mark_seen--> Committed --ttl--> (absent)
//!                                 |
//!                                 +------release------> (absent)
//! ```
//!
//! The reservation step closes the window between "not seen yet" and
//! "committed": two concurrent commands with the same id cannot both pass
//! the check.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement Location |
//! |----|-----------|---------------------|
//! | INVARIANT-1 | At most one in-flight reservation per id | `guard.rs` - `try_reserve()` |
//! | INVARIANT-2 | Committed markers live at most `ttl` | `guard.rs` - `expire()` |
//! | INVARIANT-3 | At most `max_entries` committed markers | `guard.rs` - `enforce_capacity()` |

pub mod config;
pub mod domain;
pub mod guard;

pub use config::IdempotencyConfig;
pub use domain::Reservation;
pub use guard::IdempotencyGuard;
