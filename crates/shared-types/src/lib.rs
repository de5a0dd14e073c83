//! # Shared Types Crate
//!
//! This crate contains the replicated entity model, the wall-clock port and
//! the collaborator error types shared by every region subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Version Is Authority**: `EntityRecord::version` orders writes;
//!   `updated_at` is informational because regional clocks may skew.
//! - **Origin Tagging**: every record carries the region that produced it,
//!   which is what lets a consumer filter out its own events.

pub mod clock;
pub mod entities;
pub mod errors;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entities::*;
pub use errors::*;
