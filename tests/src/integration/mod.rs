//! # Cross-Region Integration Scenarios
//!
//! Most scenarios host two regions, `us` and `eu`, in one process on a
//! shared in-memory log and drive them through their HTTP routers.
//! `remote_log` runs each region in its own runtime joined over HTTP.

pub mod harness;

mod conflicts;
mod convergence;
mod idempotency;
mod outage;
mod remote_log;
