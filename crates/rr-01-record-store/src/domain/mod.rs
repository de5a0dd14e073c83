//! # Domain Layer
//!
//! Write-decision rules for the record store.

pub mod rules;

pub use rules::{decide_upsert, plan_conditional_update, UpsertOutcome};
