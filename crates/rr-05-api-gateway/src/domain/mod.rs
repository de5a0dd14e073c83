//! # Domain Layer
//!
//! - `error.rs` - HTTP error mapping
//! - `types.rs` - Request bodies

pub mod error;
pub mod types;

pub use error::ApiError;
pub use types::{UpdateBody, REQUEST_ID_HEADER};
