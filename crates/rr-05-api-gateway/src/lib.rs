//! # API Gateway (rr-05)
//!
//! Thin HTTP surface over one region.
//!
//! ## Routes
//!
//! | Method | Path | Success | Errors |
//! |--------|------|---------|--------|
//! | `PUT` | `/entities/{id}` | `200` + record | `400` bad id, body or missing `X-Request-ID`; `409` conflict; `422` duplicate; `500` |
//! | `GET` | `/entities/{id}` | `200` + record | `404` |
//! | `GET` | `/replication-lag` | `{lag_seconds, last_applied_at}` | |
//! | `GET` | `/health` | always `200` while alive | |
//! | `GET` | `/metrics` | Prometheus text | |
//!
//! `/properties/{id}` is an alias of `/entities/{id}`.

pub mod config;
pub mod domain;
pub mod service;

pub use config::GatewayConfig;
pub use domain::{ApiError, UpdateBody, REQUEST_ID_HEADER};
pub use service::{build_router, ApiGatewayService, GatewayState};
