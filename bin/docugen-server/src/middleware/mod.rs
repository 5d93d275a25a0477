//! HTTP middleware stack: API-key check, CORS and per-request tracing.

pub mod auth;
pub mod cors;
pub mod trace;
