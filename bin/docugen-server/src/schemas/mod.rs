//! Request and response bodies of the HTTP API.

pub mod generation;
pub mod social;
