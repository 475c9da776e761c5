//! HTTP/REST layer for dockhand.
//!
//! Axum router with Basic auth on every lifecycle route and a flat
//! `{ "error": ... }` body for failures.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
