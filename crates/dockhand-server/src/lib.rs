//! HTTP control plane for dockhand
//!
//! Exposes the service lifecycle over a small JSON API guarded by Basic
//! auth. The binary in `main.rs` wires settings, runtime and manager
//! together and serves [`http::router::build_router`].

pub mod http;
pub mod state;

pub use state::{ApiCredentials, AppState};
