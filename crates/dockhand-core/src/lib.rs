//! Core logic for dockhand service lifecycle management
//!
//! This crate provides:
//! - Service naming rules and descriptor validation
//! - The filesystem-backed service store (one directory per service)
//! - Lifecycle transitions (create, start, deploy, remove) sequenced over a
//!   [`dockhand_runtime::ComposeRuntime`]

mod error;
mod manager;
mod service;

pub use error::*;
pub use manager::*;
pub use service::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
