//! Configuration for dockhand
//!
//! Settings are read once at startup from an optional TOML file
//! (`~/.config/dockhand/config.toml`) and then overridden by environment
//! variables. The resulting [`Settings`] value is handed to the service
//! manager and the container runtime at construction.

mod error;
mod settings;

pub use error::*;
pub use settings::*;
