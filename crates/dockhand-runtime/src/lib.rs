//! Container runtime abstraction for dockhand
//!
//! The service manager never spawns processes itself. Everything it needs
//! from the container runtime goes through [`ComposeRuntime`], which keeps
//! the lifecycle logic testable against a fake implementation.

mod cli_runtime;
mod error;
mod types;

pub use cli_runtime::CliRuntime;
pub use error::*;
pub use types::*;

use async_trait::async_trait;
use dockhand_config::{RegistrySettings, RuntimeSettings};
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;

/// Operations dockhand needs from a compose-capable container runtime.
///
/// Project-scoped operations take the service directory that holds the
/// descriptor; the runtime derives the compose project from it.
#[async_trait]
pub trait ComposeRuntime: Send + Sync {
    /// Log in to a container registry. The password must never appear in
    /// the process argument list.
    async fn login(&self, registry: &RegistrySettings) -> Result<CommandOutput>;

    /// Bring the project up in detached mode
    async fn up(&self, project_dir: &Path) -> Result<CommandOutput>;

    /// IDs of the project's running containers. An empty list is a valid
    /// answer, distinct from an error.
    async fn running_containers(&self, project_dir: &Path) -> Result<Vec<ContainerId>>;

    /// Stop and remove the project's containers and volumes
    async fn down(&self, project_dir: &Path) -> Result<CommandOutput>;

    /// Pull newer versions of the images the descriptor references
    async fn pull(&self, project_dir: &Path) -> Result<CommandOutput>;

    /// Replace the running containers of `service` with freshly pulled images.
    /// Addressed by service name rather than by directory.
    async fn rollout(&self, service: &str, project_dir: &Path) -> Result<CommandOutput>;

    /// Host-wide removal of unused images, networks and stopped containers
    async fn prune(&self) -> Result<CommandOutput>;

    /// Last `lines` lines of the project's container logs.
    ///
    /// Best effort: failures are described in the returned text instead of
    /// being propagated, since this only ever decorates another error.
    async fn recent_logs(&self, project_dir: &Path, lines: usize) -> String;

    /// Check that the runtime binary is callable
    async fn ping(&self) -> Result<()>;

    /// Describe the runtime CLI
    fn info(&self) -> RuntimeInfo;
}

/// Registry login parameters extracted from settings
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a SecretString,
    pub server: Option<&'a str>,
}

/// Validate registry settings before any login attempt.
///
/// Fails with [`RuntimeError::MissingCredentials`] if either half of the
/// credentials is absent. The error never echoes the values.
pub fn login_request(registry: &RegistrySettings) -> Result<LoginRequest<'_>> {
    let creds = &registry.credentials;
    let username = creds
        .username
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or(RuntimeError::MissingCredentials)?;
    let password = creds
        .password
        .as_ref()
        .filter(|p| !p.expose_secret().is_empty())
        .ok_or(RuntimeError::MissingCredentials)?;

    Ok(LoginRequest {
        username,
        password,
        server: registry.server.as_deref().filter(|s| !s.is_empty()),
    })
}

/// Create the CLI runtime described by the settings
pub fn create_runtime(settings: &RuntimeSettings) -> CliRuntime {
    CliRuntime::new(&settings.command, settings.prefix.clone())
}

/// Test if the runtime is available and responsive
pub async fn test_runtime_connectivity(runtime: &dyn ComposeRuntime) -> bool {
    match runtime.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!("Runtime ping failed: {}", e);
            false
        }
    }
}
