//! Service manager - owns the mapping between service names and their
//! on-disk definitions and coordinates all lifecycle operations

mod lifecycle;

pub use lifecycle::Housekeeping;

use crate::{validate_descriptor, CoreError, Result, ServiceName, DESCRIPTOR_FILE};
use dockhand_config::{RegistrySettings, DEFAULT_LOG_TAIL_LINES};
use dockhand_runtime::{test_runtime_connectivity, ComposeRuntime};
use std::fs::{DirBuilder, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Construction-time options for [`ServiceManager`]
#[derive(Debug)]
pub struct ManagerOptions {
    /// Directory holding one sub-directory per service
    pub base_dir: PathBuf,
    /// Lines of container logs attached to start failures
    pub log_tail_lines: usize,
    /// Credentials used when an operation targets a private registry
    pub registry: RegistrySettings,
}

impl ManagerOptions {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            registry: RegistrySettings::default(),
        }
    }
}

/// Main service manager.
///
/// A service exists exactly when its directory exists under the base
/// directory; there is no other record.
pub struct ServiceManager {
    runtime: Box<dyn ComposeRuntime>,
    base_dir: PathBuf,
    log_tail_lines: usize,
    registry: RegistrySettings,
}

impl ServiceManager {
    /// Create a new service manager
    pub fn new(runtime: Box<dyn ComposeRuntime>, options: ManagerOptions) -> Self {
        Self {
            runtime,
            base_dir: options.base_dir,
            log_tail_lines: options.log_tail_lines,
            registry: options.registry,
        }
    }

    /// Create a manager for testing with default options rooted at `base_dir`
    #[cfg(any(test, feature = "test-support"))]
    pub fn new_for_testing(runtime: Box<dyn ComposeRuntime>, base_dir: &Path) -> Self {
        Self::new(runtime, ManagerOptions::new(base_dir))
    }

    /// Base directory holding the service directories
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Whether the runtime answers a ping
    pub async fn runtime_available(&self) -> bool {
        test_runtime_connectivity(self.runtime.as_ref()).await
    }

    /// Make sure the base directory exists
    pub fn ensure_base_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(CoreError::io("failed to create base directory"))
    }

    /// Directory for a service
    pub fn service_path(&self, name: &ServiceName) -> PathBuf {
        name.path_in(&self.base_dir)
    }

    /// Whether a service directory exists
    pub fn exists(&self, name: &ServiceName) -> Result<bool> {
        self.service_path(name)
            .try_exists()
            .map_err(CoreError::io("failed to check service path"))
    }

    /// Resolve the directory of a service that must already exist
    fn require_existing(&self, name: &ServiceName) -> Result<PathBuf> {
        if !self.exists(name)? {
            return Err(CoreError::NotFound(name.to_string()));
        }
        Ok(self.service_path(name))
    }

    /// Create a service: its directory plus the descriptor inside it.
    ///
    /// The directory is created with a single create-if-absent call, so of
    /// several concurrent creates for one name exactly one succeeds. If the
    /// descriptor cannot be written the directory is removed again.
    pub async fn create(&self, name: &str, definition: &str) -> Result<ServiceName> {
        self.create_with(name, definition, write_descriptor)
    }

    fn create_with<W>(&self, name: &str, definition: &str, write: W) -> Result<ServiceName>
    where
        W: FnOnce(&Path, &str) -> std::io::Result<()>,
    {
        let name = ServiceName::parse(name)?;
        validate_descriptor(definition)?;

        // Advisory only; the directory creation below is the real arbiter.
        if self.exists(&name)? {
            return Err(CoreError::AlreadyExists(name.to_string()));
        }

        let path = self.service_path(&name);
        create_service_dir(&path).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                CoreError::AlreadyExists(name.to_string())
            } else {
                CoreError::Io {
                    context: "failed to create service folder",
                    source: e,
                }
            }
        })?;

        if let Err(e) = write(&path.join(DESCRIPTOR_FILE), definition) {
            if let Err(cleanup) = std::fs::remove_dir_all(&path) {
                tracing::warn!(
                    service = %name,
                    "Failed to clean up half-created service folder: {}",
                    cleanup
                );
            }
            return Err(CoreError::Io {
                context: "failed to create docker-compose file",
                source: e,
            });
        }

        tracing::info!(service = %name, path = %path.display(), "service created");
        Ok(name)
    }

    /// Names of all services under the base directory, sorted.
    ///
    /// Only directories with a valid service name and a descriptor count.
    pub async fn list(&self) -> Result<Vec<ServiceName>> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Io {
                    context: "failed to read base directory",
                    source: e,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(CoreError::io("failed to read base directory"))?;
            let path = entry.path();
            if !path.is_dir() || !path.join(DESCRIPTOR_FILE).is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Ok(name) = ServiceName::parse(&file_name) {
                names.push(name);
            }
        }

        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(names)
    }

    /// Current descriptor text of a service
    pub async fn definition(&self, name: &str) -> Result<String> {
        let name = ServiceName::parse(name)?;
        let path = self.require_existing(&name)?;
        std::fs::read_to_string(path.join(DESCRIPTOR_FILE))
            .map_err(CoreError::io("failed to read docker-compose file"))
    }
}

/// Create a single service directory, failing if it already exists
fn create_service_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(path)
}

/// Write the descriptor into a fresh file
fn write_descriptor(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()
}
