//! Test support utilities for dockhand-core
//!
//! Provides MockRuntime for unit testing the ServiceManager (and anything
//! built on top of it) without a real container runtime.

use async_trait::async_trait;
use dockhand_config::RegistrySettings;
use dockhand_runtime::*;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Records which methods were called on the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Login { username: Option<String> },
    Up { dir: String },
    RunningContainers { dir: String },
    Down { dir: String },
    Pull { dir: String },
    Rollout { service: String, dir: String },
    Prune,
    RecentLogs { dir: String, lines: usize },
    Ping,
}

/// Configurable mock compose runtime
pub struct MockRuntime {
    pub calls: Arc<Mutex<Vec<MockCall>>>,
    /// Result for login calls, used once the credentials pass validation
    pub login_result: Arc<Mutex<Result<CommandOutput>>>,
    pub up_result: Arc<Mutex<Result<CommandOutput>>>,
    /// Result for running-container queries
    pub running_result: Arc<Mutex<Result<Vec<ContainerId>>>>,
    pub down_result: Arc<Mutex<Result<CommandOutput>>>,
    pub pull_result: Arc<Mutex<Result<CommandOutput>>>,
    pub rollout_result: Arc<Mutex<Result<CommandOutput>>>,
    pub prune_result: Arc<Mutex<Result<CommandOutput>>>,
    /// Text returned by recent_logs
    pub logs_output: Arc<Mutex<String>>,
    pub ping_result: Arc<Mutex<Result<()>>>,
}

impl MockRuntime {
    /// Create a new mock runtime with default success results and one
    /// running container
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            login_result: Arc::new(Mutex::new(Ok(CommandOutput::new("Login Succeeded\n")))),
            up_result: Arc::new(Mutex::new(Ok(CommandOutput::default()))),
            running_result: Arc::new(Mutex::new(Ok(vec![ContainerId::new("mock_container_id")]))),
            down_result: Arc::new(Mutex::new(Ok(CommandOutput::default()))),
            pull_result: Arc::new(Mutex::new(Ok(CommandOutput::default()))),
            rollout_result: Arc::new(Mutex::new(Ok(CommandOutput::default()))),
            prune_result: Arc::new(Mutex::new(Ok(CommandOutput::new(
                "Total reclaimed space: 0B\n",
            )))),
            logs_output: Arc::new(Mutex::new(String::new())),
            ping_result: Arc::new(Mutex::new(Ok(()))),
        }
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

fn dir_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Helper to clone a Result<T> from an Arc<Mutex<Result<T>>>
fn clone_result<T: Clone>(r: &Arc<Mutex<Result<T>>>) -> Result<T> {
    let guard = r.lock().unwrap();
    match &*guard {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(clone_runtime_error(e)),
    }
}

/// Clone a RuntimeError (thiserror types don't implement Clone)
pub fn clone_runtime_error(e: &RuntimeError) -> RuntimeError {
    match e {
        RuntimeError::Spawn { command, source } => RuntimeError::Spawn {
            command: command.clone(),
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        RuntimeError::CommandFailed {
            command,
            status,
            output,
        } => RuntimeError::CommandFailed {
            command: command.clone(),
            status: status.clone(),
            output: output.clone(),
        },
        RuntimeError::MissingCredentials => RuntimeError::MissingCredentials,
    }
}

#[async_trait]
impl ComposeRuntime for MockRuntime {
    async fn login(&self, registry: &RegistrySettings) -> Result<CommandOutput> {
        self.record(MockCall::Login {
            username: registry.credentials.username.clone(),
        });
        // Same credential check as the real runtime
        login_request(registry)?;
        clone_result(&self.login_result)
    }

    async fn up(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.record(MockCall::Up {
            dir: dir_string(project_dir),
        });
        clone_result(&self.up_result)
    }

    async fn running_containers(&self, project_dir: &Path) -> Result<Vec<ContainerId>> {
        self.record(MockCall::RunningContainers {
            dir: dir_string(project_dir),
        });
        clone_result(&self.running_result)
    }

    async fn down(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.record(MockCall::Down {
            dir: dir_string(project_dir),
        });
        clone_result(&self.down_result)
    }

    async fn pull(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.record(MockCall::Pull {
            dir: dir_string(project_dir),
        });
        clone_result(&self.pull_result)
    }

    async fn rollout(&self, service: &str, project_dir: &Path) -> Result<CommandOutput> {
        self.record(MockCall::Rollout {
            service: service.to_string(),
            dir: dir_string(project_dir),
        });
        clone_result(&self.rollout_result)
    }

    async fn prune(&self) -> Result<CommandOutput> {
        self.record(MockCall::Prune);
        clone_result(&self.prune_result)
    }

    async fn recent_logs(&self, project_dir: &Path, lines: usize) -> String {
        self.record(MockCall::RecentLogs {
            dir: dir_string(project_dir),
            lines,
        });
        self.logs_output.lock().unwrap().clone()
    }

    async fn ping(&self) -> Result<()> {
        self.record(MockCall::Ping);
        clone_result(&self.ping_result)
    }

    fn info(&self) -> RuntimeInfo {
        RuntimeInfo {
            command: "mock".into(),
            prefix: Vec::new(),
        }
    }
}
