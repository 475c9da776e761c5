//! CLI-based compose runtime
//!
//! Shells out to `docker` (or a compatible binary) for every operation:
//! - compose sub-commands run with the service directory as working
//!   directory, so the runtime picks up `docker-compose.yml` and derives the
//!   project name from the directory
//! - registry passwords are written to the child's stdin

use crate::{
    login_request, CommandOutput, ComposeRuntime, ContainerId, Result, RuntimeError, RuntimeInfo,
};
use async_trait::async_trait;
use dockhand_config::RegistrySettings;
use secrecy::ExposeSecret;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// CLI-based compose runtime
pub struct CliRuntime {
    /// Command to use ("docker" or a compatible CLI)
    cmd: String,
    /// Optional prefix (e.g., ["sudo"] or ["flatpak-spawn", "--host"])
    cmd_prefix: Vec<String>,
}

impl CliRuntime {
    pub fn new(cmd: impl Into<String>, cmd_prefix: Vec<String>) -> Self {
        Self {
            cmd: cmd.into(),
            cmd_prefix,
        }
    }

    /// Docker CLI without prefix
    pub fn docker() -> Self {
        Self::new("docker", Vec::new())
    }

    /// Build a command with the correct prefix.
    fn build_command(&self) -> Command {
        if self.cmd_prefix.is_empty() {
            Command::new(&self.cmd)
        } else {
            let mut c = Command::new(&self.cmd_prefix[0]);
            for prefix_arg in &self.cmd_prefix[1..] {
                c.arg(prefix_arg);
            }
            c.arg(&self.cmd);
            c
        }
    }

    /// Human-readable command line used in logs and error messages
    fn command_line(&self, args: &[&str]) -> String {
        let mut parts: Vec<&str> = self.cmd_prefix.iter().map(String::as_str).collect();
        parts.push(&self.cmd);
        parts.extend_from_slice(args);
        parts.join(" ")
    }

    /// Spawn a command and wait for its output.
    ///
    /// Returns the printable command line alongside the output so callers
    /// can build errors from either.
    async fn output(
        &self,
        args: &[&str],
        dir: Option<&Path>,
    ) -> Result<(String, std::process::Output)> {
        let command = self.command_line(args);
        tracing::debug!(command = %command, dir = ?dir, "running runtime command");

        let mut cmd = self.build_command();
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        Ok((command, output))
    }

    /// Run a command, returning combined stdout+stderr on success.
    ///
    /// A non-zero exit becomes [`RuntimeError::CommandFailed`] carrying the
    /// same combined output.
    async fn run(&self, args: &[&str], dir: Option<&Path>) -> Result<CommandOutput> {
        let (command, output) = self.output(args, dir).await?;
        Self::check_output(command, output)
    }

    /// Run a command and return stdout only, ignoring stderr noise
    async fn run_stdout(&self, args: &[&str], dir: Option<&Path>) -> Result<String> {
        let (command, output) = self.output(args, dir).await?;

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                status: output.status.to_string(),
                output: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn check_output(command: String, output: std::process::Output) -> Result<CommandOutput> {
        let combined = combined_output(&output.stdout, &output.stderr);
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                status: output.status.to_string(),
                output: combined,
            });
        }
        Ok(CommandOutput::new(combined))
    }
}

#[async_trait]
impl ComposeRuntime for CliRuntime {
    async fn login(&self, registry: &RegistrySettings) -> Result<CommandOutput> {
        let req = login_request(registry)?;

        let mut args = vec!["login", "-u", req.username, "--password-stdin"];
        if let Some(server) = req.server {
            args.push(server);
        }
        let command = self.command_line(&args);
        tracing::debug!(command = %command, "logging in to registry");

        let mut cmd = self.build_command();
        cmd.args(&args);

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // Ignore write errors: a child that exits early reports through its status.
            let _ = stdin
                .write_all(req.password.expose_secret().as_bytes())
                .await;
            let _ = stdin.shutdown().await;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        Self::check_output(command, output)
    }

    async fn up(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.run(&["compose", "up", "-d"], Some(project_dir)).await
    }

    async fn running_containers(&self, project_dir: &Path) -> Result<Vec<ContainerId>> {
        let stdout = self
            .run_stdout(&["compose", "ps", "-q"], Some(project_dir))
            .await?;
        Ok(parse_container_ids(&stdout))
    }

    async fn down(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.run(&["compose", "down", "--volumes"], Some(project_dir))
            .await
    }

    async fn pull(&self, project_dir: &Path) -> Result<CommandOutput> {
        self.run(&["compose", "pull"], Some(project_dir)).await
    }

    async fn rollout(&self, service: &str, project_dir: &Path) -> Result<CommandOutput> {
        self.run(&["rollout", service], Some(project_dir)).await
    }

    async fn prune(&self) -> Result<CommandOutput> {
        self.run(&["system", "prune", "-f"], None).await
    }

    async fn recent_logs(&self, project_dir: &Path, lines: usize) -> String {
        let tail = format!("--tail={}", lines);
        match self
            .run_stdout(&["compose", "logs", &tail], Some(project_dir))
            .await
        {
            Ok(logs) => logs,
            Err(e) => format!("Failed to get logs: {}", e),
        }
    }

    async fn ping(&self) -> Result<()> {
        self.run(&["--version"], None).await?;
        Ok(())
    }

    fn info(&self) -> RuntimeInfo {
        RuntimeInfo {
            command: self.cmd.clone(),
            prefix: self.cmd_prefix.clone(),
        }
    }
}

fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    format!("{}{}", stdout, stderr)
}

/// Parse `compose ps -q` output: one container ID per non-empty line
fn parse_container_ids(stdout: &str) -> Vec<ContainerId> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ContainerId::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockhand_config::Credentials;

    #[test]
    fn test_parse_container_ids() {
        let ids = parse_container_ids("abc123\n\n  def456  \n");
        assert_eq!(ids, vec![ContainerId::new("abc123"), ContainerId::new("def456")]);
    }

    #[test]
    fn test_parse_container_ids_empty_output() {
        assert!(parse_container_ids("").is_empty());
        assert!(parse_container_ids("  \n\n").is_empty());
    }

    #[test]
    fn test_combined_output_order() {
        assert_eq!(combined_output(b"out\n", b"err\n"), "out\nerr\n");
    }

    #[test]
    fn test_command_line_with_prefix() {
        let rt = CliRuntime::new("podman", vec!["flatpak-spawn".into(), "--host".into()]);
        assert_eq!(
            rt.command_line(&["compose", "up", "-d"]),
            "flatpak-spawn --host podman compose up -d"
        );
        assert_eq!(CliRuntime::docker().command_line(&["system", "prune", "-f"]), "docker system prune -f");
    }

    #[tokio::test]
    async fn test_login_missing_credentials_fails_before_spawn() {
        // A binary that cannot exist: reaching spawn would yield Spawn, not MissingCredentials
        let rt = CliRuntime::new("dockhand-test-no-such-binary", Vec::new());
        let err = rt.login(&RegistrySettings::default()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("dockhand-test-no-such-binary", Vec::new());
        let err = rt.up(tmp.path()).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Spawn { .. }));
        assert!(err.to_string().contains("compose up -d"));
    }

    #[tokio::test]
    async fn test_query_spawn_error_names_command() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("docker", vec!["dockhand-test-no-such-wrapper".into()]);
        let err = rt.running_containers(tmp.path()).await.unwrap_err();
        match err {
            RuntimeError::Spawn { command, .. } => {
                assert_eq!(command, "dockhand-test-no-such-wrapper docker compose ps -q");
            }
            other => panic!("expected Spawn, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recent_logs_describes_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("dockhand-test-no-such-binary", Vec::new());
        let logs = rt.recent_logs(tmp.path(), 50).await;
        assert!(logs.starts_with("Failed to get logs:"), "got: {}", logs);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compose_arguments_via_echo() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("echo", Vec::new());

        assert_eq!(rt.up(tmp.path()).await.unwrap().output, "compose up -d\n");
        assert_eq!(rt.down(tmp.path()).await.unwrap().output, "compose down --volumes\n");
        assert_eq!(rt.pull(tmp.path()).await.unwrap().output, "compose pull\n");
        assert_eq!(rt.rollout("web", tmp.path()).await.unwrap().output, "rollout web\n");
        assert_eq!(rt.prune().await.unwrap().output, "system prune -f\n");
        assert_eq!(rt.recent_logs(tmp.path(), 50).await, "compose logs --tail=50\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_login_keeps_password_out_of_arguments() {
        let rt = CliRuntime::new("echo", Vec::new());
        let registry = RegistrySettings {
            credentials: Credentials::new("ci", "s3cr3t-token"),
            server: Some("ghcr.io".into()),
        };
        let out = rt.login(&registry).await.unwrap();
        assert_eq!(out.output, "login -u ci --password-stdin ghcr.io\n");
        assert!(!out.output.contains("s3cr3t-token"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_command_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("false", Vec::new());
        let err = rt.pull(tmp.path()).await.unwrap_err();
        match err {
            RuntimeError::CommandFailed { command, .. } => {
                assert_eq!(command, "false compose pull");
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
        assert!(rt.running_containers(tmp.path()).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_running_containers_empty_on_silent_success() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = CliRuntime::new("true", Vec::new());
        let ids = rt.running_containers(tmp.path()).await.unwrap();
        assert!(ids.is_empty());
    }
}
