//! Runtime-backed lifecycle transitions for ServiceManager

use crate::{CoreError, Result, ServiceName, Step};
use dockhand_runtime::ContainerId;
use std::path::Path;

use super::ServiceManager;

/// Result of the host-wide prune that closes Deploy and Remove.
///
/// Pruning is housekeeping: by the time it runs the operation itself has
/// already succeeded, so a failure is reported but never fails the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Housekeeping {
    Clean,
    Failed(String),
}

impl Housekeeping {
    /// Warning text for the caller, if pruning failed
    pub fn warning(&self) -> Option<String> {
        match self {
            Self::Clean => None,
            Self::Failed(detail) => Some(format!("failed to prune unused resources: {}", detail)),
        }
    }
}

impl ServiceManager {
    /// Start a service and verify that at least one container is running.
    ///
    /// 1. Log in to the registry if the images are private
    /// 2. `compose up -d`
    /// 3. Query running containers; none running is a failure even when
    ///    step 2 succeeded
    ///
    /// Failures in steps 2 and 3 carry the most recent container logs.
    pub async fn start(&self, name: &str, private_registry: bool) -> Result<Vec<ContainerId>> {
        let name = ServiceName::parse(name)?;
        let path = self.require_existing(&name)?;

        if private_registry {
            self.login(&name).await?;
        }

        tracing::info!(service = %name, "starting service");
        if let Err(e) = self.runtime.up(&path).await {
            let logs = self.recent_logs(&path).await;
            return Err(CoreError::execution(Step::BringUp, with_logs(e.to_string(), &logs)));
        }

        match self.runtime.running_containers(&path).await {
            Ok(ids) if ids.is_empty() => {
                let logs = self.recent_logs(&path).await;
                Err(CoreError::execution(
                    Step::StatusCheck,
                    with_logs("no containers are running".to_string(), &logs),
                ))
            }
            Ok(ids) => {
                tracing::info!(service = %name, containers = ids.len(), "service started");
                Ok(ids)
            }
            Err(e) => {
                let logs = self.recent_logs(&path).await;
                Err(CoreError::execution(Step::StatusCheck, with_logs(e.to_string(), &logs)))
            }
        }
    }

    /// Roll a running service onto freshly pulled images.
    ///
    /// Login, pull and rollout each gate the next step. The closing prune
    /// is reported through [`Housekeeping`].
    pub async fn deploy(&self, name: &str, private_registry: bool) -> Result<Housekeeping> {
        let name = ServiceName::parse(name)?;
        let path = self.require_existing(&name)?;

        if private_registry {
            self.login(&name).await?;
        }

        tracing::info!(service = %name, "pulling images");
        self.runtime
            .pull(&path)
            .await
            .map_err(|e| CoreError::execution(Step::Pull, e.to_string()))?;

        tracing::info!(service = %name, "rolling out new containers");
        self.runtime
            .rollout(name.as_str(), &path)
            .await
            .map_err(|e| CoreError::execution(Step::Rollout, e.to_string()))?;

        tracing::info!(service = %name, "service deployed");
        Ok(self.housekeeping().await)
    }

    /// Tear a service down and delete its directory.
    ///
    /// If teardown fails the directory is kept so the call can be retried.
    /// If the directory cannot be deleted afterwards, the containers stay
    /// down and the error is returned.
    pub async fn remove(&self, name: &str) -> Result<Housekeeping> {
        self.remove_with(name, |path| std::fs::remove_dir_all(path)).await
    }

    async fn remove_with<D>(&self, name: &str, delete_dir: D) -> Result<Housekeeping>
    where
        D: FnOnce(&Path) -> std::io::Result<()>,
    {
        let name = ServiceName::parse(name)?;
        let path = self.require_existing(&name)?;

        tracing::info!(service = %name, "tearing down service");
        self.runtime
            .down(&path)
            .await
            .map_err(|e| CoreError::execution(Step::Teardown, e.to_string()))?;

        delete_dir(&path).map_err(CoreError::io("failed to remove service folder"))?;

        tracing::info!(service = %name, "service removed");
        Ok(self.housekeeping().await)
    }

    async fn login(&self, name: &ServiceName) -> Result<()> {
        tracing::info!(service = %name, "logging in to registry");
        self.runtime
            .login(&self.registry)
            .await
            .map(|_| ())
            .map_err(CoreError::Authentication)
    }

    async fn recent_logs(&self, path: &Path) -> String {
        self.runtime.recent_logs(path, self.log_tail_lines).await
    }

    async fn housekeeping(&self) -> Housekeeping {
        match self.runtime.prune().await {
            Ok(_) => Housekeeping::Clean,
            Err(e) => {
                tracing::warn!("Prune after lifecycle operation failed: {}", e);
                Housekeeping::Failed(e.to_string())
            }
        }
    }
}

fn with_logs(detail: String, logs: &str) -> String {
    format!("{}\nContainer logs:\n{}", detail, logs)
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::{CoreError, ManagerOptions, ServiceManager, Step, DESCRIPTOR_FILE};
    use dockhand_config::{Credentials, RegistrySettings};
    use dockhand_runtime::{ContainerId, RuntimeError};
    use std::path::Path;

    const COMPOSE: &str = "services:\n  web:\n    image: nginx:alpine\n";

    fn failure(msg: &str) -> RuntimeError {
        RuntimeError::CommandFailed {
            command: "docker compose".into(),
            status: "exit status: 1".into(),
            output: msg.into(),
        }
    }

    fn private_registry() -> RegistrySettings {
        RegistrySettings {
            credentials: Credentials::new("ci", "token"),
            server: None,
        }
    }

    /// Manager with an existing "web" service
    async fn manager_with_service(mock: MockRuntime, base: &Path) -> ServiceManager {
        let mut options = ManagerOptions::new(base);
        options.registry = private_registry();
        let mgr = ServiceManager::new(Box::new(mock), options);
        mgr.create("web", COMPOSE).await.unwrap();
        mgr
    }

    // ==================== Start ====================

    #[tokio::test]
    async fn test_start_success() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let ids = mgr.start("web", false).await.unwrap();
        assert_eq!(ids, vec![ContainerId::new("mock_container_id")]);

        let dir = tmp.path().join("web").to_string_lossy().to_string();
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                MockCall::Up { dir: dir.clone() },
                MockCall::RunningContainers { dir },
            ]
        );
    }

    #[tokio::test]
    async fn test_start_not_found_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = ServiceManager::new_for_testing(Box::new(mock), tmp.path());

        let err = mgr.start("ghost", true).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(ref n) if n == "ghost"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_zero_containers_includes_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        *mock.running_result.lock().unwrap() = Ok(Vec::new());
        *mock.logs_output.lock().unwrap() = "web-1 | panic: missing DATABASE_URL".into();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.start("web", false).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::StatusCheck));
        let msg = err.to_string();
        assert!(msg.contains("no containers are running"), "{}", msg);
        assert!(msg.contains("panic: missing DATABASE_URL"), "{}", msg);
    }

    #[tokio::test]
    async fn test_start_up_failure_includes_output_and_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        *mock.up_result.lock().unwrap() = Err(failure("port is already allocated"));
        *mock.logs_output.lock().unwrap() = "web-1 | bind failed".into();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.start("web", false).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::BringUp));
        let msg = err.to_string();
        assert!(msg.contains("port is already allocated"), "{}", msg);
        assert!(msg.contains("Container logs:\nweb-1 | bind failed"), "{}", msg);

        // No status query after a failed bring-up
        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| matches!(c, MockCall::RunningContainers { .. })));
        assert!(calls.iter().any(|c| matches!(c, MockCall::RecentLogs { lines: 50, .. })));
    }

    #[tokio::test]
    async fn test_start_status_query_failure_includes_logs() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        *mock.running_result.lock().unwrap() = Err(failure("daemon unreachable"));
        *mock.logs_output.lock().unwrap() = "last words".into();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let msg = mgr.start("web", false).await.unwrap_err().to_string();
        assert!(msg.contains("daemon unreachable"));
        assert!(msg.contains("last words"));
    }

    #[tokio::test]
    async fn test_start_private_logs_in_first() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = manager_with_service(mock, tmp.path()).await;

        mgr.start("web", true).await.unwrap();
        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], MockCall::Login { username: Some("ci".into()) });
        assert!(matches!(calls[1], MockCall::Up { .. }));
    }

    #[tokio::test]
    async fn test_start_login_failure_aborts_before_up() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        *mock.login_result.lock().unwrap() = Err(failure("unauthorized: incorrect username or password"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.start("web", true).await.unwrap_err();
        assert!(matches!(err, CoreError::Authentication(_)));
        assert!(!calls.lock().unwrap().iter().any(|c| matches!(c, MockCall::Up { .. })));
    }

    // ==================== Deploy ====================

    #[tokio::test]
    async fn test_deploy_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let housekeeping = mgr.deploy("web", false).await.unwrap();
        assert_eq!(housekeeping, super::Housekeeping::Clean);
        assert!(housekeeping.warning().is_none());

        let dir = tmp.path().join("web").to_string_lossy().to_string();
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                MockCall::Pull { dir: dir.clone() },
                MockCall::Rollout { service: "web".into(), dir },
                MockCall::Prune,
            ]
        );
    }

    #[tokio::test]
    async fn test_deploy_private_missing_credentials_has_no_side_effects() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        // No registry credentials configured
        let mgr = ServiceManager::new_for_testing(Box::new(mock), tmp.path());
        mgr.create("web", COMPOSE).await.unwrap();

        let err = mgr.deploy("web", true).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Authentication(RuntimeError::MissingCredentials)
        ));

        let calls = calls.lock().unwrap();
        assert_eq!(*calls, vec![MockCall::Login { username: None }]);
    }

    #[tokio::test]
    async fn test_deploy_pull_failure_stops_rollout() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        *mock.pull_result.lock().unwrap() = Err(failure("manifest unknown"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.deploy("web", false).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Pull));
        assert!(err.to_string().starts_with("compose pull failed: "));
        assert!(err.to_string().contains("manifest unknown"));

        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| matches!(c, MockCall::Rollout { .. } | MockCall::Prune)));
    }

    #[tokio::test]
    async fn test_deploy_rollout_failure_skips_prune() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        *mock.rollout_result.lock().unwrap() = Err(failure("healthcheck timed out"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.deploy("web", false).await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Rollout));
        assert!(err.to_string().starts_with("rollout failed: "));
        assert!(!calls.lock().unwrap().contains(&MockCall::Prune));
    }

    #[tokio::test]
    async fn test_deploy_prune_failure_is_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        *mock.prune_result.lock().unwrap() = Err(failure("prune already running"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let housekeeping = mgr.deploy("web", false).await.unwrap();
        let warning = housekeeping.warning().unwrap();
        assert!(warning.contains("prune already running"));
    }

    #[tokio::test]
    async fn test_deploy_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = ServiceManager::new_for_testing(Box::new(MockRuntime::new()), tmp.path());
        assert!(matches!(
            mgr.deploy("ghost", false).await,
            Err(CoreError::NotFound(_))
        ));
    }

    // ==================== Remove ====================

    #[tokio::test]
    async fn test_remove_deletes_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let housekeeping = mgr.remove("web").await.unwrap();
        assert_eq!(housekeeping, super::Housekeeping::Clean);
        assert!(!tmp.path().join("web").exists());

        let dir = tmp.path().join("web").to_string_lossy().to_string();
        assert_eq!(
            *calls.lock().unwrap(),
            vec![MockCall::Down { dir }, MockCall::Prune]
        );
    }

    #[tokio::test]
    async fn test_remove_teardown_failure_keeps_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let down_result = mock.down_result.clone();
        *down_result.lock().unwrap() = Err(failure("container is busy"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr.remove("web").await.unwrap_err();
        assert_eq!(err.step(), Some(Step::Teardown));
        assert!(tmp.path().join("web").join(DESCRIPTOR_FILE).exists());

        // Retry once the runtime recovers
        *down_result.lock().unwrap() = Ok(Default::default());
        mgr.remove("web").await.unwrap();
        assert!(!tmp.path().join("web").exists());
    }

    #[tokio::test]
    async fn test_remove_delete_failure_after_teardown_skips_prune() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = manager_with_service(mock, tmp.path()).await;

        let err = mgr
            .remove_with("web", |_| {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only file system",
                ))
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Io { context: "failed to remove service folder", .. }
        ));
        assert!(err.to_string().contains("read-only file system"));

        // Containers were torn down and stay down; no housekeeping ran
        let dir = tmp.path().join("web").to_string_lossy().to_string();
        assert_eq!(*calls.lock().unwrap(), vec![MockCall::Down { dir }]);
        assert!(tmp.path().join("web").exists());
    }

    #[tokio::test]
    async fn test_remove_prune_failure_still_removes() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        *mock.prune_result.lock().unwrap() = Err(failure("daemon busy"));
        let mgr = manager_with_service(mock, tmp.path()).await;

        let housekeeping = mgr.remove("web").await.unwrap();
        assert!(matches!(housekeeping, super::Housekeeping::Failed(_)));
        assert!(!tmp.path().join("web").exists());
    }

    #[tokio::test]
    async fn test_remove_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        let mgr = ServiceManager::new_for_testing(Box::new(mock), tmp.path());

        assert!(matches!(mgr.remove("ghost").await, Err(CoreError::NotFound(_))));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_log_tail_is_used() {
        let tmp = tempfile::tempdir().unwrap();
        let mock = MockRuntime::new();
        let calls = mock.calls.clone();
        *mock.running_result.lock().unwrap() = Ok(Vec::new());
        let mut options = ManagerOptions::new(tmp.path());
        options.log_tail_lines = 200;
        let mgr = ServiceManager::new(Box::new(mock), options);
        mgr.create("web", COMPOSE).await.unwrap();

        assert!(mgr.start("web", false).await.is_err());
        assert!(calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| matches!(c, MockCall::RecentLogs { lines: 200, .. })));
    }
}
