//! Service identity and descriptor rules

use crate::{CoreError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of the compose descriptor inside each service directory
pub const DESCRIPTOR_FILE: &str = "docker-compose.yml";

/// Longest accepted service name
pub const MAX_NAME_LEN: usize = 63;

/// A validated service name.
///
/// The name doubles as a directory under the base directory and as the
/// compose project / service identifier, so it follows compose project
/// naming: lowercase ASCII letters, digits, `-` and `_`, starting with a
/// letter or digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn parse(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(CoreError::Validation("service name is required".into()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "invalid service name: must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        let rest_ok =
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

        if !first_ok || !rest_ok {
            return Err(CoreError::Validation(format!(
                "invalid service name '{}': use lowercase letters, digits, '-' and '_', \
                 starting with a letter or digit",
                name
            )));
        }

        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory for this service under `base_dir`
    pub fn path_in(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(&self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Syntactic check of a compose descriptor.
///
/// Only YAML well-formedness is checked; the container definitions
/// themselves are left to the runtime. Any non-empty text that parses is
/// accepted, including whitespace or comments only.
pub fn validate_descriptor(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(CoreError::Validation(
            "docker_compose_content is required".into(),
        ));
    }

    serde_yaml_ng::from_str::<serde_yaml_ng::Value>(content)
        .map(|_| ())
        .map_err(|e| CoreError::Validation(format!("invalid docker-compose content: {}", e)))
}
