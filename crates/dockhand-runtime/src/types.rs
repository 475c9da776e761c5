//! Types shared between the runtime trait and its implementations

use std::fmt;

/// Container ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output of a runtime command that exited successfully.
/// `output` is stdout followed by stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
}

impl CommandOutput {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }
}

/// Describes the runtime CLI in use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    /// Binary name, e.g. "docker"
    pub command: String,
    /// Prefix arguments placed before the binary
    pub prefix: Vec<String>,
}

impl fmt::Display for RuntimeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.prefix {
            write!(f, "{} ", p)?;
        }
        write!(f, "{}", self.command)
    }
}
