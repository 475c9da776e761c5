//! Error types for dockhand-core

use std::fmt;
use thiserror::Error;

/// Runtime step that failed during a lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BringUp,
    StatusCheck,
    Pull,
    Rollout,
    Teardown,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BringUp => write!(f, "compose up failed"),
            Self::StatusCheck => write!(f, "status check failed"),
            Self::Pull => write!(f, "compose pull failed"),
            Self::Rollout => write!(f, "rollout failed"),
            Self::Teardown => write!(f, "compose down failed"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("service not found: {0}")]
    NotFound(String),

    #[error("service already exists: {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to login to registry: {0}")]
    Authentication(#[source] dockhand_runtime::RuntimeError),

    #[error("{step}: {detail}")]
    Execution { step: Step, detail: String },

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        source: std::io::Error,
    },
}

impl CoreError {
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { context, source }
    }

    pub(crate) fn execution(step: Step, detail: impl Into<String>) -> Self {
        Self::Execution {
            step,
            detail: detail.into(),
        }
    }

    /// The failing runtime step, if this is an execution error
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Execution { step, .. } => Some(*step),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
