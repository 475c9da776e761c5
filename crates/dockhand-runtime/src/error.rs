//! Error types for the container runtime layer

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status})\nOutput: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    #[error("registry username and password are required for private images")]
    MissingCredentials,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
