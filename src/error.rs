// Error kinds surfaced by the navigator and its collaborators. Every
// command failure ends up as one of these and is printed by the shell,
// which then carries on with the next line.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    /// Target folder could not be resolved, or its parent lookup failed.
    #[error("cannot change folder: {0}")]
    Navigation(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// Network or local I/O fault while streaming file bytes.
    #[error("transfer failed: {0}")]
    Transfer(String),
    /// The storage service rejected or failed a request.
    #[error("backend error: {0}")]
    Backend(String),
    /// Malformed or unknown command line.
    #[error("{0}")]
    Usage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = ShellError> = std::result::Result<T, E>;
