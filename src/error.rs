use thiserror::Error;

/// Failures that abort an invocation. The binary reports them and exits 1.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("prompt failed: {0}")]
    Prompt(std::io::Error),
    #[error("failed to start command: {0}")]
    Spawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;
