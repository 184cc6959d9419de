use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SupervisorError {
    #[error("Tests are already running")]
    AlreadyRunning,
    #[error("invalid run request: {0}")]
    InvalidRequest(String),
    #[error("failed to spawn test command: {0}")]
    Spawn(#[from] std::io::Error),
}
