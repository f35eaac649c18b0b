//! Host error type.

use canvas::error::EngineError;
use canvas::persist::PersistError;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("script read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("script parse failed: {0}")]
    Script(#[from] serde_json::Error),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
    /// A background worker exited before answering.
    #[error("worker stopped: {0}")]
    WorkerStopped(&'static str),
}

impl HostError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "E_CONFIG",
            Self::Io(_) => "E_SCRIPT_IO",
            Self::Script(_) => "E_SCRIPT_PARSE",
            Self::Engine(e) => e.error_code(),
            Self::Persist(e) => e.error_code(),
            Self::WorkerStopped(_) => "E_WORKER_STOPPED",
        }
    }
}
