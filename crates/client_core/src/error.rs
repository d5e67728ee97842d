use std::path::PathBuf;

use storage::HandoffError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum HomeError {
    #[error("failed to create project: {0}")]
    PersistenceFailure(String),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error("unknown project {0}")]
    UnknownProject(String),
}
