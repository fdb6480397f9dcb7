use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Corrupt filesystem: {0}")]
    CorruptFilesystem(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Partition error: {0}")]
    Partition(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FsError {
    /// True for the errors a path lookup reports as "no such file".
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_) | FsError::NotADirectory(_))
    }
}

pub type FsResult<T> = Result<T, FsError>;
