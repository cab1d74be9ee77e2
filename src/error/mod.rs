mod from;

use std::{fmt, path::PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// How much of the local data survived a failed restore.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalState {
    /// Nothing local was touched.
    Intact,
    /// Local data was moved aside and then put back.
    RolledBack,
    /// Local data was cleared and could not be put back.
    Cleared,
}

impl fmt::Display for LocalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocalState::Intact => "local data is intact",
            LocalState::RolledBack => "local data was rolled back",
            LocalState::Cleared => "local data was cleared",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("no item found for key `{0}`")]
    ItemNotFound(String),

    #[error("storage URL `{0}` is invalid")]
    InvalidStorageUrl(String),

    #[error("`{0}` is not a valid file name")]
    InvalidFileName(String),

    #[error("`{0}` is not a valid category name")]
    InvalidCategory(String),

    #[error("hash `{0}` is invalid")]
    InvalidHash(String),

    #[error("`{0}` already exists")]
    FileAlreadyExists(PathBuf),

    #[error("`{0}` does not exist")]
    FileDoesNotExist(PathBuf),

    #[error("{0}")]
    MissingConfig(String),

    #[error("no backup found")]
    NoBackupFound,

    #[error("couldn't download backup: {0}")]
    DownloadFailed(#[source] Box<Error>),

    #[error("backup is invalid: {0}")]
    ValidationFailed(String),

    #[error("restore failed, {state}: {source}")]
    RestoreFailed {
        state: LocalState,
        #[source]
        source: Box<Error>,
    },

    #[error("another backup operation is already running")]
    OperationInProgress,

    #[error(transparent)]
    Other(AnyError),
}

#[derive(Error, Debug)]
pub struct AnyError(anyhow::Error);

impl fmt::Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for AnyError {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl Error {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(AnyError(error.into()))
    }

    pub fn download_failed(error: Error) -> Self {
        Error::DownloadFailed(Box::new(error))
    }

    pub fn restore_failed(state: LocalState, error: Error) -> Self {
        Error::RestoreFailed {
            state,
            source: Box::new(error),
        }
    }

    /// True when a failed restore left the user without their previous data.
    pub fn is_data_loss(&self) -> bool {
        matches!(
            self,
            Error::RestoreFailed {
                state: LocalState::Cleared,
                ..
            }
        )
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Other(AnyError(error))
    }
}
