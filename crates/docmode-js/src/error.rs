//! Script builtin errors

use docmode_dom::{DomError, ErrorKind};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage quota of {quota} characters exceeded")]
    QuotaExceeded { quota: usize },

    #[error("storage file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<StorageError> for DomError {
    fn from(err: StorageError) -> Self {
        let kind = match err {
            StorageError::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            StorageError::Io { .. } => ErrorKind::Unspecified,
        };
        DomError::new(kind, err.to_string())
    }
}
