//! Engine errors

use docmode_dom::{DomError, ModeError};
use docmode_js::StorageError;
use docmode_net::XhrError;
use std::path::PathBuf;
use thiserror::Error;

use crate::event_loop::ContextId;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("script error: {0}")]
    Dom(#[from] DomError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Xhr(#[from] XhrError),

    #[error(transparent)]
    Mode(#[from] ModeError),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration: {0}")]
    Config(String),

    #[error("configuration file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no browsing context {0}")]
    NoContext(ContextId),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
