//! XHR errors

use docmode_dom::{DomError, ErrorKind};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum XhrError {
    #[error("invalid state")]
    InvalidState,

    #[error("the async argument is required in this document mode")]
    MissingAsync,

    #[error("forbidden header: {0}")]
    ForbiddenHeader(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout")]
    Timeout,

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<XhrError> for DomError {
    fn from(err: XhrError) -> Self {
        let kind = match err {
            XhrError::InvalidState => ErrorKind::InvalidState,
            XhrError::MissingAsync
            | XhrError::ForbiddenHeader(_)
            | XhrError::UnsupportedMethod(_)
            | XhrError::InvalidUrl(_) => ErrorKind::InvalidArg,
            XhrError::Network(_) | XhrError::Timeout | XhrError::Parse(_) => ErrorKind::Unspecified,
        };
        DomError::new(kind, err.to_string())
    }
}
